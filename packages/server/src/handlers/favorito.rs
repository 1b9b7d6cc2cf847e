use std::collections::HashMap;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sea_orm::*;
use tracing::instrument;

use crate::entity::{favorito, material};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::handlers::material::find_material;
use crate::models::favorito::{CreateFavoritoRequest, FavoritoListResponse, FavoritoResponse};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/",
    tag = "Favorites",
    operation_id = "listFavorites",
    summary = "List the caller's favorites",
    responses(
        (status = 200, description = "Favorites, newest first", body = FavoritoListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn list_favoritos(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<FavoritoListResponse>, AppError> {
    let entries = favorito::Entity::find()
        .filter(favorito::Column::UsuarioId.eq(auth_user.user_id))
        .order_by_desc(favorito::Column::FechaAgregado)
        .all(&state.db)
        .await?;

    let material_ids: Vec<i32> = entries.iter().map(|f| f.material_id).collect();
    let titles: HashMap<i32, String> = if material_ids.is_empty() {
        HashMap::new()
    } else {
        material::Entity::find()
            .select_only()
            .column(material::Column::Id)
            .column(material::Column::Titulo)
            .filter(material::Column::Id.is_in(material_ids))
            .into_tuple::<(i32, String)>()
            .all(&state.db)
            .await?
            .into_iter()
            .collect()
    };

    let total = entries.len() as u64;
    let favoritos = entries
        .into_iter()
        .map(|f| {
            let titulo = titles.get(&f.material_id).cloned().unwrap_or_default();
            FavoritoResponse::new(f, titulo)
        })
        .collect();

    Ok(Json(FavoritoListResponse { favoritos, total }))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Favorites",
    operation_id = "createFavorite",
    summary = "Bookmark a material",
    request_body = CreateFavoritoRequest,
    responses(
        (status = 201, description = "Favorite created", body = FavoritoResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Material not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Already bookmarked (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id, material = payload.material))]
pub async fn create_favorito(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateFavoritoRequest>,
) -> Result<impl IntoResponse, AppError> {
    let material = find_material(&state.db, payload.material).await?;

    let new_favorito = favorito::ActiveModel {
        usuario_id: Set(auth_user.user_id),
        material_id: Set(material.id),
        fecha_agregado: Set(chrono::Utc::now()),
        ..Default::default()
    };

    let model = new_favorito
        .insert(&state.db)
        .await
        .map_err(|e| match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                AppError::Conflict("Material is already in favorites".into())
            }
            _ => AppError::from(e),
        })?;

    Ok((
        StatusCode::CREATED,
        Json(FavoritoResponse::new(model, material.titulo)),
    ))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Favorites",
    operation_id = "deleteFavorite",
    summary = "Remove a favorite",
    params(("id" = i32, Path, description = "Favorite ID")),
    responses(
        (status = 204, description = "Favorite removed"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the caller's favorite (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Favorite not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id, user_id = auth_user.user_id))]
pub async fn delete_favorito(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let model = favorito::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Favorite not found".into()))?;

    if model.usuario_id != auth_user.user_id {
        return Err(AppError::PermissionDenied);
    }

    favorito::Entity::delete_by_id(id).exec(&state.db).await?;

    Ok(StatusCode::NO_CONTENT)
}
