use std::collections::HashMap;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use sea_orm::*;
use tracing::instrument;

use crate::entity::{comentario, user};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::handlers::material::find_material;
use crate::models::comentario::{
    ComentarioListQuery, ComentarioListResponse, ComentarioResponse, CreateComentarioRequest,
    UpdateComentarioRequest, validate_texto,
};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/",
    tag = "Comments",
    operation_id = "listComments",
    summary = "List comments",
    description = "Open endpoint. Usually filtered by material with `?material=`; \
        comments come back oldest first.",
    params(ComentarioListQuery),
    responses(
        (status = 200, description = "Comment list", body = ComentarioListResponse),
    ),
)]
#[instrument(skip(state, query))]
pub async fn list_comentarios(
    State(state): State<AppState>,
    Query(query): Query<ComentarioListQuery>,
) -> Result<Json<ComentarioListResponse>, AppError> {
    let mut select = comentario::Entity::find();
    if let Some(material) = query.material {
        select = select.filter(comentario::Column::MaterialId.eq(material));
    }

    let entries = select
        .order_by_asc(comentario::Column::Fecha)
        .all(&state.db)
        .await?;

    let authors = load_authors(&state.db, entries.iter().map(|c| c.usuario_id)).await?;

    let total = entries.len() as u64;
    let comentarios = entries
        .into_iter()
        .map(|c| {
            let author = authors.get(&c.usuario_id);
            ComentarioResponse::new(c, author)
        })
        .collect();

    Ok(Json(ComentarioListResponse { comentarios, total }))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Comments",
    operation_id = "createComment",
    summary = "Post a comment on a material",
    request_body = CreateComentarioRequest,
    responses(
        (status = 201, description = "Comment created", body = ComentarioResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Material not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id, material = payload.material))]
pub async fn create_comentario(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateComentarioRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_texto(&payload.texto)?;

    find_material(&state.db, payload.material).await?;

    let new_comentario = comentario::ActiveModel {
        usuario_id: Set(auth_user.user_id),
        material_id: Set(payload.material),
        texto: Set(payload.texto),
        fecha: Set(chrono::Utc::now()),
        ..Default::default()
    };

    let model = new_comentario.insert(&state.db).await?;
    let author = user::Entity::find_by_id(auth_user.user_id)
        .one(&state.db)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ComentarioResponse::new(model, author.as_ref())),
    ))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Comments",
    operation_id = "updateComment",
    summary = "Edit a comment",
    description = "Author only.",
    params(("id" = i32, Path, description = "Comment ID")),
    request_body = UpdateComentarioRequest,
    responses(
        (status = 200, description = "Comment updated", body = ComentarioResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the author (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Comment not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id, user_id = auth_user.user_id))]
pub async fn update_comentario(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateComentarioRequest>,
) -> Result<Json<ComentarioResponse>, AppError> {
    validate_texto(&payload.texto)?;

    let model = find_comentario(&state.db, id).await?;
    require_author(&model, auth_user.user_id)?;

    let mut active: comentario::ActiveModel = model.into();
    active.texto = Set(payload.texto);
    let model = active.update(&state.db).await?;

    let author = user::Entity::find_by_id(auth_user.user_id)
        .one(&state.db)
        .await?;

    Ok(Json(ComentarioResponse::new(model, author.as_ref())))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Comments",
    operation_id = "deleteComment",
    summary = "Delete a comment",
    description = "Author only.",
    params(("id" = i32, Path, description = "Comment ID")),
    responses(
        (status = 204, description = "Comment deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the author (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Comment not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id, user_id = auth_user.user_id))]
pub async fn delete_comentario(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let model = find_comentario(&state.db, id).await?;
    require_author(&model, auth_user.user_id)?;

    comentario::Entity::delete_by_id(id).exec(&state.db).await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn find_comentario(
    db: &DatabaseConnection,
    id: i32,
) -> Result<comentario::Model, AppError> {
    comentario::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Comment not found".into()))
}

fn require_author(model: &comentario::Model, user_id: i32) -> Result<(), AppError> {
    if model.usuario_id == user_id {
        Ok(())
    } else {
        Err(AppError::PermissionDenied)
    }
}

async fn load_authors<C: ConnectionTrait>(
    db: &C,
    ids: impl Iterator<Item = i32>,
) -> Result<HashMap<i32, user::Model>, AppError> {
    let ids: Vec<i32> = ids.collect();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let users = user::Entity::find()
        .filter(user::Column::Id.is_in(ids))
        .all(db)
        .await?;
    Ok(users.into_iter().map(|u| (u.id, u)).collect())
}
