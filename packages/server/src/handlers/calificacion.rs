use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use sea_orm::*;
use tracing::instrument;

use crate::entity::calificacion;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::handlers::material::find_material;
use crate::models::calificacion::{
    CalificacionListQuery, CalificacionListResponse, CalificacionResponse,
    CreateCalificacionRequest, UpdateCalificacionRequest, validate_puntaje,
};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/",
    tag = "Ratings",
    operation_id = "listRatings",
    summary = "List ratings",
    description = "Open endpoint. Usually filtered by material with `?material=`.",
    params(CalificacionListQuery),
    responses(
        (status = 200, description = "Rating list", body = CalificacionListResponse),
    ),
)]
#[instrument(skip(state, query))]
pub async fn list_calificaciones(
    State(state): State<AppState>,
    Query(query): Query<CalificacionListQuery>,
) -> Result<Json<CalificacionListResponse>, AppError> {
    let mut select = calificacion::Entity::find();
    if let Some(material) = query.material {
        select = select.filter(calificacion::Column::MaterialId.eq(material));
    }

    let entries = select
        .order_by_desc(calificacion::Column::Fecha)
        .all(&state.db)
        .await?;

    let total = entries.len() as u64;
    let calificaciones = entries.into_iter().map(CalificacionResponse::from).collect();

    Ok(Json(CalificacionListResponse {
        calificaciones,
        total,
    }))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Ratings",
    operation_id = "createRating",
    summary = "Rate a material",
    description = "One rating per user per material; rating twice answers 409.",
    request_body = CreateCalificacionRequest,
    responses(
        (status = 201, description = "Rating created", body = CalificacionResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Material not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Already rated (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id, material = payload.material))]
pub async fn create_calificacion(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateCalificacionRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_puntaje(payload.puntaje)?;

    find_material(&state.db, payload.material).await?;

    let new_calificacion = calificacion::ActiveModel {
        usuario_id: Set(auth_user.user_id),
        material_id: Set(payload.material),
        puntaje: Set(payload.puntaje),
        fecha: Set(chrono::Utc::now()),
        ..Default::default()
    };

    let model = new_calificacion
        .insert(&state.db)
        .await
        .map_err(|e| match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                AppError::Conflict("You have already rated this material".into())
            }
            _ => AppError::from(e),
        })?;

    Ok((StatusCode::CREATED, Json(CalificacionResponse::from(model))))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Ratings",
    operation_id = "updateRating",
    summary = "Change a rating",
    description = "Author only.",
    params(("id" = i32, Path, description = "Rating ID")),
    request_body = UpdateCalificacionRequest,
    responses(
        (status = 200, description = "Rating updated", body = CalificacionResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the author (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Rating not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id, user_id = auth_user.user_id))]
pub async fn update_calificacion(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateCalificacionRequest>,
) -> Result<Json<CalificacionResponse>, AppError> {
    validate_puntaje(payload.puntaje)?;

    let model = find_calificacion(&state.db, id).await?;
    require_author(&model, auth_user.user_id)?;

    let mut active: calificacion::ActiveModel = model.into();
    active.puntaje = Set(payload.puntaje);
    let model = active.update(&state.db).await?;

    Ok(Json(CalificacionResponse::from(model)))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Ratings",
    operation_id = "deleteRating",
    summary = "Withdraw a rating",
    description = "Author only.",
    params(("id" = i32, Path, description = "Rating ID")),
    responses(
        (status = 204, description = "Rating deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the author (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Rating not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id, user_id = auth_user.user_id))]
pub async fn delete_calificacion(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let model = find_calificacion(&state.db, id).await?;
    require_author(&model, auth_user.user_id)?;

    calificacion::Entity::delete_by_id(id)
        .exec(&state.db)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn find_calificacion(
    db: &DatabaseConnection,
    id: i32,
) -> Result<calificacion::Model, AppError> {
    calificacion::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Rating not found".into()))
}

fn require_author(model: &calificacion::Model, user_id: i32) -> Result<(), AppError> {
    if model.usuario_id == user_id {
        Ok(())
    } else {
        Err(AppError::PermissionDenied)
    }
}
