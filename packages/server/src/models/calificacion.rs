use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::calificacion;
use crate::error::AppError;

/// Request body for rating a material.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateCalificacionRequest {
    /// Material being rated.
    #[schema(example = 17)]
    pub material: i32,
    /// Star rating, 1-5.
    #[schema(example = 4)]
    pub puntaje: i16,
}

/// PATCH body for a rating (author only).
#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpdateCalificacionRequest {
    pub puntaje: i16,
}

pub fn validate_puntaje(puntaje: i16) -> Result<(), AppError> {
    if !(1..=5).contains(&puntaje) {
        return Err(AppError::Validation("puntaje must be between 1 and 5".into()));
    }
    Ok(())
}

/// Query parameters for the rating listing.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct CalificacionListQuery {
    /// Restrict to ratings of one material.
    pub material: Option<i32>,
}

/// Response DTO for a rating.
#[derive(Serialize, utoipa::ToSchema)]
pub struct CalificacionResponse {
    pub id: i32,
    pub material: i32,
    pub usuario: i32,
    pub puntaje: i16,
    pub fecha: DateTime<Utc>,
}

impl From<calificacion::Model> for CalificacionResponse {
    fn from(model: calificacion::Model) -> Self {
        Self {
            id: model.id,
            material: model.material_id,
            usuario: model.usuario_id,
            puntaje: model.puntaje,
            fecha: model.fecha,
        }
    }
}

/// Response DTO for the rating listing.
#[derive(Serialize, utoipa::ToSchema)]
pub struct CalificacionListResponse {
    pub calificaciones: Vec<CalificacionResponse>,
    pub total: u64,
}
