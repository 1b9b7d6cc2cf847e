use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::{comentario, user};
use crate::error::AppError;

/// Request body for posting a comment.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateComentarioRequest {
    /// Material being commented on.
    #[schema(example = 17)]
    pub material: i32,
    pub texto: String,
}

/// PATCH body for a comment (author only).
#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpdateComentarioRequest {
    pub texto: String,
}

pub fn validate_texto(texto: &str) -> Result<(), AppError> {
    if texto.trim().is_empty() || texto.len() > 5_000 {
        return Err(AppError::Validation(
            "Comment text must be non-empty and at most 5000 bytes".into(),
        ));
    }
    Ok(())
}

/// Query parameters for the comment listing.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct ComentarioListQuery {
    /// Restrict to comments on one material.
    pub material: Option<i32>,
}

/// Response DTO for a comment.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ComentarioResponse {
    pub id: i32,
    pub material: i32,
    /// Author's email.
    pub usuario_email: String,
    /// Author's display name (first name or email fallback).
    pub nombre_usuario: String,
    pub texto: String,
    pub fecha: DateTime<Utc>,
}

impl ComentarioResponse {
    pub fn new(model: comentario::Model, author: Option<&user::Model>) -> Self {
        let (usuario_email, nombre_usuario) = match author {
            Some(u) => {
                let nombre = if u.first_name.is_empty() {
                    u.email.clone()
                } else {
                    format!("{} {}", u.first_name, u.last_name).trim_end().to_string()
                };
                (u.email.clone(), nombre)
            }
            None => (String::new(), String::new()),
        };
        Self {
            id: model.id,
            material: model.material_id,
            usuario_email,
            nombre_usuario,
            texto: model.texto,
            fecha: model.fecha,
        }
    }
}

/// Response DTO for the comment listing.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ComentarioListResponse {
    pub comentarios: Vec<ComentarioResponse>,
    pub total: u64,
}
