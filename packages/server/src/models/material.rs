use chrono::{DateTime, Utc};
use sea_orm::FromQueryResult;
use serde::{Deserialize, Serialize};

use crate::entity::{material, user};
use crate::error::AppError;

pub use super::shared::{Pagination, escape_like};
use super::shared::{double_option, validate_titulo};

/// Request body for creating a material. File content travels as base64 in
/// `archivo_blob`; either a file or a `video_url` must be supplied.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateMaterialRequest {
    #[schema(example = "Vocabulario kichwa: la familia")]
    pub titulo: String,
    #[serde(default)]
    pub descripcion: String,
    /// One of `ficha`, `presentacion`, `video`.
    #[schema(example = "ficha")]
    pub tipo: String,
    /// File content, base64-encoded.
    pub archivo_blob: Option<String>,
    #[schema(example = "familia.pdf")]
    pub archivo_nombre: Option<String>,
    /// Declared MIME type of the file; drives thumbnail generation.
    #[schema(example = "application/pdf")]
    pub archivo_tipo: Option<String>,
    pub video_url: Option<String>,
}

/// PATCH body for a material. Nullable content fields use double-option
/// semantics: absent = leave alone, null = clear, value = replace. Clearing
/// `archivo_blob` also clears the stored filename and declared type.
#[derive(Deserialize, Default, PartialEq, utoipa::ToSchema)]
pub struct UpdateMaterialRequest {
    pub titulo: Option<String>,
    pub descripcion: Option<String>,
    pub tipo: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub archivo_blob: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub archivo_nombre: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub archivo_tipo: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub video_url: Option<Option<String>>,
}

/// Query parameters for the material listing.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct MaterialListQuery {
    /// 1-based page number.
    pub page: Option<u64>,
    /// Items per page (1-100).
    pub per_page: Option<u64>,
    /// Case-insensitive search over titulo and descripcion.
    pub search: Option<String>,
    /// Filter by material kind.
    pub tipo: Option<String>,
    /// Filter by owner user ID.
    pub usuario: Option<i32>,
    /// `fecha_creacion` (default) or `titulo`.
    pub sort_by: Option<String>,
    /// `asc` or `desc` (default).
    pub sort_order: Option<String>,
}

/// Rating aggregate for one material.
#[derive(FromQueryResult)]
pub struct RatingAggregate {
    pub material_id: i32,
    pub promedio: Option<f64>,
    pub total: i64,
}

/// Listing projection. Blob columns are reduced to presence flags so list
/// queries never pull file bytes off the database.
#[derive(FromQueryResult)]
pub struct MaterialListRow {
    pub id: i32,
    pub titulo: String,
    pub descripcion: String,
    pub tipo: String,
    pub archivo_nombre: Option<String>,
    pub archivo_tipo: Option<String>,
    pub video_url: Option<String>,
    pub usuario_id: i32,
    pub fecha_creacion: DateTime<Utc>,
    pub has_archivo: bool,
    pub has_thumbnail: bool,
}

/// Response DTO for a material.
///
/// Never carries `archivo_blob` or `thumbnail_blob`; binary content is exposed
/// only through the download/thumbnail URLs.
#[derive(Serialize, utoipa::ToSchema)]
pub struct MaterialResponse {
    #[schema(example = 17)]
    pub id: i32,
    pub titulo: String,
    pub descripcion: String,
    #[schema(example = "ficha")]
    pub tipo: String,
    pub archivo_nombre: Option<String>,
    pub archivo_tipo: Option<String>,
    /// Download link, present only when a file is stored.
    #[schema(example = "/api/v1/materials/17/download/")]
    pub archivo_url: Option<String>,
    pub video_url: Option<String>,
    /// Thumbnail link, present only when a preview was derived.
    #[schema(example = "/api/v1/materials/17/thumbnail/")]
    pub thumbnail_url: Option<String>,
    /// Owner's email.
    pub usuario: String,
    /// Owner's display name, or "Desconocido" when no name is set.
    pub usuario_nombre: String,
    pub fecha_creacion: DateTime<Utc>,
    /// Average rating rounded to two decimals, absent when unrated.
    pub calificacion_promedio: Option<f64>,
    pub total_calificaciones: u64,
    /// The authenticated caller's own rating, when any.
    pub mi_calificacion: Option<i16>,
}

impl MaterialResponse {
    pub fn build(
        model: material::Model,
        owner: Option<&user::Model>,
        aggregate: Option<&RatingAggregate>,
        mi_calificacion: Option<i16>,
    ) -> Self {
        let archivo_url = model
            .archivo_blob
            .as_ref()
            .map(|_| format!("/api/v1/materials/{}/download/", model.id));
        let thumbnail_url = model
            .thumbnail_blob
            .as_ref()
            .map(|_| format!("/api/v1/materials/{}/thumbnail/", model.id));

        let (usuario, usuario_nombre) = match owner {
            Some(u) => (u.email.clone(), display_name(u)),
            None => (String::new(), "Desconocido".to_string()),
        };

        Self {
            id: model.id,
            titulo: model.titulo,
            descripcion: model.descripcion,
            tipo: model.tipo,
            archivo_nombre: model.archivo_nombre,
            archivo_tipo: model.archivo_tipo,
            archivo_url,
            video_url: model.video_url,
            thumbnail_url,
            usuario,
            usuario_nombre,
            fecha_creacion: model.fecha_creacion,
            calificacion_promedio: aggregate
                .and_then(|a| a.promedio)
                .map(|p| (p * 100.0).round() / 100.0),
            total_calificaciones: aggregate.map_or(0, |a| a.total.max(0) as u64),
            mi_calificacion,
        }
    }

    /// Like [`MaterialResponse::build`], from the blob-free listing projection.
    pub fn from_row(
        row: MaterialListRow,
        owner: Option<&user::Model>,
        aggregate: Option<&RatingAggregate>,
        mi_calificacion: Option<i16>,
    ) -> Self {
        let archivo_url = row
            .has_archivo
            .then(|| format!("/api/v1/materials/{}/download/", row.id));
        let thumbnail_url = row
            .has_thumbnail
            .then(|| format!("/api/v1/materials/{}/thumbnail/", row.id));

        let (usuario, usuario_nombre) = match owner {
            Some(u) => (u.email.clone(), display_name(u)),
            None => (String::new(), "Desconocido".to_string()),
        };

        Self {
            id: row.id,
            titulo: row.titulo,
            descripcion: row.descripcion,
            tipo: row.tipo,
            archivo_nombre: row.archivo_nombre,
            archivo_tipo: row.archivo_tipo,
            archivo_url,
            video_url: row.video_url,
            thumbnail_url,
            usuario,
            usuario_nombre,
            fecha_creacion: row.fecha_creacion,
            calificacion_promedio: aggregate
                .and_then(|a| a.promedio)
                .map(|p| (p * 100.0).round() / 100.0),
            total_calificaciones: aggregate.map_or(0, |a| a.total.max(0) as u64),
            mi_calificacion,
        }
    }
}

fn display_name(user: &user::Model) -> String {
    match (user.first_name.is_empty(), user.last_name.is_empty()) {
        (false, false) => format!("{} {}", user.first_name, user.last_name),
        (false, true) => user.first_name.clone(),
        _ => "Desconocido".to_string(),
    }
}

/// Response DTO for the material listing.
#[derive(Serialize, utoipa::ToSchema)]
pub struct MaterialListResponse {
    pub data: Vec<MaterialResponse>,
    pub pagination: Pagination,
}

pub fn validate_tipo(tipo: &str) -> Result<(), AppError> {
    if material::TIPOS.contains(&tipo) {
        Ok(())
    } else {
        Err(AppError::Validation(
            "tipo must be one of: ficha, presentacion, video".into(),
        ))
    }
}

pub fn validate_create_material(req: &CreateMaterialRequest) -> Result<(), AppError> {
    validate_titulo(&req.titulo)?;
    validate_tipo(&req.tipo)?;
    validate_descripcion(&req.descripcion)?;
    Ok(())
}

pub fn validate_update_material(req: &UpdateMaterialRequest) -> Result<(), AppError> {
    if let Some(ref titulo) = req.titulo {
        validate_titulo(titulo)?;
    }
    if let Some(ref tipo) = req.tipo {
        validate_tipo(tipo)?;
    }
    if let Some(ref descripcion) = req.descripcion {
        validate_descripcion(descripcion)?;
    }
    Ok(())
}

fn validate_descripcion(descripcion: &str) -> Result<(), AppError> {
    if descripcion.len() > 10_000 {
        return Err(AppError::Validation(
            "Description must be at most 10000 bytes".into(),
        ));
    }
    Ok(())
}
