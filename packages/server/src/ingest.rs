//! Material ingestion: content resolution, thumbnail derivation, and the
//! post-commit thumbnail backfill hook.
//!
//! The synchronous creation path runs entirely inside the create request:
//! decode the transport-encoded file, derive the thumbnail best-effort, then
//! persist everything in a single insert so the record is never visible
//! mid-construction. The backfill hook is invoked explicitly after the insert
//! commits and exists so PDF thumbnails are self-healing even for write paths
//! that skip the inline derivation; it is idempotent and absorbs every error.

use media::{Thumbnail, Thumbnailer, codec};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use tracing::{debug, warn};

use crate::entity::material;
use crate::error::AppError;

/// Resolved content fields of a material, after transport decoding and after
/// merging a PATCH request with the existing record.
pub struct ResolvedContent {
    pub archivo_blob: Option<Vec<u8>>,
    pub archivo_nombre: Option<String>,
    pub archivo_tipo: Option<String>,
    pub video_url: Option<String>,
}

impl ResolvedContent {
    /// At least one of {file bytes, video URL} must be present at all times.
    fn check_presence(&self) -> Result<(), AppError> {
        let has_file = self.archivo_blob.is_some();
        let has_video = self
            .video_url
            .as_deref()
            .is_some_and(|u| !u.trim().is_empty());
        if has_file || has_video {
            Ok(())
        } else {
            Err(AppError::Validation(
                "A file (base64) or a video URL is required".into(),
            ))
        }
    }
}

/// Decode and validate the content fields of a create request.
///
/// A malformed base64 payload or an oversized decoded file fails the whole
/// request with a validation error.
pub fn resolve_new_content(
    archivo_blob: Option<&str>,
    archivo_nombre: Option<String>,
    archivo_tipo: Option<String>,
    video_url: Option<String>,
    max_file_size: usize,
) -> Result<ResolvedContent, AppError> {
    let archivo_blob = archivo_blob.map(codec::decode).transpose()?;
    if let Some(ref blob) = archivo_blob
        && blob.len() > max_file_size
    {
        return Err(AppError::Validation(format!(
            "File exceeds maximum size of {max_file_size} bytes"
        )));
    }

    let content = ResolvedContent {
        archivo_blob,
        archivo_nombre,
        archivo_tipo,
        video_url,
    };
    content.check_presence()?;
    Ok(content)
}

/// Merge a PATCH request's content fields over an existing record and
/// re-validate the presence invariant against the merged state.
///
/// `None` leaves a field alone; `Some(None)` clears it; `Some(Some(v))`
/// replaces it. Clearing the file also clears its filename and declared type.
/// The stored thumbnail is deliberately not re-derived on file replacement.
#[allow(clippy::too_many_arguments)]
pub fn resolve_updated_content(
    existing: &material::Model,
    archivo_blob: Option<Option<String>>,
    archivo_nombre: Option<Option<String>>,
    archivo_tipo: Option<Option<String>>,
    video_url: Option<Option<String>>,
    max_file_size: usize,
) -> Result<ResolvedContent, AppError> {
    let blob_cleared = matches!(archivo_blob, Some(None));

    let archivo_blob = match archivo_blob {
        None => existing.archivo_blob.clone(),
        Some(None) => None,
        Some(Some(encoded)) => {
            let decoded = codec::decode(&encoded)?;
            if decoded.len() > max_file_size {
                return Err(AppError::Validation(format!(
                    "File exceeds maximum size of {max_file_size} bytes"
                )));
            }
            Some(decoded)
        }
    };

    let merge = |patch: Option<Option<String>>, current: &Option<String>| match patch {
        None => {
            if blob_cleared {
                None
            } else {
                current.clone()
            }
        }
        Some(value) => value,
    };

    let content = ResolvedContent {
        archivo_blob,
        archivo_nombre: merge(archivo_nombre, &existing.archivo_nombre),
        archivo_tipo: merge(archivo_tipo, &existing.archivo_tipo),
        video_url: match video_url {
            None => existing.video_url.clone(),
            Some(value) => value,
        },
    };
    content.check_presence()?;
    Ok(content)
}

/// Best-effort thumbnail for the resolved content. Requires both raw bytes
/// and a declared type; never fails.
pub fn derive_thumbnail(thumbnailer: &Thumbnailer, content: &ResolvedContent) -> Option<Thumbnail> {
    let blob = content.archivo_blob.as_deref()?;
    let tipo = content.archivo_tipo.as_deref()?;
    thumbnailer.render(blob, tipo)
}

/// Whether the backfill hook has work to do for this record: stored original
/// bytes, a declared type of exactly `application/pdf` (case-insensitive),
/// and no thumbnail yet.
pub fn needs_pdf_backfill(model: &material::Model) -> bool {
    model.archivo_blob.is_some()
        && model
            .archivo_tipo
            .as_deref()
            .is_some_and(|t| t.trim().eq_ignore_ascii_case("application/pdf"))
        && model.thumbnail_blob.is_none()
}

/// Post-commit hook: fill in a missing PDF thumbnail for a newly inserted
/// material.
///
/// The caller has already received (or is about to receive) a successful
/// response, so nothing here may propagate: every failure is logged and
/// swallowed. Writes back only the two thumbnail fields. Idempotent — a
/// record that already has a thumbnail is never touched; if two invocations
/// raced, both compute the same deterministic bytes and last write wins.
pub async fn backfill_pdf_thumbnail(
    db: &DatabaseConnection,
    thumbnailer: &Thumbnailer,
    material_id: i32,
) {
    if let Err(e) = try_backfill(db, thumbnailer, material_id).await {
        warn!(material_id, error = ?e, "PDF thumbnail backfill failed");
    }
}

async fn try_backfill(
    db: &DatabaseConnection,
    thumbnailer: &Thumbnailer,
    material_id: i32,
) -> Result<(), AppError> {
    let Some(model) = material::Entity::find_by_id(material_id).one(db).await? else {
        return Ok(());
    };
    if !needs_pdf_backfill(&model) {
        return Ok(());
    }
    let Some(blob) = model.archivo_blob.as_deref() else {
        return Ok(());
    };
    let Some(thumb) = thumbnailer.render(blob, "application/pdf") else {
        debug!(material_id, "backfill produced no thumbnail");
        return Ok(());
    };

    let mut active: material::ActiveModel = model.into();
    active.thumbnail_blob = Set(Some(thumb.data));
    active.thumbnail_tipo = Set(Some(thumb.content_type.to_string()));
    active.update(db).await?;

    Ok(())
}
