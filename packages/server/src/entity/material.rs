use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Closed set of material kinds accepted on the wire.
pub const TIPOS: &[&str] = &["ficha", "presentacion", "video"];

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "material")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub titulo: String,
    pub descripcion: String,
    /// One of [`TIPOS`]; validated at the API boundary.
    pub tipo: String,

    /// Original file bytes. A material holds either a file or a video URL;
    /// at least one is present at all times (enforced at write time).
    pub archivo_blob: Option<Vec<u8>>,
    /// Original upload filename.
    pub archivo_nombre: Option<String>,
    /// Declared MIME type of the file, trusted as-is.
    pub archivo_tipo: Option<String>,
    pub video_url: Option<String>,

    /// Derived preview, never user-supplied. Consistent with archivo_blob as
    /// of generation time; file replacement does not re-derive it.
    pub thumbnail_blob: Option<Vec<u8>>,
    pub thumbnail_tipo: Option<String>,

    pub usuario_id: i32,

    #[sea_orm(belongs_to, from = "usuario_id", to = "id")]
    pub usuario: BelongsTo<super::user::Entity>,

    #[sea_orm(has_many)]
    pub favoritos: HasMany<super::favorito::Entity>,

    #[sea_orm(has_many)]
    pub comentarios: HasMany<super::comentario::Entity>,

    #[sea_orm(has_many)]
    pub calificaciones: HasMany<super::calificacion::Entity>,

    pub fecha_creacion: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
