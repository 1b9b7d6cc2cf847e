use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub email: String,
    /// Argon2 hash, never the plaintext.
    pub password: String,
    pub first_name: String,
    pub last_name: String,

    /// Set once the verification-email link is followed.
    pub is_verified: bool,

    #[sea_orm(has_many)]
    pub materiales: HasMany<super::material::Entity>,

    #[sea_orm(has_many)]
    pub favoritos: HasMany<super::favorito::Entity>,

    #[sea_orm(has_many)]
    pub comentarios: HasMany<super::comentario::Entity>,

    #[sea_orm(has_many)]
    pub calificaciones: HasMany<super::calificacion::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
