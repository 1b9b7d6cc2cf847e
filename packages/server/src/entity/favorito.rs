use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One user's bookmark of one material. Uniqueness of (usuario_id,
/// material_id) is enforced by `database::ensure_indexes`.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "favorito")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub usuario_id: i32,

    #[sea_orm(belongs_to, from = "usuario_id", to = "id")]
    pub usuario: BelongsTo<super::user::Entity>,

    pub material_id: i32,

    #[sea_orm(belongs_to, from = "material_id", to = "id")]
    pub material: BelongsTo<super::material::Entity>,

    pub fecha_agregado: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
