use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "comentario")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub usuario_id: i32,

    #[sea_orm(belongs_to, from = "usuario_id", to = "id")]
    pub usuario: BelongsTo<super::user::Entity>,

    pub material_id: i32,

    #[sea_orm(belongs_to, from = "material_id", to = "id")]
    pub material: BelongsTo<super::material::Entity>,

    pub texto: String,
    pub fecha: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
