use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::favorito;

/// Request body for adding a material to the caller's favorites.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateFavoritoRequest {
    /// Material ID to bookmark.
    #[schema(example = 17)]
    pub material: i32,
}

/// Response DTO for a favorite entry.
#[derive(Serialize, utoipa::ToSchema)]
pub struct FavoritoResponse {
    pub id: i32,
    pub material: i32,
    /// Title of the bookmarked material, for list rendering.
    pub material_titulo: String,
    pub fecha_agregado: DateTime<Utc>,
}

impl FavoritoResponse {
    pub fn new(model: favorito::Model, material_titulo: String) -> Self {
        Self {
            id: model.id,
            material: model.material_id,
            material_titulo,
            fecha_agregado: model.fecha_agregado,
        }
    }
}

/// Response DTO for the caller's favorites list.
#[derive(Serialize, utoipa::ToSchema)]
pub struct FavoritoListResponse {
    pub favoritos: Vec<FavoritoResponse>,
    pub total: u64,
}
