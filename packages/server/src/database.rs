use std::time::Duration;

use sea_orm::sea_query::{Index, PostgresQueryBuilder};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr};
use tracing::info;

use crate::entity::{calificacion, favorito};

pub async fn init_db(db_url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(db_url.to_owned());

    // Set connection pool options
    opt.max_connections(100)
        .min_connections(5)
        .connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .idle_timeout(Duration::from_secs(8))
        .max_lifetime(Duration::from_secs(8))
        .sqlx_logging(true);

    let db = Database::connect(opt).await?;
    db.get_schema_registry("server::entity::*")
        .sync(&db)
        .await?;

    Ok(db)
}

/// Ensure required database indexes exist.
///
/// SeaORM's schema-sync doesn't support composite unique indexes, so the
/// one-favorite-per-material and one-rating-per-material constraints are
/// created manually on startup.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    let statements = [
        Index::create()
            .if_not_exists()
            .unique()
            .name("idx_favorito_usuario_material")
            .table(favorito::Entity)
            .col(favorito::Column::UsuarioId)
            .col(favorito::Column::MaterialId)
            .to_string(PostgresQueryBuilder),
        Index::create()
            .if_not_exists()
            .unique()
            .name("idx_calificacion_usuario_material")
            .table(calificacion::Entity)
            .col(calificacion::Column::UsuarioId)
            .col(calificacion::Column::MaterialId)
            .to_string(PostgresQueryBuilder),
    ];

    for stmt in statements {
        db.execute_unprepared(&stmt).await?;
    }
    info!("Ensured unique indexes on favorito and calificacion");

    Ok(())
}
