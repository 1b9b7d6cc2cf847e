use std::net::SocketAddr;
use std::sync::Arc;

use media::Thumbnailer;
use tracing::{Level, info};

use server::config::AppConfig;
use server::database;
use server::mailer;
use server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let config = AppConfig::load()?;

    let db = database::init_db(&config.database.url).await?;
    database::ensure_indexes(&db).await?;

    let thumbnailer = Arc::new(Thumbnailer::new(
        config.media.thumbnail_max_dim,
        media::pdf::default_rasterizer(),
    ));
    let mailer = mailer::build(&config.email)?;

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;

    let state = AppState {
        db,
        config,
        thumbnailer,
        mailer,
    };
    let app = server::build_router(state);

    info!("Server running at http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
