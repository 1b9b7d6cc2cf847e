use std::sync::Arc;

use media::Thumbnailer;
use sea_orm::DatabaseConnection;

use crate::config::AppConfig;
use crate::mailer::Mailer;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: AppConfig,
    pub thumbnailer: Arc<Thumbnailer>,
    pub mailer: Arc<dyn Mailer>,
}
