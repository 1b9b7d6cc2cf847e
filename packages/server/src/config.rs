use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Maximum request body size in bytes. Material payloads arrive as base64
    /// inside JSON, so this bounds the whole create request.
    pub max_body_size: usize,
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_days: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmailConfig {
    /// From address for outgoing mail, e.g. `Kichwa Yachay <no-reply@example.org>`.
    pub from: String,
    /// Base URL of the frontend; verification and reset links point here.
    pub frontend_domain: String,
    /// When absent, emails are logged instead of delivered.
    pub smtp: Option<SmtpConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MediaConfig {
    /// Longer-edge bound for derived thumbnails, in pixels.
    pub thumbnail_max_dim: u32,
    /// Maximum decoded size of an uploaded file, in bytes.
    pub max_file_size: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub email: EmailConfig,
    pub media: MediaConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8000)?
            .set_default("server.max_body_size", 64 * 1024 * 1024)?
            .set_default("server.cors.allow_origins", vec!["*".to_string()])?
            .set_default("server.cors.max_age", 3600)?
            .set_default("auth.token_ttl_days", 7)?
            .set_default("email.from", "Kichwa Yachay <no-reply@localhost>")?
            .set_default("email.frontend_domain", "http://localhost:5173")?
            .set_default("media.thumbnail_max_dim", 400)?
            .set_default("media.max_file_size", 50 * 1024 * 1024)?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., YACHAY__AUTH__JWT_SECRET)
            .add_source(Environment::with_prefix("YACHAY").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
