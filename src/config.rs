//! Application configuration, read once at startup from the environment
//! (optionally seeded by a `.env` file) and passed by ownership into the
//! rest of the app. Nothing else reads environment variables at runtime.

use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Postgres connection string.
    pub database_url: String,
    /// Directory where uploaded images are written.
    pub image_dir: PathBuf,
    /// Directory for non-image resources (resume, about-info.json).
    pub resources_dir: PathBuf,
    pub host: String,
    pub port: u16,
    pub db_pool_max: u32,
    pub db_pool_min: u32,
}

impl AppConfig {
    /// Build the config from environment variables. `DATABASE_URL` is either
    /// given directly or assembled from the `DB_HOST`/`DB_USER`/`DB_PASSWORD`/
    /// `DB_NAME` parts.
    pub fn from_env() -> Self {
        let database_url = std::env::var("DATABASE_URL").unwrap_or_else(|_| {
            let host = std::env::var("DB_HOST").unwrap_or_else(|_| "localhost".to_string());
            let user = std::env::var("DB_USER").unwrap_or_else(|_| "postgres".to_string());
            let password = std::env::var("DB_PASSWORD").unwrap_or_default();
            let name = std::env::var("DB_NAME").unwrap_or_else(|_| "portfolio".to_string());
            format!("postgresql://{}:{}@{}/{}", user, password, host, name)
        });

        let upload_root = std::env::var("UPLOAD_ROOT").unwrap_or_else(|_| "uploads".to_string());
        let upload_root = PathBuf::from(upload_root);

        Self {
            database_url,
            image_dir: upload_root.join("images"),
            resources_dir: upload_root.join("resources"),
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5000),
            db_pool_max: std::env::var("DB_POOL_MAX")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            db_pool_min: std::env::var("DB_POOL_MIN")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2),
        }
    }

    /// Path of the about-page info file inside the resources directory.
    pub fn about_file(&self) -> PathBuf {
        self.resources_dir.join("about-info.json")
    }
}
