//! Shared application state, built once in `run` and cloned into handlers.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::Db;
use crate::session::SessionManager;

#[derive(Debug, Clone)]
pub struct AppState {
    pub db: Db,
    pub sessions: SessionManager,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(db: Db, config: AppConfig) -> Self {
        Self {
            sessions: SessionManager::new(db.clone()),
            db,
            config: Arc::new(config),
        }
    }
}
