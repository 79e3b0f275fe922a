//! Portfolio API - library for app logic and testing.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod routes;
pub mod session;
pub mod state;

use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    middleware,
    routing::{delete, get, patch, post, put},
    Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer, compression::CompressionLayer, cors::CorsLayer,
    limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer,
};

use config::AppConfig;
use db::Db;
use state::AppState;

/// Per-request wall-clock budget. On trip the client gets a timeout
/// response; in-flight work is not cooperatively cancelled.
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Request body cap; multipart uploads have to fit under this.
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Configure CORS from environment variables.
/// Uses ALLOWED_ORIGINS (comma-separated) or FRONTEND_ORIGIN.
pub fn configure_cors() -> CorsLayer {
    let allowed_origins = std::env::var("ALLOWED_ORIGINS")
        .ok()
        .and_then(|s| {
            let origins: Vec<HeaderValue> = s
                .split(',')
                .filter_map(|origin| origin.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                None
            } else {
                Some(origins)
            }
        })
        .or_else(|| {
            std::env::var("FRONTEND_ORIGIN")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(|origin| vec![origin])
        })
        .unwrap_or_else(|| {
            vec![
                "http://localhost:3000".parse().unwrap(),
                "http://127.0.0.1:3000".parse().unwrap(),
            ]
        });

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([axum::http::header::CONTENT_TYPE])
        .allow_credentials(true)
}

/// Admin routes that sit behind the session middleware gate. The users
/// cluster is not here: it checks sessions in-handler (bootstrap exception
/// and self-delete guard need the resolved identity).
fn admin_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/v1/admin/photos", post(routes::photos::add_photo))
        .route(
            "/api/v1/admin/photos/{file_name}",
            delete(routes::photos::remove_photo),
        )
        .route(
            "/api/v1/admin/gallery",
            post(routes::gallery::create_gallery_item),
        )
        .route(
            "/api/v1/admin/gallery/{id}",
            put(routes::gallery::update_gallery_item).delete(routes::gallery::remove_gallery_item),
        )
        .route(
            "/api/v1/admin/gallery/{id}/thumbnail",
            patch(routes::gallery::change_thumbnail),
        )
        .route(
            "/api/v1/admin/gallery/{id}/images",
            post(routes::gallery::add_project_images).delete(routes::gallery::remove_project_images),
        )
        .route("/api/v1/admin/about", patch(routes::about::update_about))
        .route("/api/v1/admin/upload", post(routes::upload::upload_file))
        .route_layer(middleware::from_fn_with_state(state, auth::require_admin))
}

/// Create and configure the application router.
pub fn create_app(state: AppState) -> Router {
    let cors = configure_cors();

    Router::new()
        .route("/api/v1/photos", get(routes::photos::list_photos))
        .route("/api/v1/gallery", get(routes::gallery::list_gallery_items))
        .route(
            "/api/v1/gallery/{name}",
            get(routes::gallery::get_gallery_item),
        )
        .route("/api/v1/about", get(routes::about::get_about))
        .route("/api/v1/check", get(routes::auth::check_session))
        .route("/api/v1/login", post(routes::auth::login))
        .route("/api/v1/logout", post(routes::auth::logout))
        .route("/api/v1/refresh", post(routes::auth::refresh))
        .route(
            "/api/v1/admin/users",
            get(routes::users::list_users).post(routes::users::create_user),
        )
        .route(
            "/api/v1/admin/users/{id}",
            delete(routes::users::delete_user),
        )
        .merge(admin_router(state.clone()))
        .layer(logging::middleware::propagate_request_id_layer())
        .layer(middleware::from_fn(logging::middleware::log_request))
        .layer(logging::middleware::request_id_layer())
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(REQUEST_TIMEOUT_SECS)))
        .layer(CompressionLayer::new())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(cors)
        .with_state(state)
}

/// Run the server (used by main). Startup failures abort the process.
pub async fn run() {
    dotenvy::dotenv().ok();

    let _log_guards = logging::init();

    let config = AppConfig::from_env();

    // Upload directories must exist before the first request.
    std::fs::create_dir_all(&config.image_dir).expect("Failed to create image directory");
    std::fs::create_dir_all(&config.resources_dir).expect("Failed to create resources directory");

    let db = Db::connect(&config)
        .await
        .expect("Failed to connect to the database");

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("Invalid HOST/PORT configuration");

    let state = AppState::new(db, config);
    let app = create_app(state);

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app).await.expect("Server error");
}

#[cfg(test)]
pub(crate) mod test_util {
    //! Helpers for handler tests. The database pool is lazy and never
    //! connects; tests only exercise paths that fail before any query.

    use super::*;
    use axum::http::Request;

    pub fn test_state() -> AppState {
        let db = Db::connect_lazy("postgresql://localhost/portfolio_test")
            .expect("lazy pool construction");

        let tmp = std::env::temp_dir().join("portfolio-api-tests");
        let config = AppConfig {
            database_url: "postgresql://localhost/portfolio_test".to_string(),
            image_dir: tmp.join("images"),
            resources_dir: tmp.join("resources"),
            host: "127.0.0.1".to_string(),
            port: 0,
            db_pool_max: 1,
            db_pool_min: 0,
        };

        AppState::new(db, config)
    }

    pub fn test_app() -> Router {
        create_app(test_state())
    }

    pub fn request_builder(method: &str, uri: &str) -> axum::http::request::Builder {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
    }
}
