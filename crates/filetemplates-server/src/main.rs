//! Filetemplates HTTP API Server
//!
//! Exposes the template listing and create-from-template operations of the
//! filetemplates library over REST, backed by local file storage.

use axum::{
    Router,
    http::HeaderValue,
    response::Json,
    routing::get,
};
use filetemplates::{FileStorage, LocalStorage, PreviewProvider, TemplateRegistry, TemplateService};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

mod config;
mod error;
mod identity;
mod models;
mod routes;

use config::ServerConfig;
use error::Result;

/// Main application state
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<TemplateRegistry>,
    pub storage: Arc<dyn FileStorage>,
    pub preview: Arc<dyn PreviewProvider>,
    pub config: ServerConfig,
}

impl AppState {
    /// Service bound to the request's user
    pub fn template_service(&self, user_id: Option<String>) -> TemplateService {
        TemplateService::new(
            self.storage.clone(),
            self.preview.clone(),
            self.registry.clone(),
            user_id,
        )
        .with_template_folder(self.config.template_folder.clone())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| {
            "filetemplates=debug,filetemplates_server=debug,tower_http=debug".to_string()
        }))
        .init();

    // Load configuration
    let config = ServerConfig::from_env()?;
    info!(
        "Starting filetemplates server on {}:{} (data in {})",
        config.host,
        config.port,
        config.data_dir.display()
    );

    // Registration happens here, before the registry is shared
    let registry = Arc::new(config.load_registry()?);
    for group in registry.iter() {
        info!(
            "Template support: {} ({}) .{} {:?}",
            group.label, group.app, group.extension, group.mimetypes
        );
    }

    tokio::fs::create_dir_all(&config.data_dir).await?;

    let state = AppState {
        registry,
        storage: Arc::new(LocalStorage::new(&config.data_dir)),
        preview: Arc::new(config.preview_provider()),
        config: config.clone(),
    };

    let app = create_router(state);

    let listener = bind_listener(&config).await?;

    info!("Server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Bind the configured address; host names such as `localhost` are resolved
async fn bind_listener(config: &ServerConfig) -> Result<tokio::net::TcpListener> {
    Ok(tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?)
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        // Health check
        .route("/health", get(health_check))
        // API routes
        .nest("/api", api_routes())
        // Middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// API routes
fn api_routes() -> Router<AppState> {
    Router::new().nest("/templates", routes::templates::router())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {}", origin);
                None
            }
        })
        .collect();
    CorsLayer::new().allow_origin(AllowOrigin::list(origins))
}

/// Health check endpoint
async fn health_check() -> Result<Json<Value>> {
    Ok(Json(json!({
        "status": "healthy",
        "service": "filetemplates-server",
        "version": env!("CARGO_PKG_VERSION"),
        "library_version": filetemplates::version(),
        "timestamp": time::OffsetDateTime::now_utc()
    })))
}
