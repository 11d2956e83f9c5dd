use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Router,
    body::Body,
    extract::Path,
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::api::{self, AppState};
use super::dialer::{Dialer, DialerSettings};
use super::embedded::Assets;
use super::page;
use super::provider::TwilioClient;
use super::relay::StatusRelay;
use super::store::StoreHandle;
use crate::config::Config;
use crate::errors::ConfigError;

/// Configuration for the panel server.
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub numbers_file: PathBuf,
    pub dev_mode: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            numbers_file: PathBuf::from("numbers.txt"),
            dev_mode: false,
        }
    }
}

/// Build the full application router: panel routes plus embedded assets.
pub fn build_router(state: Arc<AppState>) -> Router {
    api::api_router()
        .route("/static/{*path}", get(static_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Router used when the calling side cannot be configured: every request gets
/// the configuration error page.
pub fn config_error_router(err: &ConfigError) -> Router {
    let body = Arc::new(page::render_config_error(err));
    Router::new()
        .fallback(move || {
            let body = Arc::clone(&body);
            async move { (StatusCode::INTERNAL_SERVER_ERROR, Html(body.as_str().to_owned())) }
        })
        .layer(TraceLayer::new_for_http())
}

/// Serve an embedded asset from `ui/static/`.
async fn static_handler(Path(path): Path<String>) -> Response {
    match Assets::get(&path) {
        Some(content) => {
            let mime = mime_guess::from_path(&path).first_or_octet_stream();
            (
                [(header::CONTENT_TYPE, mime.as_ref().to_string())],
                Body::from(content.data.into_owned()),
            )
                .into_response()
        }
        None => (StatusCode::NOT_FOUND, "Not found").into_response(),
    }
}

/// Wire the store, provider, dialer and relay into shared state.
pub fn build_state(config: &Config, numbers_file: PathBuf) -> Result<Arc<AppState>> {
    let provider = TwilioClient::new(config).context("Failed to build provider client")?;
    let dialer = Dialer::new(
        StoreHandle::open(numbers_file),
        Arc::new(provider),
        DialerSettings::from(config),
    );
    Ok(Arc::new(AppState::new(dialer, Arc::new(StatusRelay::new()))))
}

/// Start the panel server. Missing credentials do not stop the process: the
/// panel is replaced by the configuration error page so the operator sees why.
pub async fn start_server(server: ServerConfig, config: Result<Config, ConfigError>) -> Result<()> {
    let mut app = match config {
        Ok(config) => {
            tracing::info!(
                numbers_file = %server.numbers_file.display(),
                caller_id = %config.caller_id,
                delay_secs = config.call_delay.as_secs(),
                "panel configured"
            );
            build_router(build_state(&config, server.numbers_file.clone())?)
        }
        Err(err) => {
            tracing::error!(error = %err, "configuration error, serving error page only");
            config_error_router(&err)
        }
    };

    if server.dev_mode {
        app = app.layer(CorsLayer::permissive());
    }

    let addr: SocketAddr = format!("{}:{}", server.host, server.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", server.host, server.port))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    let local_addr = listener.local_addr()?;
    tracing::info!("Call board running at http://{}", local_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server shut down gracefully.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down...");
}
