//! HTTP browsing interface
//!
//! Serves the index page built from the catalog, the catalog as JSON, and
//! the mirrored files themselves. The catalog is shared read-only.

pub mod page;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::catalog::Catalog;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },
    #[error("Server stopped: {0}")]
    Serve(std::io::Error),
}

/// State shared by every handler
#[derive(Debug, Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub mirror_root: PathBuf,
}

impl AppState {
    pub fn new(catalog: Catalog, mirror_root: impl Into<PathBuf>) -> Self {
        Self {
            catalog: Arc::new(catalog),
            mirror_root: mirror_root.into(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let files = ServeDir::new(&state.mirror_root);
    Router::new()
        .route("/", get(index))
        .route("/catalog.json", get(catalog_json))
        .route("/healthz", get(healthz))
        .nest_service("/wallpaper", files)
        .with_state(state)
        .layer(middleware::from_fn(reject_hidden))
        .layer(TraceLayer::new_for_http())
}

/// Bind on all interfaces
pub async fn bind(port: u16) -> Result<TcpListener, ServerError> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })
}

/// Serve until `shutdown` resolves
pub async fn run<F>(listener: TcpListener, router: Router, shutdown: F) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("Listening at http://localhost:{}", addr.port());
    }
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(ServerError::Serve)
}

async fn index(State(state): State<AppState>) -> Html<String> {
    Html(page::render_index(&state.catalog))
}

async fn catalog_json(State(state): State<AppState>) -> Json<Arc<Catalog>> {
    Json(state.catalog.clone())
}

async fn healthz() -> impl IntoResponse {
    "ok"
}

/// Hidden files in the mirror (`.git`, dotfiles) are never served
async fn reject_hidden(request: Request, next: Next) -> Response {
    if is_hidden_path(request.uri().path()) {
        return StatusCode::NOT_FOUND.into_response();
    }
    next.run(request).await
}

/// Encoded `/` and `\`, which `ServeDir` turns back into separators
const ENCODED_SEPARATORS: [&str; 2] = ["%2f", "%5c"];

fn is_hidden_path(path: &str) -> bool {
    // Segments are only meaningful if no separator hides inside one
    let lower = path.to_ascii_lowercase();
    if ENCODED_SEPARATORS.iter().any(|sep| lower.contains(sep)) {
        return true;
    }
    lower
        .split('/')
        .any(|segment| segment.starts_with('.') || segment.starts_with("%2e"))
}
