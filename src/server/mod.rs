//! HTTP front: four read-only routes over a shared [`ReportCache`].
//!
//! | Route | Source |
//! |---|---|
//! | `GET /` | `{directory}/wep.html` |
//! | `GET /data/json` | newest `*.json`, from the cache |
//! | `GET /data/text` | newest `*.txt`, from the cache |
//! | `GET /debug/list` | live directory listing |

mod handlers;

use axum::routing::get;
use axum::Router;
use std::future::Future;
use std::io;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::reports::ReportCache;

/// Static page served at `/`, relative to the results directory.
pub const INDEX_FILE: &str = "wep.html";

/// Format revision reported by `/debug/list`.
pub const LISTING_VERSION: &str = "v4";

/// State shared by every handler. Cloned per request.
#[derive(Debug, Clone)]
pub struct AppState {
    cache: Arc<ReportCache>,
    deployment_id: Arc<str>,
}

impl AppState {
    /// Bundle the cache with the deployment identifier shown in `/debug/list`.
    pub fn new(cache: Arc<ReportCache>, deployment_id: impl Into<Arc<str>>) -> Self {
        Self {
            cache,
            deployment_id: deployment_id.into(),
        }
    }
}

/// Build the router with all routes and request logging.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index_handler))
        .route("/data/json", get(handlers::json_handler))
        .route("/data/text", get(handlers::text_handler))
        .route("/debug/list", get(handlers::debug_list_handler))
        .layer(axum::middleware::from_fn(handlers::log_requests))
        .with_state(state)
}

/// Serve until `shutdown` resolves, then finish in-flight requests.
///
/// # Errors
///
/// Returns the listener's I/O error if accepting fails fatally.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await
}
