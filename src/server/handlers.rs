//! Route handlers. Each reads the current cache snapshot or the directory;
//! none of them mutate anything.

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::time::Instant;

use super::{AppState, INDEX_FILE, LISTING_VERSION};
use crate::reports::list_names;

const TEXT_PLAIN_UTF8: &str = "text/plain; charset=utf-8";

/// `GET /`: the directory's static HTML page.
pub(crate) async fn index_handler(State(state): State<AppState>) -> Response {
    let page = state.cache.directory().join(INDEX_FILE);
    match tokio::fs::read(&page).await {
        Ok(bytes) => Html(bytes).into_response(),
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                log::warn!("Cannot read {}: {}", page.display(), e);
            }
            let body = format!(
                "<h2>{INDEX_FILE} was not found at {}</h2>",
                escape_html(&page.display().to_string())
            );
            (StatusCode::NOT_FOUND, Html(body)).into_response()
        }
    }
}

/// `GET /data/json`: the newest JSON report, re-serialized.
pub(crate) async fn json_handler(State(state): State<AppState>) -> Response {
    let snapshot = state.cache.snapshot();
    match &snapshot.json {
        Some(doc) => Json(doc).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": format!(
                    "No JSON report found in {}",
                    state.cache.directory().display()
                )
            })),
        )
            .into_response(),
    }
}

/// `GET /data/text`: the newest text report. Empty text counts as absent.
pub(crate) async fn text_handler(State(state): State<AppState>) -> Response {
    let snapshot = state.cache.snapshot();
    match snapshot.text.as_deref() {
        Some(text) if !text.is_empty() => {
            ([(header::CONTENT_TYPE, TEXT_PLAIN_UTF8)], text.to_owned()).into_response()
        }
        _ => (
            StatusCode::NOT_FOUND,
            [(header::CONTENT_TYPE, TEXT_PLAIN_UTF8)],
            format!(
                "Warning: no TXT report found in {}",
                state.cache.directory().display()
            ),
        )
            .into_response(),
    }
}

/// `GET /debug/list`: raw directory contents plus deployment metadata.
pub(crate) async fn debug_list_handler(State(state): State<AppState>) -> Response {
    let directory = state.cache.directory().display().to_string();
    match list_names(state.cache.directory()) {
        Ok(items) => Json(json!({
            "version": LISTING_VERSION,
            "directory": directory,
            "items": items,
            "render_git_commit": &*state.deployment_id,
        }))
        .into_response(),
        Err(e) => {
            log::warn!("/debug/list failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "version": LISTING_VERSION,
                    "directory": directory,
                    "error": e.to_string(),
                })),
            )
                .into_response()
        }
    }
}

/// Log method, path, status and latency of every request at debug level.
pub(crate) async fn log_requests(request: Request<Body>, next: Next) -> Response {
    let started = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_owned();

    let response = next.run(request).await;
    log::debug!(
        "{} {} -> {} ({} us)",
        method,
        path,
        response.status().as_u16(),
        started.elapsed().as_micros()
    );
    response
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
