use filetime::{set_file_mtime, FileTime};
use reportwatch::reports::ReportCache;
use reportwatch::server::{self, AppState};
use reportwatch::signal::ShutdownHandler;
use serde_json::{json, Value};
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

struct RawResponse {
    status: u16,
    head: String,
    body: Vec<u8>,
}

impl RawResponse {
    fn header(&self, name: &str) -> Option<String> {
        self.head.lines().skip(1).find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim()
                .eq_ignore_ascii_case(name)
                .then(|| value.trim().to_string())
        })
    }

    fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("json body")
    }

    fn text(&self) -> String {
        String::from_utf8(self.body.clone()).expect("utf-8 body")
    }
}

async fn get(addr: SocketAddr, path: &str) -> RawResponse {
    let mut stream = tokio::net::TcpStream::connect(addr)
        .await
        .expect("connect server");
    let req = format!("GET {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    stream
        .write_all(req.as_bytes())
        .await
        .expect("write request");
    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.expect("read response");

    let split = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("http response must have separator");
    let head = String::from_utf8_lossy(&raw[..split]).into_owned();
    let body = raw[split + 4..].to_vec();
    let status = head
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse().ok())
        .expect("status code");
    RawResponse { status, head, body }
}

async fn start(dir: &Path, deployment: &str) -> SocketAddr {
    let cache = Arc::new(ReportCache::new(dir));
    cache.reload();
    start_with(cache, deployment).await
}

async fn start_with(cache: Arc<ReportCache>, deployment: &str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let state = AppState::new(cache, deployment);
    tokio::spawn(async move {
        server::serve(listener, state, std::future::pending())
            .await
            .expect("serve app")
    });
    addr
}

fn write_with_mtime(dir: &Path, name: &str, content: &str, secs: i64) {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    set_file_mtime(&path, FileTime::from_unix_time(secs, 0)).unwrap();
}

#[tokio::test]
async fn test_json_endpoint_serves_newest_report() {
    let dir = tempdir().unwrap();
    write_with_mtime(dir.path(), "a.json", r#"{"x":1}"#, 1_600_000_000);
    write_with_mtime(dir.path(), "b.json", r#"{"x":2}"#, 1_700_000_000);
    let addr = start(dir.path(), "abc").await;

    let resp = get(addr, "/data/json").await;
    assert_eq!(resp.status, 200);
    assert!(resp
        .header("content-type")
        .unwrap()
        .starts_with("application/json"));
    assert_eq!(resp.json(), json!({"x": 2}));
}

#[tokio::test]
async fn test_json_endpoint_keeps_large_numbers_exact() {
    let dir = tempdir().unwrap();
    write_with_mtime(
        dir.path(),
        "r.json",
        r#"{"id":123456789012345678901234567890}"#,
        1_600_000_000,
    );
    let addr = start(dir.path(), "abc").await;

    let resp = get(addr, "/data/json").await;
    assert_eq!(resp.status, 200);
    assert_eq!(resp.body, br#"{"id":123456789012345678901234567890}"#);
}

#[tokio::test]
async fn test_json_endpoint_keeps_u64_overflow_and_decimals() {
    let dir = tempdir().unwrap();
    write_with_mtime(
        dir.path(),
        "r.json",
        r#"{"big":18446744073709551616,"ratio":0.1}"#,
        1_600_000_000,
    );
    let addr = start(dir.path(), "abc").await;

    let resp = get(addr, "/data/json").await;
    assert_eq!(resp.status, 200);
    assert_eq!(resp.text(), r#"{"big":18446744073709551616,"ratio":0.1}"#);
}

#[tokio::test]
async fn test_text_endpoint_serves_newest_report() {
    let dir = tempdir().unwrap();
    write_with_mtime(dir.path(), "old.txt", "old", 1_600_000_000);
    write_with_mtime(dir.path(), "new.txt", "fresh report\nline 2", 1_700_000_000);
    let addr = start(dir.path(), "abc").await;

    let resp = get(addr, "/data/text").await;
    assert_eq!(resp.status, 200);
    assert_eq!(
        resp.header("content-type").as_deref(),
        Some("text/plain; charset=utf-8")
    );
    assert_eq!(resp.text(), "fresh report\nline 2");
}

#[tokio::test]
async fn test_empty_directory_returns_404s() {
    let dir = tempdir().unwrap();
    let addr = start(dir.path(), "abc").await;

    let resp = get(addr, "/data/json").await;
    assert_eq!(resp.status, 404);
    let body = resp.json();
    let error = body["error"].as_str().expect("error key");
    assert!(error.contains(&dir.path().display().to_string()));

    let resp = get(addr, "/data/text").await;
    assert_eq!(resp.status, 404);
    assert_eq!(
        resp.header("content-type").as_deref(),
        Some("text/plain; charset=utf-8")
    );
    assert!(resp.text().contains("no TXT report"));
}

#[tokio::test]
async fn test_empty_text_report_is_404() {
    let dir = tempdir().unwrap();
    write_with_mtime(dir.path(), "blank.txt", "", 1_600_000_000);
    let addr = start(dir.path(), "abc").await;

    let resp = get(addr, "/data/text").await;
    assert_eq!(resp.status, 404);
}

#[tokio::test]
async fn test_missing_directory_degrades() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("missing");
    let addr = start(&missing, "abc").await;

    let resp = get(addr, "/debug/list").await;
    assert_eq!(resp.status, 500);
    let body = resp.json();
    assert_eq!(body["version"], "v4");
    assert_eq!(body["directory"], missing.display().to_string());
    assert!(body["error"].is_string());

    assert_eq!(get(addr, "/data/json").await.status, 404);
    assert_eq!(get(addr, "/data/text").await.status, 404);
    assert_eq!(get(addr, "/").await.status, 404);
}

#[tokio::test]
async fn test_index_serves_wep_html() {
    let dir = tempdir().unwrap();
    let page = "<!doctype html><html><body><h1>تقارير</h1></body></html>";
    fs::write(dir.path().join("wep.html"), page).unwrap();
    let addr = start(dir.path(), "abc").await;

    let resp = get(addr, "/").await;
    assert_eq!(resp.status, 200);
    assert!(resp.header("content-type").unwrap().starts_with("text/html"));
    assert_eq!(resp.body, page.as_bytes());
}

#[tokio::test]
async fn test_index_missing_names_expected_path() {
    let dir = tempdir().unwrap();
    let addr = start(dir.path(), "abc").await;

    let resp = get(addr, "/").await;
    assert_eq!(resp.status, 404);
    assert!(resp.header("content-type").unwrap().starts_with("text/html"));
    assert!(resp.text().contains("wep.html"));
}

#[tokio::test]
async fn test_debug_list_reports_items_and_deployment() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("b.txt"), "x").unwrap();
    fs::write(dir.path().join("a.json"), "{}").unwrap();
    fs::write(dir.path().join("wep.html"), "<p></p>").unwrap();
    let addr = start(dir.path(), "deadbeef").await;

    let resp = get(addr, "/debug/list").await;
    assert_eq!(resp.status, 200);
    assert_eq!(
        resp.json(),
        json!({
            "version": "v4",
            "directory": dir.path().display().to_string(),
            "items": ["a.json", "b.txt", "wep.html"],
            "render_git_commit": "deadbeef",
        })
    );
}

#[tokio::test]
async fn test_malformed_json_does_not_affect_text() {
    let dir = tempdir().unwrap();
    write_with_mtime(dir.path(), "ok.json", r#"{"x":1}"#, 1_600_000_000);
    write_with_mtime(dir.path(), "broken.json", "{", 1_700_000_000);
    write_with_mtime(dir.path(), "r.txt", "text ok", 1_600_000_000);
    let addr = start(dir.path(), "abc").await;

    assert_eq!(get(addr, "/data/json").await.status, 404);
    let resp = get(addr, "/data/text").await;
    assert_eq!(resp.status, 200);
    assert_eq!(resp.text(), "text ok");
}

#[tokio::test]
async fn test_responses_follow_reloads() {
    let dir = tempdir().unwrap();
    write_with_mtime(dir.path(), "a.json", r#"{"run":1}"#, 1_600_000_000);
    let cache = Arc::new(ReportCache::new(dir.path()));
    cache.reload();
    let addr = start_with(Arc::clone(&cache), "abc").await;

    assert_eq!(get(addr, "/data/json").await.json(), json!({"run": 1}));

    write_with_mtime(dir.path(), "b.json", r#"{"run":2}"#, 1_700_000_000);
    cache.reload();
    assert_eq!(get(addr, "/data/json").await.json(), json!({"run": 2}));
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let dir = tempdir().unwrap();
    let addr = start(dir.path(), "abc").await;
    assert_eq!(get(addr, "/data/csv").await.status, 404);
}

#[tokio::test]
async fn test_serve_stops_on_shutdown_request() {
    let dir = tempdir().unwrap();
    let cache = Arc::new(ReportCache::new(dir.path()));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let shutdown = ShutdownHandler::new();
    let stop = shutdown.clone();

    let server = tokio::spawn(server::serve(
        listener,
        AppState::new(cache, "abc"),
        async move { stop.wait().await },
    ));

    shutdown.request_shutdown();
    tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server should stop")
        .unwrap()
        .unwrap();
}
