#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::Path;

use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use radio_core::config::DirectoryConfig;
use tokio::net::TcpListener;

pub const SEARCH_PATH: &str = "/json/stations/search";

/// Serves `body` with `status` at `SEARCH_PATH` on an ephemeral loopback port.
pub async fn serve_directory(status: StatusCode, body: &'static str) -> SocketAddr {
    let app = Router::new().route(SEARCH_PATH, get(move || async move { (status, body) }));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

pub fn directory_config(api_url: String, local_path: &Path) -> DirectoryConfig {
    DirectoryConfig {
        api_url,
        country: "Romania".to_string(),
        local_path: local_path.to_path_buf(),
    }
}

/// Nothing listens on port 1, so requests fail with connection refused.
pub fn unreachable_api() -> String {
    format!("http://127.0.0.1:1{}", SEARCH_PATH)
}
