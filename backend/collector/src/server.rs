//! Collector HTTP server.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

use crate::handlers::{self, CollectorState};

pub const TRACK_ROUTE: &str = "/api/track-page-view";
pub const HEALTH_ROUTE: &str = "/api/health";

/// Routes with permissive CORS; the tracking script posts cross-origin.
pub fn build_router(state: CollectorState) -> Router {
    Router::new()
        .route(TRACK_ROUTE, post(handlers::track_page_view))
        .route(HEALTH_ROUTE, get(handlers::health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Prepare today's log and serve until Ctrl-C.
#[instrument(skip(state))]
pub async fn start_server(addr: SocketAddr, state: CollectorState) -> Result<()> {
    let path = state
        .log
        .ensure_header()
        .await
        .context("failed to prepare CSV log")?;
    info!(file = %path.display(), "CSV log ready");

    let app = build_router(state);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Collector listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Collector stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::DailyCsvLog;

    async fn spawn_router(dir: &std::path::Path) -> (SocketAddr, tokio::task::JoinHandle<()>) {
        let state = CollectorState::new(DailyCsvLog::new(dir), 500);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            axum::serve(listener, build_router(state)).await.unwrap();
        });
        (addr, server)
    }

    async fn raw_request(addr: SocketAddr, head: &str, body: &str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        let request = format!(
            "{head}\r\nHost: localhost\r\nConnection: close\r\nContent-Length: {}\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    fn post(content_type: Option<&str>) -> String {
        match content_type {
            Some(ct) => format!("POST {TRACK_ROUTE} HTTP/1.1\r\nContent-Type: {ct}"),
            None => format!("POST {TRACK_ROUTE} HTTP/1.1"),
        }
    }

    #[tokio::test]
    async fn serves_health_over_tcp() {
        let dir = tempfile::tempdir().unwrap();
        let (addr, server) = spawn_router(dir.path()).await;

        let response = raw_request(addr, &format!("GET {HEALTH_ROUTE} HTTP/1.1"), "").await;
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.contains("\"status\":\"ok\""));

        server.abort();
    }

    #[tokio::test]
    async fn tracks_valid_json_through_router() {
        let dir = tempfile::tempdir().unwrap();
        let (addr, server) = spawn_router(dir.path()).await;

        let body = r#"{"pageUrl":"https://a.test/","clickTime":"2026-03-01T12:00:00.000Z","pageTitle":"Home"}"#;
        let response = raw_request(addr, &post(Some("application/json")), body).await;
        assert!(response.starts_with("HTTP/1.1 200"), "{response}");
        assert!(response.contains(handlers::MSG_TRACKED));

        server.abort();
    }

    #[tokio::test]
    async fn unreadable_bodies_are_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let (addr, server) = spawn_router(dir.path()).await;
        let fields = r#"{"pageUrl":"https://a.test/","clickTime":"t"}"#;

        for (content_type, body) in [
            (None, fields),
            (Some("text/plain"), fields),
            (Some("application/json"), "null"),
            (Some("application/json"), "{not json"),
            (Some("application/json"), r#"{"pageUrl":0,"clickTime":false}"#),
        ] {
            let response = raw_request(addr, &post(content_type), body).await;
            assert!(response.starts_with("HTTP/1.1 400"), "{content_type:?} {body}: {response}");
            assert!(response.contains(handlers::MSG_MISSING_FIELDS));
        }
        assert!(!dir.path().join(format!(
            "{}_clicked_data.csv",
            DailyCsvLog::today().format("%Y-%m-%d")
        )).exists());

        server.abort();
    }

    #[tokio::test]
    async fn start_server_fails_on_unusable_log_dir() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        tokio::fs::write(&blocker, "x").await.unwrap();
        let state = CollectorState::new(DailyCsvLog::new(&blocker), 500);
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        assert!(start_server(addr, state).await.is_err());
    }
}
