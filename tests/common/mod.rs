//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::Request,
    response::Response,
    routing::get,
    Router,
};
use tower::ServiceExt;

use redirector::config::{RedirectOptions, RedirectorConfig};
use redirector::redirect::{RedirectSpec, RouteMap};
use redirector::{HttpServer, Resolver, Shutdown};

/// Build a pattern → destination map.
pub fn routes(pairs: &[(&str, &str)]) -> RouteMap {
    pairs
        .iter()
        .map(|(p, d)| (p.to_string(), RedirectSpec::from(*d)))
        .collect()
}

/// The host application the redirects are layered over.
pub fn app() -> Router {
    Router::new().route("/it/works", get(|| async { "redirects totally working" }))
}

/// Build a server with `options` over [`app`].
pub fn server(options: RedirectOptions) -> HttpServer {
    let config = RedirectorConfig {
        redirects: options,
        ..RedirectorConfig::default()
    };
    let resolver = Arc::new(Resolver::new(config.redirects.clone()).unwrap());
    HttpServer::with_app(config, resolver, app())
}

/// Send one GET through the router.
pub async fn get_with_host(router: &Router, uri: &str, host: &str) -> Response {
    router
        .clone()
        .oneshot(
            Request::builder()
                .uri(uri)
                .header("Host", host)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
}

pub async fn get_path(router: &Router, uri: &str) -> Response {
    get_with_host(router, uri, "localhost").await
}

/// Run `server` on an ephemeral port until the returned [`Shutdown`] fires.
pub async fn spawn_server(server: HttpServer) -> (SocketAddr, Shutdown) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.clone();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    // Wait for server to start
    tokio::time::sleep(Duration::from_millis(100)).await;
    (addr, shutdown)
}
