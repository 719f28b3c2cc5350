//! Tests against a real listener.

use std::time::Duration;

use futures_util::future::join_all;
use reqwest::{redirect::Policy, StatusCode};

use redirector::config::RedirectOptions;

mod common;
use common::{routes, server, spawn_server};

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(Policy::none())
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_redirect_over_tcp() {
    let (addr, shutdown) = spawn_server(server(RedirectOptions {
        routes: routes(&[("/test", "/it/works"), ("/out", "https://example.com/landing?a=1")]),
        ..RedirectOptions::default()
    }))
    .await;
    let client = client();

    let res = client.get(format!("http://{addr}/test")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(res.headers()["location"], "/it/works");
    assert!(res.headers().contains_key("x-request-id"));

    let res = client.get(format!("http://{addr}/out?b=2")).send().await.unwrap();
    assert_eq!(res.headers()["location"], "https://example.com/landing?a=1&b=2");

    let res = client.get(format!("http://{addr}/it/works")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "redirects totally working");

    shutdown.trigger();
}

#[tokio::test]
async fn test_concurrent_requests() {
    let (addr, shutdown) = spawn_server(server(RedirectOptions {
        routes: routes(&[("/from/{param}", "/to/{param}")]),
        ..RedirectOptions::default()
    }))
    .await;
    let client = client();

    let requests = (0..50).map(|i| {
        let client = client.clone();
        async move {
            let res = client
                .get(format!("http://{addr}/from/p{i}"))
                .send()
                .await
                .unwrap();
            (i, res.status(), res.headers()["location"].to_str().unwrap().to_string())
        }
    });

    for (i, status, location) in join_all(requests).await {
        assert_eq!(status, StatusCode::MOVED_PERMANENTLY);
        assert_eq!(location, format!("/to/p{i}"));
    }

    shutdown.trigger();
}
