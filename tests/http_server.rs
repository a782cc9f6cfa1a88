//! The HTTP front-end driven through the Axum service.

use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tower::ServiceExt;
use tree_router::config::parse_config;
use tree_router::http::server::reload;
use tree_router::{HttpServer, Shutdown};

const CONFIG: &str = r#"
[server]
bind_address = "127.0.0.1:0"

[[routes]]
name = "item"
template = "items/{id:int}"
data_tokens = { area = "catalog" }
response = { kind = "content", body = "item {id}" }

[[routes]]
template = "old/{id}"
response = { kind = "redirect", redirect_route = "item", redirect_values = { tab = "info" }, status = 301 }

[[routes]]
template = "{category=home}"
response = { kind = "content", body = "category {category}" }
"#;

fn server() -> HttpServer {
    HttpServer::new(parse_config(CONFIG).unwrap()).unwrap()
}

async fn get(server: &HttpServer, uri: &str) -> (StatusCode, axum::http::HeaderMap, String) {
    let response = server
        .app()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn test_content_body_uses_route_values() {
    let server = server();

    let (status, _, body) = get(&server, "/items/42").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "item 42");

    let (_, _, body) = get(&server, "/").await;
    assert_eq!(body, "category home");
}

#[tokio::test]
async fn test_unmatched_path_is_not_found() {
    let server = server();
    let (status, _, _) = get(&server, "/items/42/reviews").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_redirect_location_is_generated() {
    let server = server();
    let (status, headers, _) = get(&server, "/old/7").await;
    assert_eq!(status, StatusCode::MOVED_PERMANENTLY);
    assert_eq!(headers.get(header::LOCATION).unwrap(), "/items/7?tab=info");
}

#[tokio::test]
async fn test_request_id_is_propagated() {
    let server = server();

    let (_, headers, _) = get(&server, "/items/1").await;
    assert!(headers.get("x-request-id").is_some());

    let response = server
        .app()
        .oneshot(
            Request::builder()
                .uri("/items/1")
                .header("x-request-id", "trace-me")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.headers().get("x-request-id").unwrap(), "trace-me");
}

#[tokio::test]
async fn test_reload_publishes_next_version() {
    let server = server();
    assert_eq!(server.shared().version(), 1);

    let mut config = parse_config(CONFIG).unwrap();
    config.routes.retain(|route| route.name.as_deref() != Some("item"));
    config.routes.retain(|route| route.template != "old/{id}");
    let version = reload(server.shared(), &config).unwrap();
    assert_eq!(version, 2);
    assert_eq!(server.shared().version(), 2);

    // the same app now serves the new table
    let (status, _, body) = get(&server, "/items").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "category items");
    let (status, _, _) = get(&server, "/items/42").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_reload_keeps_current_routes() {
    let server = server();
    let mut config = parse_config(CONFIG).unwrap();
    config.routes[0].template = "items/{id:unknown}".to_string();

    assert!(reload(server.shared(), &config).is_err());
    assert_eq!(server.shared().version(), 1);
    let (status, _, _) = get(&server, "/items/42").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_serves_over_tcp_until_shutdown() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = server();

    let running = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move { server.run(listener, &shutdown).await })
    };

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /items/5 HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    assert!(response.starts_with("HTTP/1.1 200 OK"), "{response}");
    assert!(response.ends_with("item 5"), "{response}");

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), running)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}
