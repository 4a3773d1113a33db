//! End-to-end dispatch over real sockets.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use protomux::config::MuxConfig;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;

mod common;

#[tokio::test]
async fn root_redirects_to_landing_page() {
    let mux = common::start_mux(MuxConfig::default()).await;

    let res = common::client().get(mux.url("/")).send().await.unwrap();
    assert_eq!(res.status(), 301);
    assert_eq!(res.headers()["location"], "http://www.blynk.cc");
}

#[tokio::test]
async fn redirect_leaves_connection_unclassified() {
    let mux = common::start_mux(MuxConfig::default()).await;
    let mut stream = TcpStream::connect(mux.addr).await.unwrap();

    let first = common::raw_get(&mut stream, "/").await;
    assert_eq!(first.status, 301);
    assert_eq!(first.header("location"), Some("http://www.blynk.cc"));

    // Second request on the same connection is classified fresh.
    let second = common::raw_get(&mut stream, "/admin").await;
    assert_eq!(second.status, 200);
    assert!(second.body.starts_with(b"<!DOCTYPE html>"));
}

#[tokio::test]
async fn plain_http_reaches_api_and_favicon() {
    let mux = common::start_mux(MuxConfig::default()).await;
    let client = common::client();

    let res = client.get(mux.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    let json: serde_json::Value = res.json().await.unwrap();
    assert_eq!(json["status"], "ok");

    let res = client.get(mux.url("/favicon.ico")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["content-type"], "image/x-icon");
    assert_eq!(res.headers()["cache-control"], "public, max-age=86400");
}

#[tokio::test]
async fn admin_served_to_allowed_peer() {
    let mux = common::start_mux(MuxConfig::default()).await;

    let res = common::client().get(mux.url("/admin")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["cache-control"], "no-cache");
    let body = res.text().await.unwrap();
    assert!(body.contains("protomux admin"));
}

#[tokio::test]
async fn admin_api_on_admin_connection() {
    let mux = common::start_mux(MuxConfig::default()).await;
    let mut stream = TcpStream::connect(mux.addr).await.unwrap();

    let page = common::raw_get(&mut stream, "/admin").await;
    assert_eq!(page.status, 200);

    let status = common::raw_get(&mut stream, "/admin/status").await;
    assert_eq!(status.status, 200);
    let json: serde_json::Value = serde_json::from_slice(&status.body).unwrap();
    assert_eq!(json["status"], "operational");

    let connections = common::raw_get(&mut stream, "/admin/connections").await;
    let json: serde_json::Value = serde_json::from_slice(&connections.body).unwrap();
    assert!(json["active"].as_u64().unwrap() >= 1);
}

#[tokio::test]
async fn admin_denied_peer_gets_no_response() {
    let mut config = MuxConfig::default();
    config.admin.allowed_ips = "10.0.0.1".into();
    let mux = common::start_mux(config).await;
    let client = common::client();

    let err = client.get(mux.url("/admin")).send().await.unwrap_err();
    assert!(!err.is_status());

    // Only the admin path is gated.
    let res = client.get(mux.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), 200);
}

#[tokio::test]
async fn connection_is_not_reclassified() {
    let mux = common::start_mux(MuxConfig::default()).await;
    let mut stream = TcpStream::connect(mux.addr).await.unwrap();

    let first = common::raw_get(&mut stream, "/health").await;
    assert_eq!(first.status, 200);

    // Still on the Plain-HTTP chain: no admin page, no redirect.
    let admin = common::raw_get(&mut stream, "/admin").await;
    assert_eq!(admin.status, 404);
    let root = common::raw_get(&mut stream, "/").await;
    assert_eq!(root.status, 404);
}

#[tokio::test]
async fn websocket_session_echoes_binary_frames() {
    let mux = common::start_mux(MuxConfig::default()).await;

    let (mut ws, response) = tokio_tungstenite::connect_async(mux.ws_url("/websockets"))
        .await
        .unwrap();
    assert_eq!(response.status(), 101);

    ws.send(Message::Binary(vec![1u8, 2, 3].into())).await.unwrap();
    let reply = tokio::time::timeout(Duration::from_secs(5), ws.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(reply.into_data().as_ref(), &[1u8, 2, 3]);

    ws.close(None).await.unwrap();
}

#[tokio::test]
async fn websocket_prefix_matches_sub_paths() {
    let mux = common::start_mux(MuxConfig::default()).await;

    let (mut ws, _) = tokio_tungstenite::connect_async(mux.ws_url("/websockets/hardware"))
        .await
        .unwrap();
    ws.send(Message::Binary(b"ping".to_vec().into())).await.unwrap();
    let reply = tokio::time::timeout(Duration::from_secs(5), ws.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(reply.into_data().as_ref(), b"ping");
}

#[tokio::test]
async fn plain_request_on_websocket_path_is_rejected() {
    let mux = common::start_mux(MuxConfig::default()).await;

    let res = common::client().get(mux.url("/websockets")).send().await.unwrap();
    assert_eq!(res.status(), 400);
}

#[tokio::test]
async fn archives_served_on_plain_http_only() {
    let csv_dir = std::env::temp_dir().join(format!("protomux-csv-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&csv_dir).unwrap();
    std::fs::write(csv_dir.join("report.csv.gz"), b"\x1f\x8b archive").unwrap();

    let mut config = MuxConfig::default();
    config.static_files.csv_dir = csv_dir.clone();
    let mux = common::start_mux(config).await;

    let res = common::client().get(mux.url("/report.csv.gz")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(
        res.headers()["content-disposition"],
        "attachment; filename=\"report.csv.gz\""
    );
    assert_eq!(res.bytes().await.unwrap().as_ref(), b"\x1f\x8b archive");

    // An admin connection has no archive mount.
    let mut stream = TcpStream::connect(mux.addr).await.unwrap();
    assert_eq!(common::raw_get(&mut stream, "/admin").await.status, 200);
    let archive = common::raw_get(&mut stream, "/report.csv.gz").await;
    assert_eq!(archive.status, 404);

    std::fs::remove_dir_all(&csv_dir).unwrap();
}

#[tokio::test]
async fn admin_routes_follow_configured_root() {
    let mut config = MuxConfig::default();
    config.paths.admin_root_path = "/ops".into();
    let mux = common::start_mux(config).await;
    let mut stream = TcpStream::connect(mux.addr).await.unwrap();

    let page = common::raw_get(&mut stream, "/ops").await;
    assert_eq!(page.status, 200);
    assert!(page.body.starts_with(b"<!DOCTYPE html>"));

    let status = common::raw_get(&mut stream, "/ops/status").await;
    assert_eq!(status.status, 200);
    let json: serde_json::Value = serde_json::from_slice(&status.body).unwrap();
    assert_eq!(json["status"], "operational");
}

#[tokio::test]
async fn query_on_root_or_admin_goes_to_plain_http() {
    let mut config = MuxConfig::default();
    config.admin.allowed_ips = "10.0.0.1".into();
    let mux = common::start_mux(config).await;
    let client = common::client();

    let res = client.get(mux.url("/?utm=1")).send().await.unwrap();
    assert_eq!(res.status(), 404);

    // Not the admin path, so the gate does not drop the connection.
    let res = client.get(mux.url("/admin?tab=1")).send().await.unwrap();
    assert_eq!(res.status(), 404);
}
