//! HttpFetcher against a local fake of the JCDecaux API.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use axum::extract::Query;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;

use velov_beat::config::ApiConfig;
use velov_beat::{decoder, transform, FetchError, HttpFetcher, StationSource};
use velov_devkit::fixtures::{stations_payload, StationJson};

const API_KEY: &str = "test-key";

async fn stations(Query(params): Query<HashMap<String, String>>) -> (StatusCode, Vec<u8>) {
    if params.get("apiKey").map(String::as_str) != Some(API_KEY) {
        return (StatusCode::FORBIDDEN, b"{\"error\": \"Unauthorized\"}".to_vec());
    }

    let contract = params.get("contract").cloned().unwrap_or_else(|| "lyon".into());
    let body = stations_payload(&[
        StationJson::part_dieu().contract(&contract),
        StationJson::new(2035).contract(&contract).closed(),
    ]);
    (StatusCode::OK, body)
}

async fn spawn_api() -> SocketAddr {
    let app = Router::new()
        .route("/vls/v3/stations", get(stations))
        .route("/empty/vls/v3/stations", get(|| async { "[]" }))
        .route("/broken/vls/v3/stations", get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn api(addr: SocketAddr, prefix: &str, key: &str) -> ApiConfig {
    ApiConfig {
        base_url: format!("http://{addr}/{prefix}"),
        key: Some(key.to_string()),
        timeout: Duration::from_secs(5),
        ..ApiConfig::default()
    }
}

#[tokio::test]
async fn fetch_decode_transform_roundtrip() {
    let addr = spawn_api().await;
    let mut config = api(addr, "", API_KEY);
    config.contract = Some("lyon".into());
    let fetcher = HttpFetcher::new(&config).unwrap();

    let body = fetcher.fetch().await.unwrap();
    let events = transform::transform_all(decoder::decode(&body).unwrap());

    assert_eq!(events.len(), 2);
    assert_eq!(events[0].number, 12);
    assert_eq!(events[0].name, "Part-Dieu");
    assert_eq!(events[0].location.lat, 45.75);
    assert_eq!(events[1].status, "CLOSED");
}

#[tokio::test]
async fn empty_list_is_two_bytes() {
    let addr = spawn_api().await;
    let fetcher = HttpFetcher::new(&api(addr, "empty", API_KEY)).unwrap();

    let body = fetcher.fetch().await.unwrap();
    assert_eq!(body.len(), 2);
    assert!(decoder::decode(&body).unwrap().is_empty());
}

#[tokio::test]
async fn non_ok_status_is_reported() {
    let addr = spawn_api().await;

    let fetcher = HttpFetcher::new(&api(addr, "broken", API_KEY)).unwrap();
    let err = fetcher.fetch().await.unwrap_err();
    assert!(matches!(err, FetchError::Status { status: 500, .. }));

    let fetcher = HttpFetcher::new(&api(addr, "", "wrong-key")).unwrap();
    let err = fetcher.fetch().await.unwrap_err();
    assert_eq!(err.status(), Some(403));
    assert!(!err.to_string().contains("wrong-key"), "API key leaked in error: {err}");
}

#[tokio::test]
async fn unreachable_endpoint_is_transport_error() {
    // Bind then drop to get a port nothing listens on.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let fetcher = HttpFetcher::new(&api(addr, "", API_KEY)).unwrap();
    let err = fetcher.fetch().await.unwrap_err();
    assert!(matches!(err, FetchError::Transport { .. }));
    assert!(!err.to_string().contains(API_KEY));
}
