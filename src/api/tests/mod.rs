use super::*;
use crate::proxy::DirectConnection;
use crate::service::test_helpers::{
    FetchBehavior, TestService, create_test_service, create_test_service_with,
};
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;
use tower::ServiceExt; // for oneshot

const REEL_URL: &str = "https://www.instagram.com/reel/ABC123/";
const LOCAL_CLIENT: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

/// Router over the test service, using the service's own config
fn router_for(t: &TestService) -> Router {
    let service = Arc::new(t.service.clone());
    let config = service.get_config();
    create_router(service, config)
}

/// Router over the test service with a tweaked config
fn router_with(t: &TestService, tweak: impl FnOnce(&mut Config)) -> Router {
    let service = Arc::new(t.service.clone());
    let mut config = (*service.get_config()).clone();
    tweak(&mut config);
    create_router(service, Arc::new(config))
}

/// GET request carrying the peer address the rate limiter needs
fn get_from(uri: &str, ip: IpAddr) -> Request<Body> {
    let mut request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    request
        .extensions_mut()
        .insert(ConnectInfo(SocketAddr::new(ip, 40000)));
    request
}

fn get(uri: &str) -> Request<Body> {
    get_from(uri, LOCAL_CLIENT)
}

fn reel_uri(url: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(url.as_bytes()).collect();
    format!("/download/reel?url={encoded}")
}

async fn json_body(response: Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

async fn service_with_fetch(fetch: FetchBehavior, transcode_fails: bool) -> TestService {
    create_test_service_with(
        fetch,
        transcode_fails,
        Arc::new(DirectConnection),
        Duration::from_secs(240),
    )
    .await
}

#[tokio::test]
async fn root_reports_running() {
    let t = create_test_service().await;

    let response = router_for(&t).oneshot(get("/")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["message"], "Instagram Bot API is Running!");
}

#[tokio::test]
async fn health_reports_version() {
    let t = create_test_service().await;

    let response = router_for(&t).oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["pending_cleanups"], 0);
}

#[tokio::test]
async fn download_reel_returns_links() {
    let t = create_test_service().await;

    let response = router_for(&t)
        .oneshot(get(&reel_uri(REEL_URL)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "success");
    assert_eq!(body["caption"], "Sunset run #travel #sea");
    assert_eq!(body["hashtags"], serde_json::json!(["#travel", "#sea"]));
    assert_eq!(
        body["video_download_url"],
        "http://reels.test/static/ABC123/ABC123.mp4"
    );
    assert_eq!(
        body["mp3_download_url"],
        "http://reels.test/static/ABC123/audio.mp3"
    );
    assert!(body["expires_at"].is_string());
}

#[tokio::test]
async fn download_reel_without_url_is_bad_request() {
    let t = create_test_service().await;

    let response = router_for(&t)
        .oneshot(get("/download/reel"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "invalid_url");
    assert_eq!(body["error"]["kind"], "input");
    assert!(t.fetcher.requests().is_empty());
}

#[tokio::test]
async fn download_reel_with_non_reel_url_is_bad_request() {
    let t = create_test_service().await;

    let response = router_for(&t)
        .oneshot(get(&reel_uri("https://www.instagram.com/p/ABC123/")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(t.fetcher.requests().is_empty());
}

#[tokio::test]
async fn fetch_failure_is_bad_gateway() {
    let t = service_with_fetch(FetchBehavior::Fail, false).await;

    let response = router_for(&t)
        .oneshot(get(&reel_uri(REEL_URL)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "fetch_failed");
    assert_eq!(body["error"]["details"]["shortcode"], "ABC123");
}

#[tokio::test]
async fn missing_video_is_not_found() {
    let t = service_with_fetch(FetchBehavior::CaptionOnly, false).await;

    let response = router_for(&t)
        .oneshot(get(&reel_uri(REEL_URL)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["error"]["code"], "no_media_found");
}

#[tokio::test]
async fn transcode_failure_is_unprocessable() {
    let t = service_with_fetch(FetchBehavior::Video { caption: None }, true).await;

    let response = router_for(&t)
        .oneshot(get(&reel_uri(REEL_URL)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json_body(response).await["error"]["kind"], "transcode");
    // The staged video still gets cleaned up
    assert_eq!(t.service.cleanup().pending(), 1);
}

#[tokio::test]
async fn staged_files_are_served_under_static() {
    let t = create_test_service().await;
    let app = router_for(&t);

    let response = app.clone().oneshot(get(&reel_uri(REEL_URL))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(get("/static/ABC123/audio.mp3"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"ID3 fake audio");

    let response = app
        .oneshot(get("/static/ABC123/missing.mp3"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn api_key_guards_reel_route_only() {
    let t = create_test_service().await;
    let app = router_with(&t, |config| {
        config.server.api.api_key = Some("test-secret-key".to_string());
    });

    let response = app.clone().oneshot(get(&reel_uri(REEL_URL))).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(t.fetcher.requests().is_empty());

    let mut request = get(&reel_uri(REEL_URL));
    request
        .headers_mut()
        .insert("X-Api-Key", "test-secret-key".parse().unwrap());
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Download links and liveness stay reachable without a key
    for uri in ["/", "/health", "/static/ABC123/ABC123.mp4"] {
        let response = app.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
    }

    let response = app.oneshot(get("/capabilities")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn cors_headers_present_when_enabled() {
    let t = create_test_service().await;
    let app = router_with(&t, |config| {
        config.server.api.cors_enabled = true;
        config.server.api.cors_origins = vec!["*".to_string()];
    });

    let mut request = get("/health");
    request
        .headers_mut()
        .insert("Origin", "http://localhost:3000".parse().unwrap());
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}

#[tokio::test]
async fn cors_headers_absent_when_disabled() {
    let t = create_test_service().await;
    let app = router_with(&t, |config| config.server.api.cors_enabled = false);

    let mut request = get("/health");
    request
        .headers_mut()
        .insert("Origin", "http://localhost:3000".parse().unwrap());
    let response = app.oneshot(request).await.unwrap();

    assert!(
        !response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}

#[tokio::test]
async fn events_endpoint_streams_sse() {
    let t = create_test_service().await;

    let response = router_for(&t).oneshot(get("/events")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()["content-type"].to_str().unwrap();
    assert!(content_type.starts_with("text/event-stream"));
}

#[tokio::test]
async fn capabilities_names_collaborators() {
    let t = create_test_service().await;

    let response = router_for(&t).oneshot(get("/capabilities")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["fetcher"], "fake");
    assert_eq!(body["transcoder"], "fake");
    assert_eq!(body["proxy"], "direct");
    assert_eq!(body["can_download"], true);
}

#[tokio::test]
async fn openapi_json_is_served() {
    let t = create_test_service().await;

    let response = router_for(&t).oneshot(get("/openapi.json")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["info"]["title"], "reel-dl REST API");
    assert!(body["paths"]["/download/reel"].is_object());
}

#[tokio::test]
async fn cleanup_status_tracks_scheduled_task() {
    let t = create_test_service().await;
    let app = router_for(&t);

    app.clone().oneshot(get(&reel_uri(REEL_URL))).await.unwrap();

    let response = app.clone().oneshot(get("/cleanup/1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["id"], 1);
    let state = body["state"].as_str().unwrap();
    assert!(state == "scheduled" || state == "sleeping", "{state}");

    let response = app.oneshot(get("/cleanup/999")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        json_body(response).await["error"]["code"],
        "cleanup_task_not_found"
    );
}

#[tokio::test]
async fn rate_limit_rejects_after_burst() {
    let t = create_test_service().await;
    let app = router_with(&t, |config| {
        config.server.api.rate_limit.requests_per_minute = 60;
        config.server.api.rate_limit.burst_size = 2;
        config.server.api.rate_limit.exempt_ips.clear();
    });
    let client = IpAddr::V4(Ipv4Addr::new(203, 0, 113, 9));

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(get_from("/capabilities", client))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .clone()
        .oneshot(get_from("/capabilities", client))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "rate_limited");
    assert!(body["error"]["details"]["retry_after_seconds"].as_u64().unwrap() >= 1);

    // Exempt paths are never limited
    let response = app.oneshot(get_from("/health", client)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn server_stops_on_shutdown_signal() {
    let t = create_test_service().await;
    let service = Arc::new(t.service.clone());
    let mut config = (*service.get_config()).clone();
    config.server.api.bind_address = "127.0.0.1:0".parse().unwrap();

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(start_api_server_with_shutdown(
        service,
        Arc::new(config),
        async move {
            let _ = stop_rx.await;
        },
    ));

    tokio::time::sleep(Duration::from_millis(50)).await;
    stop_tx.send(()).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server should stop after the signal")
        .unwrap();
    assert!(result.is_ok());
}
