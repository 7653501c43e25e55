use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;

use crate::bootstrap::EngineStatus;
use crate::{cors, imagery, telemetry};

#[derive(Clone)]
pub struct AppState {
    metrics: PrometheusHandle,
    engine: Arc<EngineStatus>,
    clock: Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>,
}

impl AppState {
    pub fn new(metrics: PrometheusHandle, engine: EngineStatus) -> Self {
        Self {
            metrics,
            engine: Arc::new(engine),
            clock: Arc::new(Utc::now),
        }
    }

    #[cfg(test)]
    pub fn with_clock(mut self, clock: Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>) -> Self {
        self.clock = clock;
        self
    }

    pub fn metrics(&self) -> &PrometheusHandle {
        &self.metrics
    }

    pub fn engine(&self) -> &EngineStatus {
        &self.engine
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/api/earth-engine-tiles", get(imagery::tiles))
        .route("/api/earth-engine-image-date", get(imagery::image_date))
        .layer(cors::frontend_cors_layer())
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthBody {
    status: &'static str,
    earth_engine_initialized: bool,
    timestamp: String,
}

async fn health(State(state): State<AppState>) -> Json<HealthBody> {
    Json(HealthBody {
        status: "healthy",
        earth_engine_initialized: state.engine().is_ready(),
        timestamp: state.now().to_rfc3339(),
    })
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let body = telemetry::render_metrics(state.metrics());
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/plain; version=0.0.4")
        .body(Body::from(body))
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use chrono::TimeZone;
    use http_body_util::BodyExt;
    use httpmock::prelude::*;
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use url::Url;

    use ee_gateway_engine::client::EarthEngineClient;

    fn offline_state() -> AppState {
        let metrics = telemetry::init_metrics().expect("metrics init");
        AppState::new(
            metrics,
            EngineStatus::Unavailable {
                reason: "no credential source available".to_string(),
            },
        )
    }

    fn ready_state(base: &Url) -> AppState {
        let metrics = telemetry::init_metrics().expect("metrics init");
        let client = EarthEngineClient::new(
            base.clone(),
            "test-token",
            reqwest::Client::builder().build().expect("client"),
        );
        AppState::new(metrics, EngineStatus::Ready(client))
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .expect("handler should respond");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body should read")
            .to_bytes();
        let value = serde_json::from_slice(&bytes).expect("body should be json");
        (status, value)
    }

    #[tokio::test]
    async fn health_reports_degraded_engine() {
        let clock = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let state = offline_state().with_clock(Arc::new(move || clock));
        let app = app_router(state);

        let (status, body) = get_json(app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["earth_engine_initialized"], false);
        assert_eq!(body["timestamp"], "2024-05-01T12:00:00+00:00");
    }

    #[tokio::test]
    async fn health_reports_ready_engine() {
        let base = Url::parse("http://127.0.0.1:1/api/").expect("url");
        let app = app_router(ready_state(&base));

        let (status, body) = get_json(app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["earth_engine_initialized"], true);
    }

    #[tokio::test]
    async fn metrics_exports_build_info() {
        let app = app_router(offline_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/metrics")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("handler should respond");

        assert_eq!(response.status(), StatusCode::OK);
        let collected = response
            .into_body()
            .collect()
            .await
            .expect("body should read");
        let body = String::from_utf8(collected.to_bytes().to_vec()).expect("utf-8");
        assert!(body.contains("app_build_info"));
        assert!(body.contains("app_uptime_seconds"));
    }

    #[tokio::test]
    async fn tiles_require_initialized_engine() {
        let app = app_router(offline_state());

        let (status, body) = get_json(app, "/api/earth-engine-tiles").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Earth Engine not initialized");
    }

    #[tokio::test]
    async fn image_date_requires_initialized_engine() {
        let app = app_router(offline_state());

        let (status, body) = get_json(app, "/api/earth-engine-image-date").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Earth Engine not initialized");
    }

    #[tokio::test]
    async fn tiles_relay_map_identifiers_end_to_end() {
        let server = MockServer::start_async().await;
        let base = Url::parse(&server.url("/api/")).expect("url");
        let app = app_router(ready_state(&base));

        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/mapid").json_body_partial(
                    json!({
                        "region": "-10,-10,10,10",
                        "start_date": "2024-01-01",
                        "end_date": "2024-01-31",
                        "max_cloud_percentage": 10,
                        "mode": "latest"
                    })
                    .to_string(),
                );
                then.status(200)
                    .json_body(json!({ "mapid": "abc", "token": "xyz" }));
            })
            .await;

        let query = serde_urlencoded::to_string([
            ("bbox", "-10,-10,10,10"),
            ("start_date", "2024-01-01"),
            ("end_date", "2024-01-31"),
            ("cloud_percentage", "10"),
        ])
        .expect("encode query");
        let (status, body) = get_json(app, &format!("/api/earth-engine-tiles?{query}")).await;
        mock.assert_async().await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["mapid"], "abc");
        assert_eq!(body["token"], "xyz");
        let tiles_url = body["tiles_url"].as_str().expect("tiles_url");
        assert!(tiles_url.contains("abc"));
        assert!(tiles_url.contains("xyz"));
        assert_eq!(body["date_info"], "Sentinel-2 Latest Available");
        assert_eq!(body["parameters"]["max_cloud_percentage"], 10);
        assert_eq!(body["parameters"]["bbox"], "-10,-10,10,10");
        assert_eq!(body["parameters"]["date_range"], "2024-01-01 to 2024-01-31");
    }

    #[tokio::test]
    async fn tiles_default_to_world_extent() {
        let server = MockServer::start_async().await;
        let base = Url::parse(&server.url("/api/")).expect("url");
        let app = app_router(ready_state(&base));

        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/mapid").json_body_partial(
                    json!({
                        "region": "-180,-90,180,90",
                        "max_cloud_percentage": 20
                    })
                    .to_string(),
                );
                then.status(200)
                    .json_body(json!({ "mapid": "abc", "token": "xyz" }));
            })
            .await;

        let (status, body) = get_json(app, "/api/earth-engine-tiles").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["parameters"]["bbox"], "-180,-90,180,90");
        assert_eq!(body["parameters"]["collection"], "COPERNICUS/S2_SR");
        assert_eq!(body["parameters"]["date_range"], "2024-01-01 to 2024-12-31");
        assert_eq!(body["parameters"]["max_cloud_percentage"], 20);
    }

    #[tokio::test]
    async fn composite_mode_changes_the_caption() {
        let server = MockServer::start_async().await;
        let base = Url::parse(&server.url("/api/")).expect("url");
        let app = app_router(ready_state(&base));

        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/mapid")
                    .json_body_partial(json!({ "mode": "composite" }).to_string());
                then.status(200)
                    .json_body(json!({ "mapid": "abc", "token": "xyz" }));
            })
            .await;

        let (status, body) = get_json(app, "/api/earth-engine-tiles?composite=true").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["date_info"],
            "Sentinel-2 Composite (2024-01-01 to 2024-12-31)"
        );
    }

    #[tokio::test]
    async fn non_numeric_cloud_percentage_is_a_bad_request() {
        let server = MockServer::start_async().await;
        let base = Url::parse(&server.url("/api/")).expect("url");
        let app = app_router(ready_state(&base));

        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/mapid");
                then.status(200)
                    .json_body(json!({ "mapid": "abc", "token": "xyz" }));
            })
            .await;

        let (status, body) = get_json(app, "/api/earth-engine-tiles?cloud_percentage=twenty").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert!(body["error"]
            .as_str()
            .expect("error message")
            .contains("cloud_percentage"));
        assert_eq!(mock.hits_async().await, 0);
    }

    #[tokio::test]
    async fn upstream_tile_failure_suggests_a_fallback() {
        let server = MockServer::start_async().await;
        let base = Url::parse(&server.url("/api/")).expect("url");
        let app = app_router(ready_state(&base));

        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/mapid");
                then.status(500).body("quota exceeded");
            })
            .await;

        let (status, body) = get_json(app, "/api/earth-engine-tiles").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert!(body["error"]
            .as_str()
            .expect("error message")
            .contains("quota exceeded"));
        assert_eq!(
            body["fallback_suggestion"],
            "Consider using ArcGIS World Imagery as fallback"
        );
    }

    #[tokio::test]
    async fn image_date_round_trips_the_vendor_timestamp() {
        let server = MockServer::start_async().await;
        let base = Url::parse(&server.url("/api/")).expect("url");
        let app = app_router(ready_state(&base));

        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/value").json_body_partial(
                    json!({
                        "point": { "lon": 139.69, "lat": 35.68 },
                        "property": "system:time_start"
                    })
                    .to_string(),
                );
                then.status(200)
                    .json_body(json!({ "value": 1704067200000_i64 }));
            })
            .await;

        let (status, body) =
            get_json(app, "/api/earth-engine-image-date?lat=35.68&lon=139.69").await;
        mock.assert_async().await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["date"], "2024-01-01");
        assert_eq!(body["formatted_date"], "January 01, 2024");
        assert_eq!(body["timestamp"], 1_704_067_200_000_i64);
    }

    #[tokio::test]
    async fn image_date_defaults_to_the_origin() {
        let server = MockServer::start_async().await;
        let base = Url::parse(&server.url("/api/")).expect("url");
        let app = app_router(ready_state(&base));

        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/value")
                    .json_body_partial(json!({ "point": { "lon": 0.0, "lat": 0.0 } }).to_string());
                then.status(200)
                    .json_body(json!({ "value": 1704067200000_i64 }));
            })
            .await;

        let (status, _) = get_json(app, "/api/earth-engine-image-date").await;
        mock.assert_async().await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn non_numeric_latitude_is_a_bad_request() {
        let server = MockServer::start_async().await;
        let base = Url::parse(&server.url("/api/")).expect("url");
        let app = app_router(ready_state(&base));

        let (status, body) = get_json(app, "/api/earth-engine-image-date?lat=north").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert!(body["error"]
            .as_str()
            .expect("error message")
            .contains("lat"));
    }

    #[tokio::test]
    async fn image_date_errors_carry_no_fallback_field() {
        let server = MockServer::start_async().await;
        let base = Url::parse(&server.url("/api/")).expect("url");
        let app = app_router(ready_state(&base));

        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/value");
                then.status(500).body("no image found");
            })
            .await;

        let (status, body) = get_json(app, "/api/earth-engine-image-date").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert!(body["error"]
            .as_str()
            .expect("error message")
            .contains("no image found"));
        assert!(body.get("fallback_suggestion").is_none());
    }

    #[tokio::test]
    async fn cors_allows_the_frontend_origin() {
        let app = app_router(offline_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header(header::ORIGIN, "http://localhost:3000")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("handler should respond");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .and_then(|value| value.to_str().ok()),
            Some("http://localhost:3000")
        );
    }
}
