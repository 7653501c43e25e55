use axum::http::{HeaderValue, Method};
use tower_http::cors::CorsLayer;

/// Frontend origins allowed to call the gateway from a browser.
const ALLOWED_ORIGINS: [&str; 5] = [
    "https://disaster-map-v2.vercel.app",
    "http://localhost:3000",
    "http://127.0.0.1:3000",
    "http://localhost:8000",
    "http://127.0.0.1:8000",
];

/// Builds the CORS layer for the fixed frontend allow-list.
///
/// Only GET is exposed; the gateway has no mutating routes.
pub fn frontend_cors_layer() -> CorsLayer {
    let origins: Vec<HeaderValue> = ALLOWED_ORIGINS
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET])
}
