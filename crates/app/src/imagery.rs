use std::time::Instant;

use axum::{
    extract::{Query, State},
    Json,
};
use metrics::{counter, histogram};
use serde::Deserialize;
use tracing::{error, info};

use ee_gateway_core::imagery::{ImageSelection, SENTINEL2_COLLECTION, WORLD_BBOX};
use ee_gateway_core::types::{ImageDateEnvelope, TileParameters, TilesEnvelope};
use ee_gateway_engine::client::{GeoPoint, ImageDateQuery, MapTilesRequest, VisParams};

use crate::bootstrap::EngineStatus;
use crate::envelope::ApiError;
use crate::router::AppState;

const DEFAULT_START_DATE: &str = "2024-01-01";
const DEFAULT_END_DATE: &str = "2024-12-31";
const DEFAULT_MAX_CLOUD: i64 = 20;
const FALLBACK_SUGGESTION: &str = "Consider using ArcGIS World Imagery as fallback";

// The image-date lookup always scans a fixed two-year window with a relaxed
// cloud threshold; the frontend only asks "when was this spot last seen".
const DATE_LOOKUP_START: &str = "2023-01-01";
const DATE_LOOKUP_END: &str = "2024-12-31";
const DATE_LOOKUP_MAX_CLOUD: i64 = 30;

#[derive(Debug, Deserialize)]
pub struct TilesQuery {
    #[serde(default)]
    bbox: Option<String>,
    #[serde(default)]
    start_date: Option<String>,
    #[serde(default)]
    end_date: Option<String>,
    #[serde(default)]
    cloud_percentage: Option<String>,
    #[serde(default)]
    composite: Option<String>,
}

/// GET /api/earth-engine-tiles
pub async fn tiles(
    State(state): State<AppState>,
    Query(query): Query<TilesQuery>,
) -> Result<Json<TilesEnvelope>, ApiError> {
    let engine = match state.engine() {
        EngineStatus::Ready(client) => client,
        EngineStatus::Unavailable { .. } => {
            counter!("tile_requests_total", "result" => "not_initialized").increment(1);
            return Err(ApiError::not_initialized());
        }
    };

    let bbox = query.bbox.as_deref().unwrap_or(WORLD_BBOX);
    let start_date = query.start_date.as_deref().unwrap_or(DEFAULT_START_DATE);
    let end_date = query.end_date.as_deref().unwrap_or(DEFAULT_END_DATE);
    let max_cloud = parse_cloud_percentage(query.cloud_percentage.as_deref())?;
    let selection = ImageSelection::from_query_flag(query.composite.as_deref());

    info!(
        stage = "tiles",
        %bbox,
        start_date,
        end_date,
        max_cloud,
        mode = selection.as_str(),
        "requesting satellite tiles"
    );

    let request = MapTilesRequest {
        collection: SENTINEL2_COLLECTION,
        region: bbox,
        start_date,
        end_date,
        max_cloud_percentage: max_cloud,
        mode: selection.as_str(),
        visualization: VisParams::true_color(),
    };

    let started = Instant::now();
    let result = engine.map_tiles(&request).await;
    histogram!("engine_request_seconds", "endpoint" => "mapid")
        .record(started.elapsed().as_secs_f64());

    let tiles = result.map_err(|err| {
        counter!("tile_requests_total", "result" => "upstream_error").increment(1);
        error!(stage = "tiles", error = %err, "failed to generate tiles");
        ApiError::upstream_with_fallback(err.to_string(), FALLBACK_SUGGESTION)
    })?;

    counter!("tile_requests_total", "result" => "ok").increment(1);
    info!(stage = "tiles", mapid = %tiles.mapid, "generated tile set");

    let parameters = TileParameters::new(bbox, start_date, end_date, max_cloud);
    let date_info = selection.describe(start_date, end_date);
    Ok(Json(TilesEnvelope::new(
        tiles.mapid,
        tiles.token,
        date_info,
        parameters,
    )))
}

#[derive(Debug, Deserialize)]
pub struct ImageDateParams {
    #[serde(default)]
    lat: Option<String>,
    #[serde(default)]
    lon: Option<String>,
}

/// GET /api/earth-engine-image-date
pub async fn image_date(
    State(state): State<AppState>,
    Query(params): Query<ImageDateParams>,
) -> Result<Json<ImageDateEnvelope>, ApiError> {
    let engine = match state.engine() {
        EngineStatus::Ready(client) => client,
        EngineStatus::Unavailable { .. } => {
            counter!("image_date_requests_total", "result" => "not_initialized").increment(1);
            return Err(ApiError::not_initialized());
        }
    };

    let lat = parse_coordinate("lat", params.lat.as_deref())?;
    let lon = parse_coordinate("lon", params.lon.as_deref())?;

    let query = ImageDateQuery {
        collection: SENTINEL2_COLLECTION,
        point: GeoPoint { lon, lat },
        start_date: DATE_LOOKUP_START,
        end_date: DATE_LOOKUP_END,
        max_cloud_percentage: DATE_LOOKUP_MAX_CLOUD,
    };

    let started = Instant::now();
    let result = engine.latest_image_timestamp(&query).await;
    histogram!("engine_request_seconds", "endpoint" => "value")
        .record(started.elapsed().as_secs_f64());

    let millis = result.map_err(|err| {
        counter!("image_date_requests_total", "result" => "upstream_error").increment(1);
        error!(stage = "image_date", error = %err, "failed to fetch image date");
        ApiError::upstream(err.to_string())
    })?;

    let envelope = ImageDateEnvelope::from_millis(millis).map_err(|err| {
        counter!("image_date_requests_total", "result" => "invalid_timestamp").increment(1);
        error!(stage = "image_date", error = %err, millis, "vendor returned unusable timestamp");
        ApiError::upstream(err.to_string())
    })?;

    counter!("image_date_requests_total", "result" => "ok").increment(1);
    info!(stage = "image_date", lat, lon, date = %envelope.date, "resolved image date");

    Ok(Json(envelope))
}

fn parse_cloud_percentage(raw: Option<&str>) -> Result<i64, ApiError> {
    match raw {
        None => Ok(DEFAULT_MAX_CLOUD),
        Some(value) => value.trim().parse().map_err(|_| {
            counter!("tile_requests_total", "result" => "invalid_parameter").increment(1);
            ApiError::invalid_parameter(format!(
                "cloud_percentage must be an integer (got '{value}')"
            ))
        }),
    }
}

fn parse_coordinate(name: &str, raw: Option<&str>) -> Result<f64, ApiError> {
    match raw {
        None => Ok(0.0),
        Some(value) => value.trim().parse().map_err(|_| {
            counter!("image_date_requests_total", "result" => "invalid_parameter").increment(1);
            ApiError::invalid_parameter(format!("{name} must be a number (got '{value}')"))
        }),
    }
}
