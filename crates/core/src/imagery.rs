use chrono::{DateTime, Utc};
use thiserror::Error;

/// Sentinel-2 surface reflectance collection served by the gateway.
pub const SENTINEL2_COLLECTION: &str = "COPERNICUS/S2_SR";

/// Bounding box covering the full extent of the map, used when the caller
/// does not restrict the query.
pub const WORLD_BBOX: &str = "-180,-90,180,90";

/// Attribution line relayed to map-rendering clients.
pub const EARTH_ENGINE_ATTRIBUTION: &str = "Google Earth Engine, Copernicus Sentinel-2";

const TILE_URL_PREFIX: &str =
    "https://earthengine.googleapis.com/v1alpha/projects/earthengine-legacy/maps";

/// Which image the vendor should render for a tile request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSelection {
    /// Single most recent image in the filtered collection.
    Latest,
    /// Pixel-wise median composite over the date range.
    Composite,
}

impl ImageSelection {
    /// Interprets the raw `composite` query flag.
    ///
    /// Only the literal string `true` (case-insensitive) selects composite
    /// mode; any other value, including `1`, falls back to the most recent
    /// image. This mirrors the flag's historical string semantics.
    pub fn from_query_flag(raw: Option<&str>) -> Self {
        match raw {
            Some(value) if value.eq_ignore_ascii_case("true") => Self::Composite,
            _ => Self::Latest,
        }
    }

    /// Canonical mode name used on the wire and in metric labels.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Latest => "latest",
            Self::Composite => "composite",
        }
    }

    /// Human-readable description of the selected image, shown as a map
    /// caption by the frontend.
    pub fn describe(self, start_date: &str, end_date: &str) -> String {
        match self {
            Self::Latest => "Sentinel-2 Latest Available".to_string(),
            Self::Composite => format!("Sentinel-2 Composite ({start_date} to {end_date})"),
        }
    }
}

/// Builds the tile URL template for a generated map.
///
/// The `{z}/{x}/{y}` placeholders are left literal for the map-rendering
/// client to resolve per tile.
pub fn tile_url_template(mapid: &str, token: &str) -> String {
    format!("{TILE_URL_PREFIX}/{mapid}/tiles/{{z}}/{{x}}/{{y}}?token={token}")
}

/// Converts a vendor `system:time_start` millisecond timestamp to the UTC
/// instant it denotes, truncated to whole seconds.
pub fn image_date_from_millis(millis: i64) -> Result<DateTime<Utc>, ImageDateError> {
    DateTime::<Utc>::from_timestamp(millis.div_euclid(1000), 0)
        .ok_or(ImageDateError::OutOfRange(millis))
}

/// Error converting a vendor timestamp to a calendar date.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ImageDateError {
    #[error("timestamp {0} is outside the representable date range")]
    OutOfRange(i64),
}
