use serde::Serialize;

use crate::imagery::{self, ImageDateError, EARTH_ENGINE_ATTRIBUTION, SENTINEL2_COLLECTION};

/// Parameter block echoed back with every successful tile response so the
/// frontend can display what was actually requested.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TileParameters {
    pub collection: String,
    pub bbox: String,
    pub date_range: String,
    pub max_cloud_percentage: i64,
}

impl TileParameters {
    pub fn new(bbox: &str, start_date: &str, end_date: &str, max_cloud_percentage: i64) -> Self {
        Self {
            collection: SENTINEL2_COLLECTION.to_string(),
            bbox: bbox.to_string(),
            date_range: format!("{start_date} to {end_date}"),
            max_cloud_percentage,
        }
    }
}

/// Successful response for a tile request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TilesEnvelope {
    pub success: bool,
    pub tiles_url: String,
    pub mapid: String,
    pub token: String,
    pub date_info: String,
    pub attribution: String,
    pub parameters: TileParameters,
}

impl TilesEnvelope {
    pub fn new(mapid: String, token: String, date_info: String, parameters: TileParameters) -> Self {
        Self {
            success: true,
            tiles_url: imagery::tile_url_template(&mapid, &token),
            mapid,
            token,
            date_info,
            attribution: EARTH_ENGINE_ATTRIBUTION.to_string(),
            parameters,
        }
    }
}

/// Successful response for an image-date lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageDateEnvelope {
    pub success: bool,
    pub date: String,
    pub formatted_date: String,
    pub timestamp: i64,
}

impl ImageDateEnvelope {
    /// Builds the envelope from a vendor `system:time_start` timestamp.
    pub fn from_millis(millis: i64) -> Result<Self, ImageDateError> {
        let instant = imagery::image_date_from_millis(millis)?;
        Ok(Self {
            success: true,
            date: instant.format("%Y-%m-%d").to_string(),
            formatted_date: instant.format("%B %d, %Y").to_string(),
            timestamp: millis,
        })
    }
}

/// Error body shared by every failing endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_suggestion: Option<String>,
}

impl ErrorEnvelope {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            fallback_suggestion: None,
        }
    }

    pub fn with_fallback(mut self, suggestion: impl Into<String>) -> Self {
        self.fallback_suggestion = Some(suggestion.into());
        self
    }
}
