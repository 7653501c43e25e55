use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Production base URL for the Earth Engine REST endpoints.
pub const DEFAULT_API_URL: &str = "https://earthengine.googleapis.com/api/";

/// Image property holding the acquisition time in milliseconds since epoch.
const TIME_START_PROPERTY: &str = "system:time_start";

/// Client for the Earth Engine endpoints backing map-tile generation.
///
/// All filtering, sorting, and compositing happens on the vendor side; this
/// client only ships the query parameters and decodes the result.
#[derive(Clone)]
pub struct EarthEngineClient {
    http: Client,
    base_url: Url,
    access_token: String,
}

impl EarthEngineClient {
    /// Creates a new client bound to the provided access token.
    pub fn new(base_url: Url, access_token: impl Into<String>, http: Client) -> Self {
        Self {
            http,
            base_url,
            access_token: access_token.into(),
        }
    }

    /// Requests a tile-set identifier for the described image computation.
    pub async fn map_tiles(
        &self,
        request: &MapTilesRequest<'_>,
    ) -> Result<MapTilesResponse, EngineError> {
        let url = self.base_url.join("mapid")?;
        let response = self.authorized_request(url).json(request).send().await?;

        parse_json(response).await
    }

    /// Fetches the acquisition timestamp of the newest image matching the
    /// query. The vendor sorts the filtered collection newest-first and
    /// evaluates the property of its head image.
    pub async fn latest_image_timestamp(
        &self,
        query: &ImageDateQuery<'_>,
    ) -> Result<i64, EngineError> {
        let url = self.base_url.join("value")?;
        let body = ValueRequest {
            query,
            property: TIME_START_PROPERTY,
        };
        let response = self.authorized_request(url).json(&body).send().await?;

        parse_json::<ValueResponse>(response)
            .await
            .map(|decoded| decoded.value)
    }

    fn authorized_request(&self, url: Url) -> reqwest::RequestBuilder {
        self.http
            .post(url)
            .header("Authorization", format!("Bearer {}", self.access_token))
    }
}

/// Parameters for a tile request. Dates and region are opaque strings the
/// vendor interprets; nothing is validated locally.
#[derive(Debug, Serialize)]
pub struct MapTilesRequest<'a> {
    pub collection: &'a str,
    pub region: &'a str,
    pub start_date: &'a str,
    pub end_date: &'a str,
    pub max_cloud_percentage: i64,
    pub mode: &'a str,
    pub visualization: VisParams<'a>,
}

/// Band/range mapping applied when rendering tiles.
#[derive(Debug, Clone, Serialize)]
pub struct VisParams<'a> {
    pub bands: [&'a str; 3],
    pub min: u32,
    pub max: u32,
    pub gamma: f64,
}

impl VisParams<'static> {
    /// True-color rendering of Sentinel-2 surface reflectance.
    pub fn true_color() -> Self {
        Self {
            bands: ["B4", "B3", "B2"],
            min: 0,
            max: 3000,
            gamma: 1.2,
        }
    }
}

/// Parameters for an image-date lookup around a point.
#[derive(Debug, Serialize)]
pub struct ImageDateQuery<'a> {
    pub collection: &'a str,
    pub point: GeoPoint,
    pub start_date: &'a str,
    pub end_date: &'a str,
    pub max_cloud_percentage: i64,
}

/// Geographic point in degrees, longitude first as the vendor expects.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct GeoPoint {
    pub lon: f64,
    pub lat: f64,
}

#[derive(Serialize)]
struct ValueRequest<'a> {
    #[serde(flatten)]
    query: &'a ImageDateQuery<'a>,
    property: &'a str,
}

/// Tile-set identifiers returned by the vendor.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct MapTilesResponse {
    pub mapid: String,
    pub token: String,
}

#[derive(Debug, Deserialize)]
struct ValueResponse {
    value: i64,
}

/// Errors produced by the Earth Engine client.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to build url: {0}")]
    Url(#[from] url::ParseError),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {status}: {body}")]
    Status { status: StatusCode, body: String },
}

async fn parse_json<T>(response: Response) -> Result<T, EngineError>
where
    T: DeserializeOwned,
{
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<unavailable>"));
        return Err(EngineError::Status { status, body });
    }

    Ok(response.json().await?)
}
