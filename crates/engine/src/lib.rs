pub mod auth;
pub mod client;

pub use auth::{
    AccessToken, AuthError, CredentialChain, CredentialOrigin, GoogleAuthClient,
    ServiceAccountKey, EARTH_ENGINE_SCOPE,
};
pub use client::{
    EarthEngineClient, EngineError, GeoPoint, ImageDateQuery, MapTilesRequest, MapTilesResponse,
    VisParams, DEFAULT_API_URL,
};
