use chrono::Utc;
use reqwest::Client;
use tracing::{error, info};
use url::Url;

use ee_gateway_engine::auth::{AuthError, CredentialChain, GoogleAuthClient, EARTH_ENGINE_SCOPE};
use ee_gateway_engine::client::{EarthEngineClient, DEFAULT_API_URL};

/// Outcome of the one-shot Earth Engine initialization.
///
/// Computed in `main` before the server accepts its first request and never
/// mutated afterwards; handlers read it through `AppState`. There is no
/// re-initialization path: a gateway that starts degraded stays degraded
/// until restarted.
#[derive(Clone)]
pub enum EngineStatus {
    Ready(EarthEngineClient),
    Unavailable { reason: String },
}

impl EngineStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

/// Resolves credentials, acquires an access token, and builds the Earth
/// Engine client. Failure is recorded, not fatal: requests will answer with
/// a structured "not initialized" error instead.
pub async fn initialize_engine() -> EngineStatus {
    match try_initialize().await {
        Ok(client) => {
            info!(stage = "bootstrap", "Earth Engine initialized");
            EngineStatus::Ready(client)
        }
        Err(err) => {
            error!(stage = "bootstrap", error = %err, "Earth Engine initialization failed");
            EngineStatus::Unavailable {
                reason: err.to_string(),
            }
        }
    }
}

async fn try_initialize() -> Result<EarthEngineClient, AuthError> {
    let (key, origin) = CredentialChain::default().resolve()?;
    info!(
        stage = "bootstrap",
        origin = origin.as_str(),
        account = %key.client_email,
        "resolved service account credentials"
    );

    let http = Client::builder().build()?;
    let token_url = Url::parse(&key.token_uri)?;
    let auth = GoogleAuthClient::new(token_url, http.clone());
    let token = auth
        .service_account_token(&key, &[EARTH_ENGINE_SCOPE], Utc::now())
        .await?;
    info!(
        stage = "bootstrap",
        expires_at = %token.expires_at(Utc::now()).to_rfc3339(),
        "obtained Earth Engine access token"
    );

    let base_url = Url::parse(DEFAULT_API_URL)?;
    Ok(EarthEngineClient::new(base_url, token.access_token, http))
}
