pub mod config;

use std::{env, net::SocketAddr, num::ParseIntError};

pub use config::{AppConfig, ConfigError, Environment};

/// Port the gateway listens on when `PORT` is not set.
pub const DEFAULT_PORT: u16 = 5000;

/// Loads environment variables from `.env` when available.
///
/// Missing files are ignored so the function is safe in production builds
/// where dotenv files are not deployed.
pub fn load_env_file() {
    let _ = dotenvy::dotenv();
}

/// Returns the address the HTTP server should bind to.
///
/// The port is resolved from the `PORT` environment variable, falling back
/// to [`DEFAULT_PORT`]. The host is always `0.0.0.0` so the hosting platform
/// can route external traffic to the process.
pub fn server_bind_address() -> Result<SocketAddr, ParseIntError> {
    let port = match env::var("PORT") {
        Ok(value) => value.trim().parse::<u16>()?,
        Err(_) => DEFAULT_PORT,
    };
    Ok(SocketAddr::from(([0, 0, 0, 0], port)))
}
