pub mod config;

use std::{env, net::SocketAddr};

use url::Url;

pub use config::{AppConfig, ConfigError, Environment};

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";

/// Base origin of the departments/positions API.
///
/// Fixed at compile time through `ORG_ADMIN_API_BASE_URL`; builds without it
/// point at the local development backend.
pub const DEFAULT_API_BASE_URL: &str = match option_env!("ORG_ADMIN_API_BASE_URL") {
    Some(value) => value,
    None => "http://127.0.0.1:8000/api/",
};

/// Loads environment variables from `.env` when available.
///
/// Missing files are ignored so the function is safe in production builds
/// where dotenv files are not deployed.
pub fn load_env_file() {
    let _ = dotenvy::dotenv();
}

/// Returns the address the admin shell should bind to.
///
/// The value is resolved from the `APP_BIND_ADDR` environment variable and
/// falls back to [`DEFAULT_BIND_ADDR`] when the variable is not set.
pub fn server_bind_address() -> Result<SocketAddr, std::net::AddrParseError> {
    let value = env::var("APP_BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
    value.parse()
}

/// Returns the API base origin.
///
/// `API_BASE_URL` overrides the compiled-in [`DEFAULT_API_BASE_URL`].
pub fn api_base_url() -> Result<Url, url::ParseError> {
    let value = env::var("API_BASE_URL").unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string());
    Url::parse(value.trim())
}

#[cfg(test)]
pub(crate) static ENV_GUARD: std::sync::LazyLock<std::sync::Mutex<()>> =
    std::sync::LazyLock::new(|| std::sync::Mutex::new(()));
