//! HTTP weather origins.

pub mod openweathermap;
pub mod weatherapi;

pub use openweathermap::OpenWeatherMapOrigin;
pub use weatherapi::WeatherApiOrigin;

use crate::config::toml_config::{OriginConfig, OriginKind};
use crate::domain::ports::WeatherOrigin;
use crate::utils::error::{ResolutionError, Result};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub(crate) fn http_client(timeout: Duration) -> Result<Client> {
    let client = Client::builder().timeout(timeout).build()?;
    Ok(client)
}

pub(crate) fn transport_error(origin: &str, err: reqwest::Error) -> ResolutionError {
    let message = if err.is_timeout() {
        format!("request timed out: {}", err)
    } else if err.is_decode() {
        format!("unexpected response body: {}", err)
    } else {
        err.to_string()
    };
    ResolutionError::transient(origin, message)
}

/// 依設定順序建立上游來源
pub fn build_origins(configs: &[OriginConfig]) -> Result<Vec<Arc<dyn WeatherOrigin>>> {
    let mut origins: Vec<Arc<dyn WeatherOrigin>> = Vec::with_capacity(configs.len());
    for config in configs {
        let timeout = config.timeout();
        let origin: Arc<dyn WeatherOrigin> = match config.kind {
            OriginKind::WeatherApi => Arc::new(WeatherApiOrigin::new(
                &config.base_url,
                &config.api_key,
                timeout,
            )?),
            OriginKind::OpenWeatherMap => Arc::new(OpenWeatherMapOrigin::new(
                &config.base_url,
                &config.api_key,
                timeout,
            )?),
        };
        tracing::debug!("🔌 Configured weather origin {} at {}", origin.name(), config.base_url);
        origins.push(origin);
    }
    Ok(origins)
}
