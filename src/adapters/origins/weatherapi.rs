use super::{http_client, transport_error};
use crate::domain::model::Weather;
use crate::domain::ports::WeatherOrigin;
use crate::utils::error::{ResolutionError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

const NAME: &str = "weatherapi";
// weatherapi.com: "No matching location found."
const NO_MATCHING_LOCATION: i64 = 1006;

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    current: Current,
}

#[derive(Debug, Deserialize)]
struct Current {
    temp_c: f64,
    humidity: u8,
    condition: Condition,
}

#[derive(Debug, Deserialize)]
struct Condition {
    text: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: i64,
    message: String,
}

/// weatherapi.com 的 current.json 端點
#[derive(Debug, Clone)]
pub struct WeatherApiOrigin {
    client: Client,
    base_url: String,
    api_key: String,
}

impl WeatherApiOrigin {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl WeatherOrigin for WeatherApiOrigin {
    fn name(&self) -> &str {
        NAME
    }

    async fn get_weather(&self, city: &str) -> std::result::Result<Weather, ResolutionError> {
        let url = format!("{}/current.json", self.base_url);
        tracing::debug!("Making weatherapi request for {}", city);

        let response = self
            .client
            .get(&url)
            .query(&[("key", self.api_key.as_str()), ("q", city)])
            .send()
            .await
            .map_err(|e| transport_error(NAME, e))?;

        let status = response.status();
        if status.is_success() {
            let body: CurrentResponse = response.json().await.map_err(|e| transport_error(NAME, e))?;
            return Ok(Weather::new(
                body.current.temp_c,
                body.current.humidity,
                body.current.condition.text,
            ));
        }

        if status == StatusCode::BAD_REQUEST {
            if let Ok(body) = response.json::<ErrorResponse>().await {
                if body.error.code == NO_MATCHING_LOCATION {
                    return Err(ResolutionError::NotFound {
                        city: city.to_string(),
                    });
                }
                return Err(ResolutionError::transient(
                    NAME,
                    format!("API error {}: {}", body.error.code, body.error.message),
                ));
            }
        }

        Err(ResolutionError::transient(
            NAME,
            format!("unexpected HTTP status {}", status),
        ))
    }
}
