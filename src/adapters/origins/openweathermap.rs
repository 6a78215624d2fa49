use super::{http_client, transport_error};
use crate::domain::model::Weather;
use crate::domain::ports::WeatherOrigin;
use crate::utils::error::{ResolutionError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

const NAME: &str = "openweathermap";

#[derive(Debug, Deserialize)]
struct WeatherResponse {
    main: MainReadings,
    #[serde(default)]
    weather: Vec<Conditions>,
}

#[derive(Debug, Deserialize)]
struct MainReadings {
    temp: f64,
    humidity: u8,
}

#[derive(Debug, Deserialize)]
struct Conditions {
    description: String,
}

/// openweathermap.org 的 /weather 端點，使用公制單位
#[derive(Debug, Clone)]
pub struct OpenWeatherMapOrigin {
    client: Client,
    base_url: String,
    api_key: String,
}

impl OpenWeatherMapOrigin {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl WeatherOrigin for OpenWeatherMapOrigin {
    fn name(&self) -> &str {
        NAME
    }

    async fn get_weather(&self, city: &str) -> std::result::Result<Weather, ResolutionError> {
        let url = format!("{}/weather", self.base_url);
        tracing::debug!("Making openweathermap request for {}", city);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("q", city),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
            ])
            .send()
            .await
            .map_err(|e| transport_error(NAME, e))?;

        match response.status() {
            status if status.is_success() => {
                let body: WeatherResponse =
                    response.json().await.map_err(|e| transport_error(NAME, e))?;
                let description = body
                    .weather
                    .into_iter()
                    .next()
                    .map(|c| c.description)
                    .unwrap_or_default();
                Ok(Weather::new(body.main.temp, body.main.humidity, description))
            }
            StatusCode::NOT_FOUND => Err(ResolutionError::NotFound {
                city: city.to_string(),
            }),
            status => Err(ResolutionError::transient(
                NAME,
                format!("unexpected HTTP status {}", status),
            )),
        }
    }
}
