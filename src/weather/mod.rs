//! Current weather lookup for prompt conditioning (weatherapi.com)

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::WeatherConfig;
use crate::types::{AppError, AppResult};

pub const UNAVAILABLE: &str = "unavailable";

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("Weather API key not configured")]
    NotConfigured,

    #[error("Location is empty")]
    EmptyLocation,

    #[error("Unable to fetch data: {0} - {1}")]
    Http(u16, String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unexpected weather data format: {0}")]
    Format(String),
}

impl WeatherError {
    // The request URL carries the API key in its query string
    fn network(e: reqwest::Error) -> Self {
        WeatherError::Network(e.without_url().to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherConditions {
    pub location: String,
    pub country: String,
    pub temperature_c: f64,
    pub feels_like_c: f64,
    pub condition: String,
    pub humidity: f64,
    /// e.g. "14.4 kph NW"
    pub wind: String,
    pub uv_index: f64,
}

impl WeatherConditions {
    /// Prompt variables in the order the advisory tasks expect them, units included
    pub fn prompt_values(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Temperature", format!("{}°C", format_number(self.temperature_c))),
            ("Condition", self.condition.clone()),
            ("Humidity", format!("{}%", format_number(self.humidity))),
            ("Wind", self.wind.clone()),
            ("UV_index", format_number(self.uv_index)),
        ]
    }

    pub fn unavailable_values() -> Vec<(&'static str, String)> {
        ["Temperature", "Condition", "Humidity", "Wind", "UV_index"]
            .into_iter()
            .map(|k| (k, UNAVAILABLE.to_string()))
            .collect()
    }
}

fn format_number(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{:.0}", v)
    } else {
        format!("{}", v)
    }
}

// weatherapi.com current.json payload (only the fields we read)
#[derive(Deserialize)]
struct CurrentResponse {
    location: ApiLocation,
    current: ApiCurrent,
}

#[derive(Deserialize)]
struct ApiLocation {
    name: String,
    country: String,
}

#[derive(Deserialize)]
struct ApiCurrent {
    temp_c: f64,
    feelslike_c: f64,
    humidity: f64,
    wind_kph: f64,
    wind_dir: String,
    uv: f64,
    condition: ApiCondition,
}

#[derive(Deserialize)]
struct ApiCondition {
    text: String,
}

impl From<CurrentResponse> for WeatherConditions {
    fn from(r: CurrentResponse) -> Self {
        Self {
            location: r.location.name,
            country: r.location.country,
            temperature_c: r.current.temp_c,
            feels_like_c: r.current.feelslike_c,
            condition: r.current.condition.text,
            humidity: r.current.humidity,
            wind: format!("{} kph {}", format_number(r.current.wind_kph), r.current.wind_dir),
            uv_index: r.current.uv,
        }
    }
}

#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn current(&self, location: &str) -> Result<WeatherConditions, WeatherError>;

    fn is_configured(&self) -> bool;
}

pub struct WeatherClient {
    client: Client,
    api_key: Option<String>,
    api_base: String,
}

impl WeatherClient {
    pub fn new(config: &WeatherConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build weather client: {}", e)))?;
        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl WeatherProvider for WeatherClient {
    async fn current(&self, location: &str) -> Result<WeatherConditions, WeatherError> {
        let api_key = self.api_key.as_deref().ok_or(WeatherError::NotConfigured)?;
        let location = location.trim();
        if location.is_empty() {
            return Err(WeatherError::EmptyLocation);
        }

        debug!(location = %location, "Fetching current weather");
        let response = self
            .client
            .get(format!("{}/current.json", self.api_base))
            .query(&[("key", api_key), ("q", location), ("aqi", "no")])
            .send()
            .await
            .map_err(WeatherError::network)?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(WeatherError::network)?;
        if !status.is_success() {
            return Err(WeatherError::Http(status.as_u16(), body));
        }

        let parsed: CurrentResponse =
            serde_json::from_str(&body).map_err(|e| WeatherError::Format(e.to_string()))?;
        let conditions = WeatherConditions::from(parsed);
        info!(
            location = %conditions.location,
            temperature_c = conditions.temperature_c,
            condition = %conditions.condition,
            "Weather fetched"
        );
        Ok(conditions)
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}
