use anyhow::Result;
use serde::Serialize;

use crate::clients::openweather::OpenWeatherClient;
use crate::config::WeatherConfig;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WeatherReport {
    pub city: String,
    pub message: String,
    pub temperature_celsius: Option<f64>,
    pub description: Option<String>,
}

pub struct WeatherService {
    client: Option<OpenWeatherClient>,
    default_city: String,
}

impl WeatherService {
    #[must_use]
    pub fn new(config: &WeatherConfig, http_client: reqwest::Client) -> Self {
        let client = config
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .map(|key| OpenWeatherClient::new(http_client, &config.base_url, key));

        Self {
            client,
            default_city: config.default_city.clone(),
        }
    }

    pub async fn report(&self, city: Option<&str>) -> Result<WeatherReport> {
        let city = city
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(&self.default_city);

        let Some(client) = &self.client else {
            return Ok(WeatherReport {
                city: city.to_string(),
                message: format!("Solen skinner i {city}!"),
                temperature_celsius: None,
                description: None,
            });
        };

        let current = client.current(city).await?;
        Ok(WeatherReport {
            message: format!(
                "{}: {:.1} °C, {}",
                current.city, current.temperature_celsius, current.description
            ),
            city: current.city,
            temperature_celsius: Some(current.temperature_celsius),
            description: Some(current.description),
        })
    }
}
