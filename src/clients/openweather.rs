use anyhow::{Context, Result, bail};
use reqwest::Client;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct WeatherResponse {
    name: String,
    main: MainReading,
    #[serde(default)]
    weather: Vec<Condition>,
}

#[derive(Debug, Deserialize)]
struct MainReading {
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct Condition {
    description: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CurrentWeather {
    pub city: String,
    pub temperature_celsius: f64,
    pub description: String,
}

#[derive(Clone)]
pub struct OpenWeatherClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl OpenWeatherClient {
    #[must_use]
    pub fn new(client: Client, base_url: &str, api_key: &str) -> Self {
        Self {
            client,
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
        }
    }

    pub async fn current(&self, city: &str) -> Result<CurrentWeather> {
        let url = url::Url::parse_with_params(
            &self.base_url,
            [("q", city), ("appid", self.api_key.as_str()), ("units", "metric")],
        )
        .context("Invalid weather API URL")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Weather request failed")?;

        let status = response.status();
        if !status.is_success() {
            bail!("OpenWeatherMap returned {status} for {city:?}");
        }

        let parsed: WeatherResponse = response
            .json()
            .await
            .context("Failed to decode weather response")?;

        Ok(CurrentWeather {
            city: parsed.name,
            temperature_celsius: parsed.main.temp,
            description: parsed
                .weather
                .into_iter()
                .next()
                .map(|c| c.description)
                .unwrap_or_default(),
        })
    }
}
