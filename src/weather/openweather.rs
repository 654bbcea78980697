//! `OpenWeatherMap` current-weather client

use std::time::Instant;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use super::WeatherSource;
use crate::config::WeatherConfig;
use crate::models::{Coordinate, WeatherSnapshot};
use crate::{CareMapError, Result};

/// Current weather response, reduced to the fields we render
#[derive(Debug, Deserialize)]
struct CurrentWeatherResponse {
    main: MainReadings,
    #[serde(default)]
    weather: Vec<Condition>,
}

#[derive(Debug, Deserialize)]
struct MainReadings {
    temp: f64,
    humidity: u8,
}

#[derive(Debug, Deserialize)]
struct Condition {
    description: String,
}

impl CurrentWeatherResponse {
    fn into_snapshot(self) -> Result<WeatherSnapshot> {
        let description = self
            .weather
            .into_iter()
            .next()
            .map(|condition| condition.description)
            .ok_or_else(|| CareMapError::decode("weather response has no condition entry"))?;
        Ok(WeatherSnapshot::from_metric(
            self.main.temp,
            description,
            self.main.humidity,
        ))
    }
}

/// Weather client for the `OpenWeatherMap` current-weather endpoint
pub struct OpenWeatherSource {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    units: String,
    language: String,
}

impl OpenWeatherSource {
    pub fn new(
        client: Client,
        endpoint: impl Into<String>,
        api_key: Option<String>,
        settings: &WeatherConfig,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            api_key,
            units: settings.units.clone(),
            language: settings.language.clone(),
        }
    }
}

#[async_trait]
impl WeatherSource for OpenWeatherSource {
    #[instrument(skip(self), fields(coordinate = %coordinate.format_coordinates()))]
    async fn current(&self, coordinate: Coordinate) -> Result<WeatherSnapshot> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| CareMapError::config("weather API key is not configured"))?;

        debug!("Requesting current weather from {}", self.endpoint);
        let start_time = Instant::now();

        let latitude = coordinate.latitude.to_string();
        let longitude = coordinate.longitude.to_string();
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("lat", latitude.as_str()),
                ("lon", longitude.as_str()),
                ("units", self.units.as_str()),
                ("lang", self.language.as_str()),
                ("appid", api_key),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CareMapError::transport(format!(
                "weather service returned status {}",
                response.status()
            )));
        }

        let payload: CurrentWeatherResponse = response
            .json()
            .await
            .map_err(|e| CareMapError::decode(format!("invalid weather payload: {e}")))?;
        let snapshot = payload.into_snapshot()?;

        let elapsed = start_time.elapsed();
        info!(
            "Current weather {}℃ {} in {:.3}s",
            snapshot.temperature_c,
            snapshot.description,
            elapsed.as_secs_f64()
        );
        if elapsed.as_secs() > 5 {
            warn!("Slow weather response: {:.3}s", elapsed.as_secs_f64());
        }

        Ok(snapshot)
    }
}
