//! Current weather lookup

use async_trait::async_trait;

use crate::Result;
use crate::models::{Coordinate, WeatherSnapshot};

pub mod openweather;

pub use openweather::OpenWeatherSource;

/// Source of current conditions at a coordinate
#[async_trait]
pub trait WeatherSource: Send + Sync {
    async fn current(&self, coordinate: Coordinate) -> Result<WeatherSnapshot>;
}
