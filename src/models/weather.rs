//! Current weather snapshot and display methods

use serde::{Deserialize, Serialize};

/// Current conditions at a coordinate, as shown in the status line
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WeatherSnapshot {
    /// Temperature in Celsius, rounded to the nearest degree
    pub temperature_c: i32,
    /// Localized description of the conditions
    pub description: String,
    /// Relative humidity percentage
    pub humidity_percent: u8,
}

impl WeatherSnapshot {
    /// Build a snapshot from raw metric readings
    #[must_use]
    pub fn from_metric(temperature: f64, description: String, humidity_percent: u8) -> Self {
        Self {
            temperature_c: round_half_up(temperature),
            description,
            humidity_percent,
        }
    }

    /// Status line rendered under the map
    #[must_use]
    pub fn status_line(&self) -> String {
        format!(
            "🌡 {}℃ / {} (湿度{}%)",
            self.temperature_c, self.description, self.humidity_percent
        )
    }
}

/// Rounds .5 toward positive infinity, so -2.5 becomes -2
fn round_half_up(value: f64) -> i32 {
    (value + 0.5).floor() as i32
}
