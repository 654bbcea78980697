//! Weather briefing and outing advice
//!
//! Fetches current weather for a coordinate and asks a text generation
//! service for one short tip that fits the conditions. Failures are returned
//! as errors; [`crate::fallback`] decides what the user sees instead.

pub mod gemini;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::Result;
use crate::fallback;
use crate::models::{Coordinate, WeatherSnapshot};
use crate::weather::WeatherSource;

pub use gemini::GeminiGenerator;

/// Turns a prompt into generated text
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// What the text panel shows after a briefing cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Briefing {
    /// Weather status line; `None` leaves the previous line in place
    pub weather_line: Option<String>,
    pub advice: String,
}

/// Prompt for one short tip matching the current conditions.
///
/// The model picks one of three tip kinds (something to carry, how to dress
/// the child, a word of encouragement for the parent) and must avoid the
/// stock hydration reminder so repeated calls stay varied.
#[must_use]
pub fn compose_prompt(weather: &WeatherSnapshot) -> String {
    format!(
        "あなたは育児経験豊富なアドバイザーです。\n\
         場所の状況：気温{}度、天気は{}、湿度は{}%。\n\
         ベビーカーで娘と外出中のパパへ、今の状況にぴったりの「持ち物」「娘の服装」「パパへのねぎらい」のいずれかを、30文字以内で親しみやすく教えて。\n\
         「水分補給」という言葉は使わずに、毎回違う視点でアドバイスしてください。",
        weather.temperature_c, weather.description, weather.humidity_percent
    )
}

/// Weather lookup plus advice generation
#[derive(Clone)]
pub struct BriefingService {
    weather: Arc<dyn WeatherSource>,
    generator: Arc<dyn TextGenerator>,
}

impl BriefingService {
    pub fn new(weather: Arc<dyn WeatherSource>, generator: Arc<dyn TextGenerator>) -> Self {
        Self { weather, generator }
    }

    /// Current conditions at `coordinate`
    pub async fn weather(&self, coordinate: Coordinate) -> Result<WeatherSnapshot> {
        self.weather.current(coordinate).await
    }

    /// One generated tip for `weather`
    #[instrument(skip_all)]
    pub async fn advise(&self, weather: &WeatherSnapshot) -> Result<String> {
        let advice = self.generator.generate(&compose_prompt(weather)).await?;
        info!("Generated advice: {}", advice);
        Ok(advice)
    }

    /// Advice for a weather lookup outcome; never fails.
    ///
    /// Generation only runs when the lookup succeeded. Any failure on the
    /// way ends in one of the fixed fallback tips.
    pub async fn advice_for(&self, weather: Result<WeatherSnapshot>) -> String {
        let advice = match weather {
            Ok(snapshot) => self.advise(&snapshot).await,
            Err(e) => Err(e),
        };
        fallback::advice_or_fallback(advice)
    }

    /// Weather line and advice for `coordinate`; never fails.
    ///
    /// When the weather lookup fails the line is `None`.
    pub async fn describe(&self, coordinate: Coordinate) -> Briefing {
        let weather = self.weather(coordinate).await;
        Briefing {
            weather_line: weather.as_ref().ok().map(WeatherSnapshot::status_line),
            advice: self.advice_for(weather).await,
        }
    }
}
