//! `CareMap` - nearby caregiver facilities, weather and a short outing tip
//!
//! Every place the user picks (a searched destination, a position fix, the
//! current map view) triggers one refresh: the facility layer is rebuilt
//! from `OpenStreetMap` data and the text panel gets the current weather plus
//! a generated tip for the parent pushing the stroller.

pub mod advice;
pub mod api;
pub mod config;
pub mod error;
pub mod facilities;
pub mod fallback;
pub mod geocode;
pub mod map;
pub mod models;
pub mod orchestrator;
pub mod telemetry;
pub mod weather;
pub mod web;

// Re-export core types for public API
pub use advice::{BriefingService, GeminiGenerator, TextGenerator};
pub use config::CareMapConfig;
pub use error::CareMapError;
pub use facilities::{FacilityFinder, FacilitySource, OverpassSource};
pub use geocode::{Geocoder, NominatimGeocoder};
pub use map::{MapState, MapSurface, Viewport};
pub use models::{Coordinate, Facility, FacilityCategory, WeatherSnapshot};
pub use orchestrator::{GeolocationFix, RefreshOrchestrator, Sources};
pub use weather::{OpenWeatherSource, WeatherSource};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, CareMapError>;
