//! Data models for the `CareMap` pipeline
//!
//! This module contains the core domain models organized by concern:
//! - Location: coordinates and great-circle distance
//! - Facility: caregiver facilities found around a coordinate
//! - Weather: the current-conditions snapshot
//! - Markers and notices placed on the map surface

pub mod facility;
pub mod location;
pub mod weather;

use serde::{Deserialize, Serialize};

// Re-export all public types for convenient access
pub use facility::{Facility, FacilityCategory};
pub use location::Coordinate;
pub use weather::WeatherSnapshot;

/// The single "you are here" pin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserMarker {
    pub position: Coordinate,
    pub label: String,
}

/// Kind of user-facing notice the browser shows as a blocking alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    NotFound,
    PermissionDenied,
}

/// A user-facing notice raised by a trigger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}
