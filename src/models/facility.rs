//! Caregiver facility model and its presentation helpers

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::Coordinate;

/// Walking speed used for the walk-time estimate
pub const WALKING_METERS_PER_MINUTE: u32 = 80;

/// Name shown when a facility carries no `name` tag
pub const DEFAULT_FACILITY_NAME: &str = "赤ちゃん休憩室";

/// What kind of stop a facility is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FacilityCategory {
    Feeding,
    AccessibleToilet,
    DiaperChange,
}

impl FacilityCategory {
    /// Classify from raw point-of-interest tags
    #[must_use]
    pub fn from_tags(tags: &BTreeMap<String, String>) -> Self {
        let amenity = tags.get("amenity").map(String::as_str);
        let changing_table = tags.get("changing_table").map(String::as_str);
        match (amenity, changing_table) {
            (Some("baby_feeding"), _) => Self::Feeding,
            (Some("diaper_change"), _) | (_, Some("yes")) => Self::DiaperChange,
            _ => Self::AccessibleToilet,
        }
    }

    /// Map icon: feeding rooms get a bottle, everything else shares the toilet icon
    #[must_use]
    pub fn icon(&self) -> &'static str {
        match self {
            Self::Feeding => "🍼",
            Self::AccessibleToilet | Self::DiaperChange => "🚽",
        }
    }
}

/// A facility as rendered in one refresh cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facility {
    pub position: Coordinate,
    pub category: FacilityCategory,
    pub name: Option<String>,
    pub distance_meters: u32,
    pub walk_minutes: u32,
}

impl Facility {
    /// Build a facility relative to the search center
    #[must_use]
    pub fn near(
        center: &Coordinate,
        position: Coordinate,
        category: FacilityCategory,
        name: Option<String>,
    ) -> Self {
        let distance_meters = center.distance_meters(&position);
        Self {
            position,
            category,
            name,
            distance_meters,
            walk_minutes: walk_minutes(distance_meters),
        }
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(DEFAULT_FACILITY_NAME)
    }

    /// Popup line with distance and walking time
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "📏 距離: 約{}m (徒歩{}分)",
            self.distance_meters, self.walk_minutes
        )
    }

    /// Turn-by-turn link for an external maps application
    #[must_use]
    pub fn navigation_url(&self) -> String {
        format!(
            "https://www.google.com/maps/dir/?api=1&destination={},{}",
            self.position.latitude, self.position.longitude
        )
    }
}

/// Minutes on foot, rounded up
#[must_use]
pub fn walk_minutes(distance_meters: u32) -> u32 {
    distance_meters.div_ceil(WALKING_METERS_PER_MINUTE)
}
