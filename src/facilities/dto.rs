//! DTOs for decoding Overpass JSON responses.

use std::collections::BTreeMap;

use serde::Deserialize;
use tracing::debug;

use super::RawPoi;
use crate::models::Coordinate;

#[derive(Debug, Deserialize)]
pub(super) struct OverpassResponseDto {
    #[serde(default)]
    pub(super) elements: Vec<OverpassElementDto>,
}

#[derive(Debug, Deserialize)]
pub(super) struct OverpassElementDto {
    #[serde(rename = "type", default)]
    pub(super) element_type: Option<String>,
    #[serde(default)]
    pub(super) id: Option<i64>,
    pub(super) lat: Option<f64>,
    pub(super) lon: Option<f64>,
    pub(super) center: Option<OverpassCenterDto>,
    #[serde(default)]
    pub(super) tags: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct OverpassCenterDto {
    pub(super) lat: f64,
    pub(super) lon: f64,
}

impl OverpassResponseDto {
    /// Elements without a usable position are dropped, the rest keep response order
    pub(super) fn into_pois(self) -> Vec<RawPoi> {
        self.elements
            .into_iter()
            .filter_map(OverpassElementDto::into_poi)
            .collect()
    }
}

impl OverpassElementDto {
    fn into_poi(self) -> Option<RawPoi> {
        let Some((latitude, longitude)) = self.coordinates() else {
            debug!(
                "Skipping {} {} without coordinates",
                self.element_type.as_deref().unwrap_or("element"),
                self.id.unwrap_or_default()
            );
            return None;
        };
        let position = Coordinate::new(latitude, longitude).ok()?;
        Some(RawPoi {
            position,
            tags: self.tags,
        })
    }

    /// Point coordinate when present, else the area's computed center
    fn coordinates(&self) -> Option<(f64, f64)> {
        if let (Some(latitude), Some(longitude)) = (self.lat, self.lon) {
            return Some((latitude, longitude));
        }
        self.center.as_ref().map(|center| (center.lat, center.lon))
    }
}
