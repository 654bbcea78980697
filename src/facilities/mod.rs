//! Facility finder
//!
//! Queries a point-of-interest service for caregiver facilities around a
//! coordinate and turns the raw hits into [`Facility`] values with distance
//! and walking time relative to the search center.

mod dto;
pub mod overpass;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, instrument};

use crate::Result;
use crate::fallback;
use crate::models::{Coordinate, Facility, FacilityCategory};

pub use overpass::OverpassSource;

/// Default search radius around the center
pub const DEFAULT_RADIUS_METERS: u32 = 2500;

/// A point of interest as returned by the source, position already resolved
#[derive(Debug, Clone, PartialEq)]
pub struct RawPoi {
    pub position: Coordinate,
    pub tags: BTreeMap<String, String>,
}

/// Source of caregiver points of interest
#[async_trait]
pub trait FacilitySource: Send + Sync {
    /// All matching points within `radius_meters` of `center`, in service order
    async fn fetch(&self, center: Coordinate, radius_meters: u32) -> Result<Vec<RawPoi>>;
}

/// Builds the facility layer contents for a center coordinate
#[derive(Clone)]
pub struct FacilityFinder {
    source: Arc<dyn FacilitySource>,
    radius_meters: u32,
}

impl FacilityFinder {
    pub fn new(source: Arc<dyn FacilitySource>) -> Self {
        Self::with_radius(source, DEFAULT_RADIUS_METERS)
    }

    pub fn with_radius(source: Arc<dyn FacilitySource>, radius_meters: u32) -> Self {
        Self {
            source,
            radius_meters,
        }
    }

    /// Fetch and map facilities, propagating upstream failures
    #[instrument(skip(self), fields(center = %center.format_coordinates(), radius = self.radius_meters))]
    pub async fn search(&self, center: Coordinate) -> Result<Vec<Facility>> {
        let pois = self.source.fetch(center, self.radius_meters).await?;
        let facilities = to_facilities(&center, pois);
        info!("Found {} facilities", facilities.len());
        Ok(facilities)
    }

    /// Fetch and map facilities; any failure yields an empty set for this cycle
    pub async fn find(&self, center: Coordinate) -> Vec<Facility> {
        fallback::facilities_or_empty(self.search(center).await)
    }
}

/// Maps raw hits to facilities, keeping service order
#[must_use]
pub fn to_facilities(center: &Coordinate, pois: Vec<RawPoi>) -> Vec<Facility> {
    pois.into_iter()
        .map(|poi| {
            let category = FacilityCategory::from_tags(&poi.tags);
            let name = poi.tags.get("name").cloned();
            Facility::near(center, poi.position, category, name)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CareMapError;
    use std::sync::Mutex;

    struct RecordingSource {
        calls: Mutex<Vec<(Coordinate, u32)>>,
        response: fn() -> Result<Vec<RawPoi>>,
    }

    #[async_trait]
    impl FacilitySource for RecordingSource {
        async fn fetch(&self, center: Coordinate, radius_meters: u32) -> Result<Vec<RawPoi>> {
            self.calls.lock().unwrap().push((center, radius_meters));
            (self.response)()
        }
    }

    fn poi(latitude: f64, longitude: f64, tags: &[(&str, &str)]) -> RawPoi {
        RawPoi {
            position: Coordinate::new(latitude, longitude).unwrap(),
            tags: tags
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        }
    }

    fn three_pois() -> Result<Vec<RawPoi>> {
        Ok(vec![
            poi(35.70, 139.7671, &[("amenity", "toilets"), ("wheelchair", "yes")]),
            poi(35.6815, 139.7671, &[("amenity", "baby_feeding"), ("name", "授乳室")]),
            poi(35.69, 139.7671, &[("changing_table", "yes")]),
        ])
    }

    fn failing() -> Result<Vec<RawPoi>> {
        Err(CareMapError::transport("connection refused"))
    }

    #[tokio::test]
    async fn test_search_maps_distance_walk_time_and_keeps_order() {
        let source = Arc::new(RecordingSource {
            calls: Mutex::new(Vec::new()),
            response: three_pois,
        });
        let finder = FacilityFinder::new(source.clone());
        let center = Coordinate::new(35.6812, 139.7671).unwrap();

        let facilities = finder.search(center).await.unwrap();

        assert_eq!(source.calls.lock().unwrap().as_slice(), &[(center, 2500)]);
        assert_eq!(facilities.len(), 3);
        assert_eq!(facilities[0].category, FacilityCategory::AccessibleToilet);
        assert_eq!(facilities[1].category, FacilityCategory::Feeding);
        assert_eq!(facilities[1].display_name(), "授乳室");
        assert_eq!(facilities[2].category, FacilityCategory::DiaperChange);
        for facility in &facilities {
            assert_eq!(
                facility.distance_meters,
                center.distance_meters(&facility.position)
            );
            assert_eq!(
                facility.walk_minutes,
                facility.distance_meters.div_ceil(80)
            );
        }
    }

    #[tokio::test]
    async fn test_find_degrades_to_empty() {
        let source = Arc::new(RecordingSource {
            calls: Mutex::new(Vec::new()),
            response: failing,
        });
        let finder = FacilityFinder::with_radius(source, 1000);
        let center = Coordinate::new(35.6812, 139.7671).unwrap();

        assert!(finder.search(center).await.is_err());
        assert!(finder.find(center).await.is_empty());
    }
}
