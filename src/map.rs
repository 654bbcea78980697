//! Map presentation surface
//!
//! The surface owns the viewport, the single user marker, the facility
//! layer and the two text fields under the map. It only supports replace and
//! clear operations; the browser renders whatever state it holds.

use serde::{Deserialize, Serialize};

use crate::models::{Coordinate, Facility, Notice, UserMarker};

/// Visible map area
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub center: Coordinate,
    pub zoom: u8,
}

/// Operations the refresh pipeline performs on the map
pub trait MapSurface: Send {
    fn set_view(&mut self, viewport: Viewport);
    fn viewport(&self) -> Viewport;
    /// Replace the user marker; the previous one is removed
    fn place_user_marker(&mut self, marker: UserMarker);
    fn clear_facilities(&mut self);
    /// Replace the whole facility layer
    fn show_facilities(&mut self, facilities: Vec<Facility>);
    fn set_weather_line(&mut self, line: String);
    fn set_advice(&mut self, advice: String);
    fn notify(&mut self, notice: Notice);
    fn clear_notice(&mut self);
}

/// In-process map state, serialized to the browser as-is
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapState {
    pub viewport: Viewport,
    pub user_marker: Option<UserMarker>,
    pub facilities: Vec<Facility>,
    pub weather_line: Option<String>,
    pub advice: Option<String>,
    pub notice: Option<Notice>,
}

impl MapState {
    #[must_use]
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            user_marker: None,
            facilities: Vec::new(),
            weather_line: None,
            advice: None,
            notice: None,
        }
    }
}

impl MapSurface for MapState {
    fn set_view(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn place_user_marker(&mut self, marker: UserMarker) {
        self.user_marker = Some(marker);
    }

    fn clear_facilities(&mut self) {
        self.facilities.clear();
    }

    fn show_facilities(&mut self, facilities: Vec<Facility>) {
        self.facilities = facilities;
    }

    fn set_weather_line(&mut self, line: String) {
        self.weather_line = Some(line);
    }

    fn set_advice(&mut self, advice: String) {
        self.advice = Some(advice);
    }

    fn notify(&mut self, notice: Notice) {
        self.notice = Some(notice);
    }

    fn clear_notice(&mut self) {
        self.notice = None;
    }
}
