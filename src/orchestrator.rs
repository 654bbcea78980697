//! Refresh orchestrator
//!
//! Every location-producing event (first load, destination search, search
//! around the viewport, a position fix) ends up here. The orchestrator moves
//! the user marker right away, then runs the weather/advice fetch and the
//! facility fetch and hands their results to the map surface.
//!
//! Each of the two channels carries a generation counter. A trigger advances
//! the counter of every channel it refreshes and a result is only applied if
//! its generation is still the newest, so a slow response for an older
//! location can never overwrite a newer one.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use reqwest::Client;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::advice::{BriefingService, GeminiGenerator};
use crate::config::{CareMapConfig, DefaultsConfig};
use crate::facilities::{FacilityFinder, OverpassSource};
use crate::geocode::{Geocoder, NominatimGeocoder};
use crate::map::{MapSurface, Viewport};
use crate::models::{Coordinate, Notice, NoticeKind, UserMarker};
use crate::weather::OpenWeatherSource;
use crate::{CareMapError, Result};

/// Advice text shown while a destination is being resolved
pub const ANALYZING_TEXT: &str = "新しい目的地を分析中...";

/// Marker label after a position fix
pub const CURRENT_LOCATION_LABEL: &str = "現在地";

/// How the two fetches of a refresh are scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOrdering {
    /// Weather and advice complete before the facility request is issued
    AdviceFirst,
    /// Both fetches run at the same time
    Concurrent,
}

/// Outcome of a host geolocation request
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeolocationFix {
    Position(Coordinate),
    Denied,
    Unavailable,
}

/// Monotonic counter identifying the newest request on one channel
#[derive(Debug, Default)]
struct Generation(AtomicU64);

impl Generation {
    fn advance(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_current(&self, generation: u64) -> bool {
        self.0.load(Ordering::SeqCst) == generation
    }
}

/// Generations captured by one trigger that refreshes both channels
#[derive(Debug, Clone, Copy)]
struct Ticket {
    facilities: u64,
    briefing: u64,
}

/// Upstream collaborators of the pipeline
#[derive(Clone)]
pub struct Sources {
    pub geocoder: Arc<dyn Geocoder>,
    pub facilities: FacilityFinder,
    pub briefing: BriefingService,
}

impl Sources {
    /// HTTP-backed collaborators for the configured services
    pub fn from_config(config: &CareMapConfig, client: Client) -> Self {
        let services = &config.services;
        let credentials = &config.credentials;

        if credentials.weather_api_key.is_none() {
            warn!("No weather API key configured, every briefing will use a fallback tip");
        }
        if credentials.generative_api_key.is_none() {
            warn!("No generative API key configured, advice will use fallback tips");
        }

        let overpass = OverpassSource::new(
            client.clone(),
            &services.overpass_url,
            config.search.query_timeout_seconds,
        );
        let weather = OpenWeatherSource::new(
            client.clone(),
            &services.weather_url,
            credentials.weather_api_key.clone(),
            &config.weather,
        );
        let generator = GeminiGenerator::new(
            client.clone(),
            &services.generative_url,
            &services.generative_model,
            credentials.generative_api_key.clone(),
        );

        Self {
            geocoder: Arc::new(NominatimGeocoder::new(client, &services.geocoding_url)),
            facilities: FacilityFinder::with_radius(
                Arc::new(overpass),
                config.search.radius_meters,
            ),
            briefing: BriefingService::new(Arc::new(weather), Arc::new(generator)),
        }
    }
}

/// Drives refreshes of one map session
pub struct RefreshOrchestrator<S> {
    sources: Sources,
    surface: Mutex<S>,
    facility_generation: Generation,
    briefing_generation: Generation,
    defaults: DefaultsConfig,
}

impl<S: MapSurface> RefreshOrchestrator<S> {
    pub fn new(sources: Sources, surface: S, defaults: DefaultsConfig) -> Self {
        Self {
            sources,
            surface: Mutex::new(surface),
            facility_generation: Generation::default(),
            briefing_generation: Generation::default(),
            defaults,
        }
    }

    /// Read the surface under its lock
    pub async fn inspect<R>(&self, read: impl FnOnce(&S) -> R) -> R {
        let surface = self.surface.lock().await;
        read(&surface)
    }

    /// Record a pan or zoom made in the browser
    pub async fn set_viewport(&self, viewport: Viewport) {
        self.surface.lock().await.set_view(viewport);
    }

    /// First refresh at the configured start position
    #[instrument(skip(self))]
    pub async fn initial_load(&self) -> Result<()> {
        let start = self.defaults.start()?;
        self.refresh(
            start,
            self.defaults.label.clone(),
            self.defaults.zoom,
            FetchOrdering::Concurrent,
        )
        .await;
        Ok(())
    }

    /// Resolve `query` and refresh around it, advice before facilities.
    ///
    /// An empty query does nothing. When the place is unknown a notice is
    /// raised and nothing else on the map changes. The trigger takes its
    /// generations before geocoding, so a request made after it wins even if
    /// the geocoder answers late.
    #[instrument(skip(self))]
    pub async fn search_destination(&self, query: &str) -> Result<()> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(());
        }

        let ticket = self.issue_ticket();
        self.apply(&self.briefing_generation, ticket.briefing, |surface| {
            surface.clear_notice();
            surface.set_advice(ANALYZING_TEXT.to_string());
        })
        .await;

        let coordinate = match self.sources.geocoder.resolve(query).await {
            Ok(coordinate) => coordinate,
            Err(e @ CareMapError::NotFound { .. }) => {
                info!("No match for destination '{}'", query);
                let notice = Notice {
                    kind: NoticeKind::NotFound,
                    message: e.user_message(),
                };
                self.apply(&self.briefing_generation, ticket.briefing, |surface| {
                    surface.notify(notice);
                })
                .await;
                return Err(e);
            }
            Err(e) => {
                warn!("Geocoding '{}' failed: {}", query, e);
                return Err(e);
            }
        };

        self.refresh_with(
            ticket,
            coordinate,
            format!("目的地: {query}"),
            self.defaults.focus_zoom,
            FetchOrdering::AdviceFirst,
        )
        .await;
        Ok(())
    }

    /// Refresh the facility layer around the current viewport center
    #[instrument(skip(self))]
    pub async fn search_around(&self) {
        let generation = self.facility_generation.advance();
        let center = {
            let mut surface = self.surface.lock().await;
            surface.clear_notice();
            surface.viewport().center
        };
        self.refresh_facilities(center, generation).await;
    }

    /// Refresh around a host position fix; a refused fix raises a notice
    #[instrument(skip(self))]
    pub async fn current_location(&self, fix: GeolocationFix) -> Result<()> {
        let coordinate = match fix {
            GeolocationFix::Position(coordinate) => coordinate,
            GeolocationFix::Denied | GeolocationFix::Unavailable => {
                let err = CareMapError::permission_denied(format!("geolocation {fix:?}"));
                self.notify(NoticeKind::PermissionDenied, &err).await;
                return Err(err);
            }
        };

        self.refresh(
            coordinate,
            CURRENT_LOCATION_LABEL.to_string(),
            self.defaults.focus_zoom,
            FetchOrdering::Concurrent,
        )
        .await;
        Ok(())
    }

    /// Move the view and user marker to `coordinate`, then refresh both channels
    pub async fn refresh(
        &self,
        coordinate: Coordinate,
        label: String,
        zoom: u8,
        ordering: FetchOrdering,
    ) {
        let ticket = self.issue_ticket();
        self.refresh_with(ticket, coordinate, label, zoom, ordering)
            .await;
    }

    fn issue_ticket(&self) -> Ticket {
        Ticket {
            facilities: self.facility_generation.advance(),
            briefing: self.briefing_generation.advance(),
        }
    }

    #[instrument(skip(self), fields(coordinate = %coordinate.format_coordinates()))]
    async fn refresh_with(
        &self,
        ticket: Ticket,
        coordinate: Coordinate,
        label: String,
        zoom: u8,
        ordering: FetchOrdering,
    ) {
        // only full refreshes advance the briefing channel, so it also
        // orders marker and view moves
        let moved = self
            .apply(&self.briefing_generation, ticket.briefing, |surface| {
                surface.clear_notice();
                surface.set_view(Viewport {
                    center: coordinate,
                    zoom,
                });
                surface.place_user_marker(UserMarker {
                    position: coordinate,
                    label,
                });
            })
            .await;
        if !moved {
            debug!("Superseded before fetching (generation {})", ticket.briefing);
            return;
        }

        match ordering {
            FetchOrdering::AdviceFirst => {
                self.refresh_briefing(coordinate, ticket.briefing).await;
                self.refresh_facilities(coordinate, ticket.facilities)
                    .await;
            }
            FetchOrdering::Concurrent => {
                futures::join!(
                    self.refresh_briefing(coordinate, ticket.briefing),
                    self.refresh_facilities(coordinate, ticket.facilities),
                );
            }
        }
    }

    async fn refresh_facilities(&self, center: Coordinate, generation: u64) {
        self.apply(&self.facility_generation, generation, |surface| {
            surface.clear_facilities();
        })
        .await;

        let facilities = self.sources.facilities.find(center).await;

        let count = facilities.len();
        if self
            .apply(&self.facility_generation, generation, |surface| {
                surface.show_facilities(facilities);
            })
            .await
        {
            debug!("Facility layer now shows {} markers", count);
        } else {
            debug!("Discarding stale facility result (generation {})", generation);
        }
    }

    async fn refresh_briefing(&self, coordinate: Coordinate, generation: u64) {
        let briefing = &self.sources.briefing;
        let weather = briefing.weather(coordinate).await;
        if let Ok(snapshot) = &weather {
            let line = snapshot.status_line();
            self.apply(&self.briefing_generation, generation, |surface| {
                surface.set_weather_line(line);
            })
            .await;
        }
        let advice = briefing.advice_for(weather).await;

        if !self
            .apply(&self.briefing_generation, generation, |surface| {
                surface.set_advice(advice);
            })
            .await
        {
            debug!("Discarding stale advice (generation {})", generation);
        }
    }

    /// Run `update` if `generation` is still the newest on `channel`
    async fn apply(
        &self,
        channel: &Generation,
        generation: u64,
        update: impl FnOnce(&mut S),
    ) -> bool {
        let mut surface = self.surface.lock().await;
        if !channel.is_current(generation) {
            return false;
        }
        update(&mut surface);
        true
    }

    async fn notify(&self, kind: NoticeKind, err: &CareMapError) {
        self.surface.lock().await.notify(Notice {
            kind,
            message: err.user_message(),
        });
    }
}
