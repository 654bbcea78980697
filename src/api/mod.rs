use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::CareMapError;
use crate::map::{MapState, Viewport};
use crate::models::{Coordinate, Facility, FacilityCategory, Notice, UserMarker};
use crate::orchestrator::{GeolocationFix, RefreshOrchestrator};

const MIN_ZOOM: u8 = 1;
const MAX_ZOOM: u8 = 19;

pub type SharedOrchestrator = Arc<RefreshOrchestrator<MapState>>;

#[derive(Serialize, Deserialize)]
pub struct ApiCoordinate {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Serialize, Deserialize)]
pub struct FacilityMarker {
    pub position: ApiCoordinate,
    pub category: FacilityCategory,
    pub icon: String,
    pub name: String,
    pub summary: String,
    pub navigation_url: String,
    pub distance_meters: u32,
    pub walk_minutes: u32,
}

impl From<&Facility> for FacilityMarker {
    fn from(facility: &Facility) -> Self {
        Self {
            position: ApiCoordinate {
                latitude: facility.position.latitude,
                longitude: facility.position.longitude,
            },
            category: facility.category,
            icon: facility.category.icon().to_string(),
            name: facility.display_name().to_string(),
            summary: facility.summary(),
            navigation_url: facility.navigation_url(),
            distance_meters: facility.distance_meters,
            walk_minutes: facility.walk_minutes,
        }
    }
}

/// Everything the browser needs to redraw the page
#[derive(Serialize, Deserialize)]
pub struct MapSnapshot {
    pub viewport: Viewport,
    pub user_marker: Option<UserMarker>,
    pub facilities: Vec<FacilityMarker>,
    pub weather_line: Option<String>,
    pub advice: Option<String>,
    pub notice: Option<Notice>,
    pub generated_at: DateTime<Utc>,
}

impl From<&MapState> for MapSnapshot {
    fn from(state: &MapState) -> Self {
        Self {
            viewport: state.viewport,
            user_marker: state.user_marker.clone(),
            facilities: state.facilities.iter().map(FacilityMarker::from).collect(),
            weather_line: state.weather_line.clone(),
            advice: state.advice.clone(),
            notice: state.notice.clone(),
            generated_at: Utc::now(),
        }
    }
}

#[derive(Deserialize)]
pub struct SearchRequest {
    pub query: String,
}

/// Result of the browser's geolocation call
#[derive(Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LocateRequest {
    Position { latitude: f64, longitude: f64 },
    Denied,
    Unavailable,
}

impl TryFrom<LocateRequest> for GeolocationFix {
    type Error = CareMapError;

    fn try_from(request: LocateRequest) -> Result<Self, Self::Error> {
        Ok(match request {
            LocateRequest::Position {
                latitude,
                longitude,
            } => Self::Position(Coordinate::new(latitude, longitude)?),
            LocateRequest::Denied => Self::Denied,
            LocateRequest::Unavailable => Self::Unavailable,
        })
    }
}

#[derive(Deserialize)]
pub struct ViewportRequest {
    pub center: ApiCoordinate,
    pub zoom: u8,
}

impl TryFrom<ViewportRequest> for Viewport {
    type Error = CareMapError;

    fn try_from(request: ViewportRequest) -> Result<Self, Self::Error> {
        if !(MIN_ZOOM..=MAX_ZOOM).contains(&request.zoom) {
            return Err(CareMapError::validation(format!(
                "zoom must be between {MIN_ZOOM} and {MAX_ZOOM}"
            )));
        }
        Ok(Self {
            center: Coordinate::new(request.center.latitude, request.center.longitude)?,
            zoom: request.zoom,
        })
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

pub struct ApiError(CareMapError);

impl From<CareMapError> for ApiError {
    fn from(err: CareMapError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            CareMapError::NotFound { .. } => StatusCode::NOT_FOUND,
            CareMapError::PermissionDenied { .. } => StatusCode::FORBIDDEN,
            CareMapError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            CareMapError::Transport { .. }
            | CareMapError::Decode { .. }
            | CareMapError::Config { .. } => {
                warn!("Request failed upstream: {}", self.0);
                StatusCode::BAD_GATEWAY
            }
        };
        let body = ErrorBody {
            message: self.0.user_message(),
        };
        (status, Json(body)).into_response()
    }
}

pub fn router(orchestrator: SharedOrchestrator) -> Router {
    Router::new()
        .route("/state", get(get_state))
        .route("/search", post(search))
        .route("/search-around", post(search_around))
        .route("/locate", post(locate))
        .route("/viewport", put(set_viewport))
        .with_state(orchestrator)
}

async fn snapshot(orchestrator: &SharedOrchestrator) -> Json<MapSnapshot> {
    Json(orchestrator.inspect(|state| MapSnapshot::from(state)).await)
}

async fn get_state(State(orchestrator): State<SharedOrchestrator>) -> Json<MapSnapshot> {
    snapshot(&orchestrator).await
}

async fn search(
    State(orchestrator): State<SharedOrchestrator>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<MapSnapshot>, ApiError> {
    orchestrator.search_destination(&request.query).await?;
    Ok(snapshot(&orchestrator).await)
}

async fn search_around(State(orchestrator): State<SharedOrchestrator>) -> Json<MapSnapshot> {
    orchestrator.search_around().await;
    snapshot(&orchestrator).await
}

async fn locate(
    State(orchestrator): State<SharedOrchestrator>,
    Json(request): Json<LocateRequest>,
) -> Result<Json<MapSnapshot>, ApiError> {
    orchestrator.current_location(request.try_into()?).await?;
    Ok(snapshot(&orchestrator).await)
}

async fn set_viewport(
    State(orchestrator): State<SharedOrchestrator>,
    Json(request): Json<ViewportRequest>,
) -> Result<StatusCode, ApiError> {
    orchestrator.set_viewport(request.try_into()?).await;
    Ok(StatusCode::NO_CONTENT)
}
