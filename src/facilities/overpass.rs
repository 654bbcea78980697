//! Reqwest-backed Overpass source.
//!
//! Owns transport details only: query construction, HTTP error mapping and
//! JSON decoding into raw points of interest.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, instrument};

use super::dto::OverpassResponseDto;
use super::{FacilitySource, RawPoi};
use crate::models::Coordinate;
use crate::{CareMapError, Result};

/// Tag filters selecting caregiver facilities
const FACILITY_SELECTORS: [&str; 3] = [
    r#"["amenity"~"baby_feeding|diaper_change"]"#,
    r#"["changing_table"="yes"]"#,
    r#"["amenity"="toilets"]["wheelchair"="yes"]"#,
];

/// Point and area features; areas are resolved to their center by `out center`
const ELEMENT_TYPES: [&str; 2] = ["node", "way"];

/// Overpass source performing HTTP POST requests against one interpreter endpoint
pub struct OverpassSource {
    client: Client,
    endpoint: String,
    query_timeout_seconds: u32,
}

impl OverpassSource {
    pub fn new(client: Client, endpoint: impl Into<String>, query_timeout_seconds: u32) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            query_timeout_seconds: query_timeout_seconds.max(1),
        }
    }
}

#[async_trait]
impl FacilitySource for OverpassSource {
    #[instrument(skip(self), fields(center = %center.format_coordinates()))]
    async fn fetch(&self, center: Coordinate, radius_meters: u32) -> Result<Vec<RawPoi>> {
        let query = build_query(&center, radius_meters, self.query_timeout_seconds);
        debug!("Overpass query:\n{}", query);

        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&[("data", query)])
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }

        let decoded: OverpassResponseDto = serde_json::from_slice(body.as_ref())
            .map_err(|e| CareMapError::decode(format!("invalid Overpass JSON payload: {e}")))?;
        Ok(decoded.into_pois())
    }
}

/// Union of every selector for both element types, around `center`
pub fn build_query(center: &Coordinate, radius_meters: u32, query_timeout_seconds: u32) -> String {
    let around = format!(
        "(around:{radius_meters},{},{})",
        center.latitude, center.longitude
    );
    let around = around.as_str();

    let lines: Vec<String> = ELEMENT_TYPES
        .iter()
        .flat_map(|element_type| {
            FACILITY_SELECTORS
                .iter()
                .map(move |selector| format!("  {element_type}{selector}{around};"))
        })
        .collect();

    format!(
        "[out:json][timeout:{query_timeout_seconds}];\n(\n{}\n);\nout center;",
        lines.join("\n")
    )
}

fn map_status_error(status: StatusCode, body: &[u8]) -> CareMapError {
    let excerpt = error_excerpt(body);
    let mut message = format!("facility search failed with HTTP {}", status.as_u16());
    if !excerpt.is_empty() {
        message.push_str(" (");
        message.push_str(&excerpt);
        message.push(')');
    }
    CareMapError::transport(message)
}

/// Error body flattened to one line and cut after `ERROR_EXCERPT_CHARS`
fn error_excerpt(body: &[u8]) -> String {
    const ERROR_EXCERPT_CHARS: usize = 160;

    let flattened = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let cut = flattened
        .char_indices()
        .nth(ERROR_EXCERPT_CHARS)
        .map(|(index, _)| index);
    match cut {
        Some(cut) => format!("{}...", &flattened[..cut]),
        None => flattened,
    }
}
