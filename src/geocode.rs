//! Geocoder client
//!
//! Resolves a free-text place name to a coordinate through the Nominatim
//! search endpoint. Only the first match is used.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, instrument};

use crate::models::Coordinate;
use crate::{CareMapError, Result};

/// Resolves place names to coordinates
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolve `query` to the coordinate of its best match.
    ///
    /// Fails with [`CareMapError::NotFound`] when there is no match and with
    /// a transport or decode error when the service cannot be used.
    async fn resolve(&self, query: &str) -> Result<Coordinate>;
}

/// One Nominatim search hit; coordinates arrive as strings
#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: Option<String>,
}

impl NominatimPlace {
    fn coordinate(&self) -> Result<Coordinate> {
        let latitude: f64 = self
            .lat
            .trim()
            .parse()
            .map_err(|_| CareMapError::decode(format!("invalid latitude '{}'", self.lat)))?;
        let longitude: f64 = self
            .lon
            .trim()
            .parse()
            .map_err(|_| CareMapError::decode(format!("invalid longitude '{}'", self.lon)))?;
        Coordinate::new(latitude, longitude).map_err(|e| CareMapError::decode(e.to_string()))
    }
}

/// Geocoder backed by a Nominatim search endpoint
pub struct NominatimGeocoder {
    client: Client,
    endpoint: String,
}

impl NominatimGeocoder {
    pub fn new(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    #[instrument(skip(self))]
    async fn resolve(&self, query: &str) -> Result<Coordinate> {
        let query = query.trim();
        if query.is_empty() {
            return Err(CareMapError::not_found(query));
        }

        debug!("Geocoding place name: {}", query);

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("format", "json"), ("q", query), ("limit", "1")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CareMapError::transport(format!(
                "geocoding service returned status {}",
                response.status()
            )));
        }

        let places: Vec<NominatimPlace> = response
            .json()
            .await
            .map_err(|e| CareMapError::decode(format!("invalid geocoding payload: {e}")))?;

        let Some(place) = places.first() else {
            return Err(CareMapError::not_found(query));
        };
        let coordinate = place.coordinate()?;

        info!(
            "Resolved '{}' to {} ({})",
            query,
            coordinate.format_coordinates(),
            place.display_name.as_deref().unwrap_or("unnamed")
        );
        Ok(coordinate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn geocoder(server: &MockServer) -> NominatimGeocoder {
        NominatimGeocoder::new(Client::new(), format!("{}/search", server.uri()))
    }

    #[tokio::test]
    async fn test_resolves_first_match() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "Tokyo Station"))
            .and(query_param("limit", "1"))
            .and(query_param("format", "json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "lat": "35.6812996", "lon": "139.7670658", "display_name": "東京駅" },
                { "lat": "0", "lon": "0" }
            ])))
            .mount(&server)
            .await;

        let coordinate = geocoder(&server).resolve("Tokyo Station").await.unwrap();
        assert!((coordinate.latitude - 35.681).abs() < 0.001);
        assert!((coordinate.longitude - 139.767).abs() < 0.001);
    }

    #[tokio::test]
    async fn test_zero_matches_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let err = geocoder(&server).resolve("nowhere at all").await.unwrap_err();
        assert!(matches!(err, CareMapError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_empty_query_is_not_found_without_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        for query in ["", "   "] {
            let err = geocoder(&server).resolve(query).await.unwrap_err();
            assert!(matches!(err, CareMapError::NotFound { .. }));
        }
    }

    #[tokio::test]
    async fn test_server_error_is_transport() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = geocoder(&server).resolve("Osaka").await.unwrap_err();
        assert!(matches!(err, CareMapError::Transport { .. }));
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>busy</html>"))
            .mount(&server)
            .await;

        let err = geocoder(&server).resolve("Osaka").await.unwrap_err();
        assert!(matches!(err, CareMapError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_unparseable_coordinate_is_decode() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([{ "lat": "north", "lon": "139.7" }])),
            )
            .mount(&server)
            .await;

        let err = geocoder(&server).resolve("Osaka").await.unwrap_err();
        assert!(matches!(err, CareMapError::Decode { .. }));
    }
}
