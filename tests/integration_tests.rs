//! End-to-end tests: HTTP API, orchestrator and the real upstream clients
//! against mocked geocoding, Overpass, weather and generation services

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use caremap::fallback::FALLBACK_TIPS;
use caremap::{CareMapConfig, MapState, RefreshOrchestrator, Sources, Viewport, web};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GEMINI_PATH: &str = "/v1beta/models/gemini-1.5-flash:generateContent";

struct Upstreams {
    server: MockServer,
}

impl Upstreams {
    async fn start() -> Self {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "Tokyo Station"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "lat": "35.6812", "lon": "139.7671", "display_name": "東京駅" }
            ])))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .and(query_param("units", "metric"))
            .and(query_param("lang", "ja"))
            .and(query_param("appid", "owm-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "weather": [{ "description": "clear sky" }],
                "main": { "temp": 23.4, "humidity": 55 }
            })))
            .mount(&server)
            .await;

        Self { server }
    }

    async fn with_facilities(self) -> Self {
        Mock::given(method("POST"))
            .and(path("/api/interpreter"))
            .and(body_string_contains("changing_table"))
            .and(body_string_contains("around%3A2500"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "elements": [
                    {
                        "type": "node",
                        "id": 1,
                        "lat": 35.6822,
                        "lon": 139.7671,
                        "tags": { "amenity": "baby_feeding", "name": "授乳室 丸の内" }
                    },
                    {
                        "type": "way",
                        "id": 2,
                        "center": { "lat": 35.6812, "lon": 139.7681 },
                        "tags": { "amenity": "toilets", "wheelchair": "yes" }
                    },
                    { "type": "relation", "id": 3, "tags": { "amenity": "toilets" } }
                ]
            })))
            .mount(&self.server)
            .await;
        self
    }

    async fn with_generator(self, response: ResponseTemplate) -> Self {
        Mock::given(method("POST"))
            .and(path(GEMINI_PATH))
            .and(header("x-goog-api-key", "gem-key"))
            .respond_with(response)
            .mount(&self.server)
            .await;
        self
    }

    fn config(&self) -> CareMapConfig {
        let uri = self.server.uri();
        let mut config = CareMapConfig::default();
        config.services.geocoding_url = format!("{uri}/search");
        config.services.overpass_url = format!("{uri}/api/interpreter");
        config.services.weather_url = format!("{uri}/data/2.5/weather");
        config.services.generative_url = format!("{uri}/v1beta");
        config.credentials.weather_api_key = Some("owm-key".to_string());
        config.credentials.generative_api_key = Some("gem-key".to_string());
        config
    }

    fn app(&self) -> (Arc<RefreshOrchestrator<MapState>>, Router) {
        let config = self.config();
        let surface = MapState::new(Viewport {
            center: config.defaults.start().unwrap(),
            zoom: config.defaults.zoom,
        });
        let orchestrator = Arc::new(RefreshOrchestrator::new(
            Sources::from_config(&config, reqwest::Client::new()),
            surface,
            config.defaults.clone(),
        ));
        let app = web::app(orchestrator.clone(), "frontend/dist");
        (orchestrator, app)
    }
}

fn tip_reply() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "candidates": [{ "content": { "parts": [{ "text": "日差しが強いので帽子を！" }] } }]
    }))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(body) => {
            request = request.header("content-type", "application/json");
            Body::from(body.to_string())
        }
        None => Body::empty(),
    };
    let response = app
        .clone()
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_destination_search_end_to_end() {
    let upstreams = Upstreams::start()
        .await
        .with_facilities()
        .await
        .with_generator(tip_reply())
        .await;
    let (_, app) = upstreams.app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/search",
        Some(json!({ "query": "Tokyo Station" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_marker"]["label"], "目的地: Tokyo Station");
    assert_eq!(body["weather_line"], "🌡 23℃ / clear sky (湿度55%)");
    assert_eq!(body["advice"], "日差しが強いので帽子を！");

    let facilities = body["facilities"].as_array().unwrap();
    assert_eq!(facilities.len(), 2);
    assert_eq!(facilities[0]["icon"], "🍼");
    assert_eq!(facilities[0]["name"], "授乳室 丸の内");
    assert_eq!(facilities[0]["distance_meters"], 111);
    assert_eq!(facilities[0]["walk_minutes"], 2);
    assert_eq!(facilities[1]["icon"], "🚽");
    assert_eq!(facilities[1]["name"], "赤ちゃん休憩室");
    assert_eq!(facilities[1]["category"], "accessible-toilet");
}

#[tokio::test]
async fn test_generation_outage_falls_back_to_fixed_tip() {
    let upstreams = Upstreams::start()
        .await
        .with_facilities()
        .await
        .with_generator(ResponseTemplate::new(500))
        .await;
    let (_, app) = upstreams.app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/locate",
        Some(json!({ "status": "position", "latitude": 35.6812, "longitude": 139.7671 })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["weather_line"], "🌡 23℃ / clear sky (湿度55%)");
    let advice = body["advice"].as_str().unwrap();
    assert!(FALLBACK_TIPS.contains(&advice), "unexpected advice {advice}");
    assert_eq!(body["facilities"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_overpass_outage_leaves_layer_empty() {
    let upstreams = Upstreams::start()
        .await
        .with_generator(tip_reply())
        .await;
    Mock::given(method("POST"))
        .and(path("/api/interpreter"))
        .respond_with(ResponseTemplate::new(504).set_body_string("rate limited"))
        .mount(&upstreams.server)
        .await;
    let (_, app) = upstreams.app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/search",
        Some(json!({ "query": "Tokyo Station" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["facilities"], json!([]));
    assert_eq!(body["advice"], "日差しが強いので帽子を！");
}

#[tokio::test]
async fn test_unknown_place_reports_not_found() {
    let upstreams = Upstreams::start().await;
    let (_, app) = upstreams.app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/search",
        Some(json!({ "query": "Atlantis" })),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "場所が見つかりませんでした");

    let requests = upstreams.server.received_requests().await.unwrap();
    assert!(requests.iter().all(|r| r.url.path() == "/search"));
}

#[tokio::test]
async fn test_initial_load_populates_state() {
    let upstreams = Upstreams::start()
        .await
        .with_facilities()
        .await
        .with_generator(tip_reply())
        .await;
    let (orchestrator, app) = upstreams.app();

    orchestrator.initial_load().await.unwrap();

    let (status, body) = send(&app, Method::GET, "/api/state", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_marker"]["label"], "東京駅 (サンプル)");
    assert_eq!(body["viewport"]["zoom"], 15);
    assert_eq!(body["facilities"].as_array().unwrap().len(), 2);
    assert!(body["generated_at"].is_string());
}
