use crate::models::{Coordinates, TransportMode};
use crate::services::route_engine::avoidance::AvoidanceArea;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

const ORS_BASE_URL: &str = "https://api.openrouteservice.org";

/// Provider failures the search loops care about: throttling is absorbed and
/// the search moves on with a fresh seed, anything else is a plain failure.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("request failed: {0}")]
    RequestFailed(String),
}

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Normalized provider payload: the path, plus the provider-reported summary
/// distance when present. Callers fall back to summing the path themselves
/// when it is absent.
#[derive(Debug, Clone)]
pub struct ProviderPath {
    pub path: Vec<Coordinates>,
    pub distance_meters: Option<f64>,
}

/// The two operations the engine needs from a directions provider. Kept as a
/// trait so tests drive the search and composition logic with deterministic
/// stubs instead of network calls.
#[async_trait]
pub trait RoutingProvider: Send + Sync {
    /// Point-to-point route through the waypoints in order. First and last
    /// may coincide to request a loop.
    async fn directions(
        &self,
        waypoints: &[Coordinates],
        mode: &TransportMode,
        avoid: Option<&AvoidanceArea>,
    ) -> ProviderResult<ProviderPath>;

    /// Provider-synthesized closed loop of roughly `target_meters`, shaped by
    /// `points` and randomized by `seed`.
    async fn round_trip(
        &self,
        start: Coordinates,
        target_meters: f64,
        points: u32,
        seed: u64,
        mode: &TransportMode,
    ) -> ProviderResult<ProviderPath>;
}

#[derive(Clone)]
pub struct OrsClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OrsClient {
    pub fn new(api_key: String) -> Self {
        OrsClient {
            client: Client::new(),
            api_key,
            base_url: ORS_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        OrsClient {
            client: Client::new(),
            api_key,
            base_url,
        }
    }

    fn endpoint(&self, mode: &TransportMode) -> String {
        format!(
            "{}/v2/directions/{}/geojson",
            self.base_url,
            mode.ors_profile()
        )
    }

    async fn post_directions(
        &self,
        url: &str,
        body: serde_json::Value,
    ) -> ProviderResult<ProviderPath> {
        let response = self
            .client
            .post(url)
            .header("Authorization", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(format!("transport error: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                tracing::warn!(status = %status, "Provider throttled request: {}", error_text);
                return Err(ProviderError::RateLimited(error_text));
            }
            tracing::warn!(
                status = %status,
                "Provider HTTP error {}: {}",
                status, error_text
            );
            return Err(ProviderError::RequestFailed(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let parsed: OrsGeoJsonResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::RequestFailed(format!("failed to parse response: {}", e)))?;

        let feature = parsed
            .features
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::RequestFailed("no routes in response".to_string()))?;

        let path: Vec<Coordinates> = feature
            .geometry
            .coordinates
            .iter()
            .filter_map(|c| Coordinates::new(c[1], c[0]).ok())
            .collect();
        let distance_meters = feature.properties.summary.map(|s| s.distance);

        tracing::debug!(
            path_points = path.len(),
            distance_m = ?distance_meters,
            "Provider response: {} path points, distance {:?}",
            path.len(), distance_meters
        );

        Ok(ProviderPath {
            path,
            distance_meters,
        })
    }
}

#[async_trait]
impl RoutingProvider for OrsClient {
    async fn directions(
        &self,
        waypoints: &[Coordinates],
        mode: &TransportMode,
        avoid: Option<&AvoidanceArea>,
    ) -> ProviderResult<ProviderPath> {
        if waypoints.len() < 2 {
            return Err(ProviderError::RequestFailed(
                "at least 2 waypoints required".to_string(),
            ));
        }
        if waypoints.len() > 50 {
            return Err(ProviderError::RequestFailed(
                "maximum 50 waypoints allowed".to_string(),
            ));
        }

        tracing::debug!(
            waypoints = waypoints.len(),
            profile = %mode.ors_profile(),
            avoid_polygons = avoid.map(|a| a.polygon_count()).unwrap_or(0),
            "Directions request: {} waypoints, profile {}",
            waypoints.len(), mode.ors_profile()
        );

        let body = directions_body(waypoints, avoid);
        self.post_directions(&self.endpoint(mode), body).await
    }

    async fn round_trip(
        &self,
        start: Coordinates,
        target_meters: f64,
        points: u32,
        seed: u64,
        mode: &TransportMode,
    ) -> ProviderResult<ProviderPath> {
        tracing::debug!(
            target_m = target_meters,
            points = points,
            seed = seed,
            profile = %mode.ors_profile(),
            "Round-trip request: {:.0}m, {} points, seed {}",
            target_meters, points, seed
        );

        let body = round_trip_body(&start, target_meters, points, seed);
        self.post_directions(&self.endpoint(mode), body).await
    }
}

fn directions_body(waypoints: &[Coordinates], avoid: Option<&AvoidanceArea>) -> serde_json::Value {
    let coordinates: Vec<[f64; 2]> = waypoints.iter().map(|c| [c.lng, c.lat]).collect();
    let mut body = json!({
        "coordinates": coordinates,
        "instructions": false,
    });
    if let Some(area) = avoid {
        body["options"] = json!({ "avoid_polygons": area.to_geojson() });
    }
    body
}

fn round_trip_body(
    start: &Coordinates,
    target_meters: f64,
    points: u32,
    seed: u64,
) -> serde_json::Value {
    json!({
        "coordinates": [[start.lng, start.lat]],
        "instructions": false,
        "options": {
            "round_trip": {
                "length": target_meters,
                "points": points,
                "seed": seed,
            }
        }
    })
}

// Provider API response types

#[derive(Debug, Deserialize)]
struct OrsGeoJsonResponse {
    features: Vec<OrsFeature>,
}

#[derive(Debug, Deserialize)]
struct OrsFeature {
    geometry: OrsGeometry,
    properties: OrsProperties,
}

#[derive(Debug, Deserialize)]
struct OrsGeometry {
    coordinates: Vec<[f64; 2]>, // [lng, lat] pairs
}

#[derive(Debug, Deserialize, Default)]
struct OrsProperties {
    #[serde(default)]
    summary: Option<OrsSummary>,
}

#[derive(Debug, Deserialize)]
struct OrsSummary {
    distance: f64, // meters
}
