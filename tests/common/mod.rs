// Shared test fixtures: a deterministic stub routing provider and synthetic
// path builders.

use async_trait::async_trait;
use loopsmith::models::{Coordinates, TransportMode};
use loopsmith::services::ors::{ProviderError, ProviderPath, ProviderResult, RoutingProvider};
use loopsmith::services::route_engine::avoidance::AvoidanceArea;
use std::sync::Mutex;

/// What the stub does for round-trip requests.
#[allow(dead_code)]
pub enum RoundTripBehavior {
    /// A clean circular loop of exactly the requested length
    PerfectLoop,
    /// Always throttled
    RateLimited,
}

/// Record of one directions call: the waypoints requested and how many
/// avoidance polygons were attached.
#[allow(dead_code)]
pub struct RecordedDirections {
    pub waypoints: Vec<Coordinates>,
    pub avoid_polygons: usize,
}

/// Record of one round-trip call.
#[allow(dead_code)]
pub struct RecordedRoundTrip {
    pub start: Coordinates,
    pub target_meters: f64,
    pub points: u32,
    pub seed: u64,
}

pub struct StubProvider {
    pub round_trip_behavior: RoundTripBehavior,
    pub directions_calls: Mutex<Vec<RecordedDirections>>,
    pub round_trip_calls: Mutex<Vec<RecordedRoundTrip>>,
}

impl StubProvider {
    pub fn new(round_trip_behavior: RoundTripBehavior) -> Self {
        Self {
            round_trip_behavior,
            directions_calls: Mutex::new(Vec::new()),
            round_trip_calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl RoutingProvider for StubProvider {
    async fn directions(
        &self,
        waypoints: &[Coordinates],
        _mode: &TransportMode,
        avoid: Option<&AvoidanceArea>,
    ) -> ProviderResult<ProviderPath> {
        self.directions_calls.lock().unwrap().push(RecordedDirections {
            waypoints: waypoints.to_vec(),
            avoid_polygons: avoid.map(|a| a.polygon_count()).unwrap_or(0),
        });

        let path = interpolate_path(waypoints, 40.0);
        let distance = total_length(&path);
        Ok(ProviderPath {
            path,
            distance_meters: Some(distance),
        })
    }

    async fn round_trip(
        &self,
        start: Coordinates,
        target_meters: f64,
        points: u32,
        seed: u64,
        _mode: &TransportMode,
    ) -> ProviderResult<ProviderPath> {
        self.round_trip_calls.lock().unwrap().push(RecordedRoundTrip {
            start,
            target_meters,
            points,
            seed,
        });

        match self.round_trip_behavior {
            RoundTripBehavior::PerfectLoop => Ok(ProviderPath {
                path: make_loop(start, target_meters, 64),
                distance_meters: Some(target_meters),
            }),
            RoundTripBehavior::RateLimited => {
                Err(ProviderError::RateLimited("429 Too Many Requests".to_string()))
            }
        }
    }
}

/// Closed circular loop of roughly `length_meters` around `center`.
#[allow(dead_code)]
pub fn make_loop(center: Coordinates, length_meters: f64, n: usize) -> Vec<Coordinates> {
    let radius = length_meters / std::f64::consts::TAU;
    (0..=n)
        .map(|i| {
            let angle = std::f64::consts::TAU * i as f64 / n as f64;
            center.local_offset(radius * angle.cos(), radius * angle.sin())
        })
        .collect()
}

/// Straight-line interpolation through the given waypoints with roughly
/// `step_meters` spacing, the way a road path follows its request.
pub fn interpolate_path(waypoints: &[Coordinates], step_meters: f64) -> Vec<Coordinates> {
    let mut path = Vec::new();
    for w in waypoints.windows(2) {
        let (dx, dy) = w[0].planar_vector_to(&w[1]);
        let leg = (dx * dx + dy * dy).sqrt();
        let steps = (leg / step_meters).ceil().max(1.0) as usize;
        for i in 0..steps {
            let t = i as f64 / steps as f64;
            path.push(w[0].local_offset(dx * t, dy * t));
        }
    }
    if let Some(last) = waypoints.last() {
        path.push(*last);
    }
    path
}

pub fn total_length(path: &[Coordinates]) -> f64 {
    path.windows(2).map(|w| w[0].distance_meters(&w[1])).sum()
}

/// True when some path point lies within `tolerance_meters` of `point`.
#[allow(dead_code)]
pub fn path_passes_near(path: &[Coordinates], point: &Coordinates, tolerance_meters: f64) -> bool {
    path.iter()
        .any(|p| p.distance_meters(point) <= tolerance_meters)
}
