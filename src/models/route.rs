use crate::models::Coordinates;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    #[default]
    Walk,
    Run,
}

impl TransportMode {
    /// Returns the routing profile name sent to the directions provider.
    /// The provider has no dedicated running profile; runners are routed
    /// over the pedestrian graph.
    pub fn ors_profile(&self) -> &str {
        match self {
            TransportMode::Walk => "foot-walking",
            TransportMode::Run => "foot-walking",
        }
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportMode::Walk => write!(f, "walk"),
            TransportMode::Run => write!(f, "run"),
        }
    }
}

impl FromStr for TransportMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "walk" | "walking" => Ok(TransportMode::Walk),
            "run" | "running" => Ok(TransportMode::Run),
            _ => Err(format!("Invalid transport mode: '{}'", s)),
        }
    }
}

/// A finished loop route with its derived quality metrics.
/// Never mutated after creation; corrections produce a new value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    pub id: Uuid,
    /// Ordered path coordinates; first and last coincide for a closed loop
    pub path: Vec<Coordinates>,
    pub length_meters: f64,
    pub target_meters: f64,
    /// |length - target| / target
    pub distance_error: f64,
    /// Fraction of the path length that retraces earlier ground (0-1)
    pub overlap_ratio: f64,
}

impl Route {
    pub fn new(
        path: Vec<Coordinates>,
        length_meters: f64,
        target_meters: f64,
        overlap_ratio: f64,
    ) -> Self {
        let distance_error = if target_meters > 0.0 {
            (length_meters - target_meters).abs() / target_meters
        } else {
            0.0
        };
        Route {
            id: Uuid::new_v4(),
            path,
            length_meters,
            target_meters,
            distance_error,
            overlap_ratio,
        }
    }
}

/// Engine result: the route plus how many provider round-trip attempts it cost.
#[derive(Debug, Clone, Serialize)]
pub struct RoutePlan {
    pub route: Route,
    pub attempts: u32,
}

/// An ordered pair of coordinates marking a road section to avoid.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BlockedSegment {
    pub from: Coordinates,
    pub to: Coordinates,
}

// Request types for API endpoints

#[derive(Debug, Clone, Deserialize)]
pub struct LoopRouteRequest {
    pub start_point: Coordinates,
    pub target_meters: f64,
    #[serde(default)]
    pub waypoints: Vec<Coordinates>,
    #[serde(default = "default_avoid_spurs")]
    pub avoid_spurs: bool,
    #[serde(default)]
    pub mode: TransportMode,
}

fn default_avoid_spurs() -> bool {
    true
}

impl LoopRouteRequest {
    pub fn validate(&self) -> Result<(), String> {
        validate_start_and_target(&self.start_point, self.target_meters)?;
        if self.waypoints.iter().any(|w| !w.is_finite()) {
            return Err("waypoints must have finite coordinates".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RerouteRequest {
    pub start_point: Coordinates,
    pub target_meters: f64,
    #[serde(default)]
    pub waypoints: Vec<Coordinates>,
    pub blocked_segments: Vec<BlockedSegment>,
    /// Shape of the previously generated route, reused to keep the new
    /// route recognizable
    pub prior_path: Vec<Coordinates>,
    #[serde(default)]
    pub mode: TransportMode,
}

impl RerouteRequest {
    pub fn validate(&self) -> Result<(), String> {
        validate_start_and_target(&self.start_point, self.target_meters)?;
        if self.waypoints.iter().any(|w| !w.is_finite()) {
            return Err("waypoints must have finite coordinates".to_string());
        }
        if self.blocked_segments.is_empty() {
            return Err("at least one blocked segment is required".to_string());
        }
        Ok(())
    }
}

fn validate_start_and_target(start: &Coordinates, target_meters: f64) -> Result<(), String> {
    if !start.is_finite() {
        return Err("start_point must have finite coordinates".to_string());
    }
    if !(-90.0..=90.0).contains(&start.lat) || !(-180.0..=180.0).contains(&start.lng) {
        return Err("start_point is outside valid coordinate ranges".to_string());
    }
    if !target_meters.is_finite() || !(500.0..=50_000.0).contains(&target_meters) {
        return Err("target_meters must be between 500 and 50000".to_string());
    }
    Ok(())
}
