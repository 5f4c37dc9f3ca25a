pub mod avoidance;
pub mod metrics;
mod search;

use crate::config::EngineConfig;
use crate::constants::{
    ANCHOR_MIN_DISTANCE_METERS, DETOUR_OFFSET_FRACTION, DETOUR_OFFSET_MAX_METERS,
    DETOUR_OFFSET_MIN_METERS, FILLER_MIN_LENGTH_METERS, REROUTE_SHAPE_SAMPLES,
    SPLICE_JOIN_EPSILON_DEG,
};
use crate::error::{AppError, Result};
use crate::models::route::{LoopRouteRequest, RerouteRequest};
use crate::models::{Coordinates, Route, RoutePlan};
use crate::services::ors::RoutingProvider;

use avoidance::build_avoidance_area;
use metrics::{overlap_ratio_default, path_length_meters};
use rand::RngExt;
use search::CandidateSearch;
use std::sync::Arc;

/// Composes finished loop routes out of provider candidates: a plain
/// round-trip search when the caller gives only a start point, a directions
/// route through (possibly synthesized) waypoints topped up with a filler
/// loop when short, and a constrained reroute around blocked segments.
pub struct RouteEngine {
    provider: Arc<dyn RoutingProvider>,
    search: CandidateSearch,
    config: EngineConfig,
}

impl RouteEngine {
    pub fn new(provider: Arc<dyn RoutingProvider>, config: EngineConfig) -> Self {
        let search = CandidateSearch::new(provider.clone(), config.clone());
        RouteEngine {
            provider,
            search,
            config,
        }
    }

    /// Generate a loop route starting and ending at the request's start
    /// point, passing near its waypoints in order.
    pub async fn generate_loop(&self, request: &LoopRouteRequest) -> Result<RoutePlan> {
        request.validate().map_err(AppError::InvalidRequest)?;

        tracing::info!(
            lat = request.start_point.lat,
            lng = request.start_point.lng,
            target_m = request.target_meters,
            waypoints = request.waypoints.len(),
            "Loop request: ({:.4}, {:.4}), {:.0}m, {} waypoints",
            request.start_point.lat,
            request.start_point.lng,
            request.target_meters,
            request.waypoints.len()
        );

        if request.waypoints.is_empty() {
            return self.round_trip_route(request).await;
        }

        let waypoints = if request.waypoints.len() == 1 {
            // A single waypoint would produce a straight there-and-back
            // route. Synthesize a second waypoint off to one side so the
            // return leg travels a different corridor.
            let side = if rand::rng().random_bool(0.5) { 1.0 } else { -1.0 };
            let detour = synthesize_detour_waypoint(
                &request.start_point,
                &request.waypoints[0],
                request.target_meters,
                side,
            );
            tracing::debug!(
                detour_lat = detour.lat,
                detour_lng = detour.lng,
                "Synthesized detour waypoint at ({:.5}, {:.5})",
                detour.lat,
                detour.lng
            );
            vec![request.waypoints[0], detour]
        } else {
            request.waypoints.clone()
        };

        self.waypoint_route(request, &waypoints).await
    }

    /// Rebuild a previously generated route so it avoids the caller's
    /// blocked road segments, reusing the prior route's general shape.
    pub async fn reroute(&self, request: &RerouteRequest) -> Result<RoutePlan> {
        request.validate().map_err(AppError::InvalidRequest)?;

        let area = build_avoidance_area(
            &request.blocked_segments,
            self.config.avoid_half_width_meters,
        )
        .ok_or_else(|| {
            AppError::NoAvoidablePath(
                "none of the blocked segments could be converted into avoidance zones".to_string(),
            )
        })?;

        let shape = sample_shape_points(&request.prior_path, REROUTE_SHAPE_SAMPLES);
        tracing::info!(
            polygons = area.polygon_count(),
            shape_points = shape.len(),
            waypoints = request.waypoints.len(),
            "Reroute: {} avoidance polygons, {} shape points retained",
            area.polygon_count(),
            shape.len()
        );

        let mut coords = Vec::with_capacity(shape.len() + request.waypoints.len() + 2);
        coords.push(request.start_point);
        coords.extend(shape);
        coords.extend_from_slice(&request.waypoints);
        coords.push(request.start_point);

        let directions = self
            .provider
            .directions(&coords, &request.mode, Some(&area))
            .await?;
        let (path, length) = usable_path(directions.path, directions.distance_meters)?;

        let overlap = overlap_ratio_default(&path);
        let route = Route::new(path, length, request.target_meters, overlap);
        Ok(RoutePlan { route, attempts: 1 })
    }

    async fn round_trip_route(&self, request: &LoopRouteRequest) -> Result<RoutePlan> {
        let outcome = self
            .search
            .round_trip(
                request.start_point,
                request.target_meters,
                &request.mode,
                request.avoid_spurs,
            )
            .await;

        let Some(candidate) = outcome.best else {
            return Err(AppError::NoRouteFound(format!(
                "no valid loop candidate within {} attempts",
                outcome.attempts
            )));
        };

        let overlap = overlap_ratio_default(&candidate.path);
        let route = Route::new(
            candidate.path,
            candidate.distance_meters,
            request.target_meters,
            overlap,
        );
        Ok(RoutePlan {
            route,
            attempts: outcome.attempts,
        })
    }

    async fn waypoint_route(
        &self,
        request: &LoopRouteRequest,
        waypoints: &[Coordinates],
    ) -> Result<RoutePlan> {
        let start = request.start_point;
        let target = request.target_meters;

        let mut coords = Vec::with_capacity(waypoints.len() + 2);
        coords.push(start);
        coords.extend_from_slice(waypoints);
        coords.push(start);

        let directions = self.provider.directions(&coords, &request.mode, None).await?;
        let (mut path, mut length) = usable_path(directions.path, directions.distance_meters)?;
        let mut attempts = 1u32;

        if length < target {
            let shortfall = (target - length).max(FILLER_MIN_LENGTH_METERS);
            let (anchor_idx, anchor) = choose_filler_anchor(&path, &start, waypoints);
            tracing::info!(
                length_m = %format!("{:.0}", length),
                shortfall_m = %format!("{:.0}", shortfall),
                "Waypoint route {:.0}m short of {:.0}m target, searching {:.0}m filler loop",
                target - length,
                target,
                shortfall
            );

            let outcome = self
                .search
                .filler_loop(anchor, shortfall, &request.mode, request.avoid_spurs, true)
                .await;
            attempts += outcome.attempts;

            if let Some(filler) = outcome.best {
                splice_filler(&mut path, anchor_idx, filler.path);
                length = path_length_meters(&path).unwrap_or(length);
            } else {
                tracing::warn!(
                    "No filler loop found, returning the route {:.0}m short",
                    target - length
                );
            }
        }
        // A route that overshoots the target is returned as-is; there is no
        // trimming step.

        let overlap = overlap_ratio_default(&path);
        let route = Route::new(path, length, target, overlap);
        Ok(RoutePlan { route, attempts })
    }
}

/// Reject degenerate provider payloads and resolve the route length,
/// preferring the provider's reported distance over our own summation.
fn usable_path(
    path: Vec<Coordinates>,
    reported_distance: Option<f64>,
) -> Result<(Vec<Coordinates>, f64)> {
    if path.len() < 2 {
        return Err(AppError::NoRouteFound(
            "provider returned a degenerate path".to_string(),
        ));
    }
    let length = reported_distance
        .filter(|d| d.is_finite() && *d > 0.0)
        .or_else(|| path_length_meters(&path))
        .filter(|d| d.is_finite() && *d > 0.0)
        .ok_or_else(|| {
            AppError::NoRouteFound("provider returned no usable distance".to_string())
        })?;
    Ok((path, length))
}

/// Perpendicular offset waypoint for single-waypoint requests, anchored at
/// the midpoint of the start-to-waypoint leg. `side` is +1 or -1.
fn synthesize_detour_waypoint(
    start: &Coordinates,
    waypoint: &Coordinates,
    target_meters: f64,
    side: f64,
) -> Coordinates {
    let (dx, dy) = start.planar_vector_to(waypoint);
    let length = (dx * dx + dy * dy).sqrt();
    // A waypoint on top of the start has no direction; pick east
    let (ux, uy) = if length < 1.0 {
        (1.0, 0.0)
    } else {
        (dx / length, dy / length)
    };
    let (nx, ny) = (-uy, ux);

    let offset = (target_meters * DETOUR_OFFSET_FRACTION)
        .clamp(DETOUR_OFFSET_MIN_METERS, DETOUR_OFFSET_MAX_METERS);

    let midpoint = start.local_offset(dx / 2.0, dy / 2.0);
    midpoint.local_offset(nx * offset * side, ny * offset * side)
}

/// Where to hang a filler loop: the path point farthest from the start when
/// it is far enough out to explore new ground, else the first waypoint, else
/// the start itself. Returns the splice index and the anchor coordinate.
fn choose_filler_anchor(
    path: &[Coordinates],
    start: &Coordinates,
    waypoints: &[Coordinates],
) -> (usize, Coordinates) {
    let mut far_idx = 0;
    let mut far_dist = 0.0;
    for (i, p) in path.iter().enumerate() {
        let d = start.distance_meters(p);
        if d > far_dist {
            far_dist = d;
            far_idx = i;
        }
    }
    if far_dist >= ANCHOR_MIN_DISTANCE_METERS {
        return (far_idx, path[far_idx]);
    }

    if let Some(wp) = waypoints.first() {
        let idx = path
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                wp.distance_meters(a)
                    .partial_cmp(&wp.distance_meters(b))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(i, _)| i)
            .unwrap_or(0);
        return (idx, *wp);
    }

    (0, *start)
}

/// Insert a filler loop into the path immediately after the anchor index.
/// When the filler starts exactly at the join point the duplicate is
/// dropped; otherwise the sequences are concatenated directly.
fn splice_filler(path: &mut Vec<Coordinates>, anchor_idx: usize, filler: Vec<Coordinates>) {
    if filler.is_empty() || anchor_idx >= path.len() {
        return;
    }
    let join = path[anchor_idx];
    let skip_first = filler.first().is_some_and(|f| {
        (f.lat - join.lat).abs() < SPLICE_JOIN_EPSILON_DEG
            && (f.lng - join.lng).abs() < SPLICE_JOIN_EPSILON_DEG
    });
    let tail: Vec<Coordinates> = if skip_first {
        filler[1..].to_vec()
    } else {
        filler
    };
    let insert_at = anchor_idx + 1;
    path.splice(insert_at..insert_at, tail);
}

/// Evenly-strided sample of a prior route's shape, with the first and last
/// samples dropped: they sit near the loop's start and end and would bias
/// the new request.
fn sample_shape_points(path: &[Coordinates], max_samples: usize) -> Vec<Coordinates> {
    if path.len() < 3 || max_samples < 3 {
        return Vec::new();
    }
    let stride = ((path.len() + max_samples - 1) / max_samples).max(1);
    let mut sampled: Vec<Coordinates> = path.iter().step_by(stride).copied().collect();
    sampled.truncate(max_samples);
    if sampled.len() < 3 {
        return Vec::new();
    }
    sampled.remove(0);
    sampled.pop();
    sampled
}
