//! Stable application-wide constants.
//!
//! Values here are structural invariants, algorithm coefficients, and default
//! fallbacks for env-var-based configuration. The geometry heuristics are
//! empirically tuned against real provider output; changing one changes which
//! candidate routes get accepted. For knobs that benefit from runtime
//! experimentation, see [`EngineConfig`](crate::config::EngineConfig) instead.

// --- Server defaults (used when HOST / PORT env vars are absent) ---

/// Default bind address for the HTTP server.
pub const DEFAULT_HOST: &str = "0.0.0.0";
/// Default port for the HTTP server.
pub const DEFAULT_PORT: &str = "3000";

// --- Overlap estimation ---

/// Grid cell edge (meters) used to bucket segment midpoints when estimating
/// how much of a route retraces earlier ground.
pub const OVERLAP_GRID_METERS: f64 = 20.0;
/// A segment only counts as overlapping when its grid cell was first touched
/// at least this many segment indices earlier. Keeps adjacent sections that
/// share a cell near a turn from being flagged.
pub const OVERLAP_LOCALITY_SEGMENTS: usize = 12;

// --- Out-and-back spur detection ---

/// A path returning within this many meters of an earlier point counts as
/// having come "back".
pub const SPUR_RETURN_RADIUS_METERS: f64 = 12.0;
/// Minimum forward steps before a return can count as a spur.
pub const SPUR_MIN_STEPS: usize = 18;
/// Maximum forward steps examined from each start index.
pub const SPUR_MAX_STEPS: usize = 90;
/// Paths with fewer points than this are treated as spur-free; the walker
/// has too little to work with below it.
pub const SPUR_MIN_PATH_POINTS: usize = 40;
/// Default detour budget (meters) for the standalone spur analyzer.
pub const SPUR_MAX_DETOUR_METERS: f64 = 140.0;
/// Detour budget (meters) used when rejecting search candidates. Slightly
/// looser than the analyzer default so borderline provider loops still get
/// filtered.
pub const SEARCH_SPUR_MAX_DETOUR_METERS: f64 = 160.0;

// --- Candidate search ---

/// Round-trip point counts alternated across attempts (even index, odd
/// index) to diversify candidate loop shapes.
pub const ROUND_TRIP_POINTS_EVEN: u32 = 6;
pub const ROUND_TRIP_POINTS_ODD: u32 = 8;
/// Weight of the relative distance error in the filler-loop score. Overlap
/// carries weight 1.0; a filler loop exists to add distinct ground first and
/// hit the length second.
pub const FILLER_DISTANCE_ERROR_WEIGHT: f64 = 0.2;

// --- Waypoint route composition ---

/// Shortest filler loop worth requesting (meters); providers produce
/// degenerate loops below this.
pub const FILLER_MIN_LENGTH_METERS: f64 = 1600.0;
/// The farthest-from-start path point only anchors a filler loop when it is
/// at least this far out (meters); closer anchors fall back to the first
/// waypoint or the start.
pub const ANCHOR_MIN_DISTANCE_METERS: f64 = 600.0;
/// Detour waypoint offset: fraction of the target length, clamped below.
pub const DETOUR_OFFSET_FRACTION: f64 = 0.08;
pub const DETOUR_OFFSET_MIN_METERS: f64 = 250.0;
pub const DETOUR_OFFSET_MAX_METERS: f64 = 900.0;
/// Two path points within this many degrees on both axes are the same join
/// point when splicing a filler loop.
pub const SPLICE_JOIN_EPSILON_DEG: f64 = 1e-6;

// --- Reroute shape sampling ---

/// Number of evenly-strided points sampled from a prior route's path before
/// the first and last samples are dropped.
pub const REROUTE_SHAPE_SAMPLES: usize = 7;

// --- Avoidance polygons ---

/// Blocked segments shorter than this (planar meters) are degenerate and
/// produce no polygon.
pub const BLOCKED_SEGMENT_MIN_METERS: f64 = 2.0;
