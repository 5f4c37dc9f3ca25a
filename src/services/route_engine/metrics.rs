use crate::constants::{
    OVERLAP_GRID_METERS, OVERLAP_LOCALITY_SEGMENTS, SPUR_MAX_STEPS, SPUR_MIN_PATH_POINTS,
    SPUR_MIN_STEPS, SPUR_RETURN_RADIUS_METERS,
};
use crate::models::Coordinates;
use std::collections::HashMap;

/// Total path length in meters, or `None` for sequences too short to form a
/// path. A two-point sequence of identical points is a zero-length path,
/// which is distinct from "no path".
pub fn path_length_meters(path: &[Coordinates]) -> Option<f64> {
    if path.len() < 2 {
        return None;
    }
    Some(
        path.windows(2)
            .map(|w| w[0].distance_meters(&w[1]))
            .sum(),
    )
}

/// Estimate what fraction of the path's length retraces previously traveled
/// ground.
///
/// Each segment's midpoint is bucketed into a rectangular grid sized
/// `grid_meters` at the path's mean latitude. A segment counts as overlapping
/// when its cell was first touched by a segment at least
/// `OVERLAP_LOCALITY_SEGMENTS` indices earlier; nearer hits are adjacent
/// sections sharing a cell around a turn, not revisits. Degenerate paths
/// (fewer than 3 points, or zero length) are reported as fully overlapped.
pub fn overlap_ratio(path: &[Coordinates], grid_meters: f64) -> f64 {
    if path.len() < 3 {
        return 1.0;
    }

    let mean_lat = path.iter().map(|p| p.lat).sum::<f64>() / path.len() as f64;
    let reference = Coordinates {
        lat: mean_lat,
        lng: 0.0,
    };
    let (lat_deg_per_m, lng_deg_per_m) = reference.degrees_per_meter();
    let cell_lat_deg = grid_meters * lat_deg_per_m;
    let cell_lng_deg = grid_meters * lng_deg_per_m;

    // Grid cell -> index of the first segment whose midpoint landed there
    let mut first_touch: HashMap<(i64, i64), usize> = HashMap::new();
    let mut overlapping_length = 0.0;
    let mut total_length = 0.0;

    for (idx, w) in path.windows(2).enumerate() {
        let seg_len = w[0].distance_meters(&w[1]);
        total_length += seg_len;

        let mid_lat = (w[0].lat + w[1].lat) / 2.0;
        let mid_lng = (w[0].lng + w[1].lng) / 2.0;
        let key = (
            (mid_lat / cell_lat_deg).floor() as i64,
            (mid_lng / cell_lng_deg).floor() as i64,
        );

        match first_touch.get(&key) {
            Some(&first_idx) if idx - first_idx >= OVERLAP_LOCALITY_SEGMENTS => {
                overlapping_length += seg_len;
            }
            Some(_) => {}
            None => {
                first_touch.insert(key, idx);
            }
        }
    }

    if total_length <= 0.0 {
        return 1.0;
    }
    (overlapping_length / total_length).clamp(0.0, 1.0)
}

/// Overlap ratio at the default grid size.
pub fn overlap_ratio_default(path: &[Coordinates]) -> f64 {
    overlap_ratio(path, OVERLAP_GRID_METERS)
}

/// Detect a short out-and-back spur: a deviation that returns close to a
/// recently visited point after only a small detour.
///
/// From every start index the walker moves forward accumulating traveled
/// distance. A spur is found when the walker comes back within
/// `SPUR_RETURN_RADIUS_METERS` of the start index's point after at least
/// `SPUR_MIN_STEPS` steps. The start index is abandoned once the accumulated
/// detour exceeds `max_detour_meters` or `SPUR_MAX_STEPS` steps are spent.
/// Sequences under `SPUR_MIN_PATH_POINTS` points are spur-free by definition.
pub fn has_short_out_and_back_spur(path: &[Coordinates], max_detour_meters: f64) -> bool {
    if path.len() < SPUR_MIN_PATH_POINTS {
        return false;
    }

    for i in 0..path.len() {
        let origin = &path[i];
        let mut detour = 0.0;

        for step in 1..=SPUR_MAX_STEPS {
            let j = i + step;
            if j >= path.len() {
                break;
            }
            detour += path[j - 1].distance_meters(&path[j]);
            if detour > max_detour_meters {
                break;
            }
            if step >= SPUR_MIN_STEPS
                && path[j].distance_meters(origin) <= SPUR_RETURN_RADIUS_METERS
            {
                return true;
            }
        }
    }

    false
}
