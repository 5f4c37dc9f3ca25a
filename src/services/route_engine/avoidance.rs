use crate::constants::BLOCKED_SEGMENT_MIN_METERS;
use crate::models::{BlockedSegment, Coordinates};
use geojson::{Geometry, Value};

/// A set of buffered rectangles around blocked road segments, handed to the
/// routing provider as no-go zones. Built fresh per reroute request.
#[derive(Debug, Clone)]
pub struct AvoidanceArea {
    polygons: Vec<Vec<Coordinates>>,
}

impl AvoidanceArea {
    pub fn polygon_count(&self) -> usize {
        self.polygons.len()
    }

    pub fn polygons(&self) -> &[Vec<Coordinates>] {
        &self.polygons
    }

    /// GeoJSON MultiPolygon in the provider's [lng, lat] ring format.
    pub fn to_geojson(&self) -> Geometry {
        let rings: Vec<Vec<Vec<Vec<f64>>>> = self
            .polygons
            .iter()
            .map(|ring| vec![ring.iter().map(|c| vec![c.lng, c.lat]).collect()])
            .collect();
        Geometry::new(Value::MultiPolygon(rings))
    }
}

/// Convert blocked segments into an avoidance area. Segments with non-finite
/// endpoints or a planar length under 2 m are dropped silently; returns None
/// when nothing survives so the caller can fail with a clear error instead of
/// sending an empty constraint.
pub fn build_avoidance_area(
    segments: &[BlockedSegment],
    half_width_meters: f64,
) -> Option<AvoidanceArea> {
    let polygons: Vec<Vec<Coordinates>> = segments
        .iter()
        .filter_map(|s| buffer_segment(s, half_width_meters))
        .collect();

    if polygons.is_empty() {
        return None;
    }
    Some(AvoidanceArea { polygons })
}

/// Buffer one segment into a closed rectangle: both endpoints offset by
/// ±half_width along the segment's unit normal, first vertex repeated to
/// close the ring.
fn buffer_segment(segment: &BlockedSegment, half_width_meters: f64) -> Option<Vec<Coordinates>> {
    if !segment.from.is_finite() || !segment.to.is_finite() {
        return None;
    }

    let (dx, dy) = segment.from.planar_vector_to(&segment.to);
    let length = (dx * dx + dy * dy).sqrt();
    if length < BLOCKED_SEGMENT_MIN_METERS {
        return None;
    }

    let (nx, ny) = (-dy / length, dx / length);
    let h = half_width_meters;
    let a = segment.from;
    let b = segment.to;

    Some(vec![
        a.local_offset(nx * h, ny * h),
        a.local_offset(-nx * h, -ny * h),
        b.local_offset(-nx * h, -ny * h),
        b.local_offset(nx * h, ny * h),
        a.local_offset(nx * h, ny * h),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_coord(lat: f64, lng: f64) -> Coordinates {
        Coordinates::new(lat, lng).unwrap()
    }

    fn segment_of_length(start: Coordinates, meters: f64) -> BlockedSegment {
        BlockedSegment {
            from: start,
            to: start.local_offset(meters, 0.0),
        }
    }

    /// Shoelace area of a closed ring, in square meters, via planar
    /// projection around the first vertex
    fn ring_area_m2(ring: &[Coordinates]) -> f64 {
        let origin = ring[0];
        let pts: Vec<(f64, f64)> = ring.iter().map(|p| origin.planar_vector_to(p)).collect();
        let mut area = 0.0;
        for w in pts.windows(2) {
            area += w[0].0 * w[1].1 - w[1].0 * w[0].1;
        }
        (area / 2.0).abs()
    }

    #[test]
    fn test_single_segment_yields_closed_rectangle() {
        let seg = segment_of_length(make_coord(52.0, 4.0), 100.0);
        let area = build_avoidance_area(&[seg], 18.0).unwrap();

        assert_eq!(area.polygon_count(), 1);
        let ring = &area.polygons()[0];
        assert_eq!(ring.len(), 5);
        assert_eq!(ring[0], ring[4]);

        // 100 m x 36 m rectangle
        let m2 = ring_area_m2(ring);
        assert!(
            (m2 - 3600.0).abs() < 40.0,
            "expected ~3600 m^2, got {:.1}",
            m2
        );
    }

    #[test]
    fn test_degenerate_segment_produces_no_polygon() {
        let p = make_coord(52.0, 4.0);
        let short = BlockedSegment {
            from: p,
            to: p.local_offset(1.0, 0.5),
        };
        assert!(build_avoidance_area(&[short], 18.0).is_none());
    }

    #[test]
    fn test_non_finite_segment_is_dropped() {
        let bad = BlockedSegment {
            from: Coordinates {
                lat: f64::NAN,
                lng: 4.0,
            },
            to: make_coord(52.0, 4.001),
        };
        assert!(build_avoidance_area(&[bad], 18.0).is_none());
    }

    #[test]
    fn test_invalid_segments_dropped_but_valid_kept() {
        let p = make_coord(52.0, 4.0);
        let good = segment_of_length(p, 50.0);
        let degenerate = BlockedSegment { from: p, to: p };
        let area = build_avoidance_area(&[degenerate, good], 18.0).unwrap();
        assert_eq!(area.polygon_count(), 1);
    }

    #[test]
    fn test_empty_input_yields_none() {
        assert!(build_avoidance_area(&[], 18.0).is_none());
    }

    #[test]
    fn test_geojson_multipolygon_shape() {
        let seg = segment_of_length(make_coord(52.0, 4.0), 100.0);
        let area = build_avoidance_area(&[seg], 18.0).unwrap();

        let geometry = area.to_geojson();
        match geometry.value {
            Value::MultiPolygon(ref polys) => {
                assert_eq!(polys.len(), 1);
                assert_eq!(polys[0].len(), 1); // one outer ring, no holes
                assert_eq!(polys[0][0].len(), 5);
                // [lng, lat] ordering
                assert!((polys[0][0][0][1] - 52.0).abs() < 0.01);
            }
            ref other => panic!("expected MultiPolygon, got {:?}", other),
        }
    }
}
