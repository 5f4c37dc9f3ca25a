use serde::{Deserialize, Serialize};

/// Meters per degree of latitude (and of longitude at the equator).
pub const METERS_PER_DEGREE: f64 = 111_320.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Result<Self, String> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(format!(
                "Invalid latitude: {} (must be between -90 and 90)",
                lat
            ));
        }
        if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
            return Err(format!(
                "Invalid longitude: {} (must be between -180 and 180)",
                lng
            ));
        }
        Ok(Coordinates { lat, lng })
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }

    /// Great-circle distance to `other` using the Haversine formula.
    /// Returns distance in meters.
    pub fn distance_meters(&self, other: &Coordinates) -> f64 {
        const EARTH_RADIUS_M: f64 = 6_371_000.0;

        let lat1_rad = self.lat.to_radians();
        let lat2_rad = other.lat.to_radians();
        let delta_lat = (other.lat - self.lat).to_radians();
        let delta_lng = (other.lng - self.lng).to_radians();

        let a = (delta_lat / 2.0).sin().powi(2)
            + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
        // Floating-point error can push `a` a hair past 1.0 for near-antipodal
        // points, which would make asin return NaN.
        let c = 2.0 * a.sqrt().clamp(0.0, 1.0).asin();

        EARTH_RADIUS_M * c
    }

    /// Degrees per meter of northward and eastward travel at this latitude.
    /// Flat-Earth approximation, only valid across a few kilometers.
    pub fn degrees_per_meter(&self) -> (f64, f64) {
        let lat_deg_per_m = 1.0 / METERS_PER_DEGREE;
        let lng_deg_per_m = 1.0 / (METERS_PER_DEGREE * self.lat.to_radians().cos());
        (lat_deg_per_m, lng_deg_per_m)
    }

    /// Apply a local planar offset (x = east, y = north, in meters) to this
    /// point. Uses the same flat-Earth approximation as `degrees_per_meter`.
    pub fn local_offset(&self, dx_east_m: f64, dy_north_m: f64) -> Coordinates {
        let (lat_deg_per_m, lng_deg_per_m) = self.degrees_per_meter();
        Coordinates {
            lat: self.lat + dy_north_m * lat_deg_per_m,
            lng: self.lng + dx_east_m * lng_deg_per_m,
        }
    }

    /// Project `other` into planar meters relative to this point
    /// (x = east, y = north).
    pub fn planar_vector_to(&self, other: &Coordinates) -> (f64, f64) {
        let (lat_deg_per_m, lng_deg_per_m) = self.degrees_per_meter();
        let dx = (other.lng - self.lng) / lng_deg_per_m;
        let dy = (other.lat - self.lat) / lat_deg_per_m;
        (dx, dy)
    }
}
