use crate::constants::*;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub ors_api_key: String,
    pub ors_base_url: Option<String>,
    pub engine: EngineConfig,
}

/// Tunables for the candidate search and route composition engine.
/// Read once at startup and injected; core logic never consults the
/// environment directly.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Attempt budget for a plain round-trip search
    pub round_trip_attempts: usize,

    /// Attempt budget for a filler loop covering a length shortfall
    pub filler_attempts: usize,

    /// Attempt budget for a filler loop patching a waypoint route; higher
    /// because length accuracy matters more once a user has pinned waypoints
    pub filler_attempts_waypoint: usize,

    /// Relative distance error at or under which a round-trip candidate is
    /// accepted immediately without spending remaining attempts
    pub accept_distance_error: f64,

    /// Half-width (meters) of the rectangle buffered around each blocked
    /// road segment
    pub avoid_half_width_meters: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            round_trip_attempts: 10,
            filler_attempts: 8,
            filler_attempts_waypoint: 14,
            accept_distance_error: 0.03,
            avoid_half_width_meters: 18.0,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Result<Self, String> {
        let defaults = Self::default();

        Ok(Self {
            round_trip_attempts: env::var("ENGINE_ROUND_TRIP_ATTEMPTS")
                .unwrap_or_else(|_| defaults.round_trip_attempts.to_string())
                .parse()
                .map_err(|_| "Invalid ENGINE_ROUND_TRIP_ATTEMPTS")?,

            filler_attempts: env::var("ENGINE_FILLER_ATTEMPTS")
                .unwrap_or_else(|_| defaults.filler_attempts.to_string())
                .parse()
                .map_err(|_| "Invalid ENGINE_FILLER_ATTEMPTS")?,

            filler_attempts_waypoint: env::var("ENGINE_FILLER_ATTEMPTS_WAYPOINT")
                .unwrap_or_else(|_| defaults.filler_attempts_waypoint.to_string())
                .parse()
                .map_err(|_| "Invalid ENGINE_FILLER_ATTEMPTS_WAYPOINT")?,

            accept_distance_error: env::var("ENGINE_ACCEPT_DISTANCE_ERROR")
                .unwrap_or_else(|_| defaults.accept_distance_error.to_string())
                .parse()
                .map_err(|_| "Invalid ENGINE_ACCEPT_DISTANCE_ERROR")?,

            avoid_half_width_meters: env::var("ENGINE_AVOID_HALF_WIDTH_M")
                .unwrap_or_else(|_| defaults.avoid_half_width_meters.to_string())
                .parse()
                .map_err(|_| "Invalid ENGINE_AVOID_HALF_WIDTH_M")?,
        })
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        dotenv::dotenv().ok();

        let engine = EngineConfig::from_env()?;
        if engine.round_trip_attempts == 0 {
            return Err("ENGINE_ROUND_TRIP_ATTEMPTS must be at least 1".to_string());
        }
        if engine.avoid_half_width_meters <= 0.0 || engine.avoid_half_width_meters > 500.0 {
            return Err("ENGINE_AVOID_HALF_WIDTH_M must be between 0 and 500 meters".to_string());
        }

        Ok(Config {
            host: env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| DEFAULT_PORT.to_string())
                .parse()
                .map_err(|_| "Invalid PORT")?,
            ors_api_key: env::var("ORS_API_KEY").map_err(|_| "ORS_API_KEY must be set")?,
            ors_base_url: env::var("ORS_BASE_URL").ok(),
            engine,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
