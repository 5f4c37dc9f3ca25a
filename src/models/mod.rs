pub mod coordinates;
pub mod route;

pub use coordinates::Coordinates;
pub use route::{BlockedSegment, Route, RoutePlan, TransportMode};
