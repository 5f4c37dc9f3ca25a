pub mod ors;
pub mod route_engine;
