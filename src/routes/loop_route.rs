use crate::error::Result;
use crate::models::route::LoopRouteRequest;
use crate::models::RoutePlan;
use crate::AppState;
use axum::{extract::State, Json};
use std::sync::Arc;

/// POST /routes/loop
/// Generate a loop route that starts and ends at the same point
pub async fn create_loop_route(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoopRouteRequest>,
) -> Result<Json<RoutePlan>> {
    tracing::info!(
        lat = request.start_point.lat,
        lng = request.start_point.lng,
        target_m = request.target_meters,
        waypoints = request.waypoints.len(),
        mode = %request.mode,
        "Loop route request: ({:.4}, {:.4}), {:.0}m, {} waypoints, mode={}",
        request.start_point.lat,
        request.start_point.lng,
        request.target_meters,
        request.waypoints.len(),
        request.mode
    );

    let plan = state.engine.generate_loop(&request).await?;
    Ok(Json(plan))
}
