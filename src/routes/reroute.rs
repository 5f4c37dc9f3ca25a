use crate::error::Result;
use crate::models::route::RerouteRequest;
use crate::models::RoutePlan;
use crate::AppState;
use axum::{extract::State, Json};
use std::sync::Arc;

/// POST /routes/reroute
/// Rebuild a prior route so it avoids the caller's blocked road segments
pub async fn create_reroute(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RerouteRequest>,
) -> Result<Json<RoutePlan>> {
    tracing::info!(
        blocked_segments = request.blocked_segments.len(),
        prior_points = request.prior_path.len(),
        "Reroute request: {} blocked segments, prior path of {} points",
        request.blocked_segments.len(),
        request.prior_path.len()
    );

    let plan = state.engine.reroute(&request).await?;
    Ok(Json(plan))
}
