use axum::Json;
use serde_json::{json, Value};

/// GET /debug/health - liveness check
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "loopsmith",
    }))
}
