use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health — liveness plus the advisory health score.
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let snapshot = state.metrics.snapshot();
    Json(json!({
        "status": "OPERATIONAL",
        "engine": "TitanIntraServiceAuth",
        "health_score": snapshot.health_score,
    }))
}
