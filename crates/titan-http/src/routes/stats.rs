use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use titan_core::constants::ENGINE_NAME;

use crate::state::AppState;

/// GET /v6/engine/stats — full telemetry snapshot: traffic, latency,
/// cryptography, ZKP pipeline and CA counters.
pub async fn engine_stats(State(state): State<AppState>) -> Json<Value> {
    let s = state.metrics.snapshot();
    let zkp = state.zkp_metrics.snapshot();

    let uptime = s.uptime_seconds;
    let tps = if uptime > 0.0 {
        s.http_req_total as f64 / uptime
    } else {
        0.0
    };
    let total = s.http_req_total.max(1);
    let success_rate = s.http_req_2xx as f64 / total as f64 * 100.0;

    let store = state.ca.store();
    let ca_status = match (store.count_identities(false), store.count_revoked()) {
        (Ok(active), Ok(revoked)) => json!({
            "ca_identities_total": active,
            "ca_identities_revoked": revoked,
            "ca_status": "ok",
        }),
        _ => json!({
            "ca_identities_total": 0,
            "ca_identities_revoked": 0,
            "ca_status": "error",
        }),
    };

    Json(json!({
        "engine_metadata": {
            "name": ENGINE_NAME,
            "version": s.engine_version,
            "status": s.engine_status,
            "uptime_seconds": round2(uptime),
            "architecture": std::env::consts::ARCH,
            "active_workers": s.active_workers,
        },
        "traffic_telemetry": {
            "total_requests": s.http_req_total,
            "tps_current": round2(tps),
            "active_connections": s.http_active_connections,
            "success_rate": format!("{success_rate:.2}%"),
            "dropped_requests": s.q_dropped_reqs,
            "circuit_breaker": s.circuit_breaker,
        },
        "latency_analytics_ms": {
            "average": round4(s.lat_avg),
            "peak": round4(s.lat_max),
            "minimum": round4(s.lat_min),
            "cumulative_processing_time": round2(s.lat_sum / 1000.0),
        },
        "cryptography_performance": {
            "algorithm": state.signing_algorithm,
            "tokens_minted": s.sec_tokens_minted,
            "signatures_generated": s.sec_signatures,
            "sec_blocked_attempts": s.sec_blocked_attempts,
            "last_issued_jti": s.sec_last_jti,
            "last_authenticated_user": s.sec_last_user,
        },
        "zkp_performance": zkp,
        "ca_status": ca_status,
    }))
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}
