//! Health, liveness, and readiness endpoint handlers.
//!
//! These handlers expose server health information for orchestrators
//! (Kubernetes, load balancers) and operational monitoring.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::json;

use super::AppState;
use crate::network::HealthState;

/// Returns detailed health information as JSON.
///
/// Always returns 200 -- the `state` field in the response body indicates
/// whether the server is actually healthy. This lets monitoring tools
/// distinguish between "server is up but draining" vs "server is down".
pub async fn health_handler(
    State(state): State<AppState>,
) -> Json<serde_json::Value> {
    let health = state.shutdown.health_state();
    let connections = state.registry.count();
    let in_flight = state.shutdown.in_flight_count();
    let uptime_secs = state.start_time.elapsed().as_secs();

    Json(json!({
        "state": health.as_str(),
        "connections": connections,
        "in_flight": in_flight,
        "uptime_secs": uptime_secs,
    }))
}

/// Kubernetes liveness probe -- always returns 200 OK.
///
/// The liveness probe only checks whether the process is running and
/// responsive. It intentionally does not check downstream dependencies
/// or health state, because a failed liveness probe triggers a pod restart.
pub async fn liveness_handler() -> StatusCode {
    StatusCode::OK
}

/// Kubernetes readiness probe -- returns 200 when ready, 503 otherwise.
///
/// Returns 503 during startup (before `set_ready()` is called), during
/// graceful shutdown (Draining state), and after stop. This removes the
/// pod from the Service's endpoint list so no new traffic is routed to it.
pub async fn readiness_handler(State(state): State<AppState>) -> StatusCode {
    if state.shutdown.health_state() == HealthState::Ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
