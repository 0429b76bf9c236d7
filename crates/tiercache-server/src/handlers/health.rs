use axum::{Json, extract::State};
use serde::Serialize;

use crate::state::AppState;
use crate::sync::ListenerState;

/// Degraded tiers are reported here; the instance still answers 200.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub listener: ListenerState,
    pub local_entries: u64,
}

impl HealthResponse {
    pub fn up(listener: ListenerState, local_entries: u64) -> Self {
        Self {
            status: "UP".to_string(),
            listener,
            local_entries,
        }
    }
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let local = state.coordinator().local();
    local.run_pending_tasks().await;

    Json(HealthResponse::up(
        state.listener().state(),
        local.entry_count(),
    ))
}
