use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::models::application::ApplicationStatus;
use crate::AppState;

/// Liveness plus the pipeline rules this instance enforces.
#[axum::debug_handler]
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let pipeline = &state.pipeline;
    let terminal: Vec<&str> = ApplicationStatus::ALL
        .iter()
        .filter(|status| pipeline.transitions.is_terminal(**status))
        .map(|status| status.as_str())
        .collect();
    let body = json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "pipeline": {
            "terminal_statuses": terminal,
            "single_active_interview": pipeline.single_active_interview,
            "reject_overlapping_interviews": pipeline.reject_overlapping_interviews,
            "require_favorable_feedback_for_offer": pipeline.require_favorable_feedback_for_offer,
        },
    });
    (StatusCode::OK, Json(body))
}
