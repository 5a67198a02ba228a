use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, patch, post},
    Router,
};
use serde::Serialize;

use crate::models::outcome::Cascaded;
use crate::AppState;

pub mod applications;
pub mod feedback;
pub mod health;
pub mod interviews;

/// Every pipeline route. Everything except `/health` sits behind bearer auth.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/api/applications", post(applications::submit_application))
        .route("/api/applications/:id", get(applications::get_application))
        .route(
            "/api/applications/:id/transition",
            post(applications::transition_application),
        )
        .route(
            "/api/applications/:id/withdraw",
            post(applications::withdraw_application),
        )
        .route(
            "/api/applications/:id/reconcile",
            post(applications::reconcile_application),
        )
        .route(
            "/api/applications/:id/history",
            get(applications::application_history),
        )
        .route(
            "/api/applications/:id/interviews",
            get(applications::list_application_interviews).post(applications::schedule_interview),
        )
        .route(
            "/api/applications/:id/feedback/rollup",
            get(applications::application_feedback_rollup),
        )
        .route("/api/interviews/:id", get(interviews::get_interview))
        .route("/api/interviews/:id/history", get(interviews::interview_history))
        .route("/api/interviews/:id/reschedule", post(interviews::reschedule_interview))
        .route("/api/interviews/:id/cancel", post(interviews::cancel_interview))
        .route("/api/interviews/:id/confirm", post(interviews::confirm_interview))
        .route("/api/interviews/:id/start", post(interviews::start_interview))
        .route("/api/interviews/:id/complete", post(interviews::complete_interview))
        .route("/api/interviews/:id/no-show", post(interviews::mark_no_show))
        .route("/api/interviews/:id/respond", post(interviews::respond_to_invitation))
        .route(
            "/api/interviews/:id/feedback",
            get(feedback::list_feedback).post(feedback::submit_feedback),
        )
        .route(
            "/api/interviews/:id/feedback/candidate",
            get(feedback::candidate_feedback),
        )
        .route("/api/interviews/:id/feedback/rollup", get(feedback::feedback_rollup))
        .route("/api/feedback/:id", patch(feedback::update_feedback))
        .route("/api/users/:id/interviews", get(interviews::user_interviews))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::auth::require_bearer_auth,
        ));

    Router::new()
        .route("/health", get(health::health))
        .merge(api)
        .with_state(state)
}

/// 207 when a follow-up write failed, `complete` otherwise.
pub(crate) fn cascaded_response<T: Serialize>(outcome: Cascaded<T>, complete: StatusCode) -> Response {
    if outcome.is_partial() {
        tracing::warn!(failed = outcome.failures().len(), "operation partially applied");
        (StatusCode::MULTI_STATUS, Json(outcome)).into_response()
    } else {
        (complete, Json(outcome)).into_response()
    }
}
