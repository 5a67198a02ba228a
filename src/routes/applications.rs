use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::{
        application_dto::{SubmitApplicationPayload, TransitionPayload},
        interview_dto::ScheduleInterviewPayload,
    },
    error::Result,
    middleware::auth::Claims,
    routes::cascaded_response,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/applications",
    responses(
        (status = 201, description = "Application submitted"),
        (status = 400, description = "Invalid payload"),
        (status = 422, description = "Missing required field")
    )
)]
#[axum::debug_handler]
pub async fn submit_application(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<SubmitApplicationPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let actor_id = claims.actor_id()?;
    let application = state
        .lifecycle
        .submit(payload.into_new_application(actor_id), actor_id)
        .await?;
    Ok((StatusCode::CREATED, Json(application)))
}

#[utoipa::path(
    get,
    path = "/api/applications/{id}",
    params(
        ("id" = Uuid, Path, description = "Application ID")
    ),
    responses(
        (status = 200, description = "Application found"),
        (status = 404, description = "Application not found")
    )
)]
#[axum::debug_handler]
pub async fn get_application(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let application = state.lifecycle.get(id).await?;
    Ok(Json(application))
}

#[utoipa::path(
    post,
    path = "/api/applications/{id}/transition",
    params(
        ("id" = Uuid, Path, description = "Application ID")
    ),
    responses(
        (status = 200, description = "Application moved or already at the target"),
        (status = 403, description = "Actor may not move this application"),
        (status = 409, description = "Transition not allowed or lost a race")
    )
)]
#[axum::debug_handler]
pub async fn transition_application(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TransitionPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let actor_id = claims.actor_id()?;
    let application = state
        .lifecycle
        .transition(id, payload.status, actor_id, payload.notes)
        .await?;
    Ok(Json(application))
}

#[utoipa::path(
    post,
    path = "/api/applications/{id}/withdraw",
    params(
        ("id" = Uuid, Path, description = "Application ID")
    ),
    responses(
        (status = 200, description = "Withdrawn, active interviews cancelled"),
        (status = 207, description = "Withdrawn, some interviews could not be cancelled"),
        (status = 409, description = "Application can no longer be withdrawn")
    )
)]
#[axum::debug_handler]
pub async fn withdraw_application(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let actor_id = claims.actor_id()?;
    let outcome = state.scheduler.withdraw_application(id, actor_id).await?;
    Ok(cascaded_response(outcome, StatusCode::OK))
}

#[axum::debug_handler]
pub async fn reconcile_application(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let actor_id = claims.actor_id()?;
    let application = state.scheduler.reconcile(id, actor_id).await.map_err(|e| {
        tracing::error!(application_id = %id, error = %e, "reconcile failed");
        e
    })?;
    Ok(Json(application))
}

#[utoipa::path(
    get,
    path = "/api/applications/{id}/history",
    params(
        ("id" = Uuid, Path, description = "Application ID")
    ),
    responses(
        (status = 200, description = "Status changes, newest first"),
        (status = 404, description = "Application not found")
    )
)]
#[axum::debug_handler]
pub async fn application_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let history = state.ledger.application_history(id).await?;
    Ok(Json(history))
}

#[axum::debug_handler]
pub async fn list_application_interviews(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let interviews = state.scheduler.interviews_for_application(id).await?;
    Ok(Json(interviews))
}

#[utoipa::path(
    post,
    path = "/api/applications/{id}/interviews",
    params(
        ("id" = Uuid, Path, description = "Application ID")
    ),
    responses(
        (status = 201, description = "Interview scheduled"),
        (status = 207, description = "Interview scheduled, application not advanced"),
        (status = 409, description = "Application is closed"),
        (status = 422, description = "Invalid time, duration or venue")
    )
)]
#[axum::debug_handler]
pub async fn schedule_interview(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ScheduleInterviewPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let actor_id = claims.actor_id()?;
    let outcome = state
        .scheduler
        .schedule(payload.into_request(id), actor_id)
        .await?;
    Ok(cascaded_response(outcome, StatusCode::CREATED))
}

#[axum::debug_handler]
pub async fn application_feedback_rollup(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let rollup = state.feedback.application_rollup(id).await?;
    Ok(Json(rollup))
}
