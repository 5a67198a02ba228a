use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::interview_dto::{
        CancelInterviewPayload, CompleteInterviewPayload, RescheduleInterviewPayload,
        RespondPayload, UserInterviewsQuery,
    },
    error::Result,
    middleware::auth::Claims,
    routes::cascaded_response,
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/interviews/{id}",
    params(
        ("id" = Uuid, Path, description = "Interview ID")
    ),
    responses(
        (status = 200, description = "Interview with participants and history"),
        (status = 404, description = "Interview not found")
    )
)]
#[axum::debug_handler]
pub async fn get_interview(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let details = state.scheduler.interview_details(id).await?;
    Ok(Json(details))
}

#[axum::debug_handler]
pub async fn interview_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let history = state.ledger.interview_history(id).await?;
    Ok(Json(history))
}

#[utoipa::path(
    post,
    path = "/api/interviews/{id}/reschedule",
    params(
        ("id" = Uuid, Path, description = "Interview ID")
    ),
    responses(
        (status = 200, description = "Interview moved"),
        (status = 207, description = "Interview moved, some responses not reset"),
        (status = 409, description = "Interview can no longer be rescheduled"),
        (status = 422, description = "New time is not later than the current one")
    )
)]
#[axum::debug_handler]
pub async fn reschedule_interview(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RescheduleInterviewPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let actor_id = claims.actor_id()?;
    let outcome = state
        .scheduler
        .reschedule(id, payload.into(), actor_id)
        .await?;
    Ok(cascaded_response(outcome, StatusCode::OK))
}

#[utoipa::path(
    post,
    path = "/api/interviews/{id}/cancel",
    params(
        ("id" = Uuid, Path, description = "Interview ID")
    ),
    responses(
        (status = 200, description = "Interview cancelled"),
        (status = 409, description = "Interview already finished")
    )
)]
#[axum::debug_handler]
pub async fn cancel_interview(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    payload: Option<Json<CancelInterviewPayload>>,
) -> Result<impl IntoResponse> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    payload.validate()?;
    let actor_id = claims.actor_id()?;
    let interview = state.scheduler.cancel(id, payload.reason, actor_id).await?;
    Ok(Json(interview))
}

#[axum::debug_handler]
pub async fn confirm_interview(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let actor_id = claims.actor_id()?;
    let interview = state.scheduler.confirm(id, actor_id).await?;
    Ok(Json(interview))
}

#[axum::debug_handler]
pub async fn start_interview(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let actor_id = claims.actor_id()?;
    let interview = state.scheduler.start(id, actor_id).await?;
    Ok(Json(interview))
}

#[utoipa::path(
    post,
    path = "/api/interviews/{id}/complete",
    params(
        ("id" = Uuid, Path, description = "Interview ID")
    ),
    responses(
        (status = 200, description = "Interview completed, application advanced"),
        (status = 207, description = "Interview completed, application not advanced"),
        (status = 409, description = "Interview not yet due or already finished")
    )
)]
#[axum::debug_handler]
pub async fn complete_interview(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    payload: Option<Json<CompleteInterviewPayload>>,
) -> Result<impl IntoResponse> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    payload.validate()?;
    let actor_id = claims.actor_id()?;
    let outcome = state.scheduler.complete(id, payload.notes, actor_id).await?;
    Ok(cascaded_response(outcome, StatusCode::OK))
}

#[axum::debug_handler]
pub async fn mark_no_show(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let actor_id = claims.actor_id()?;
    let outcome = state.scheduler.mark_no_show(id, actor_id).await?;
    Ok(cascaded_response(outcome, StatusCode::OK))
}

#[axum::debug_handler]
pub async fn respond_to_invitation(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RespondPayload>,
) -> Result<impl IntoResponse> {
    let actor_id = claims.actor_id()?;
    let participant = state.scheduler.respond(id, actor_id, payload.accept).await?;
    Ok(Json(participant))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}/interviews",
    params(
        ("id" = Uuid, Path, description = "User ID"),
        ("role" = Option<String>, Query, description = "candidate, interviewer or observer")
    ),
    responses(
        (status = 200, description = "Interviews the user takes part in, soonest first")
    )
)]
#[axum::debug_handler]
pub async fn user_interviews(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<UserInterviewsQuery>,
) -> Result<impl IntoResponse> {
    let interviews = state.scheduler.interviews_for_user(id, query.role).await?;
    Ok(Json(interviews))
}
