use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::feedback_dto::{SubmitFeedbackPayload, UpdateFeedbackPayload},
    error::Result,
    middleware::auth::Claims,
    AppState,
};

#[axum::debug_handler]
pub async fn list_feedback(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let feedback = state.feedback.latest_by_evaluator(id).await?;
    Ok(Json(feedback))
}

#[utoipa::path(
    post,
    path = "/api/interviews/{id}/feedback",
    params(
        ("id" = Uuid, Path, description = "Interview ID")
    ),
    responses(
        (status = 201, description = "Feedback recorded"),
        (status = 403, description = "Caller is not an evaluator on this interview"),
        (status = 409, description = "Interview is not completed"),
        (status = 422, description = "Rating outside 1-5")
    )
)]
#[axum::debug_handler]
pub async fn submit_feedback(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SubmitFeedbackPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let evaluator_id = claims.actor_id()?;
    let feedback = state
        .feedback
        .submit(id, evaluator_id, payload.into())
        .await?;
    Ok((StatusCode::CREATED, Json(feedback)))
}

#[axum::debug_handler]
pub async fn candidate_feedback(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let feedback = state.feedback.candidate_feedback(id).await?;
    Ok(Json(feedback))
}

#[utoipa::path(
    get,
    path = "/api/interviews/{id}/feedback/rollup",
    params(
        ("id" = Uuid, Path, description = "Interview ID")
    ),
    responses(
        (status = 200, description = "Average rating, counts and consensus"),
        (status = 404, description = "Interview not found")
    )
)]
#[axum::debug_handler]
pub async fn feedback_rollup(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let rollup = state.feedback.rollup(id).await?;
    Ok(Json(rollup))
}

#[axum::debug_handler]
pub async fn update_feedback(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateFeedbackPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let evaluator_id = claims.actor_id()?;
    let feedback = state
        .feedback
        .update(id, evaluator_id, payload.into())
        .await?;
    Ok(Json(feedback))
}
