use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::feedback::{FeedbackPatch, NewFeedback, Recommendation};

/// `rating` is range-checked by the aggregator so that out-of-range values
/// surface as `invalid_rating` rather than a generic validation error.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SubmitFeedbackPayload {
    pub rating: Option<i32>,
    #[validate(length(max = 5000))]
    pub strengths: Option<String>,
    #[validate(length(max = 5000))]
    pub weaknesses: Option<String>,
    #[validate(length(max = 5000))]
    pub notes: Option<String>,
    pub recommendation: Recommendation,
    #[serde(default)]
    pub is_visible_to_candidate: bool,
}

impl From<SubmitFeedbackPayload> for NewFeedback {
    fn from(payload: SubmitFeedbackPayload) -> Self {
        NewFeedback {
            rating: payload.rating,
            strengths: payload.strengths,
            weaknesses: payload.weaknesses,
            notes: payload.notes,
            recommendation: payload.recommendation,
            is_visible_to_candidate: payload.is_visible_to_candidate,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateFeedbackPayload {
    pub rating: Option<i32>,
    #[validate(length(max = 5000))]
    pub strengths: Option<String>,
    #[validate(length(max = 5000))]
    pub weaknesses: Option<String>,
    #[validate(length(max = 5000))]
    pub notes: Option<String>,
    pub recommendation: Option<Recommendation>,
    pub is_visible_to_candidate: Option<bool>,
}

impl From<UpdateFeedbackPayload> for FeedbackPatch {
    fn from(payload: UpdateFeedbackPayload) -> Self {
        FeedbackPatch {
            rating: payload.rating,
            strengths: payload.strengths,
            weaknesses: payload.weaknesses,
            notes: payload.notes,
            recommendation: payload.recommendation,
            is_visible_to_candidate: payload.is_visible_to_candidate,
        }
    }
}
