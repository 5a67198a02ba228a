use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::interview::{InterviewType, ParticipantRole};
use crate::services::scheduler_service::{RescheduleRequest, ScheduleRequest};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ScheduleInterviewPayload {
    pub interview_type: InterviewType,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: i32,
    #[validate(length(max = 500))]
    pub location: Option<String>,
    #[validate(length(max = 2000))]
    pub meeting_link: Option<String>,
    #[validate(length(max = 5000))]
    pub notes: Option<String>,
    #[serde(default)]
    pub interviewer_ids: Vec<Uuid>,
    #[serde(default)]
    pub observer_ids: Vec<Uuid>,
}

impl ScheduleInterviewPayload {
    pub fn into_request(self, application_id: Uuid) -> ScheduleRequest {
        ScheduleRequest {
            application_id,
            interview_type: self.interview_type,
            scheduled_at: self.scheduled_at,
            duration_minutes: self.duration_minutes,
            location: self.location,
            meeting_link: self.meeting_link,
            notes: self.notes,
            interviewer_ids: self.interviewer_ids,
            observer_ids: self.observer_ids,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RescheduleInterviewPayload {
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: Option<i32>,
    #[validate(length(max = 500))]
    pub location: Option<String>,
    #[validate(length(max = 2000))]
    pub meeting_link: Option<String>,
    #[validate(length(max = 5000))]
    pub notes: Option<String>,
}

impl From<RescheduleInterviewPayload> for RescheduleRequest {
    fn from(payload: RescheduleInterviewPayload) -> Self {
        RescheduleRequest {
            scheduled_at: payload.scheduled_at,
            duration_minutes: payload.duration_minutes,
            location: payload.location,
            meeting_link: payload.meeting_link,
            notes: payload.notes,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CancelInterviewPayload {
    #[validate(length(max = 2000))]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CompleteInterviewPayload {
    #[validate(length(max = 5000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RespondPayload {
    pub accept: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserInterviewsQuery {
    pub role: Option<ParticipantRole>,
}
