use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::application::ApplicationStatus;

/// Notification-worthy facts emitted by the pipeline. Delivery belongs to the
/// injected dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    ApplicationStatusChanged {
        application_id: Uuid,
        from: Option<ApplicationStatus>,
        to: ApplicationStatus,
    },
    InterviewScheduled {
        interview_id: Uuid,
        application_id: Uuid,
        scheduled_at: DateTime<Utc>,
    },
    InterviewRescheduled {
        interview_id: Uuid,
        application_id: Uuid,
        previous_scheduled_at: DateTime<Utc>,
        scheduled_at: DateTime<Utc>,
    },
    InterviewCancelled {
        interview_id: Uuid,
        application_id: Uuid,
        reason: Option<String>,
    },
    InterviewCompleted {
        interview_id: Uuid,
        application_id: Uuid,
    },
    InterviewNoShow {
        interview_id: Uuid,
        application_id: Uuid,
    },
    FeedbackSubmitted {
        interview_id: Uuid,
        evaluator_id: Uuid,
    },
}

impl PipelineEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            PipelineEvent::ApplicationStatusChanged { .. } => "application_status_changed",
            PipelineEvent::InterviewScheduled { .. } => "interview_scheduled",
            PipelineEvent::InterviewRescheduled { .. } => "interview_rescheduled",
            PipelineEvent::InterviewCancelled { .. } => "interview_cancelled",
            PipelineEvent::InterviewCompleted { .. } => "interview_completed",
            PipelineEvent::InterviewNoShow { .. } => "interview_no_show",
            PipelineEvent::FeedbackSubmitted { .. } => "feedback_submitted",
        }
    }
}
