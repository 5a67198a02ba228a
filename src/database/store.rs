use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::application::{Application, ApplicationStatus, ApplicationStatusEvent};
use crate::models::feedback::InterviewFeedback;
use crate::models::interview::{
    Interview, InterviewParticipant, InterviewStatus, InterviewStatusEvent, ParticipantRole,
    ParticipantStatus,
};

/// Persistence contract of the pipeline.
///
/// Status writes are compare-and-swap: the row is only updated when its stored
/// status still equals `expected`, and the matching ledger entry is written in
/// the same unit of work. A `false`/`None` return means another writer got
/// there first.
#[async_trait]
pub trait PipelineStore: Send + Sync {
    async fn insert_application(
        &self,
        application: &Application,
        initial_event: &ApplicationStatusEvent,
    ) -> Result<()>;

    async fn get_application(&self, id: Uuid) -> Result<Option<Application>>;

    /// Moves the application to `event.to_status` and stamps `updated_at`
    /// with `event.created_at`.
    async fn compare_and_set_application_status(
        &self,
        id: Uuid,
        expected: ApplicationStatus,
        event: &ApplicationStatusEvent,
    ) -> Result<Option<Application>>;

    /// Oldest first.
    async fn application_events(&self, application_id: Uuid) -> Result<Vec<ApplicationStatusEvent>>;

    async fn insert_interview(
        &self,
        interview: &Interview,
        participants: &[InterviewParticipant],
        initial_event: &InterviewStatusEvent,
    ) -> Result<()>;

    async fn get_interview(&self, id: Uuid) -> Result<Option<Interview>>;

    /// Overwrites every mutable column of `interview` if the stored status is
    /// still `expected`.
    async fn compare_and_set_interview(
        &self,
        interview: &Interview,
        expected: InterviewStatus,
        event: &InterviewStatusEvent,
    ) -> Result<bool>;

    /// Ordered by `scheduled_at`.
    async fn interviews_for_application(&self, application_id: Uuid) -> Result<Vec<Interview>>;

    /// Ordered by `scheduled_at`. `role = None` matches any role.
    async fn interviews_for_user(
        &self,
        user_id: Uuid,
        role: Option<ParticipantRole>,
    ) -> Result<Vec<Interview>>;

    async fn participants(&self, interview_id: Uuid) -> Result<Vec<InterviewParticipant>>;

    async fn set_participant_status(
        &self,
        interview_id: Uuid,
        user_id: Uuid,
        status: ParticipantStatus,
    ) -> Result<bool>;

    /// Oldest first.
    async fn interview_events(&self, interview_id: Uuid) -> Result<Vec<InterviewStatusEvent>>;

    async fn insert_feedback(&self, feedback: &InterviewFeedback) -> Result<()>;

    async fn get_feedback(&self, id: Uuid) -> Result<Option<InterviewFeedback>>;

    async fn update_feedback(&self, feedback: &InterviewFeedback) -> Result<()>;

    /// Oldest first.
    async fn feedback_for_interview(&self, interview_id: Uuid) -> Result<Vec<InterviewFeedback>>;
}
