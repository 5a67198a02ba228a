#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Barrier;
use uuid::Uuid;

use hiring_pipeline::config::PipelineConfig;
use hiring_pipeline::database::{MemoryStore, PipelineStore};
use hiring_pipeline::error::{Error, Result};
use hiring_pipeline::models::application::{
    ApplicantProfile, Application, ApplicationStatus, ApplicationStatusEvent, NewApplication,
};
use hiring_pipeline::models::feedback::InterviewFeedback;
use hiring_pipeline::models::interview::{
    Interview, InterviewParticipant, InterviewStatus, InterviewStatusEvent, InterviewType,
    ParticipantRole, ParticipantStatus,
};
use hiring_pipeline::services::notification_service::{LogDispatcher, NotificationDispatcher};
use hiring_pipeline::services::scheduler_service::ScheduleRequest;
use hiring_pipeline::utils::time::FixedClock;
use hiring_pipeline::AppState;

pub const JWT_SECRET: &str = "test_secret_key";

pub fn monday_morning() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
}

pub struct Harness {
    pub store: Arc<dyn PipelineStore>,
    pub clock: FixedClock,
    pub state: AppState,
    pub employer: Uuid,
    pub candidate: Uuid,
    pub interviewer: Uuid,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(PipelineConfig::default())
    }

    pub fn with_config(config: PipelineConfig) -> Self {
        Self::build(Arc::new(MemoryStore::new()), Arc::new(LogDispatcher), config)
    }

    pub fn build(
        store: Arc<dyn PipelineStore>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        config: PipelineConfig,
    ) -> Self {
        let clock = FixedClock::new(monday_morning());
        let state = AppState::new(
            store.clone(),
            dispatcher,
            config,
            Arc::new(clock.clone()),
            JWT_SECRET,
        );
        Self {
            store,
            clock,
            state,
            employer: Uuid::new_v4(),
            candidate: Uuid::new_v4(),
            interviewer: Uuid::new_v4(),
        }
    }

    pub fn new_application(&self) -> NewApplication {
        NewApplication {
            job_id: Uuid::new_v4(),
            candidate_id: self.candidate,
            employer_id: self.employer,
            profile: ApplicantProfile {
                full_name: "Dilnoza Karimova".to_string(),
                email: "dilnoza@example.com".to_string(),
                skills: vec!["rust".to_string(), "postgres".to_string()],
                ..Default::default()
            },
        }
    }

    pub async fn submit(&self) -> Application {
        self.state
            .lifecycle
            .submit(self.new_application(), self.candidate)
            .await
            .expect("submit application")
    }

    pub async fn move_to(&self, application: &Application, status: ApplicationStatus) -> Application {
        self.state
            .lifecycle
            .transition(application.id, status, self.employer, None)
            .await
            .expect("transition application")
    }

    pub async fn under_review(&self) -> Application {
        let application = self.submit().await;
        self.move_to(&application, ApplicationStatus::UnderReview).await
    }

    pub fn video_request(&self, application_id: Uuid, hours_ahead: i64) -> ScheduleRequest {
        ScheduleRequest {
            application_id,
            interview_type: InterviewType::Video,
            scheduled_at: self.clock_now() + Duration::hours(hours_ahead),
            duration_minutes: 60,
            location: None,
            meeting_link: Some("https://example.com/x".to_string()),
            notes: None,
            interviewer_ids: vec![self.interviewer],
            observer_ids: Vec::new(),
        }
    }

    pub async fn schedule(&self, application: &Application) -> Interview {
        self.state
            .scheduler
            .schedule(self.video_request(application.id, 24), self.employer)
            .await
            .expect("schedule interview")
            .into_value()
    }

    /// An interview that has taken place, with its application moved along.
    pub async fn completed_interview(&self) -> (Application, Interview) {
        let application = self.under_review().await;
        let interview = self.schedule(&application).await;
        self.clock.advance(Duration::hours(25));
        let interview = self
            .state
            .scheduler
            .complete(interview.id, None, self.interviewer)
            .await
            .expect("complete interview")
            .into_value();
        let application = self.state.lifecycle.get(application.id).await.unwrap();
        (application, interview)
    }

    pub fn clock_now(&self) -> DateTime<Utc> {
        use hiring_pipeline::utils::time::Clock;
        self.clock.now()
    }
}

fn take_one(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

/// Memory store with failure switches. Application status writes, participant
/// writes and interview listings can be made to fail, status writes can be
/// made to lose a race, and application reads can be held at a shared barrier.
pub struct InterceptStore {
    inner: MemoryStore,
    fail_application_writes: AtomicBool,
    fail_participant_writes: AtomicBool,
    fail_interview_listing: AtomicBool,
    conflicting_writes: AtomicUsize,
    gated_reads: AtomicUsize,
    gate: Barrier,
}

impl InterceptStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            fail_application_writes: AtomicBool::new(false),
            fail_participant_writes: AtomicBool::new(false),
            fail_interview_listing: AtomicBool::new(false),
            conflicting_writes: AtomicUsize::new(0),
            gated_reads: AtomicUsize::new(0),
            gate: Barrier::new(2),
        }
    }

    pub fn fail_application_writes(&self, fail: bool) {
        self.fail_application_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_participant_writes(&self, fail: bool) {
        self.fail_participant_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_interview_listing(&self, fail: bool) {
        self.fail_interview_listing.store(fail, Ordering::SeqCst);
    }

    /// The next `n` application status writes report a lost race without
    /// writing anything.
    pub fn conflict_next_writes(&self, n: usize) {
        self.conflicting_writes.store(n, Ordering::SeqCst);
    }

    /// The next two application reads wait for each other before returning.
    pub fn gate_next_two_reads(&self) {
        self.gated_reads.store(2, Ordering::SeqCst);
    }
}

#[async_trait]
impl PipelineStore for InterceptStore {
    async fn insert_application(
        &self,
        application: &Application,
        initial_event: &ApplicationStatusEvent,
    ) -> Result<()> {
        self.inner.insert_application(application, initial_event).await
    }

    async fn get_application(&self, id: Uuid) -> Result<Option<Application>> {
        let result = self.inner.get_application(id).await;
        if take_one(&self.gated_reads) {
            self.gate.wait().await;
        }
        result
    }

    async fn compare_and_set_application_status(
        &self,
        id: Uuid,
        expected: ApplicationStatus,
        event: &ApplicationStatusEvent,
    ) -> Result<Option<Application>> {
        if self.fail_application_writes.load(Ordering::SeqCst) {
            return Err(Error::Internal("application table unavailable".to_string()));
        }
        if take_one(&self.conflicting_writes) {
            return Ok(None);
        }
        self.inner
            .compare_and_set_application_status(id, expected, event)
            .await
    }

    async fn application_events(&self, application_id: Uuid) -> Result<Vec<ApplicationStatusEvent>> {
        self.inner.application_events(application_id).await
    }

    async fn insert_interview(
        &self,
        interview: &Interview,
        participants: &[InterviewParticipant],
        initial_event: &InterviewStatusEvent,
    ) -> Result<()> {
        self.inner
            .insert_interview(interview, participants, initial_event)
            .await
    }

    async fn get_interview(&self, id: Uuid) -> Result<Option<Interview>> {
        self.inner.get_interview(id).await
    }

    async fn compare_and_set_interview(
        &self,
        interview: &Interview,
        expected: InterviewStatus,
        event: &InterviewStatusEvent,
    ) -> Result<bool> {
        self.inner
            .compare_and_set_interview(interview, expected, event)
            .await
    }

    async fn interviews_for_application(&self, application_id: Uuid) -> Result<Vec<Interview>> {
        if self.fail_interview_listing.load(Ordering::SeqCst) {
            return Err(Error::Internal("interview index unavailable".to_string()));
        }
        self.inner.interviews_for_application(application_id).await
    }

    async fn interviews_for_user(
        &self,
        user_id: Uuid,
        role: Option<ParticipantRole>,
    ) -> Result<Vec<Interview>> {
        self.inner.interviews_for_user(user_id, role).await
    }

    async fn participants(&self, interview_id: Uuid) -> Result<Vec<InterviewParticipant>> {
        self.inner.participants(interview_id).await
    }

    async fn set_participant_status(
        &self,
        interview_id: Uuid,
        user_id: Uuid,
        status: ParticipantStatus,
    ) -> Result<bool> {
        if self.fail_participant_writes.load(Ordering::SeqCst) {
            return Err(Error::Internal("participants table unavailable".to_string()));
        }
        self.inner
            .set_participant_status(interview_id, user_id, status)
            .await
    }

    async fn interview_events(&self, interview_id: Uuid) -> Result<Vec<InterviewStatusEvent>> {
        self.inner.interview_events(interview_id).await
    }

    async fn insert_feedback(&self, feedback: &InterviewFeedback) -> Result<()> {
        self.inner.insert_feedback(feedback).await
    }

    async fn get_feedback(&self, id: Uuid) -> Result<Option<InterviewFeedback>> {
        self.inner.get_feedback(id).await
    }

    async fn update_feedback(&self, feedback: &InterviewFeedback) -> Result<()> {
        self.inner.update_feedback(feedback).await
    }

    async fn feedback_for_interview(&self, interview_id: Uuid) -> Result<Vec<InterviewFeedback>> {
        self.inner.feedback_for_interview(interview_id).await
    }
}
