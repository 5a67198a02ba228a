use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::database::store::PipelineStore;
use crate::error::{Error, Result};
use crate::models::application::{Application, ApplicationStatus, ApplicationStatusEvent};
use crate::models::feedback::InterviewFeedback;
use crate::models::interview::{
    Interview, InterviewParticipant, InterviewStatus, InterviewStatusEvent, ParticipantRole,
    ParticipantStatus,
};

#[derive(Default)]
struct MemoryState {
    applications: HashMap<Uuid, Application>,
    application_events: Vec<ApplicationStatusEvent>,
    interviews: HashMap<Uuid, Interview>,
    participants: Vec<InterviewParticipant>,
    interview_events: Vec<InterviewStatusEvent>,
    feedback: Vec<InterviewFeedback>,
}

/// Process-local store. One lock guards all tables, which makes every
/// compare-and-swap plus its ledger append a single atomic step.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PipelineStore for MemoryStore {
    async fn insert_application(
        &self,
        application: &Application,
        initial_event: &ApplicationStatusEvent,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.applications.contains_key(&application.id) {
            return Err(Error::BadRequest(format!(
                "Application {} already exists",
                application.id
            )));
        }
        let duplicate = state
            .applications
            .values()
            .any(|a| a.job_id == application.job_id && a.candidate_id == application.candidate_id);
        if duplicate {
            return Err(Error::BadRequest(format!(
                "Candidate {} has already applied to job {}",
                application.candidate_id, application.job_id
            )));
        }
        state.applications.insert(application.id, application.clone());
        state.application_events.push(initial_event.clone());
        Ok(())
    }

    async fn get_application(&self, id: Uuid) -> Result<Option<Application>> {
        Ok(self.state.lock().await.applications.get(&id).cloned())
    }

    async fn compare_and_set_application_status(
        &self,
        id: Uuid,
        expected: ApplicationStatus,
        event: &ApplicationStatusEvent,
    ) -> Result<Option<Application>> {
        let mut state = self.state.lock().await;
        let Some(application) = state.applications.get_mut(&id) else {
            return Err(Error::NotFound(format!("Application {} not found", id)));
        };
        if application.status != expected {
            return Ok(None);
        }
        application.status = event.to_status;
        application.updated_at = event.created_at;
        let updated = application.clone();
        state.application_events.push(event.clone());
        Ok(Some(updated))
    }

    async fn application_events(&self, application_id: Uuid) -> Result<Vec<ApplicationStatusEvent>> {
        let state = self.state.lock().await;
        Ok(state
            .application_events
            .iter()
            .filter(|e| e.application_id == application_id)
            .cloned()
            .collect())
    }

    async fn insert_interview(
        &self,
        interview: &Interview,
        participants: &[InterviewParticipant],
        initial_event: &InterviewStatusEvent,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        if !state.applications.contains_key(&interview.application_id) {
            return Err(Error::NotFound(format!(
                "Application {} not found",
                interview.application_id
            )));
        }
        state.interviews.insert(interview.id, interview.clone());
        state.participants.extend(participants.iter().cloned());
        state.interview_events.push(initial_event.clone());
        Ok(())
    }

    async fn get_interview(&self, id: Uuid) -> Result<Option<Interview>> {
        Ok(self.state.lock().await.interviews.get(&id).cloned())
    }

    async fn compare_and_set_interview(
        &self,
        interview: &Interview,
        expected: InterviewStatus,
        event: &InterviewStatusEvent,
    ) -> Result<bool> {
        let mut state = self.state.lock().await;
        let Some(stored) = state.interviews.get_mut(&interview.id) else {
            return Err(Error::NotFound(format!("Interview {} not found", interview.id)));
        };
        if stored.status != expected {
            return Ok(false);
        }
        *stored = interview.clone();
        state.interview_events.push(event.clone());
        Ok(true)
    }

    async fn interviews_for_application(&self, application_id: Uuid) -> Result<Vec<Interview>> {
        let state = self.state.lock().await;
        let mut interviews: Vec<Interview> = state
            .interviews
            .values()
            .filter(|i| i.application_id == application_id)
            .cloned()
            .collect();
        interviews.sort_by_key(|i| (i.scheduled_at, i.created_at));
        Ok(interviews)
    }

    async fn interviews_for_user(
        &self,
        user_id: Uuid,
        role: Option<ParticipantRole>,
    ) -> Result<Vec<Interview>> {
        let state = self.state.lock().await;
        let matching: HashMap<Uuid, Interview> = state
            .participants
            .iter()
            .filter(|p| p.user_id == user_id && role.map_or(true, |r| p.role == r))
            .filter_map(|p| state.interviews.get(&p.interview_id))
            .map(|i| (i.id, i.clone()))
            .collect();
        let mut interviews: Vec<Interview> = matching.into_values().collect();
        interviews.sort_by_key(|i| (i.scheduled_at, i.created_at));
        Ok(interviews)
    }

    async fn participants(&self, interview_id: Uuid) -> Result<Vec<InterviewParticipant>> {
        let state = self.state.lock().await;
        Ok(state
            .participants
            .iter()
            .filter(|p| p.interview_id == interview_id)
            .cloned()
            .collect())
    }

    async fn set_participant_status(
        &self,
        interview_id: Uuid,
        user_id: Uuid,
        status: ParticipantStatus,
    ) -> Result<bool> {
        let mut state = self.state.lock().await;
        match state
            .participants
            .iter_mut()
            .find(|p| p.interview_id == interview_id && p.user_id == user_id)
        {
            Some(participant) => {
                participant.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn interview_events(&self, interview_id: Uuid) -> Result<Vec<InterviewStatusEvent>> {
        let state = self.state.lock().await;
        Ok(state
            .interview_events
            .iter()
            .filter(|e| e.interview_id == interview_id)
            .cloned()
            .collect())
    }

    async fn insert_feedback(&self, feedback: &InterviewFeedback) -> Result<()> {
        let mut state = self.state.lock().await;
        if !state.interviews.contains_key(&feedback.interview_id) {
            return Err(Error::NotFound(format!(
                "Interview {} not found",
                feedback.interview_id
            )));
        }
        state.feedback.push(feedback.clone());
        Ok(())
    }

    async fn get_feedback(&self, id: Uuid) -> Result<Option<InterviewFeedback>> {
        let state = self.state.lock().await;
        Ok(state.feedback.iter().find(|f| f.id == id).cloned())
    }

    async fn update_feedback(&self, feedback: &InterviewFeedback) -> Result<()> {
        let mut state = self.state.lock().await;
        match state.feedback.iter_mut().find(|f| f.id == feedback.id) {
            Some(stored) => {
                *stored = feedback.clone();
                Ok(())
            }
            None => Err(Error::NotFound(format!("Feedback {} not found", feedback.id))),
        }
    }

    async fn feedback_for_interview(&self, interview_id: Uuid) -> Result<Vec<InterviewFeedback>> {
        let state = self.state.lock().await;
        Ok(state
            .feedback
            .iter()
            .filter(|f| f.interview_id == interview_id)
            .cloned()
            .collect())
    }
}
