use std::sync::Arc;
use uuid::Uuid;

use crate::database::store::PipelineStore;
use crate::error::{Error, Result};
use crate::models::application::{ApplicationStatus, ApplicationStatusEvent};
use crate::models::interview::{InterviewStatus, InterviewStatusEvent};
use crate::services::transition_table::TransitionTable;
use crate::utils::time::Clock;

/// Append-only history of application and interview status changes.
///
/// Entries are built here and persisted by the store together with the status
/// write they describe, so a stream never holds an entry for a write that did
/// not happen.
#[derive(Clone)]
pub struct LedgerService {
    store: Arc<dyn PipelineStore>,
    clock: Arc<dyn Clock>,
}

impl LedgerService {
    pub fn new(store: Arc<dyn PipelineStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn application_entry(
        &self,
        application_id: Uuid,
        from_status: Option<ApplicationStatus>,
        to_status: ApplicationStatus,
        actor_id: Uuid,
        notes: Option<String>,
    ) -> ApplicationStatusEvent {
        ApplicationStatusEvent {
            id: Uuid::new_v4(),
            application_id,
            from_status,
            to_status,
            notes,
            actor_id,
            created_at: self.clock.now(),
        }
    }

    pub fn interview_entry(
        &self,
        interview_id: Uuid,
        from_status: Option<InterviewStatus>,
        to_status: InterviewStatus,
        actor_id: Uuid,
        notes: Option<String>,
    ) -> InterviewStatusEvent {
        InterviewStatusEvent {
            id: Uuid::new_v4(),
            interview_id,
            from_status,
            to_status,
            notes,
            actor_id,
            created_at: self.clock.now(),
        }
    }

    /// Newest first, for display.
    pub async fn application_history(&self, application_id: Uuid) -> Result<Vec<ApplicationStatusEvent>> {
        self.require_application(application_id).await?;
        let mut events = self.store.application_events(application_id).await?;
        events.reverse();
        Ok(events)
    }

    /// Oldest first, for replay.
    pub async fn application_replay(&self, application_id: Uuid) -> Result<Vec<ApplicationStatusEvent>> {
        self.require_application(application_id).await?;
        self.store.application_events(application_id).await
    }

    /// Newest first, for display.
    pub async fn interview_history(&self, interview_id: Uuid) -> Result<Vec<InterviewStatusEvent>> {
        if self.store.get_interview(interview_id).await?.is_none() {
            return Err(Error::NotFound(format!("Interview {} not found", interview_id)));
        }
        let mut events = self.store.interview_events(interview_id).await?;
        events.reverse();
        Ok(events)
    }

    /// Replays an application's stream and checks it only follows `table`.
    pub async fn verify_application_stream(
        &self,
        application_id: Uuid,
        table: &TransitionTable,
    ) -> Result<()> {
        let events = self.application_replay(application_id).await?;
        let mut walk = Vec::with_capacity(events.len());
        for event in &events {
            if let (Some(from), Some(&last)) = (event.from_status, walk.last()) {
                if from != last {
                    return Err(Error::Internal(format!(
                        "Ledger for application {} is discontinuous: {} recorded after {}",
                        application_id, from, last
                    )));
                }
            }
            walk.push(event.to_status);
        }
        table.check_walk(&walk).map_err(|(from, to)| {
            Error::Internal(format!(
                "Ledger for application {} contains illegal edge {} -> {}",
                application_id, from, to
            ))
        })
    }

    async fn require_application(&self, application_id: Uuid) -> Result<()> {
        match self.store.get_application(application_id).await? {
            Some(_) => Ok(()),
            None => Err(Error::NotFound(format!("Application {} not found", application_id))),
        }
    }
}
