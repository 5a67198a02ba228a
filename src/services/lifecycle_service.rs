use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::database::store::PipelineStore;
use crate::error::{Error, Result};
use crate::models::application::{Application, ApplicationStatus, NewApplication};
use crate::models::event::PipelineEvent;
use crate::services::ledger_service::LedgerService;
use crate::services::notification_service::Notifier;
use crate::utils::time::Clock;

/// Extra check run before an application status write. Rejecting returns the
/// error to the caller unchanged.
#[async_trait]
pub trait TransitionPolicy: Send + Sync {
    async fn check(&self, application: &Application, target: ApplicationStatus) -> Result<()>;
}

/// Owns `Application.status`. Nothing else writes it.
#[derive(Clone)]
pub struct LifecycleService {
    store: Arc<dyn PipelineStore>,
    ledger: LedgerService,
    notifier: Notifier,
    config: Arc<PipelineConfig>,
    clock: Arc<dyn Clock>,
    policy: Option<Arc<dyn TransitionPolicy>>,
}

impl LifecycleService {
    pub fn new(
        store: Arc<dyn PipelineStore>,
        ledger: LedgerService,
        notifier: Notifier,
        config: Arc<PipelineConfig>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            ledger,
            notifier,
            config,
            clock,
            policy: None,
        }
    }

    pub fn with_policy(mut self, policy: Arc<dyn TransitionPolicy>) -> Self {
        self.policy = Some(policy);
        self
    }

    pub async fn get(&self, application_id: Uuid) -> Result<Application> {
        self.store
            .get_application(application_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Application {} not found", application_id)))
    }

    pub async fn submit(&self, new: NewApplication, actor_id: Uuid) -> Result<Application> {
        if actor_id != new.candidate_id {
            return Err(Error::Unauthorized(
                "Only the candidate can submit their application".to_string(),
            ));
        }
        if new.profile.full_name.trim().is_empty() {
            return Err(Error::MissingRequiredField("full_name".to_string()));
        }
        if new.profile.email.trim().is_empty() {
            return Err(Error::MissingRequiredField("email".to_string()));
        }

        let now = self.clock.now();
        let application = Application {
            id: Uuid::new_v4(),
            job_id: new.job_id,
            candidate_id: new.candidate_id,
            employer_id: new.employer_id,
            status: ApplicationStatus::Submitted,
            profile: new.profile,
            created_at: now,
            updated_at: now,
        };
        let event = self.ledger.application_entry(
            application.id,
            None,
            ApplicationStatus::Submitted,
            actor_id,
            None,
        );
        self.store.insert_application(&application, &event).await?;
        tracing::info!(application_id = %application.id, job_id = %application.job_id, "application submitted");

        self.notifier
            .emit(PipelineEvent::ApplicationStatusChanged {
                application_id: application.id,
                from: None,
                to: ApplicationStatus::Submitted,
            })
            .await;
        Ok(application)
    }

    /// Moves an application along one edge of the transition table.
    ///
    /// Requesting the status the application already has is a no-op and writes
    /// no history. Losing a race against another writer yields
    /// `ConcurrentModification` unless the winner reached the same target.
    pub async fn transition(
        &self,
        application_id: Uuid,
        target: ApplicationStatus,
        actor_id: Uuid,
        notes: Option<String>,
    ) -> Result<Application> {
        let application = self.get(application_id).await?;
        authorize_transition(&application, target, actor_id)?;

        if application.status == target {
            tracing::debug!(application_id = %application_id, status = %target, "transition is a no-op");
            return Ok(application);
        }
        self.ensure_allowed(&application, target)?;

        match self.write_edge(&application, target, actor_id, notes).await {
            Err(Error::ConcurrentModification(msg)) => {
                let current = self.get(application_id).await?;
                if current.status == target {
                    Ok(current)
                } else {
                    Err(Error::ConcurrentModification(msg))
                }
            }
            other => other,
        }
    }

    pub async fn withdraw(&self, application_id: Uuid, candidate_id: Uuid) -> Result<Application> {
        let application = self.get(application_id).await?;
        if application.candidate_id != candidate_id {
            return Err(Error::Unauthorized(
                "Only the candidate can withdraw their application".to_string(),
            ));
        }
        if !application.status.is_withdrawable() {
            return Err(Error::NotWithdrawable(application.status.to_string()));
        }
        self.write_edge(
            &application,
            ApplicationStatus::Withdrawn,
            candidate_id,
            Some("Withdrawn by candidate".to_string()),
        )
        .await
    }

    /// Cascade entry point: brings the application up to `target` along the
    /// forward hiring path. Returns `None` when it is already there or beyond.
    /// A write conflict is retried once against a fresh read.
    pub async fn advance(
        &self,
        application_id: Uuid,
        target: ApplicationStatus,
        actor_id: Uuid,
        notes: Option<String>,
    ) -> Result<Option<Application>> {
        let mut attempt = 0;
        loop {
            let application = self.get(application_id).await?;
            if application.status.is_at_or_past(target) {
                return Ok(None);
            }
            let path = self
                .config
                .transitions
                .forward_path(application.status, target)
                .ok_or_else(|| {
                    Error::InvalidTransition(format!(
                        "{} is not reachable from {}",
                        target, application.status
                    ))
                })?;

            match self.walk(application, &path, actor_id, notes.clone()).await {
                Ok(updated) => return Ok(Some(updated)),
                Err(Error::ConcurrentModification(msg)) if attempt == 0 => {
                    tracing::warn!(application_id = %application_id, %msg, "cascade conflict, retrying");
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// `interview_scheduled -> interview_completed`, only when the application
    /// currently sits at `interview_scheduled`.
    pub async fn complete_cascade(
        &self,
        application_id: Uuid,
        actor_id: Uuid,
    ) -> Result<Option<Application>> {
        let mut attempt = 0;
        loop {
            let application = self.get(application_id).await?;
            if application.status != ApplicationStatus::InterviewScheduled {
                return Ok(None);
            }
            match self
                .write_edge(
                    &application,
                    ApplicationStatus::InterviewCompleted,
                    actor_id,
                    Some("Interview completed".to_string()),
                )
                .await
            {
                Ok(updated) => return Ok(Some(updated)),
                Err(Error::ConcurrentModification(msg)) if attempt == 0 => {
                    tracing::warn!(application_id = %application_id, %msg, "cascade conflict, retrying");
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn walk(
        &self,
        mut application: Application,
        path: &[ApplicationStatus],
        actor_id: Uuid,
        notes: Option<String>,
    ) -> Result<Application> {
        for &step in path {
            self.ensure_allowed(&application, step)?;
            application = self
                .write_edge(&application, step, actor_id, notes.clone())
                .await?;
        }
        Ok(application)
    }

    fn ensure_allowed(&self, application: &Application, target: ApplicationStatus) -> Result<()> {
        if self.config.transitions.allows(application.status, target) {
            Ok(())
        } else {
            Err(Error::InvalidTransition(format!(
                "{} -> {} is not allowed",
                application.status, target
            )))
        }
    }

    async fn write_edge(
        &self,
        application: &Application,
        target: ApplicationStatus,
        actor_id: Uuid,
        notes: Option<String>,
    ) -> Result<Application> {
        if let Some(policy) = &self.policy {
            policy.check(application, target).await?;
        }

        let event = self.ledger.application_entry(
            application.id,
            Some(application.status),
            target,
            actor_id,
            notes,
        );
        let updated = self
            .store
            .compare_and_set_application_status(application.id, application.status, &event)
            .await?
            .ok_or_else(|| {
                Error::ConcurrentModification(format!(
                    "Application {} changed while moving {} -> {}",
                    application.id, application.status, target
                ))
            })?;

        tracing::info!(
            application_id = %application.id,
            from = %application.status,
            to = %target,
            actor_id = %actor_id,
            "application status changed"
        );
        self.notifier
            .emit(PipelineEvent::ApplicationStatusChanged {
                application_id: application.id,
                from: Some(application.status),
                to: target,
            })
            .await;
        Ok(updated)
    }
}

fn authorize_transition(
    application: &Application,
    target: ApplicationStatus,
    actor_id: Uuid,
) -> Result<()> {
    if actor_id == application.employer_id {
        return Ok(());
    }
    if actor_id == application.candidate_id && target == ApplicationStatus::Withdrawn {
        return Ok(());
    }
    Err(Error::Unauthorized(format!(
        "Actor {} may not move application {} to {}",
        actor_id, application.id, target
    )))
}
