use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::database::store::PipelineStore;
use crate::error::{Error, Result};
use crate::models::application::{Application, ApplicationStatus};
use crate::models::event::PipelineEvent;
use crate::models::interview::{
    Interview, InterviewDetails, InterviewParticipant, InterviewStatus, InterviewType,
    ParticipantRole, ParticipantStatus,
};
use crate::models::outcome::{CascadeFailure, Cascaded, Withdrawal};
use crate::services::ledger_service::LedgerService;
use crate::services::lifecycle_service::LifecycleService;
use crate::services::notification_service::Notifier;
use crate::utils::time::Clock;

use InterviewStatus::*;

const RESCHEDULABLE: &[InterviewStatus] = &[Scheduled, Confirmed, Rescheduled];
const CANCELLABLE: &[InterviewStatus] = &[Scheduled, Confirmed, Rescheduled];
const CONFIRMABLE: &[InterviewStatus] = &[Scheduled, Rescheduled];
const STARTABLE: &[InterviewStatus] = &[Scheduled, Confirmed, Rescheduled];
const COMPLETABLE: &[InterviewStatus] = &[Scheduled, Confirmed, InProgress, Rescheduled];
const NO_SHOW_ELIGIBLE: &[InterviewStatus] = &[Scheduled, Confirmed, Rescheduled];

#[derive(Debug, Clone)]
pub struct ScheduleRequest {
    pub application_id: Uuid,
    pub interview_type: InterviewType,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub location: Option<String>,
    pub meeting_link: Option<String>,
    pub notes: Option<String>,
    pub interviewer_ids: Vec<Uuid>,
    pub observer_ids: Vec<Uuid>,
}

/// `None` fields keep the interview's current value.
#[derive(Debug, Clone)]
pub struct RescheduleRequest {
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: Option<i32>,
    pub location: Option<String>,
    pub meeting_link: Option<String>,
    pub notes: Option<String>,
}

/// Owns interviews and their participants. Cascades into the lifecycle
/// manager on schedule and complete; never the other way round.
#[derive(Clone)]
pub struct SchedulerService {
    store: Arc<dyn PipelineStore>,
    ledger: LedgerService,
    lifecycle: LifecycleService,
    notifier: Notifier,
    config: Arc<PipelineConfig>,
    clock: Arc<dyn Clock>,
}

impl SchedulerService {
    pub fn new(
        store: Arc<dyn PipelineStore>,
        ledger: LedgerService,
        lifecycle: LifecycleService,
        notifier: Notifier,
        config: Arc<PipelineConfig>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            ledger,
            lifecycle,
            notifier,
            config,
            clock,
        }
    }

    pub async fn schedule(&self, req: ScheduleRequest, actor_id: Uuid) -> Result<Cascaded<Interview>> {
        let application = self.lifecycle.get(req.application_id).await?;
        if actor_id != application.employer_id {
            return Err(Error::Unauthorized(
                "Only the owning employer can schedule interviews".to_string(),
            ));
        }
        if self.config.transitions.is_terminal(application.status) {
            return Err(Error::InvalidTransition(format!(
                "Cannot schedule an interview for a {} application",
                application.status
            )));
        }

        let now = self.clock.now();
        if req.scheduled_at <= now {
            return Err(Error::InvalidSchedule(
                "scheduled_at must be in the future".to_string(),
            ));
        }
        validate_duration(req.duration_minutes)?;
        interview_end(req.scheduled_at, req.duration_minutes)?;
        let location = non_blank(req.location);
        let meeting_link = non_blank(req.meeting_link);
        validate_venue(req.interview_type, &location, &meeting_link)?;

        if self.config.single_active_interview {
            let existing = self.store.interviews_for_application(application.id).await?;
            if existing.iter().any(|i| i.status.is_active()) {
                return Err(Error::InvalidSchedule(
                    "Application already has an active interview".to_string(),
                ));
            }
        }

        let interview_id = Uuid::new_v4();
        let participants = build_participants(
            interview_id,
            application.candidate_id,
            &req.interviewer_ids,
            &req.observer_ids,
        );
        if self.config.reject_overlapping_interviews {
            self.ensure_no_overlap(&participants, None, req.scheduled_at, req.duration_minutes)
                .await?;
        }

        let interview = Interview {
            id: interview_id,
            application_id: application.id,
            interview_type: req.interview_type,
            status: Scheduled,
            scheduled_at: req.scheduled_at,
            duration_minutes: req.duration_minutes,
            location,
            meeting_link,
            notes: non_blank(req.notes),
            created_by: actor_id,
            completed_at: None,
            created_at: now,
            updated_at: now,
        };
        let event = self
            .ledger
            .interview_entry(interview.id, None, Scheduled, actor_id, None);
        self.store
            .insert_interview(&interview, &participants, &event)
            .await?;

        tracing::info!(
            interview_id = %interview.id,
            application_id = %application.id,
            scheduled_at = %interview.scheduled_at,
            participants = participants.len(),
            "interview scheduled"
        );
        self.notifier
            .emit(PipelineEvent::InterviewScheduled {
                interview_id: interview.id,
                application_id: application.id,
                scheduled_at: interview.scheduled_at,
            })
            .await;

        let cascade = self
            .lifecycle
            .advance(
                application.id,
                ApplicationStatus::InterviewScheduled,
                actor_id,
                Some("Interview scheduled".to_string()),
            )
            .await;
        let failed = cascade_failure(
            interview.id,
            application.id,
            ApplicationStatus::InterviewScheduled,
            cascade,
        );
        Ok(Cascaded::new(interview, failed.into_iter().collect()))
    }

    /// Participant resets after the move are follow-ups: their failures come
    /// back as a partial success, not an error.
    pub async fn reschedule(
        &self,
        interview_id: Uuid,
        req: RescheduleRequest,
        actor_id: Uuid,
    ) -> Result<Cascaded<Interview>> {
        let interview = self.load(interview_id).await?;
        let participants = self.authorize(&interview, actor_id).await?;
        ensure_from(&interview, RESCHEDULABLE, "reschedule")?;

        let now = self.clock.now();
        if req.scheduled_at <= now {
            return Err(Error::InvalidSchedule(
                "New time must be in the future".to_string(),
            ));
        }
        if req.scheduled_at <= interview.scheduled_at {
            return Err(Error::InvalidSchedule(format!(
                "New time must be later than the current time {}",
                interview.scheduled_at
            )));
        }

        let mut updated = interview.clone();
        updated.status = Rescheduled;
        updated.scheduled_at = req.scheduled_at;
        if let Some(duration) = req.duration_minutes {
            validate_duration(duration)?;
            updated.duration_minutes = duration;
        }
        if req.location.is_some() {
            updated.location = non_blank(req.location);
        }
        if req.meeting_link.is_some() {
            updated.meeting_link = non_blank(req.meeting_link);
        }
        if req.notes.is_some() {
            updated.notes = non_blank(req.notes);
        }
        validate_venue(updated.interview_type, &updated.location, &updated.meeting_link)?;
        interview_end(updated.scheduled_at, updated.duration_minutes)?;
        if self.config.reject_overlapping_interviews {
            self.ensure_no_overlap(
                &participants,
                Some(interview.id),
                updated.scheduled_at,
                updated.duration_minutes,
            )
            .await?;
        }
        updated.updated_at = now;

        let notes = format!(
            "Rescheduled from {} to {}",
            interview.scheduled_at.to_rfc3339(),
            updated.scheduled_at.to_rfc3339()
        );
        let updated = self.write(&interview, updated, actor_id, Some(notes)).await?;

        let mut failed = Vec::new();
        for participant in &participants {
            if matches!(
                participant.status,
                ParticipantStatus::Confirmed | ParticipantStatus::Declined
            ) {
                let reset = self
                    .store
                    .set_participant_status(interview.id, participant.user_id, ParticipantStatus::Invited)
                    .await;
                failed.extend(follow_up_failure("reset participant response", participant.user_id, reset));
            }
        }

        self.notifier
            .emit(PipelineEvent::InterviewRescheduled {
                interview_id: updated.id,
                application_id: updated.application_id,
                previous_scheduled_at: interview.scheduled_at,
                scheduled_at: updated.scheduled_at,
            })
            .await;
        Ok(Cascaded::new(updated, failed))
    }

    pub async fn cancel(
        &self,
        interview_id: Uuid,
        reason: Option<String>,
        actor_id: Uuid,
    ) -> Result<Interview> {
        let interview = self.load(interview_id).await?;
        self.authorize(&interview, actor_id).await?;
        self.cancel_loaded(interview, non_blank(reason), actor_id).await
    }

    pub async fn confirm(&self, interview_id: Uuid, actor_id: Uuid) -> Result<Interview> {
        let interview = self.load(interview_id).await?;
        self.authorize(&interview, actor_id).await?;
        ensure_from(&interview, CONFIRMABLE, "confirm")?;

        let mut updated = interview.clone();
        updated.status = Confirmed;
        updated.updated_at = self.clock.now();
        self.write(&interview, updated, actor_id, None).await
    }

    pub async fn start(&self, interview_id: Uuid, actor_id: Uuid) -> Result<Interview> {
        let interview = self.load(interview_id).await?;
        self.authorize(&interview, actor_id).await?;
        ensure_from(&interview, STARTABLE, "start")?;

        let mut updated = interview.clone();
        updated.status = InProgress;
        updated.updated_at = self.clock.now();
        self.write(&interview, updated, actor_id, None).await
    }

    pub async fn complete(
        &self,
        interview_id: Uuid,
        notes: Option<String>,
        actor_id: Uuid,
    ) -> Result<Cascaded<Interview>> {
        let interview = self.load(interview_id).await?;
        let participants = self.authorize(&interview, actor_id).await?;
        ensure_from(&interview, COMPLETABLE, "complete")?;

        let now = self.clock.now();
        if interview.scheduled_at > now {
            return Err(Error::InvalidTransition(
                "Interview cannot be completed before its scheduled time".to_string(),
            ));
        }

        let notes = non_blank(notes);
        let mut updated = interview.clone();
        updated.status = Completed;
        updated.completed_at = Some(now);
        updated.updated_at = now;
        if let Some(extra) = &notes {
            updated.notes = Some(append_note(interview.notes.as_deref(), extra));
        }
        let updated = self.write(&interview, updated, actor_id, notes).await?;
        let mut failed = self
            .mark_candidate(&participants, updated.id, ParticipantStatus::Attended)
            .await;

        self.notifier
            .emit(PipelineEvent::InterviewCompleted {
                interview_id: updated.id,
                application_id: updated.application_id,
            })
            .await;

        let cascade = self
            .lifecycle
            .complete_cascade(updated.application_id, actor_id)
            .await;
        failed.extend(cascade_failure(
            updated.id,
            updated.application_id,
            ApplicationStatus::InterviewCompleted,
            cascade,
        ));
        Ok(Cascaded::new(updated, failed))
    }

    pub async fn mark_no_show(
        &self,
        interview_id: Uuid,
        actor_id: Uuid,
    ) -> Result<Cascaded<Interview>> {
        let interview = self.load(interview_id).await?;
        let participants = self.authorize(&interview, actor_id).await?;
        ensure_from(&interview, NO_SHOW_ELIGIBLE, "mark as no-show")?;

        let now = self.clock.now();
        if interview.scheduled_at > now {
            return Err(Error::InvalidTransition(
                "Interview cannot be marked as no-show before its scheduled time".to_string(),
            ));
        }

        let mut updated = interview.clone();
        updated.status = NoShow;
        updated.updated_at = now;
        let updated = self.write(&interview, updated, actor_id, None).await?;
        let failed = self
            .mark_candidate(&participants, updated.id, ParticipantStatus::NoShow)
            .await;

        self.notifier
            .emit(PipelineEvent::InterviewNoShow {
                interview_id: updated.id,
                application_id: updated.application_id,
            })
            .await;
        Ok(Cascaded::new(updated, failed))
    }

    /// A participant accepts or declines their invitation.
    pub async fn respond(
        &self,
        interview_id: Uuid,
        user_id: Uuid,
        accept: bool,
    ) -> Result<InterviewParticipant> {
        let interview = self.load(interview_id).await?;
        if interview.status.is_terminal() {
            return Err(Error::InvalidTransition(format!(
                "Cannot respond to a {} interview",
                interview.status
            )));
        }
        let participants = self.store.participants(interview_id).await?;
        let Some(mut participant) = participants.into_iter().find(|p| p.user_id == user_id) else {
            return Err(Error::Unauthorized(format!(
                "User {} is not invited to interview {}",
                user_id, interview_id
            )));
        };
        if !matches!(
            participant.status,
            ParticipantStatus::Invited | ParticipantStatus::Confirmed | ParticipantStatus::Declined
        ) {
            return Err(Error::InvalidTransition(format!(
                "Participant is already marked {}",
                participant.status.as_str()
            )));
        }

        participant.status = if accept {
            ParticipantStatus::Confirmed
        } else {
            ParticipantStatus::Declined
        };
        self.store
            .set_participant_status(interview_id, user_id, participant.status)
            .await?;
        tracing::info!(
            interview_id = %interview_id,
            user_id = %user_id,
            status = participant.status.as_str(),
            "participant responded"
        );
        Ok(participant)
    }

    /// Withdraws the application, then cancels every interview still active
    /// against it. Cancellation failures are reported, not raised.
    pub async fn withdraw_application(
        &self,
        application_id: Uuid,
        candidate_id: Uuid,
    ) -> Result<Cascaded<Withdrawal>> {
        let application = self.lifecycle.withdraw(application_id, candidate_id).await?;

        let mut cancelled = Vec::new();
        let mut failed = Vec::new();
        let interviews = match self.store.interviews_for_application(application_id).await {
            Ok(interviews) => interviews,
            Err(err) => {
                tracing::error!(application_id = %application_id, error = %err, "listing interviews to cancel failed");
                failed.push(CascadeFailure::new("list interviews", application_id, &err));
                Vec::new()
            }
        };
        for interview in interviews {
            if !CANCELLABLE.contains(&interview.status) {
                continue;
            }
            let id = interview.id;
            match self
                .cancel_loaded(interview, Some("Application withdrawn".to_string()), candidate_id)
                .await
            {
                Ok(interview) => cancelled.push(interview),
                Err(err) => {
                    tracing::error!(interview_id = %id, error = %err, "cascade cancel failed");
                    failed.push(CascadeFailure::new("cancel interview", id, &err));
                }
            }
        }

        Ok(Cascaded::new(
            Withdrawal {
                application,
                cancelled_interviews: cancelled,
            },
            failed,
        ))
    }

    /// Re-applies application cascades that a previous partial failure left
    /// behind. Safe to call any number of times.
    pub async fn reconcile(&self, application_id: Uuid, actor_id: Uuid) -> Result<Application> {
        let application = self.lifecycle.get(application_id).await?;
        if actor_id != application.employer_id {
            return Err(Error::Unauthorized(
                "Only the owning employer can reconcile an application".to_string(),
            ));
        }
        if self.config.transitions.is_terminal(application.status) {
            return Ok(application);
        }
        let interviews = self.store.interviews_for_application(application_id).await?;
        let any_active = interviews.iter().any(|i| i.status.is_active());
        let any_completed = interviews.iter().any(|i| i.status == Completed);

        if any_active || any_completed {
            self.lifecycle
                .advance(
                    application_id,
                    ApplicationStatus::InterviewScheduled,
                    actor_id,
                    Some("Reconciled with interview schedule".to_string()),
                )
                .await?;
        }
        if any_completed {
            self.lifecycle.complete_cascade(application_id, actor_id).await?;
        }
        self.lifecycle.get(application_id).await
    }

    pub async fn get_interview(&self, interview_id: Uuid) -> Result<Interview> {
        self.load(interview_id).await
    }

    pub async fn interview_details(&self, interview_id: Uuid) -> Result<InterviewDetails> {
        let interview = self.load(interview_id).await?;
        let participants = self.store.participants(interview_id).await?;
        let history = self.ledger.interview_history(interview_id).await?;
        Ok(InterviewDetails {
            interview,
            participants,
            history,
        })
    }

    pub async fn interviews_for_application(&self, application_id: Uuid) -> Result<Vec<Interview>> {
        self.lifecycle.get(application_id).await?;
        self.store.interviews_for_application(application_id).await
    }

    pub async fn interviews_for_user(
        &self,
        user_id: Uuid,
        role: Option<ParticipantRole>,
    ) -> Result<Vec<Interview>> {
        self.store.interviews_for_user(user_id, role).await
    }

    async fn cancel_loaded(
        &self,
        interview: Interview,
        reason: Option<String>,
        actor_id: Uuid,
    ) -> Result<Interview> {
        ensure_from(&interview, CANCELLABLE, "cancel")?;

        let mut updated = interview.clone();
        updated.status = Cancelled;
        updated.updated_at = self.clock.now();
        let line = match &reason {
            Some(reason) => format!("Cancelled: {}", reason),
            None => "Cancelled".to_string(),
        };
        updated.notes = Some(append_note(interview.notes.as_deref(), &line));
        let updated = self.write(&interview, updated, actor_id, reason.clone()).await?;

        self.notifier
            .emit(PipelineEvent::InterviewCancelled {
                interview_id: updated.id,
                application_id: updated.application_id,
                reason,
            })
            .await;
        Ok(updated)
    }

    async fn load(&self, interview_id: Uuid) -> Result<Interview> {
        self.store
            .get_interview(interview_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Interview {} not found", interview_id)))
    }

    /// The owning employer or an interviewer on the panel may act on an
    /// interview. Returns the participants for reuse.
    async fn authorize(
        &self,
        interview: &Interview,
        actor_id: Uuid,
    ) -> Result<Vec<InterviewParticipant>> {
        let participants = self.store.participants(interview.id).await?;
        let is_interviewer = participants
            .iter()
            .any(|p| p.user_id == actor_id && p.role == ParticipantRole::Interviewer);
        if is_interviewer {
            return Ok(participants);
        }
        let application: Application = self.lifecycle.get(interview.application_id).await?;
        if application.employer_id == actor_id {
            return Ok(participants);
        }
        Err(Error::Unauthorized(format!(
            "Actor {} may not manage interview {}",
            actor_id, interview.id
        )))
    }

    async fn write(
        &self,
        before: &Interview,
        after: Interview,
        actor_id: Uuid,
        notes: Option<String>,
    ) -> Result<Interview> {
        let event = self.ledger.interview_entry(
            before.id,
            Some(before.status),
            after.status,
            actor_id,
            notes,
        );
        let written = self
            .store
            .compare_and_set_interview(&after, before.status, &event)
            .await?;
        if !written {
            return Err(Error::ConcurrentModification(format!(
                "Interview {} changed while moving {} -> {}",
                before.id, before.status, after.status
            )));
        }
        tracing::info!(
            interview_id = %before.id,
            from = %before.status,
            to = %after.status,
            actor_id = %actor_id,
            "interview status changed"
        );
        Ok(after)
    }

    async fn mark_candidate(
        &self,
        participants: &[InterviewParticipant],
        interview_id: Uuid,
        status: ParticipantStatus,
    ) -> Vec<CascadeFailure> {
        let Some(candidate) = participants
            .iter()
            .find(|p| p.role == ParticipantRole::Candidate)
        else {
            return Vec::new();
        };
        let marked = self
            .store
            .set_participant_status(interview_id, candidate.user_id, status)
            .await;
        follow_up_failure(
            format!("mark candidate {}", status.as_str()),
            candidate.user_id,
            marked,
        )
        .into_iter()
        .collect()
    }

    async fn ensure_no_overlap(
        &self,
        participants: &[InterviewParticipant],
        exclude: Option<Uuid>,
        start: DateTime<Utc>,
        duration_minutes: i32,
    ) -> Result<()> {
        let end = interview_end(start, duration_minutes)?;
        for participant in participants
            .iter()
            .filter(|p| p.role == ParticipantRole::Interviewer)
        {
            let booked = self
                .store
                .interviews_for_user(participant.user_id, Some(ParticipantRole::Interviewer))
                .await?;
            let clash = booked.iter().find(|i| {
                Some(i.id) != exclude && i.status.is_active() && i.overlaps(start, end)
            });
            if let Some(clash) = clash {
                return Err(Error::InvalidSchedule(format!(
                    "Interviewer {} is already booked for interview {} at {}",
                    participant.user_id, clash.id, clash.scheduled_at
                )));
            }
        }
        Ok(())
    }
}

fn ensure_from(interview: &Interview, allowed: &[InterviewStatus], action: &str) -> Result<()> {
    if allowed.contains(&interview.status) {
        Ok(())
    } else {
        Err(Error::InvalidTransition(format!(
            "Cannot {} an interview that is {}",
            action, interview.status
        )))
    }
}

fn validate_duration(duration_minutes: i32) -> Result<()> {
    if duration_minutes <= 0 {
        return Err(Error::InvalidSchedule(
            "duration_minutes must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn validate_venue(
    interview_type: InterviewType,
    location: &Option<String>,
    meeting_link: &Option<String>,
) -> Result<()> {
    match interview_type {
        InterviewType::InPerson if location.is_none() => Err(Error::MissingRequiredField(
            "location is required for in-person interviews".to_string(),
        )),
        InterviewType::Video if meeting_link.is_none() => Err(Error::MissingRequiredField(
            "meeting_link is required for video interviews".to_string(),
        )),
        _ => Ok(()),
    }
}

fn interview_end(start: DateTime<Utc>, duration_minutes: i32) -> Result<DateTime<Utc>> {
    start
        .checked_add_signed(Duration::minutes(i64::from(duration_minutes)))
        .ok_or_else(|| {
            Error::InvalidSchedule(format!(
                "{} plus {} minutes is out of range",
                start, duration_minutes
            ))
        })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn append_note(existing: Option<&str>, line: &str) -> String {
    match existing {
        Some(existing) if !existing.is_empty() => format!("{}\n{}", existing, line),
        _ => line.to_string(),
    }
}

/// Candidate first, then each distinct interviewer, then each distinct
/// observer. The candidate's own id is never added to the panel.
fn build_participants(
    interview_id: Uuid,
    candidate_id: Uuid,
    interviewer_ids: &[Uuid],
    observer_ids: &[Uuid],
) -> Vec<InterviewParticipant> {
    let mut seen = HashSet::from([candidate_id]);
    let mut participants = vec![InterviewParticipant {
        interview_id,
        user_id: candidate_id,
        role: ParticipantRole::Candidate,
        status: ParticipantStatus::Invited,
    }];
    let panel = interviewer_ids
        .iter()
        .map(|id| (*id, ParticipantRole::Interviewer))
        .chain(observer_ids.iter().map(|id| (*id, ParticipantRole::Observer)));
    for (user_id, role) in panel {
        if seen.insert(user_id) {
            participants.push(InterviewParticipant {
                interview_id,
                user_id,
                role,
                status: ParticipantStatus::Invited,
            });
        }
    }
    participants
}

fn cascade_failure(
    interview_id: Uuid,
    application_id: Uuid,
    target: ApplicationStatus,
    cascade: Result<Option<Application>>,
) -> Option<CascadeFailure> {
    let err = cascade.err()?;
    tracing::error!(
        interview_id = %interview_id,
        application_id = %application_id,
        error = %err,
        "application cascade failed"
    );
    Some(CascadeFailure::new(
        format!("transition application to {}", target),
        application_id,
        &err,
    ))
}

fn follow_up_failure<T>(
    operation: impl Into<String>,
    entity_id: Uuid,
    result: Result<T>,
) -> Option<CascadeFailure> {
    let err = result.err()?;
    let operation = operation.into();
    tracing::error!(entity_id = %entity_id, error = %err, "{} failed", operation);
    Some(CascadeFailure::new(operation, entity_id, &err))
}
