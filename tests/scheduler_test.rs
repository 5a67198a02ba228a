mod common;

use chrono::{DateTime, Duration, Utc};
use common::Harness;
use hiring_pipeline::config::PipelineConfig;
use hiring_pipeline::error::Error;
use hiring_pipeline::models::application::ApplicationStatus;
use hiring_pipeline::models::interview::{
    InterviewStatus, InterviewType, ParticipantRole, ParticipantStatus,
};
use hiring_pipeline::services::scheduler_service::RescheduleRequest;
use uuid::Uuid;

fn later(h: &Harness, hours: i64) -> RescheduleRequest {
    RescheduleRequest {
        scheduled_at: h.clock_now() + Duration::hours(hours),
        duration_minutes: None,
        location: None,
        meeting_link: None,
        notes: None,
    }
}

#[tokio::test]
async fn schedule_always_invites_exactly_one_candidate() {
    let h = Harness::new();
    let application = h.under_review().await;
    let panel = Uuid::new_v4();

    for interviewers in [vec![], vec![h.interviewer, panel, h.interviewer, h.candidate]] {
        let mut request = h.video_request(application.id, 24);
        request.interviewer_ids = interviewers;
        let interview = h
            .state
            .scheduler
            .schedule(request, h.employer)
            .await
            .unwrap()
            .into_value();

        let details = h.state.scheduler.interview_details(interview.id).await.unwrap();
        let candidates: Vec<_> = details
            .participants
            .iter()
            .filter(|p| p.role == ParticipantRole::Candidate)
            .collect();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].user_id, h.candidate);
        assert!(details
            .participants
            .iter()
            .all(|p| p.status == ParticipantStatus::Invited));
    }
}

#[tokio::test]
async fn video_interview_needs_a_link_and_advances_the_application() {
    let h = Harness::new();
    let application = h.under_review().await;

    let mut request = h.video_request(application.id, 24);
    request.meeting_link = None;
    let err = h
        .state
        .scheduler
        .schedule(request, h.employer)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::MissingRequiredField(_)));
    assert!(h
        .state
        .scheduler
        .interviews_for_application(application.id)
        .await
        .unwrap()
        .is_empty());

    let outcome = h
        .state
        .scheduler
        .schedule(h.video_request(application.id, 24), h.employer)
        .await
        .unwrap();
    assert!(!outcome.is_partial());
    assert_eq!(outcome.value().status, InterviewStatus::Scheduled);
    assert_eq!(outcome.value().meeting_link.as_deref(), Some("https://example.com/x"));

    let application = h.state.lifecycle.get(application.id).await.unwrap();
    assert_eq!(application.status, ApplicationStatus::InterviewScheduled);
}

#[tokio::test]
async fn scheduling_from_submitted_walks_through_review() {
    let h = Harness::new();
    let application = h.submit().await;
    h.schedule(&application).await;

    let history = h.state.ledger.application_replay(application.id).await.unwrap();
    let walk: Vec<_> = history.iter().map(|e| e.to_status).collect();
    assert_eq!(
        walk,
        vec![
            ApplicationStatus::Submitted,
            ApplicationStatus::UnderReview,
            ApplicationStatus::InterviewScheduled,
        ]
    );
}

#[tokio::test]
async fn second_interview_does_not_touch_the_application() {
    let h = Harness::new();
    let application = h.under_review().await;
    h.schedule(&application).await;
    h.schedule(&application).await;

    let history = h.state.ledger.application_history(application.id).await.unwrap();
    assert_eq!(history.len(), 3);
}

#[tokio::test]
async fn schedule_validates_time_duration_and_owner() {
    let h = Harness::new();
    let application = h.under_review().await;

    let past = h.video_request(application.id, -1);
    let err = h.state.scheduler.schedule(past, h.employer).await.unwrap_err();
    assert!(matches!(err, Error::InvalidSchedule(_)));

    let mut zero = h.video_request(application.id, 24);
    zero.duration_minutes = 0;
    let err = h.state.scheduler.schedule(zero, h.employer).await.unwrap_err();
    assert!(matches!(err, Error::InvalidSchedule(_)));

    let mut in_person = h.video_request(application.id, 24);
    in_person.interview_type = InterviewType::InPerson;
    let err = h
        .state
        .scheduler
        .schedule(in_person, h.employer)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::MissingRequiredField(_)));

    let err = h
        .state
        .scheduler
        .schedule(h.video_request(application.id, 24), h.interviewer)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Unauthorized(_)));
}

#[tokio::test]
async fn closed_application_cannot_get_interviews() {
    let h = Harness::new();
    let application = h.under_review().await;
    h.move_to(&application, ApplicationStatus::Rejected).await;

    let err = h
        .state
        .scheduler
        .schedule(h.video_request(application.id, 24), h.employer)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidTransition(_)));
    assert!(h
        .state
        .scheduler
        .interviews_for_application(application.id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn reschedule_only_moves_later() {
    let h = Harness::new();
    let application = h.under_review().await;
    let interview = h.schedule(&application).await;

    for hours in [24, 12] {
        let err = h
            .state
            .scheduler
            .reschedule(interview.id, later(&h, hours), h.employer)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidSchedule(_)), "{} hours", hours);
    }

    let moved = h
        .state
        .scheduler
        .reschedule(interview.id, later(&h, 48), h.employer)
        .await
        .unwrap()
        .into_value();
    assert_eq!(moved.status, InterviewStatus::Rescheduled);
    assert_eq!(moved.scheduled_at, h.clock_now() + Duration::hours(48));

    let again = h
        .state
        .scheduler
        .reschedule(interview.id, later(&h, 72), h.interviewer)
        .await
        .unwrap()
        .into_value();
    assert_eq!(again.status, InterviewStatus::Rescheduled);

    let history = h.state.ledger.interview_history(interview.id).await.unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].from_status, Some(InterviewStatus::Rescheduled));
}

#[tokio::test]
async fn reschedule_resets_responses() {
    let h = Harness::new();
    let application = h.under_review().await;
    let interview = h.schedule(&application).await;

    let accepted = h
        .state
        .scheduler
        .respond(interview.id, h.candidate, true)
        .await
        .unwrap();
    assert_eq!(accepted.status, ParticipantStatus::Confirmed);
    h.state
        .scheduler
        .respond(interview.id, h.interviewer, false)
        .await
        .unwrap();

    let moved = h
        .state
        .scheduler
        .reschedule(interview.id, later(&h, 48), h.employer)
        .await
        .unwrap();
    assert!(!moved.is_partial());
    let details = h.state.scheduler.interview_details(interview.id).await.unwrap();
    assert!(details
        .participants
        .iter()
        .all(|p| p.status == ParticipantStatus::Invited));

    let err = h
        .state
        .scheduler
        .respond(interview.id, Uuid::new_v4(), true)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Unauthorized(_)));
}

#[tokio::test]
async fn finished_interviews_cannot_be_rescheduled_or_cancelled() {
    let h = Harness::new();

    let (_, completed) = h.completed_interview().await;
    let err = h
        .state
        .scheduler
        .reschedule(completed.id, later(&h, 48), h.employer)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidTransition(_)));
    let err = h
        .state
        .scheduler
        .cancel(completed.id, None, h.employer)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidTransition(_)));

    let application = h.under_review().await;
    let interview = h.schedule(&application).await;
    let cancelled = h
        .state
        .scheduler
        .cancel(interview.id, Some("Panel unavailable".into()), h.employer)
        .await
        .unwrap();
    assert_eq!(cancelled.status, InterviewStatus::Cancelled);
    assert!(cancelled.notes.unwrap().contains("Panel unavailable"));

    let err = h
        .state
        .scheduler
        .reschedule(interview.id, later(&h, 96), h.employer)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidTransition(_)));

    let application = h.state.lifecycle.get(application.id).await.unwrap();
    assert_eq!(application.status, ApplicationStatus::InterviewScheduled);
}

#[tokio::test]
async fn complete_waits_for_the_slot_and_cascades() {
    let h = Harness::new();
    let application = h.under_review().await;
    let interview = h.schedule(&application).await;

    let err = h
        .state
        .scheduler
        .complete(interview.id, None, h.interviewer)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidTransition(_)));

    h.clock.advance(Duration::hours(24));
    let outcome = h
        .state
        .scheduler
        .complete(interview.id, Some("Strong systems answers".into()), h.interviewer)
        .await
        .unwrap();
    assert!(!outcome.is_partial());
    let completed = outcome.into_value();
    assert_eq!(completed.status, InterviewStatus::Completed);
    assert_eq!(completed.completed_at, Some(h.clock_now()));

    let application = h.state.lifecycle.get(application.id).await.unwrap();
    assert_eq!(application.status, ApplicationStatus::InterviewCompleted);

    let details = h.state.scheduler.interview_details(interview.id).await.unwrap();
    let candidate = details
        .participants
        .iter()
        .find(|p| p.role == ParticipantRole::Candidate)
        .unwrap();
    assert_eq!(candidate.status, ParticipantStatus::Attended);
}

#[tokio::test]
async fn confirm_and_start_before_completing() {
    let h = Harness::new();
    let application = h.under_review().await;
    let interview = h.schedule(&application).await;

    let confirmed = h.state.scheduler.confirm(interview.id, h.employer).await.unwrap();
    assert_eq!(confirmed.status, InterviewStatus::Confirmed);
    let err = h
        .state
        .scheduler
        .confirm(interview.id, h.employer)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidTransition(_)));

    let started = h.state.scheduler.start(interview.id, h.interviewer).await.unwrap();
    assert_eq!(started.status, InterviewStatus::InProgress);

    h.clock.advance(Duration::hours(25));
    let completed = h
        .state
        .scheduler
        .complete(interview.id, None, h.interviewer)
        .await
        .unwrap()
        .into_value();
    assert_eq!(completed.status, InterviewStatus::Completed);

    let history = h.state.ledger.interview_history(interview.id).await.unwrap();
    let statuses: Vec<_> = history.iter().map(|e| e.to_status).collect();
    assert_eq!(
        statuses,
        vec![
            InterviewStatus::Completed,
            InterviewStatus::InProgress,
            InterviewStatus::Confirmed,
            InterviewStatus::Scheduled,
        ]
    );
}

#[tokio::test]
async fn no_show_marks_the_candidate_and_leaves_the_application() {
    let h = Harness::new();
    let application = h.under_review().await;
    let interview = h.schedule(&application).await;

    let err = h
        .state
        .scheduler
        .mark_no_show(interview.id, h.interviewer)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidTransition(_)));

    h.clock.advance(Duration::hours(26));
    let missed = h
        .state
        .scheduler
        .mark_no_show(interview.id, h.interviewer)
        .await
        .unwrap()
        .into_value();
    assert_eq!(missed.status, InterviewStatus::NoShow);

    let details = h.state.scheduler.interview_details(interview.id).await.unwrap();
    let candidate = details
        .participants
        .iter()
        .find(|p| p.role == ParticipantRole::Candidate)
        .unwrap();
    assert_eq!(candidate.status, ParticipantStatus::NoShow);

    let application = h.state.lifecycle.get(application.id).await.unwrap();
    assert_eq!(application.status, ApplicationStatus::InterviewScheduled);
}

#[tokio::test]
async fn strangers_cannot_manage_interviews() {
    let h = Harness::new();
    let application = h.under_review().await;
    let interview = h.schedule(&application).await;

    let err = h
        .state
        .scheduler
        .cancel(interview.id, None, h.candidate)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Unauthorized(_)));

    let err = h
        .state
        .scheduler
        .confirm(interview.id, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Unauthorized(_)));
}

#[tokio::test]
async fn withdrawal_cancels_active_interviews() {
    let h = Harness::new();
    let application = h.under_review().await;
    let first = h.schedule(&application).await;
    let second = h.schedule(&application).await;
    h.state.scheduler.cancel(second.id, None, h.employer).await.unwrap();

    let outcome = h
        .state
        .scheduler
        .withdraw_application(application.id, h.candidate)
        .await
        .unwrap();
    assert!(!outcome.is_partial());
    let withdrawal = outcome.into_value();
    assert_eq!(withdrawal.application.status, ApplicationStatus::Withdrawn);
    assert_eq!(withdrawal.cancelled_interviews.len(), 1);
    assert_eq!(withdrawal.cancelled_interviews[0].id, first.id);

    let interviews = h
        .state
        .scheduler
        .interviews_for_application(application.id)
        .await
        .unwrap();
    assert!(interviews
        .iter()
        .all(|i| i.status == InterviewStatus::Cancelled));
}

#[tokio::test]
async fn user_queries_filter_by_role() {
    let h = Harness::new();
    let application = h.under_review().await;
    let interview = h.schedule(&application).await;

    let as_interviewer = h
        .state
        .scheduler
        .interviews_for_user(h.interviewer, Some(ParticipantRole::Interviewer))
        .await
        .unwrap();
    assert_eq!(as_interviewer.len(), 1);
    assert_eq!(as_interviewer[0].id, interview.id);

    let as_candidate = h
        .state
        .scheduler
        .interviews_for_user(h.interviewer, Some(ParticipantRole::Candidate))
        .await
        .unwrap();
    assert!(as_candidate.is_empty());

    let any_role = h
        .state
        .scheduler
        .interviews_for_user(h.candidate, None)
        .await
        .unwrap();
    assert_eq!(any_role.len(), 1);
}

#[tokio::test]
async fn optional_hooks_block_double_booking() {
    let h = Harness::with_config(PipelineConfig {
        single_active_interview: true,
        reject_overlapping_interviews: true,
        ..PipelineConfig::default()
    });
    let application = h.under_review().await;
    h.schedule(&application).await;

    let err = h
        .state
        .scheduler
        .schedule(h.video_request(application.id, 48), h.employer)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidSchedule(_)));

    let other = h
        .state
        .lifecycle
        .submit(h.new_application(), h.candidate)
        .await
        .unwrap();
    let mut clash = h.video_request(other.id, 24);
    clash.scheduled_at += Duration::minutes(30);
    let err = h.state.scheduler.schedule(clash, h.employer).await.unwrap_err();
    assert!(matches!(err, Error::InvalidSchedule(_)));

    let clear = h.video_request(other.id, 26);
    h.state.scheduler.schedule(clear, h.employer).await.unwrap();
}

#[tokio::test]
async fn slots_past_the_calendar_range_are_rejected() {
    let h = Harness::with_config(PipelineConfig {
        reject_overlapping_interviews: true,
        ..PipelineConfig::default()
    });
    let application = h.under_review().await;

    let mut far = h.video_request(application.id, 24);
    far.scheduled_at = DateTime::<Utc>::MAX_UTC - Duration::minutes(30);
    let err = h.state.scheduler.schedule(far, h.employer).await.unwrap_err();
    assert!(matches!(err, Error::InvalidSchedule(_)));

    let interview = h.schedule(&application).await;
    let err = h
        .state
        .scheduler
        .reschedule(
            interview.id,
            RescheduleRequest {
                scheduled_at: DateTime::<Utc>::MAX_UTC - Duration::minutes(1),
                duration_minutes: None,
                location: None,
                meeting_link: None,
                notes: None,
            },
            h.employer,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidSchedule(_)));
}
