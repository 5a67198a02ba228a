use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use uuid::Uuid;

use crate::database::store::PipelineStore;
use crate::error::{Error, Result};
use crate::models::application::{Application, ApplicationStatus};
use crate::models::event::PipelineEvent;
use crate::models::feedback::{
    FeedbackPatch, FeedbackRollup, InterviewFeedback, NewFeedback, Recommendation,
};
use crate::models::interview::{Interview, InterviewStatus, ParticipantRole};
use crate::services::lifecycle_service::TransitionPolicy;
use crate::services::notification_service::Notifier;
use crate::utils::time::Clock;

#[derive(Clone)]
pub struct FeedbackService {
    store: Arc<dyn PipelineStore>,
    notifier: Notifier,
    clock: Arc<dyn Clock>,
}

impl FeedbackService {
    pub fn new(store: Arc<dyn PipelineStore>, notifier: Notifier, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            notifier,
            clock,
        }
    }

    /// Records an evaluation of a completed interview. An evaluator may submit
    /// more than once; readers use the most recent entry.
    pub async fn submit(
        &self,
        interview_id: Uuid,
        evaluator_id: Uuid,
        input: NewFeedback,
    ) -> Result<InterviewFeedback> {
        let interview = self.load_interview(interview_id).await?;
        if interview.status != InterviewStatus::Completed {
            return Err(Error::InvalidTransition(format!(
                "Feedback requires a completed interview, this one is {}",
                interview.status
            )));
        }
        validate_rating(input.rating)?;
        self.authorize_evaluator(&interview, evaluator_id).await?;

        let now = self.clock.now();
        let feedback = InterviewFeedback {
            id: Uuid::new_v4(),
            interview_id,
            evaluator_id,
            rating: input.rating,
            strengths: input.strengths,
            weaknesses: input.weaknesses,
            notes: input.notes,
            recommendation: input.recommendation,
            is_visible_to_candidate: input.is_visible_to_candidate,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_feedback(&feedback).await?;
        tracing::info!(
            interview_id = %interview_id,
            evaluator_id = %evaluator_id,
            recommendation = feedback.recommendation.as_str(),
            "feedback submitted"
        );

        self.notifier
            .emit(PipelineEvent::FeedbackSubmitted {
                interview_id,
                evaluator_id,
            })
            .await;
        Ok(feedback)
    }

    pub async fn update(
        &self,
        feedback_id: Uuid,
        evaluator_id: Uuid,
        patch: FeedbackPatch,
    ) -> Result<InterviewFeedback> {
        let mut feedback = self
            .store
            .get_feedback(feedback_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Feedback {} not found", feedback_id)))?;
        if feedback.evaluator_id != evaluator_id {
            return Err(Error::Unauthorized(
                "Only the original evaluator can edit feedback".to_string(),
            ));
        }
        validate_rating(patch.rating)?;

        if patch.rating.is_some() {
            feedback.rating = patch.rating;
        }
        if patch.strengths.is_some() {
            feedback.strengths = patch.strengths;
        }
        if patch.weaknesses.is_some() {
            feedback.weaknesses = patch.weaknesses;
        }
        if patch.notes.is_some() {
            feedback.notes = patch.notes;
        }
        if let Some(recommendation) = patch.recommendation {
            feedback.recommendation = recommendation;
        }
        if let Some(visible) = patch.is_visible_to_candidate {
            feedback.is_visible_to_candidate = visible;
        }
        feedback.updated_at = self.clock.now();

        self.store.update_feedback(&feedback).await?;
        tracing::info!(feedback_id = %feedback_id, "feedback updated");
        Ok(feedback)
    }

    pub async fn latest_by_evaluator(&self, interview_id: Uuid) -> Result<Vec<InterviewFeedback>> {
        self.load_interview(interview_id).await?;
        let all = self.store.feedback_for_interview(interview_id).await?;
        Ok(latest_per_evaluator(all))
    }

    pub async fn candidate_feedback(&self, interview_id: Uuid) -> Result<Vec<InterviewFeedback>> {
        let latest = self.latest_by_evaluator(interview_id).await?;
        Ok(latest
            .into_iter()
            .filter(|f| f.is_visible_to_candidate)
            .collect())
    }

    pub async fn rollup(&self, interview_id: Uuid) -> Result<FeedbackRollup> {
        let latest = self.latest_by_evaluator(interview_id).await?;
        Ok(compute_rollup(&latest))
    }

    /// Rollup across every completed interview of the application, one entry
    /// per evaluator.
    pub async fn application_rollup(&self, application_id: Uuid) -> Result<FeedbackRollup> {
        if self.store.get_application(application_id).await?.is_none() {
            return Err(Error::NotFound(format!(
                "Application {} not found",
                application_id
            )));
        }
        let mut all = Vec::new();
        for interview in self.store.interviews_for_application(application_id).await? {
            if interview.status == InterviewStatus::Completed {
                all.extend(self.store.feedback_for_interview(interview.id).await?);
            }
        }
        Ok(compute_rollup(&latest_per_evaluator(all)))
    }

    async fn load_interview(&self, interview_id: Uuid) -> Result<Interview> {
        self.store
            .get_interview(interview_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Interview {} not found", interview_id)))
    }

    async fn authorize_evaluator(&self, interview: &Interview, evaluator_id: Uuid) -> Result<()> {
        let on_panel = self
            .store
            .participants(interview.id)
            .await?
            .iter()
            .any(|p| p.user_id == evaluator_id && p.role != ParticipantRole::Candidate);
        if on_panel {
            return Ok(());
        }
        let owner = self
            .store
            .get_application(interview.application_id)
            .await?
            .map(|a: Application| a.employer_id);
        if owner == Some(evaluator_id) {
            return Ok(());
        }
        Err(Error::Unauthorized(format!(
            "User {} is not an evaluator on interview {}",
            evaluator_id, interview.id
        )))
    }
}

/// Blocks `offer_made` until the application's feedback leans favorable.
pub struct FavorableFeedbackPolicy {
    feedback: FeedbackService,
}

impl FavorableFeedbackPolicy {
    pub fn new(feedback: FeedbackService) -> Self {
        Self { feedback }
    }
}

#[async_trait]
impl TransitionPolicy for FavorableFeedbackPolicy {
    async fn check(&self, application: &Application, target: ApplicationStatus) -> Result<()> {
        if target != ApplicationStatus::OfferMade {
            return Ok(());
        }
        let rollup = self.feedback.application_rollup(application.id).await?;
        match rollup.consensus {
            Some(consensus) if consensus.is_favorable() => Ok(()),
            Some(consensus) => Err(Error::InvalidTransition(format!(
                "Offer requires favorable feedback, consensus is {}",
                consensus.as_str()
            ))),
            None => Err(Error::InvalidTransition(
                "Offer requires interview feedback".to_string(),
            )),
        }
    }
}

fn validate_rating(rating: Option<i32>) -> Result<()> {
    match rating {
        Some(r) if !(1..=5).contains(&r) => Err(Error::InvalidRating(r)),
        _ => Ok(()),
    }
}

/// Keeps the newest entry for each evaluator. Input is expected oldest first;
/// later entries win ties on `created_at`.
fn latest_per_evaluator(entries: Vec<InterviewFeedback>) -> Vec<InterviewFeedback> {
    let mut latest: HashMap<Uuid, InterviewFeedback> = HashMap::new();
    for entry in entries {
        match latest.get(&entry.evaluator_id) {
            Some(current) if current.created_at > entry.created_at => {}
            _ => {
                latest.insert(entry.evaluator_id, entry);
            }
        }
    }
    let mut out: Vec<_> = latest.into_values().collect();
    out.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    out
}

/// Mean of present ratings and the modal recommendation. A tie between
/// several modes resolves to the lower median of the tied values, which
/// leans negative.
pub fn compute_rollup(entries: &[InterviewFeedback]) -> FeedbackRollup {
    let ratings: Vec<i32> = entries.iter().filter_map(|f| f.rating).collect();
    let average_rating = if ratings.is_empty() {
        None
    } else {
        Some(ratings.iter().map(|&r| r as f64).sum::<f64>() / ratings.len() as f64)
    };

    let mut recommendation_counts: BTreeMap<Recommendation, u32> = BTreeMap::new();
    for entry in entries {
        *recommendation_counts.entry(entry.recommendation).or_insert(0) += 1;
    }

    let top = recommendation_counts.values().copied().max().unwrap_or(0);
    let tied: Vec<Recommendation> = recommendation_counts
        .iter()
        .filter(|(_, &count)| count == top)
        .map(|(&rec, _)| rec)
        .collect();
    let consensus = if tied.is_empty() {
        None
    } else {
        Some(tied[(tied.len() - 1) / 2])
    };

    FeedbackRollup {
        average_rating,
        recommendation_counts,
        consensus,
        feedback_count: entries.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn entry(evaluator: Uuid, minutes: i64, rating: Option<i32>, rec: Recommendation) -> InterviewFeedback {
        let at = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap() + Duration::minutes(minutes);
        InterviewFeedback {
            id: Uuid::new_v4(),
            interview_id: Uuid::nil(),
            evaluator_id: evaluator,
            rating,
            strengths: None,
            weaknesses: None,
            notes: None,
            recommendation: rec,
            is_visible_to_candidate: false,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn three_way_split_averages_and_picks_the_middle() {
        let entries = vec![
            entry(Uuid::new_v4(), 0, Some(4), Recommendation::Yes),
            entry(Uuid::new_v4(), 1, Some(3), Recommendation::Maybe),
            entry(Uuid::new_v4(), 2, Some(2), Recommendation::No),
        ];
        let rollup = compute_rollup(&entries);
        assert_eq!(rollup.average_rating, Some(3.0));
        assert_eq!(rollup.consensus, Some(Recommendation::Maybe));
        assert_eq!(rollup.feedback_count, 3);
    }

    #[test]
    fn even_split_leans_negative() {
        let entries = vec![
            entry(Uuid::new_v4(), 0, None, Recommendation::Yes),
            entry(Uuid::new_v4(), 1, None, Recommendation::No),
        ];
        let rollup = compute_rollup(&entries);
        assert_eq!(rollup.consensus, Some(Recommendation::No));
        assert_eq!(rollup.average_rating, None);
    }

    #[test]
    fn wide_ties_resolve_to_the_lower_median() {
        let odd = vec![
            entry(Uuid::new_v4(), 0, None, Recommendation::StrongYes),
            entry(Uuid::new_v4(), 1, None, Recommendation::StrongNo),
            entry(Uuid::new_v4(), 2, None, Recommendation::Yes),
        ];
        assert_eq!(compute_rollup(&odd).consensus, Some(Recommendation::Yes));

        let even = vec![
            entry(Uuid::new_v4(), 0, None, Recommendation::StrongYes),
            entry(Uuid::new_v4(), 1, None, Recommendation::Yes),
            entry(Uuid::new_v4(), 2, None, Recommendation::No),
            entry(Uuid::new_v4(), 3, None, Recommendation::StrongNo),
        ];
        assert_eq!(compute_rollup(&even).consensus, Some(Recommendation::No));

        let doubled = vec![
            entry(Uuid::new_v4(), 0, None, Recommendation::Maybe),
            entry(Uuid::new_v4(), 1, None, Recommendation::Maybe),
            entry(Uuid::new_v4(), 2, None, Recommendation::StrongYes),
            entry(Uuid::new_v4(), 3, None, Recommendation::StrongYes),
            entry(Uuid::new_v4(), 4, None, Recommendation::StrongNo),
        ];
        assert_eq!(compute_rollup(&doubled).consensus, Some(Recommendation::Maybe));
    }

    #[test]
    fn clear_mode_wins_over_order() {
        let entries = vec![
            entry(Uuid::new_v4(), 0, Some(5), Recommendation::StrongYes),
            entry(Uuid::new_v4(), 1, Some(5), Recommendation::StrongYes),
            entry(Uuid::new_v4(), 2, Some(1), Recommendation::StrongNo),
        ];
        let rollup = compute_rollup(&entries);
        assert_eq!(rollup.consensus, Some(Recommendation::StrongYes));
        assert_eq!(rollup.recommendation_counts[&Recommendation::StrongYes], 2);
    }

    #[test]
    fn empty_rollup_has_no_consensus() {
        let rollup = compute_rollup(&[]);
        assert_eq!(rollup.consensus, None);
        assert_eq!(rollup.feedback_count, 0);
        assert!(rollup.recommendation_counts.is_empty());
    }

    #[test]
    fn resubmission_replaces_earlier_entry() {
        let evaluator = Uuid::new_v4();
        let first = entry(evaluator, 0, Some(2), Recommendation::No);
        let second = entry(evaluator, 5, Some(4), Recommendation::Yes);
        let latest = latest_per_evaluator(vec![first, second.clone()]);
        assert_eq!(latest, vec![second]);
    }

    #[test]
    fn ratings_outside_one_to_five_are_rejected() {
        assert!(validate_rating(None).is_ok());
        assert!(validate_rating(Some(1)).is_ok());
        assert!(validate_rating(Some(5)).is_ok());
        assert!(matches!(validate_rating(Some(0)), Err(Error::InvalidRating(0))));
        assert!(matches!(validate_rating(Some(6)), Err(Error::InvalidRating(6))));
    }
}
