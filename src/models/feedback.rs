use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use uuid::Uuid;

/// Declaration order runs from most negative to most positive, so `Ord`
/// sorts pessimistic recommendations first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    StrongNo,
    No,
    Maybe,
    Yes,
    StrongYes,
}

impl Recommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::StrongNo => "strong_no",
            Recommendation::No => "no",
            Recommendation::Maybe => "maybe",
            Recommendation::Yes => "yes",
            Recommendation::StrongYes => "strong_yes",
        }
    }

    pub fn is_favorable(&self) -> bool {
        matches!(self, Recommendation::Yes | Recommendation::StrongYes)
    }
}

impl FromStr for Recommendation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "strong_no" => Ok(Recommendation::StrongNo),
            "no" => Ok(Recommendation::No),
            "maybe" => Ok(Recommendation::Maybe),
            "yes" => Ok(Recommendation::Yes),
            "strong_yes" => Ok(Recommendation::StrongYes),
            other => Err(format!("unknown recommendation '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewFeedback {
    pub id: Uuid,
    pub interview_id: Uuid,
    pub evaluator_id: Uuid,
    pub rating: Option<i32>,
    pub strengths: Option<String>,
    pub weaknesses: Option<String>,
    pub notes: Option<String>,
    pub recommendation: Recommendation,
    pub is_visible_to_candidate: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewFeedback {
    pub rating: Option<i32>,
    pub strengths: Option<String>,
    pub weaknesses: Option<String>,
    pub notes: Option<String>,
    pub recommendation: Recommendation,
    pub is_visible_to_candidate: bool,
}

/// Fields left as `None` keep their stored value.
#[derive(Debug, Clone, Default)]
pub struct FeedbackPatch {
    pub rating: Option<i32>,
    pub strengths: Option<String>,
    pub weaknesses: Option<String>,
    pub notes: Option<String>,
    pub recommendation: Option<Recommendation>,
    pub is_visible_to_candidate: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRollup {
    pub average_rating: Option<f64>,
    pub recommendation_counts: BTreeMap<Recommendation, u32>,
    pub consensus: Option<Recommendation>,
    pub feedback_count: usize,
}
