use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::application::{ApplicantProfile, ApplicationStatus, NewApplication};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SubmitApplicationPayload {
    pub job_id: Uuid,
    pub employer_id: Uuid,
    #[validate(length(max = 200))]
    pub full_name: String,
    #[validate(length(max = 320))]
    pub email: String,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    #[validate(url)]
    pub resume_url: Option<String>,
    #[validate(length(max = 10000))]
    pub cover_letter: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[validate(range(min = 0))]
    pub expected_salary: Option<i64>,
}

impl SubmitApplicationPayload {
    /// The authenticated caller is always the candidate.
    pub fn into_new_application(self, candidate_id: Uuid) -> NewApplication {
        NewApplication {
            job_id: self.job_id,
            candidate_id,
            employer_id: self.employer_id,
            profile: ApplicantProfile {
                full_name: self.full_name,
                email: self.email,
                phone: self.phone,
                resume_url: self.resume_url,
                cover_letter: self.cover_letter,
                skills: self.skills,
                expected_salary: self.expected_salary,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TransitionPayload {
    pub status: ApplicationStatus,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}
