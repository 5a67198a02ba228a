use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use std::str::FromStr;
use uuid::Uuid;

use crate::database::store::PipelineStore;
use crate::error::{Error, Result};
use crate::models::application::{
    ApplicantProfile, Application, ApplicationStatus, ApplicationStatusEvent,
};
use crate::models::feedback::{InterviewFeedback, Recommendation};
use crate::models::interview::{
    Interview, InterviewParticipant, InterviewStatus, InterviewStatusEvent, InterviewType,
    ParticipantRole, ParticipantStatus,
};

const APPLICATION_COLUMNS: &str = "id, job_id, candidate_id, employer_id, status, full_name, email, phone, resume_url, cover_letter, skills, expected_salary, created_at, updated_at";
const INTERVIEW_COLUMNS: &str = "i.id, i.application_id, i.interview_type, i.status, i.scheduled_at, i.duration_minutes, i.location, i.meeting_link, i.notes, i.created_by, i.completed_at, i.created_at, i.updated_at";
const FEEDBACK_COLUMNS: &str = "id, interview_id, evaluator_id, rating, strengths, weaknesses, notes, recommendation, is_visible_to_candidate, created_at, updated_at";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn parse_column<T>(column: &str, raw: &str) -> Result<T>
where
    T: FromStr<Err = String>,
{
    raw.parse()
        .map_err(|e| Error::Internal(format!("Corrupt {} column: {}", column, e)))
}

#[derive(FromRow)]
struct ApplicationRow {
    id: Uuid,
    job_id: Uuid,
    candidate_id: Uuid,
    employer_id: Uuid,
    status: String,
    full_name: String,
    email: String,
    phone: Option<String>,
    resume_url: Option<String>,
    cover_letter: Option<String>,
    skills: Vec<String>,
    expected_salary: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ApplicationRow> for Application {
    type Error = Error;

    fn try_from(row: ApplicationRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            job_id: row.job_id,
            candidate_id: row.candidate_id,
            employer_id: row.employer_id,
            status: parse_column("applications.status", &row.status)?,
            profile: ApplicantProfile {
                full_name: row.full_name,
                email: row.email,
                phone: row.phone,
                resume_url: row.resume_url,
                cover_letter: row.cover_letter,
                skills: row.skills,
                expected_salary: row.expected_salary,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct StatusEventRow {
    id: Uuid,
    entity_id: Uuid,
    from_status: Option<String>,
    to_status: String,
    notes: Option<String>,
    actor_id: Uuid,
    created_at: DateTime<Utc>,
}

impl TryFrom<StatusEventRow> for ApplicationStatusEvent {
    type Error = Error;

    fn try_from(row: StatusEventRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            application_id: row.entity_id,
            from_status: row
                .from_status
                .as_deref()
                .map(|s| parse_column("application_status_events.from_status", s))
                .transpose()?,
            to_status: parse_column("application_status_events.to_status", &row.to_status)?,
            notes: row.notes,
            actor_id: row.actor_id,
            created_at: row.created_at,
        })
    }
}

impl TryFrom<StatusEventRow> for InterviewStatusEvent {
    type Error = Error;

    fn try_from(row: StatusEventRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            interview_id: row.entity_id,
            from_status: row
                .from_status
                .as_deref()
                .map(|s| parse_column("interview_status_events.from_status", s))
                .transpose()?,
            to_status: parse_column("interview_status_events.to_status", &row.to_status)?,
            notes: row.notes,
            actor_id: row.actor_id,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct InterviewRow {
    id: Uuid,
    application_id: Uuid,
    interview_type: String,
    status: String,
    scheduled_at: DateTime<Utc>,
    duration_minutes: i32,
    location: Option<String>,
    meeting_link: Option<String>,
    notes: Option<String>,
    created_by: Uuid,
    completed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<InterviewRow> for Interview {
    type Error = Error;

    fn try_from(row: InterviewRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            application_id: row.application_id,
            interview_type: parse_column::<InterviewType>("interviews.interview_type", &row.interview_type)?,
            status: parse_column("interviews.status", &row.status)?,
            scheduled_at: row.scheduled_at,
            duration_minutes: row.duration_minutes,
            location: row.location,
            meeting_link: row.meeting_link,
            notes: row.notes,
            created_by: row.created_by,
            completed_at: row.completed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct ParticipantRow {
    interview_id: Uuid,
    user_id: Uuid,
    role: String,
    status: String,
}

impl TryFrom<ParticipantRow> for InterviewParticipant {
    type Error = Error;

    fn try_from(row: ParticipantRow) -> Result<Self> {
        Ok(Self {
            interview_id: row.interview_id,
            user_id: row.user_id,
            role: parse_column::<ParticipantRole>("interview_participants.role", &row.role)?,
            status: parse_column::<ParticipantStatus>("interview_participants.status", &row.status)?,
        })
    }
}

#[derive(FromRow)]
struct FeedbackRow {
    id: Uuid,
    interview_id: Uuid,
    evaluator_id: Uuid,
    rating: Option<i32>,
    strengths: Option<String>,
    weaknesses: Option<String>,
    notes: Option<String>,
    recommendation: String,
    is_visible_to_candidate: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<FeedbackRow> for InterviewFeedback {
    type Error = Error;

    fn try_from(row: FeedbackRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            interview_id: row.interview_id,
            evaluator_id: row.evaluator_id,
            rating: row.rating,
            strengths: row.strengths,
            weaknesses: row.weaknesses,
            notes: row.notes,
            recommendation: parse_column::<Recommendation>(
                "interview_feedback.recommendation",
                &row.recommendation,
            )?,
            is_visible_to_candidate: row.is_visible_to_candidate,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn convert_all<R, T>(rows: Vec<R>) -> Result<Vec<T>>
where
    T: TryFrom<R, Error = Error>,
{
    rows.into_iter().map(T::try_from).collect()
}

#[async_trait]
impl PipelineStore for PgStore {
    async fn insert_application(
        &self,
        application: &Application,
        initial_event: &ApplicationStatusEvent,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO applications (id, job_id, candidate_id, employer_id, status, full_name, email, phone, resume_url, cover_letter, skills, expected_salary, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(application.id)
        .bind(application.job_id)
        .bind(application.candidate_id)
        .bind(application.employer_id)
        .bind(application.status.as_str())
        .bind(&application.profile.full_name)
        .bind(&application.profile.email)
        .bind(&application.profile.phone)
        .bind(&application.profile.resume_url)
        .bind(&application.profile.cover_letter)
        .bind(&application.profile.skills)
        .bind(application.profile.expected_salary)
        .bind(application.created_at)
        .bind(application.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|err| match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => Error::BadRequest(format!(
                "Candidate {} has already applied to job {}",
                application.candidate_id, application.job_id
            )),
            _ => Error::from(err),
        })?;

        insert_application_event(&mut tx, initial_event).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn get_application(&self, id: Uuid) -> Result<Option<Application>> {
        let row = sqlx::query_as::<_, ApplicationRow>(&format!(
            "SELECT {} FROM applications WHERE id = $1",
            APPLICATION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Application::try_from).transpose()
    }

    async fn compare_and_set_application_status(
        &self,
        id: Uuid,
        expected: ApplicationStatus,
        event: &ApplicationStatusEvent,
    ) -> Result<Option<Application>> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query_as::<_, ApplicationRow>(&format!(
            "UPDATE applications SET status = $1, updated_at = $2 WHERE id = $3 AND status = $4 RETURNING {}",
            APPLICATION_COLUMNS
        ))
        .bind(event.to_status.as_str())
        .bind(event.created_at)
        .bind(id)
        .bind(expected.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            tx.rollback().await?;
            let exists: Option<Uuid> = sqlx::query_scalar("SELECT id FROM applications WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
            return match exists {
                Some(_) => Ok(None),
                None => Err(Error::NotFound(format!("Application {} not found", id))),
            };
        };

        insert_application_event(&mut tx, event).await?;
        tx.commit().await?;
        Ok(Some(Application::try_from(row)?))
    }

    async fn application_events(&self, application_id: Uuid) -> Result<Vec<ApplicationStatusEvent>> {
        let rows = sqlx::query_as::<_, StatusEventRow>(
            r#"
            SELECT id, application_id AS entity_id, from_status, to_status, notes, actor_id, created_at
            FROM application_status_events
            WHERE application_id = $1
            ORDER BY created_at ASC, seq ASC
            "#,
        )
        .bind(application_id)
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn insert_interview(
        &self,
        interview: &Interview,
        participants: &[InterviewParticipant],
        initial_event: &InterviewStatusEvent,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO interviews (id, application_id, interview_type, status, scheduled_at, duration_minutes, location, meeting_link, notes, created_by, completed_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(interview.id)
        .bind(interview.application_id)
        .bind(interview.interview_type.as_str())
        .bind(interview.status.as_str())
        .bind(interview.scheduled_at)
        .bind(interview.duration_minutes)
        .bind(&interview.location)
        .bind(&interview.meeting_link)
        .bind(&interview.notes)
        .bind(interview.created_by)
        .bind(interview.completed_at)
        .bind(interview.created_at)
        .bind(interview.updated_at)
        .execute(&mut *tx)
        .await?;

        if !participants.is_empty() {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
                "INSERT INTO interview_participants (interview_id, user_id, role, status) ",
            );
            builder.push_values(participants, |mut row, p| {
                row.push_bind(p.interview_id)
                    .push_bind(p.user_id)
                    .push_bind(p.role.as_str())
                    .push_bind(p.status.as_str());
            });
            builder.build().execute(&mut *tx).await?;
        }

        insert_interview_event(&mut tx, initial_event).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn get_interview(&self, id: Uuid) -> Result<Option<Interview>> {
        let row = sqlx::query_as::<_, InterviewRow>(&format!(
            "SELECT {} FROM interviews i WHERE i.id = $1",
            INTERVIEW_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Interview::try_from).transpose()
    }

    async fn compare_and_set_interview(
        &self,
        interview: &Interview,
        expected: InterviewStatus,
        event: &InterviewStatusEvent,
    ) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        let updated = sqlx::query(
            r#"
            UPDATE interviews
            SET status = $1, scheduled_at = $2, duration_minutes = $3, location = $4,
                meeting_link = $5, notes = $6, completed_at = $7, updated_at = $8
            WHERE id = $9 AND status = $10
            "#,
        )
        .bind(interview.status.as_str())
        .bind(interview.scheduled_at)
        .bind(interview.duration_minutes)
        .bind(&interview.location)
        .bind(&interview.meeting_link)
        .bind(&interview.notes)
        .bind(interview.completed_at)
        .bind(interview.updated_at)
        .bind(interview.id)
        .bind(expected.as_str())
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if updated == 0 {
            tx.rollback().await?;
            let exists: Option<Uuid> = sqlx::query_scalar("SELECT id FROM interviews WHERE id = $1")
                .bind(interview.id)
                .fetch_optional(&self.pool)
                .await?;
            return match exists {
                Some(_) => Ok(false),
                None => Err(Error::NotFound(format!("Interview {} not found", interview.id))),
            };
        }

        insert_interview_event(&mut tx, event).await?;
        tx.commit().await?;
        Ok(true)
    }

    async fn interviews_for_application(&self, application_id: Uuid) -> Result<Vec<Interview>> {
        let rows = sqlx::query_as::<_, InterviewRow>(&format!(
            "SELECT {} FROM interviews i WHERE i.application_id = $1 ORDER BY i.scheduled_at ASC, i.created_at ASC",
            INTERVIEW_COLUMNS
        ))
        .bind(application_id)
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn interviews_for_user(
        &self,
        user_id: Uuid,
        role: Option<ParticipantRole>,
    ) -> Result<Vec<Interview>> {
        let rows = sqlx::query_as::<_, InterviewRow>(&format!(
            r#"
            SELECT {} FROM interviews i
            WHERE EXISTS (
                SELECT 1 FROM interview_participants p
                WHERE p.interview_id = i.id AND p.user_id = $1 AND ($2::text IS NULL OR p.role = $2)
            )
            ORDER BY i.scheduled_at ASC, i.created_at ASC
            "#,
            INTERVIEW_COLUMNS
        ))
        .bind(user_id)
        .bind(role.map(|r| r.as_str()))
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn participants(&self, interview_id: Uuid) -> Result<Vec<InterviewParticipant>> {
        let rows = sqlx::query_as::<_, ParticipantRow>(
            r#"
            SELECT interview_id, user_id, role, status
            FROM interview_participants
            WHERE interview_id = $1
            ORDER BY created_at ASC, user_id ASC
            "#,
        )
        .bind(interview_id)
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn set_participant_status(
        &self,
        interview_id: Uuid,
        user_id: Uuid,
        status: ParticipantStatus,
    ) -> Result<bool> {
        let updated = sqlx::query(
            r#"UPDATE interview_participants SET status = $1 WHERE interview_id = $2 AND user_id = $3"#,
        )
        .bind(status.as_str())
        .bind(interview_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(updated > 0)
    }

    async fn interview_events(&self, interview_id: Uuid) -> Result<Vec<InterviewStatusEvent>> {
        let rows = sqlx::query_as::<_, StatusEventRow>(
            r#"
            SELECT id, interview_id AS entity_id, from_status, to_status, notes, actor_id, created_at
            FROM interview_status_events
            WHERE interview_id = $1
            ORDER BY created_at ASC, seq ASC
            "#,
        )
        .bind(interview_id)
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn insert_feedback(&self, feedback: &InterviewFeedback) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO interview_feedback (id, interview_id, evaluator_id, rating, strengths, weaknesses, notes, recommendation, is_visible_to_candidate, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(feedback.id)
        .bind(feedback.interview_id)
        .bind(feedback.evaluator_id)
        .bind(feedback.rating)
        .bind(&feedback.strengths)
        .bind(&feedback.weaknesses)
        .bind(&feedback.notes)
        .bind(feedback.recommendation.as_str())
        .bind(feedback.is_visible_to_candidate)
        .bind(feedback.created_at)
        .bind(feedback.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_feedback(&self, id: Uuid) -> Result<Option<InterviewFeedback>> {
        let row = sqlx::query_as::<_, FeedbackRow>(&format!(
            "SELECT {} FROM interview_feedback WHERE id = $1",
            FEEDBACK_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(InterviewFeedback::try_from).transpose()
    }

    async fn update_feedback(&self, feedback: &InterviewFeedback) -> Result<()> {
        let updated = sqlx::query(
            r#"
            UPDATE interview_feedback
            SET rating = $1, strengths = $2, weaknesses = $3, notes = $4, recommendation = $5,
                is_visible_to_candidate = $6, updated_at = $7
            WHERE id = $8
            "#,
        )
        .bind(feedback.rating)
        .bind(&feedback.strengths)
        .bind(&feedback.weaknesses)
        .bind(&feedback.notes)
        .bind(feedback.recommendation.as_str())
        .bind(feedback.is_visible_to_candidate)
        .bind(feedback.updated_at)
        .bind(feedback.id)
        .execute(&self.pool)
        .await?
        .rows_affected();
        if updated == 0 {
            return Err(Error::NotFound(format!("Feedback {} not found", feedback.id)));
        }
        Ok(())
    }

    async fn feedback_for_interview(&self, interview_id: Uuid) -> Result<Vec<InterviewFeedback>> {
        let rows = sqlx::query_as::<_, FeedbackRow>(&format!(
            "SELECT {} FROM interview_feedback WHERE interview_id = $1 ORDER BY created_at ASC, seq ASC",
            FEEDBACK_COLUMNS
        ))
        .bind(interview_id)
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }
}

async fn insert_application_event(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    event: &ApplicationStatusEvent,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO application_status_events (id, application_id, from_status, to_status, notes, actor_id, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(event.id)
    .bind(event.application_id)
    .bind(event.from_status.map(|s| s.as_str()))
    .bind(event.to_status.as_str())
    .bind(&event.notes)
    .bind(event.actor_id)
    .bind(event.created_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn insert_interview_event(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    event: &InterviewStatusEvent,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO interview_status_events (id, interview_id, from_status, to_status, notes, actor_id, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(event.id)
    .bind(event.interview_id)
    .bind(event.from_status.map(|s| s.as_str()))
    .bind(event.to_status.as_str())
    .bind(&event.notes)
    .bind(event.actor_id)
    .bind(event.created_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
