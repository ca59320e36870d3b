// src/models/submission.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::grading::Score;

/// Represents the 'submissions' table in the database.
/// One row is a participant's single allowed attempt at an assessment;
/// rows are never updated after creation.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Submission {
    pub id: i64,
    pub assessment_id: i64,
    pub participant_id: i64,
    pub submitted_at: chrono::DateTime<chrono::Utc>,
}

/// One submitted answer: the participant's picked choice for one question.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct AnswerInput {
    pub question_id: i64,
    pub choice_id: i64,
}

/// DTO for submitting an answer set.
#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub answers: Vec<AnswerInput>,
}

/// What the participant gets back from a successful submit.
#[derive(Debug, Serialize)]
pub struct SubmissionOutcome {
    pub submission_id: i64,
    #[serde(flatten)]
    pub score: Score,
    pub submitted_at: chrono::DateTime<chrono::Utc>,
}

/// The participant's most recent result, re-graded on read.
#[derive(Debug, Serialize)]
pub struct LatestResult {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(flatten)]
    pub score: Score,
    pub submitted_at: chrono::DateTime<chrono::Utc>,
}
