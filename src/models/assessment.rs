// src/models/assessment.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::grading::Score;

/// Represents the 'assessments' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Assessment {
    pub id: i64,

    /// The teacher who created the assessment; the only user allowed to
    /// edit, delete, or read grades for it.
    pub owner_id: i64,

    pub title: String,
    pub description: Option<String>,

    /// Participant actions are allowed inside [opens_at, closes_at).
    pub opens_at: chrono::DateTime<chrono::Utc>,
    pub closes_at: chrono::DateTime<chrono::Utc>,

    pub max_questions: i32,

    /// Fixed-width numeric code participants type to find the assessment.
    pub join_code: String,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for creating a new assessment.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateAssessmentRequest {
    #[validate(length(
        min = 1,
        max = 200,
        message = "Title length must be between 1 and 200 characters."
    ))]
    pub title: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub opens_at: chrono::DateTime<chrono::Utc>,
    pub closes_at: chrono::DateTime<chrono::Utc>,
    pub max_questions: Option<i32>,
}

/// DTO for editing an assessment. The window must always be supplied in
/// full so the ordering rule can be checked; the rest is optional.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateAssessmentRequest {
    pub opens_at: chrono::DateTime<chrono::Utc>,
    pub closes_at: chrono::DateTime<chrono::Utc>,
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub max_questions: Option<i32>,
}

/// What a participant sees when joining by code.
#[derive(Debug, Serialize, FromRow)]
pub struct JoinInfo {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub opens_at: chrono::DateTime<chrono::Utc>,
    pub closes_at: chrono::DateTime<chrono::Utc>,
    pub max_questions: i32,
    pub join_code: String,
}

/// Query parameters accepted by the grade report.
#[derive(Debug, Deserialize)]
pub struct GradeReportParams {
    /// Case-insensitive substring matched against participant name, email
    /// and id.
    pub filter: Option<String>,
    /// 1-based page index.
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

/// One graded row of the owner's report.
#[derive(Debug, Serialize)]
pub struct GradeRow {
    pub submission_id: i64,
    pub participant_id: i64,
    pub full_name: Option<String>,
    pub email: Option<String>,
    #[serde(flatten)]
    pub score: Score,
    pub submitted_at: chrono::DateTime<chrono::Utc>,
}

/// The full grade report for one assessment.
#[derive(Debug, Serialize)]
pub struct GradeReport {
    /// Row count after filtering, before paging.
    pub total_rows: usize,
    pub page: usize,
    pub page_size: usize,
    pub rows: Vec<GradeRow>,
}
