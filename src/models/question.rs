// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,

    pub assessment_id: i64,

    /// The text content of the question.
    pub content: String,

    /// Optional structured metadata (rendering hints etc.), stored as JSONB.
    pub meta: Option<serde_json::Value>,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Represents the 'choices' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Choice {
    pub id: i64,
    pub question_id: i64,
    pub content: String,
    pub is_correct: bool,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for creating a new question under an assessment.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 2000, message = "Question content is required."))]
    pub content: String,
    pub meta: Option<serde_json::Value>,
}

/// DTO for editing a question's content.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateQuestionRequest {
    #[validate(length(min = 1, max = 2000, message = "Question content is required."))]
    pub content: String,
}

/// One choice as supplied by the author. Entries with blank content are
/// dropped during cleaning before the 2-or-4 rule is checked.
#[derive(Debug, Clone, Deserialize)]
pub struct ChoiceInput {
    pub content: String,
    #[serde(default)]
    pub is_correct: bool,
}

/// DTO for the append and replace-all choice operations.
#[derive(Debug, Deserialize)]
pub struct SetChoicesRequest {
    pub choices: Vec<ChoiceInput>,
}

/// DTO for editing a single choice.
#[derive(Debug, Deserialize)]
pub struct UpdateChoiceRequest {
    pub content: Option<String>,
    pub is_correct: Option<bool>,
}

/// A choice as shown to a participant taking the assessment. The answer
/// key stays server-side.
#[derive(Debug, Serialize, FromRow)]
pub struct TakingChoice {
    pub id: i64,
    pub content: String,
}

/// A question as shown to a participant taking the assessment.
#[derive(Debug, Serialize)]
pub struct TakingQuestion {
    pub id: i64,
    pub content: String,
    pub meta: Option<serde_json::Value>,
    pub choices: Vec<TakingChoice>,
}

/// A question as shown to its owner for editing, answer key included.
#[derive(Debug, Serialize)]
pub struct ManageQuestion {
    pub id: i64,
    pub content: String,
    pub meta: Option<serde_json::Value>,
    pub choices: Vec<Choice>,
}
