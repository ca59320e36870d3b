// src/handlers/questions.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use validator::Validate;

use crate::{
    error::AppError,
    handlers::assessments::fetch_owned_head,
    models::question::{
        ChoiceInput, CreateQuestionRequest, SetChoicesRequest, UpdateChoiceRequest,
        UpdateQuestionRequest,
    },
    utils::{html::clean_html, jwt::Claims},
};

/// A cleaned, insert-ready choice.
#[derive(Debug, Clone, PartialEq)]
struct CleanChoice {
    content: String,
    is_correct: bool,
}

/// Normalizes an author-supplied choice set and enforces the shape rule:
/// after trimming and dropping blank entries, exactly 2 or 4 choices must
/// remain and exactly one of them must be marked correct.
fn clean_choices(choices: &[ChoiceInput]) -> Result<Vec<CleanChoice>, AppError> {
    let cleaned: Vec<CleanChoice> = choices
        .iter()
        .map(|c| CleanChoice {
            content: c.content.trim().to_string(),
            is_correct: c.is_correct,
        })
        .filter(|c| !c.content.is_empty())
        .collect();

    if cleaned.len() != 2 && cleaned.len() != 4 {
        return Err(AppError::BadRequest(
            "Choices must be exactly 2 or 4".to_string(),
        ));
    }

    if cleaned.iter().filter(|c| c.is_correct).count() != 1 {
        return Err(AppError::BadRequest(
            "Exactly one choice must be marked correct".to_string(),
        ));
    }

    Ok(cleaned)
}

/// Helper struct for the question -> assessment ownership walk.
#[derive(sqlx::FromRow)]
struct QuestionOwner {
    question_id: i64,
    owner_id: i64,
}

/// Verifies the requester owns the assessment the question belongs to,
/// walking Question -> Assessment -> owner.
async fn fetch_owned_question(
    pool: &PgPool,
    question_id: i64,
    owner_id: i64,
) -> Result<i64, AppError> {
    let row = sqlx::query_as::<_, QuestionOwner>(
        r#"
        SELECT q.id AS question_id, a.owner_id
        FROM questions q
        JOIN assessments a ON q.assessment_id = a.id
        WHERE q.id = $1
        "#,
    )
    .bind(question_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Question not found".to_string()))?;

    if row.owner_id != owner_id {
        return Err(AppError::Forbidden("Not your assessment".to_string()));
    }

    Ok(row.question_id)
}

/// Adds a question to an assessment, up to its question cap.
pub async fn add_question(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(assessment_id): Path<i64>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let content = payload.content.trim();
    if content.is_empty() {
        return Err(AppError::BadRequest("Question content is required".to_string()));
    }

    let owner_id = claims.user_id()?;
    let (_, max_questions) = fetch_owned_head(&pool, assessment_id, owner_id).await?;

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE assessment_id = $1")
        .bind(assessment_id)
        .fetch_one(&pool)
        .await?;

    if count >= max_questions as i64 {
        return Err(AppError::QuestionCapExceeded(format!(
            "Assessment already has the maximum of {} questions",
            max_questions
        )));
    }

    let question_id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO questions (assessment_id, content, meta)
        VALUES ($1, $2, $3)
        RETURNING id
        "#,
    )
    .bind(assessment_id)
    .bind(clean_html(content))
    .bind(&payload.meta)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create question: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok((StatusCode::CREATED, Json(json!({ "question_id": question_id }))))
}

/// Edits a question's content.
pub async fn update_question(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(question_id): Path<i64>,
    Json(payload): Json<UpdateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let content = payload.content.trim();
    if content.is_empty() {
        return Err(AppError::BadRequest("Question content is required".to_string()));
    }

    let owner_id = claims.user_id()?;
    fetch_owned_question(&pool, question_id, owner_id).await?;

    sqlx::query("UPDATE questions SET content = $1 WHERE id = $2")
        .bind(clean_html(content))
        .bind(question_id)
        .execute(&pool)
        .await?;

    Ok(Json(json!({ "success": true })))
}

/// Appends a validated choice set to a question.
pub async fn append_choices(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(question_id): Path<i64>,
    Json(payload): Json<SetChoicesRequest>,
) -> Result<impl IntoResponse, AppError> {
    let owner_id = claims.user_id()?;
    fetch_owned_question(&pool, question_id, owner_id).await?;

    let cleaned = clean_choices(&payload.choices)?;

    insert_choices(&pool, question_id, &cleaned).await?;

    Ok(Json(json!({ "inserted": cleaned.len() })))
}

/// Replaces a question's whole choice set.
///
/// Delete-then-insert runs inside one transaction so no reader ever sees
/// the question with zero choices.
pub async fn replace_choices(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(question_id): Path<i64>,
    Json(payload): Json<SetChoicesRequest>,
) -> Result<impl IntoResponse, AppError> {
    let owner_id = claims.user_id()?;
    fetch_owned_question(&pool, question_id, owner_id).await?;

    let cleaned = clean_choices(&payload.choices)?;

    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM choices WHERE question_id = $1")
        .bind(question_id)
        .execute(&mut *tx)
        .await?;

    let mut query_builder =
        QueryBuilder::<Postgres>::new("INSERT INTO choices (question_id, content, is_correct) ");
    query_builder.push_values(cleaned.iter(), |mut b, c| {
        b.push_bind(question_id)
            .push_bind(clean_html(&c.content))
            .push_bind(c.is_correct);
    });
    query_builder.build().execute(&mut *tx).await?;

    tx.commit().await?;

    Ok(Json(json!({ "replaced": cleaned.len() })))
}

async fn insert_choices(
    pool: &PgPool,
    question_id: i64,
    cleaned: &[CleanChoice],
) -> Result<(), AppError> {
    let mut query_builder =
        QueryBuilder::<Postgres>::new("INSERT INTO choices (question_id, content, is_correct) ");
    query_builder.push_values(cleaned.iter(), |mut b, c| {
        b.push_bind(question_id)
            .push_bind(clean_html(&c.content))
            .push_bind(c.is_correct);
    });
    query_builder.build().execute(pool).await.map_err(|e| {
        tracing::error!("Failed to insert choices: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(())
}

/// Helper struct for the choice -> question -> assessment ownership walk.
#[derive(sqlx::FromRow)]
struct ChoiceOwner {
    question_id: i64,
    owner_id: i64,
}

/// Edits a single choice's content and/or correct flag.
///
/// Setting a choice correct clears its siblings first; both writes share a
/// transaction so a concurrent reader never observes two correct choices,
/// nor zero. This is the serialization point for racing owner edits on one
/// question.
pub async fn update_choice(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(choice_id): Path<i64>,
    Json(payload): Json<UpdateChoiceRequest>,
) -> Result<impl IntoResponse, AppError> {
    let owner_id = claims.user_id()?;

    let owner_row = sqlx::query_as::<_, ChoiceOwner>(
        r#"
        SELECT c.question_id, a.owner_id
        FROM choices c
        JOIN questions q ON c.question_id = q.id
        JOIN assessments a ON q.assessment_id = a.id
        WHERE c.id = $1
        "#,
    )
    .bind(choice_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Choice not found".to_string()))?;

    if owner_row.owner_id != owner_id {
        return Err(AppError::Forbidden("Not your assessment".to_string()));
    }

    let content = match payload.content.as_deref().map(str::trim) {
        Some("") => {
            return Err(AppError::BadRequest("Choice content cannot be empty".to_string()));
        }
        Some(c) => Some(clean_html(c)),
        None => None,
    };

    if content.is_none() && payload.is_correct.is_none() {
        return Ok(Json(json!({ "success": true })));
    }

    let mut tx = pool.begin().await?;

    if payload.is_correct == Some(true) {
        sqlx::query("UPDATE choices SET is_correct = FALSE WHERE question_id = $1")
            .bind(owner_row.question_id)
            .execute(&mut *tx)
            .await?;
    }

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE choices SET ");
    let mut separated = builder.separated(", ");

    if let Some(content) = content {
        separated.push("content = ");
        separated.push_bind_unseparated(content);
    }

    if let Some(is_correct) = payload.is_correct {
        separated.push("is_correct = ");
        separated.push_bind_unseparated(is_correct);
    }

    builder.push(" WHERE id = ");
    builder.push_bind(choice_id);

    builder.build().execute(&mut *tx).await.map_err(|e| {
        tracing::error!("Failed to update choice: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    tx.commit().await?;

    Ok(Json(json!({ "success": true })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(pairs: &[(&str, bool)]) -> Vec<ChoiceInput> {
        pairs
            .iter()
            .map(|(content, is_correct)| ChoiceInput {
                content: content.to_string(),
                is_correct: *is_correct,
            })
            .collect()
    }

    #[test]
    fn test_clean_choices_accepts_two_and_four() {
        assert!(clean_choices(&input(&[("A", true), ("B", false)])).is_ok());
        assert!(
            clean_choices(&input(&[("A", false), ("B", true), ("C", false), ("D", false)]))
                .is_ok()
        );
    }

    #[test]
    fn test_clean_choices_rejects_bad_counts() {
        assert!(clean_choices(&input(&[("A", true)])).is_err());
        assert!(clean_choices(&input(&[("A", true), ("B", false), ("C", false)])).is_err());
        assert!(clean_choices(&input(&[
            ("A", true),
            ("B", false),
            ("C", false),
            ("D", false),
            ("E", false)
        ]))
        .is_err());
        assert!(clean_choices(&[]).is_err());
    }

    #[test]
    fn test_clean_choices_rejects_wrong_correct_count() {
        // Zero correct
        assert!(clean_choices(&input(&[("A", false), ("B", false)])).is_err());
        // Two correct
        assert!(clean_choices(&input(&[("A", true), ("B", true)])).is_err());
    }

    #[test]
    fn test_clean_choices_drops_blank_entries_before_counting() {
        // Three supplied, one blank: cleans to a valid pair.
        let cleaned =
            clean_choices(&input(&[("A", true), ("   ", false), ("B", false)])).unwrap();
        assert_eq!(cleaned.len(), 2);
        assert_eq!(cleaned[0].content, "A");

        // Two supplied, one blank: cleans to a single choice and fails.
        assert!(clean_choices(&input(&[("A", true), ("", false)])).is_err());
    }

    #[test]
    fn test_clean_choices_trims_content() {
        let cleaned = clean_choices(&input(&[("  A  ", true), ("B", false)])).unwrap();
        assert_eq!(cleaned[0].content, "A");
        assert!(cleaned[0].is_correct);
    }
}
