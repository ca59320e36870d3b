// src/handlers/submissions.rs

use std::collections::HashSet;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::{
    error::{AppError, is_unique_violation},
    grading::grade,
    handlers::assessments::fetch_correct_choice_map,
    models::submission::{AnswerInput, LatestResult, SubmissionOutcome, SubmitRequest, Submission},
    session::ensure_open,
    utils::jwt::Claims,
};

/// Accepts a participant's one allowed answer set for an assessment.
///
/// The submission insert is the concurrency point: duplicates are caught by
/// the unique index on (assessment_id, participant_id), not by a prior
/// existence read, so racing submits from one participant end with exactly
/// one accepted row and the rest rejected as conflicts. Answers are written
/// only after that insert has succeeded.
pub async fn submit(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(assessment_id): Path<i64>,
    Json(payload): Json<SubmitRequest>,
) -> Result<impl IntoResponse, AppError> {
    let participant_id = claims.user_id()?;

    if payload.answers.is_empty() {
        return Err(AppError::BadRequest("No answers submitted".to_string()));
    }

    #[derive(sqlx::FromRow)]
    struct Window {
        opens_at: chrono::DateTime<Utc>,
        closes_at: chrono::DateTime<Utc>,
    }

    let window = sqlx::query_as::<_, Window>(
        "SELECT opens_at, closes_at FROM assessments WHERE id = $1",
    )
    .bind(assessment_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Assessment not found".to_string()))?;

    ensure_open(Utc::now(), window.opens_at, window.closes_at)?;

    let submission = sqlx::query_as::<_, Submission>(
        r#"
        INSERT INTO submissions (assessment_id, participant_id)
        VALUES ($1, $2)
        RETURNING id, assessment_id, participant_id, submitted_at
        "#,
    )
    .bind(assessment_id)
    .bind(participant_id)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict("You have already submitted this assessment".to_string())
        } else {
            tracing::error!("Failed to create submission: {:?}", e);
            AppError::from(e)
        }
    })?;

    let question_ids: Vec<i64> =
        sqlx::query_scalar("SELECT id FROM questions WHERE assessment_id = $1")
            .bind(assessment_id)
            .fetch_all(&pool)
            .await?;

    let allowed: HashSet<i64> = question_ids.iter().copied().collect();

    // Stray question ids are dropped silently; repeats keep the first
    // occurrence only.
    let mut seen: HashSet<i64> = HashSet::new();
    let cleaned: Vec<AnswerInput> = payload
        .answers
        .iter()
        .filter(|a| allowed.contains(&a.question_id) && seen.insert(a.question_id))
        .copied()
        .collect();

    if cleaned.is_empty() {
        // The submission row above is already durable, so the attempt is
        // spent: it remains as a terminal, ungraded (zero-score) attempt.
        return Err(AppError::BadRequest(
            "No valid answers for this assessment".to_string(),
        ));
    }

    let mut query_builder =
        QueryBuilder::<Postgres>::new("INSERT INTO answers (submission_id, question_id, choice_id) ");
    query_builder.push_values(cleaned.iter(), |mut b, a| {
        b.push_bind(submission.id)
            .push_bind(a.question_id)
            .push_bind(a.choice_id);
    });
    query_builder.build().execute(&pool).await.map_err(|e| {
        tracing::error!("Failed to persist answers: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let correct_map = fetch_correct_choice_map(&pool, &question_ids).await?;
    let answer_pairs: Vec<(i64, i64)> = cleaned
        .iter()
        .map(|a| (a.question_id, a.choice_id))
        .collect();

    let score = grade(&correct_map, &answer_pairs, question_ids.len() as i64);

    Ok((
        StatusCode::CREATED,
        Json(SubmissionOutcome {
            submission_id: submission.id,
            score,
            submitted_at: submission.submitted_at,
        }),
    ))
}

/// Returns the participant's most recent submission across all
/// assessments, re-graded against the current answer key. A participant
/// with no submissions gets a null body, not an error.
pub async fn my_latest_result(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let participant_id = claims.user_id()?;

    #[derive(sqlx::FromRow)]
    struct LatestRow {
        id: i64,
        assessment_id: i64,
        submitted_at: chrono::DateTime<Utc>,
        title: String,
        description: Option<String>,
    }

    let latest = sqlx::query_as::<_, LatestRow>(
        r#"
        SELECT s.id, s.assessment_id, s.submitted_at, a.title, a.description
        FROM submissions s
        JOIN assessments a ON s.assessment_id = a.id
        WHERE s.participant_id = $1
        ORDER BY s.submitted_at DESC
        LIMIT 1
        "#,
    )
    .bind(participant_id)
    .fetch_optional(&pool)
    .await?;

    let Some(latest) = latest else {
        return Ok(Json(serde_json::Value::Null).into_response());
    };

    let question_ids: Vec<i64> =
        sqlx::query_scalar("SELECT id FROM questions WHERE assessment_id = $1")
            .bind(latest.assessment_id)
            .fetch_all(&pool)
            .await?;

    #[derive(sqlx::FromRow)]
    struct AnswerRow {
        question_id: i64,
        choice_id: i64,
    }

    let answers: Vec<AnswerRow> = sqlx::query_as(
        "SELECT question_id, choice_id FROM answers WHERE submission_id = $1",
    )
    .bind(latest.id)
    .fetch_all(&pool)
    .await?;

    let correct_map = fetch_correct_choice_map(&pool, &question_ids).await?;
    let answer_pairs: Vec<(i64, i64)> = answers
        .iter()
        .map(|a| (a.question_id, a.choice_id))
        .collect();

    let score = grade(&correct_map, &answer_pairs, question_ids.len() as i64);

    Ok(Json(LatestResult {
        title: Some(latest.title),
        description: latest.description,
        score,
        submitted_at: latest.submitted_at,
    })
    .into_response())
}
