// src/handlers/assessments.rs

use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde_json::json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use validator::Validate;

use crate::{
    config::{DEFAULT_PAGE_SIZE, JOIN_CODE_MAX_ATTEMPTS, MAX_PAGE_SIZE, MAX_QUESTIONS_PER_ASSESSMENT},
    error::{AppError, is_unique_violation},
    grading::grade,
    models::{
        assessment::{
            Assessment, CreateAssessmentRequest, GradeReport, GradeReportParams, GradeRow,
            JoinInfo, UpdateAssessmentRequest,
        },
        question::{Choice, ManageQuestion, Question, TakingChoice, TakingQuestion},
        submission::Submission,
    },
    session::ensure_open,
    utils::{jwt::Claims, join_code::{generate_join_code, is_valid_join_code}},
};

/// Helper struct for ownership checks that don't need the full row.
#[derive(sqlx::FromRow)]
struct AssessmentHead {
    id: i64,
    owner_id: i64,
    max_questions: i32,
}

/// Fetches an assessment header and verifies the requester owns it.
/// `NotFound` when the id doesn't resolve, `Forbidden` on owner mismatch.
pub(crate) async fn fetch_owned_head(
    pool: &PgPool,
    assessment_id: i64,
    owner_id: i64,
) -> Result<(i64, i32), AppError> {
    let head = sqlx::query_as::<_, AssessmentHead>(
        "SELECT id, owner_id, max_questions FROM assessments WHERE id = $1",
    )
    .bind(assessment_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Assessment not found".to_string()))?;

    if head.owner_id != owner_id {
        return Err(AppError::Forbidden("Not your assessment".to_string()));
    }

    Ok((head.id, head.max_questions))
}

fn clamp_max_questions(requested: Option<i32>) -> i32 {
    requested
        .unwrap_or(MAX_QUESTIONS_PER_ASSESSMENT)
        .clamp(1, MAX_QUESTIONS_PER_ASSESSMENT)
}

/// Creates an assessment and allocates its join code.
///
/// The join code is random; the unique index on `join_code` arbitrates
/// collisions and the insert retries with a fresh code, bounded at
/// `JOIN_CODE_MAX_ATTEMPTS`.
pub async fn create_assessment(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateAssessmentRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    if payload.closes_at <= payload.opens_at {
        return Err(AppError::BadRequest(
            "closes_at must be strictly after opens_at".to_string(),
        ));
    }

    let owner_id = claims.user_id()?;
    let title = payload.title.trim().to_string();
    let max_questions = clamp_max_questions(payload.max_questions);

    for attempt in 1..=JOIN_CODE_MAX_ATTEMPTS {
        let code = generate_join_code();

        let inserted = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO assessments
            (owner_id, title, description, opens_at, closes_at, max_questions, join_code)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(owner_id)
        .bind(&title)
        .bind(&payload.description)
        .bind(payload.opens_at)
        .bind(payload.closes_at)
        .bind(max_questions)
        .bind(&code)
        .fetch_one(&pool)
        .await;

        match inserted {
            Ok(id) => {
                return Ok((
                    StatusCode::CREATED,
                    Json(json!({ "assessment_id": id, "join_code": code })),
                ));
            }
            Err(e) if is_unique_violation(&e) => {
                tracing::warn!("Join code collision on attempt {}, retrying", attempt);
            }
            Err(e) => {
                tracing::error!("Failed to create assessment: {:?}", e);
                return Err(AppError::from(e));
            }
        }
    }

    Err(AppError::ResourceExhausted(
        "Could not allocate a unique join code".to_string(),
    ))
}

/// Lists the requester's own assessments, newest first.
pub async fn list_mine(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let owner_id = claims.user_id()?;

    let assessments = sqlx::query_as::<_, Assessment>(
        r#"
        SELECT id, owner_id, title, description, opens_at, closes_at,
               max_questions, join_code, created_at
        FROM assessments
        WHERE owner_id = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(owner_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(assessments))
}

/// Edits an assessment's window and metadata.
pub async fn update_assessment(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(assessment_id): Path<i64>,
    Json(payload): Json<UpdateAssessmentRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    if payload.closes_at <= payload.opens_at {
        return Err(AppError::BadRequest(
            "closes_at must be strictly after opens_at".to_string(),
        ));
    }

    let owner_id = claims.user_id()?;
    fetch_owned_head(&pool, assessment_id, owner_id).await?;

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE assessments SET ");
    let mut separated = builder.separated(", ");

    separated.push("opens_at = ");
    separated.push_bind_unseparated(payload.opens_at);
    separated.push("closes_at = ");
    separated.push_bind_unseparated(payload.closes_at);

    if let Some(title) = payload.title {
        separated.push("title = ");
        separated.push_bind_unseparated(title.trim().to_string());
    }

    if let Some(description) = payload.description {
        separated.push("description = ");
        separated.push_bind_unseparated(description);
    }

    if let Some(max_questions) = payload.max_questions {
        separated.push("max_questions = ");
        separated.push_bind_unseparated(clamp_max_questions(Some(max_questions)));
    }

    builder.push(" WHERE id = ");
    builder.push_bind(assessment_id);

    builder.build().execute(&pool).await.map_err(|e| {
        tracing::error!("Failed to update assessment: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(json!({ "success": true })))
}

/// Deletes an assessment and everything hanging off it.
///
/// The cascade is an explicit ordered sequence inside one transaction
/// (answers, submissions, choices, questions, then the assessment itself),
/// so the behavior does not depend on the store's native cascade support.
/// Each step deletes whatever is left, which also makes the sequence
/// idempotent.
pub async fn delete_assessment(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(assessment_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let owner_id = claims.user_id()?;
    fetch_owned_head(&pool, assessment_id, owner_id).await?;

    let mut tx = pool.begin().await?;

    sqlx::query(
        "DELETE FROM answers WHERE submission_id IN (SELECT id FROM submissions WHERE assessment_id = $1)",
    )
    .bind(assessment_id)
    .execute(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM submissions WHERE assessment_id = $1")
        .bind(assessment_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        "DELETE FROM choices WHERE question_id IN (SELECT id FROM questions WHERE assessment_id = $1)",
    )
    .bind(assessment_id)
    .execute(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM questions WHERE assessment_id = $1")
        .bind(assessment_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM assessments WHERE id = $1")
        .bind(assessment_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(Json(json!({ "success": true })))
}

/// Resolves a participant-typed join code to an open assessment.
pub async fn join_by_code(
    State(pool): State<PgPool>,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let code = code.trim();

    if !is_valid_join_code(code) {
        return Err(AppError::BadRequest(
            "Join code must be exactly 6 digits".to_string(),
        ));
    }

    let info = sqlx::query_as::<_, JoinInfo>(
        r#"
        SELECT id, title, description, opens_at, closes_at, max_questions, join_code
        FROM assessments
        WHERE join_code = $1
        "#,
    )
    .bind(code)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound(
        "No assessment matches this code".to_string(),
    ))?;

    // The window is re-checked server-side at the moment of the action.
    ensure_open(Utc::now(), info.opens_at, info.closes_at)?;

    Ok(Json(info))
}

/// Fetches the question set for a participant taking the assessment.
/// The answer key never leaves the server on this path.
pub async fn questions_for_taking(
    State(pool): State<PgPool>,
    Path(assessment_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
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

    let questions = sqlx::query_as::<_, Question>(
        r#"
        SELECT id, assessment_id, content, meta, created_at
        FROM questions
        WHERE assessment_id = $1
        ORDER BY id ASC
        "#,
    )
    .bind(assessment_id)
    .fetch_all(&pool)
    .await?;

    if questions.is_empty() {
        return Err(AppError::NotFound(
            "Assessment has no questions yet".to_string(),
        ));
    }

    let question_ids: Vec<i64> = questions.iter().map(|q| q.id).collect();
    let choices = fetch_choices_for_questions(&pool, &question_ids).await?;

    let mut by_question: HashMap<i64, Vec<TakingChoice>> = HashMap::new();
    for c in choices {
        by_question
            .entry(c.question_id)
            .or_default()
            .push(TakingChoice {
                id: c.id,
                content: c.content,
            });
    }

    let out: Vec<TakingQuestion> = questions
        .into_iter()
        .map(|q| TakingQuestion {
            choices: by_question.remove(&q.id).unwrap_or_default(),
            id: q.id,
            content: q.content,
            meta: q.meta,
        })
        .collect();

    Ok(Json(out))
}

/// Fetches the question set for the owner's editing view, answer key
/// included.
pub async fn questions_for_editing(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(assessment_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let owner_id = claims.user_id()?;
    fetch_owned_head(&pool, assessment_id, owner_id).await?;

    let questions = sqlx::query_as::<_, Question>(
        r#"
        SELECT id, assessment_id, content, meta, created_at
        FROM questions
        WHERE assessment_id = $1
        ORDER BY id ASC
        "#,
    )
    .bind(assessment_id)
    .fetch_all(&pool)
    .await?;

    let question_ids: Vec<i64> = questions.iter().map(|q| q.id).collect();
    let choices = fetch_choices_for_questions(&pool, &question_ids).await?;

    let mut by_question: HashMap<i64, Vec<Choice>> = HashMap::new();
    for c in choices {
        by_question.entry(c.question_id).or_default().push(c);
    }

    let out: Vec<ManageQuestion> = questions
        .into_iter()
        .map(|q| ManageQuestion {
            choices: by_question.remove(&q.id).unwrap_or_default(),
            id: q.id,
            content: q.content,
            meta: q.meta,
        })
        .collect();

    Ok(Json(json!({ "questions": out })))
}

async fn fetch_choices_for_questions(
    pool: &PgPool,
    question_ids: &[i64],
) -> Result<Vec<Choice>, AppError> {
    if question_ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut query_builder = QueryBuilder::<Postgres>::new(
        "SELECT id, question_id, content, is_correct, created_at FROM choices WHERE question_id IN (",
    );

    let mut separated = query_builder.separated(",");
    for id in question_ids {
        separated.push_bind(id);
    }
    separated.push_unseparated(") ORDER BY id ASC");

    let choices: Vec<Choice> = query_builder.build_query_as().fetch_all(pool).await?;

    Ok(choices)
}

/// Helper structs for the grade report joins.
#[derive(sqlx::FromRow)]
struct AnswerRow {
    submission_id: i64,
    question_id: i64,
    choice_id: i64,
}

#[derive(sqlx::FromRow)]
struct ParticipantRow {
    id: i64,
    full_name: String,
    email: String,
}

/// The owner's grade report.
///
/// Scores are never cached: every call re-derives each row from the stored
/// answers and the current correct-choice set, so re-keying a choice after
/// submissions exist retroactively changes the reported grades.
pub async fn grade_report(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(assessment_id): Path<i64>,
    Query(params): Query<GradeReportParams>,
) -> Result<impl IntoResponse, AppError> {
    let owner_id = claims.user_id()?;
    fetch_owned_head(&pool, assessment_id, owner_id).await?;

    let page = params.page.unwrap_or(1).max(1);
    let page_size = params
        .page_size
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);

    let submissions = sqlx::query_as::<_, Submission>(
        r#"
        SELECT id, assessment_id, participant_id, submitted_at
        FROM submissions
        WHERE assessment_id = $1
        ORDER BY submitted_at DESC
        "#,
    )
    .bind(assessment_id)
    .fetch_all(&pool)
    .await?;

    if submissions.is_empty() {
        return Ok(Json(GradeReport {
            total_rows: 0,
            page,
            page_size,
            rows: Vec::new(),
        }));
    }

    let question_ids: Vec<i64> =
        sqlx::query_scalar("SELECT id FROM questions WHERE assessment_id = $1")
            .bind(assessment_id)
            .fetch_all(&pool)
            .await?;
    let total_questions = question_ids.len() as i64;

    let correct_map = fetch_correct_choice_map(&pool, &question_ids).await?;

    let submission_ids: Vec<i64> = submissions.iter().map(|s| s.id).collect();
    let mut query_builder = QueryBuilder::<Postgres>::new(
        "SELECT submission_id, question_id, choice_id FROM answers WHERE submission_id IN (",
    );
    let mut separated = query_builder.separated(",");
    for id in &submission_ids {
        separated.push_bind(id);
    }
    separated.push_unseparated(")");

    let answer_rows: Vec<AnswerRow> = query_builder.build_query_as().fetch_all(&pool).await?;

    let mut answers_by_submission: HashMap<i64, Vec<(i64, i64)>> = HashMap::new();
    for a in answer_rows {
        answers_by_submission
            .entry(a.submission_id)
            .or_default()
            .push((a.question_id, a.choice_id));
    }

    let participant_ids: Vec<i64> = {
        let mut ids: Vec<i64> = submissions.iter().map(|s| s.participant_id).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    };
    let mut query_builder =
        QueryBuilder::<Postgres>::new("SELECT id, full_name, email FROM users WHERE id IN (");
    let mut separated = query_builder.separated(",");
    for id in &participant_ids {
        separated.push_bind(id);
    }
    separated.push_unseparated(")");

    let participants: Vec<ParticipantRow> =
        query_builder.build_query_as().fetch_all(&pool).await?;
    let participant_map: HashMap<i64, ParticipantRow> =
        participants.into_iter().map(|p| (p.id, p)).collect();

    let mut rows: Vec<GradeRow> = submissions
        .into_iter()
        .map(|s| {
            let answers = answers_by_submission.remove(&s.id).unwrap_or_default();
            let score = grade(&correct_map, &answers, total_questions);
            let participant = participant_map.get(&s.participant_id);

            GradeRow {
                submission_id: s.id,
                participant_id: s.participant_id,
                full_name: participant.map(|p| p.full_name.clone()),
                email: participant.map(|p| p.email.clone()),
                score,
                submitted_at: s.submitted_at,
            }
        })
        .collect();

    if let Some(filter) = params.filter.as_deref().map(str::trim).filter(|f| !f.is_empty()) {
        let needle = filter.to_lowercase();
        rows.retain(|r| {
            r.full_name
                .as_deref()
                .is_some_and(|n| n.to_lowercase().contains(&needle))
                || r.email
                    .as_deref()
                    .is_some_and(|e| e.to_lowercase().contains(&needle))
                || r.participant_id.to_string().contains(&needle)
        });
    }

    let total_rows = rows.len();
    let rows: Vec<GradeRow> = rows
        .into_iter()
        .skip((page - 1) * page_size)
        .take(page_size)
        .collect();

    Ok(Json(GradeReport {
        total_rows,
        page,
        page_size,
        rows,
    }))
}

/// Fetches `question_id -> correct choice id` for the given questions.
pub(crate) async fn fetch_correct_choice_map(
    pool: &PgPool,
    question_ids: &[i64],
) -> Result<HashMap<i64, i64>, AppError> {
    #[derive(sqlx::FromRow)]
    struct CorrectKey {
        question_id: i64,
        id: i64,
    }

    if question_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let mut query_builder = QueryBuilder::<Postgres>::new(
        "SELECT question_id, id FROM choices WHERE is_correct = TRUE AND question_id IN (",
    );

    let mut separated = query_builder.separated(",");
    for id in question_ids {
        separated.push_bind(id);
    }
    separated.push_unseparated(")");

    let keys: Vec<CorrectKey> = query_builder.build_query_as().fetch_all(pool).await?;

    Ok(keys.into_iter().map(|k| (k.question_id, k.id)).collect())
}
