// src/handlers/question.rs

use axum::{
    Json,
    extract::{Extension, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use validator::Validate;

use crate::{
    error::AppError,
    handlers::exam::{ensure_exam_owner, find_exam},
    models::{
        question::{
            CreateQuestionRequest, ExamQuestions, PublicQuestion, Question, UpdateQuestionRequest,
        },
        user::Role,
    },
    utils::{
        extract::{AppJson, AppPath},
        jwt::Claims,
    },
};

const QUESTION_COLUMNS: &str = "id, exam_id, question, option_a, option_b, option_c, option_d, \
    correct_answer, created_by, created_at";

async fn find_question(pool: &SqlitePool, id: i64) -> Result<Question, AppError> {
    sqlx::query_as::<_, Question>(&format!("SELECT {QUESTION_COLUMNS} FROM questions WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No question with id {}", id)))
}

/// Adds a question to an exam.
/// Exam owner or admin only.
pub async fn create_question(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    AppPath(exam_id): AppPath<i64>,
    AppJson(mut payload): AppJson<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    claims.require_role(&[Role::Teacher, Role::Admin])?;
    payload.sanitize();
    payload.validate()?;

    let exam = find_exam(&pool, exam_id).await?;
    ensure_exam_owner(&exam, &claims)?;

    let question = sqlx::query_as::<_, Question>(&format!(
        r#"
        INSERT INTO questions
        (exam_id, question, option_a, option_b, option_c, option_d, correct_answer, created_by, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING {QUESTION_COLUMNS}
        "#
    ))
    .bind(exam.id)
    .bind(payload.question)
    .bind(payload.option_a)
    .bind(payload.option_b)
    .bind(payload.option_c)
    .bind(payload.option_d)
    .bind(payload.correct_answer)
    .bind(claims.user_id()?)
    .bind(chrono::Utc::now())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create question: {:?}", e);
        AppError::from(e)
    })?;

    Ok((StatusCode::CREATED, Json(question)))
}

/// Lists the caller's questions; admins see all of them.
pub async fn list_questions(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    claims.require_role(&[Role::Teacher, Role::Admin])?;

    let author = match claims.role {
        Role::Admin => None,
        _ => Some(claims.user_id()?),
    };

    let questions = sqlx::query_as::<_, Question>(&format!(
        "SELECT {QUESTION_COLUMNS} FROM questions WHERE (?1 IS NULL OR created_by = ?1) ORDER BY exam_id, id"
    ))
    .bind(author)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list questions: {:?}", e);
        AppError::from(e)
    })?;

    Ok(Json(questions))
}

/// One question including its answer key.
/// Teachers and admins only.
pub async fn get_question(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    AppPath(id): AppPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    claims.require_role(&[Role::Teacher, Role::Admin])?;
    Ok(Json(find_question(&pool, id).await?))
}

/// Questions of one exam in insertion order.
/// Students receive them without the answer key.
pub async fn list_exam_questions(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    AppPath(exam_id): AppPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    let exam = find_exam(&pool, exam_id).await?;

    let questions = sqlx::query_as::<_, Question>(&format!(
        "SELECT {QUESTION_COLUMNS} FROM questions WHERE exam_id = ? ORDER BY id"
    ))
    .bind(exam.id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list exam questions: {:?}", e);
        AppError::from(e)
    })?;

    let body = match claims.role {
        Role::Student => {
            ExamQuestions::Public(questions.into_iter().map(PublicQuestion::from).collect())
        }
        Role::Teacher | Role::Admin => ExamQuestions::Full(questions),
    };

    Ok(Json(body))
}

/// Partially updates a question.
/// Author or admin only.
pub async fn update_question(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    AppPath(id): AppPath<i64>,
    AppJson(mut payload): AppJson<UpdateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    claims.require_role(&[Role::Teacher, Role::Admin])?;
    payload.sanitize();
    payload.validate()?;

    let current = find_question(&pool, id).await?;
    if claims.role != Role::Admin && current.created_by != claims.user_id()? {
        return Err(AppError::Forbidden(
            "Only the teacher who wrote this question can modify it".to_string(),
        ));
    }

    let UpdateQuestionRequest {
        question,
        option_a,
        option_b,
        option_c,
        option_d,
        correct_answer,
    } = payload;

    let text_updates = [
        ("question", question),
        ("option_a", option_a),
        ("option_b", option_b),
        ("option_c", option_c),
        ("option_d", option_d),
    ];

    if correct_answer.is_none() && text_updates.iter().all(|(_, v)| v.is_none()) {
        return Ok(Json(current));
    }

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE questions SET ");
    let mut separated = builder.separated(", ");

    for (column, value) in text_updates {
        if let Some(value) = value {
            separated.push(format!("{} = ", column));
            separated.push_bind_unseparated(value);
        }
    }

    if let Some(correct_answer) = correct_answer {
        separated.push("correct_answer = ");
        separated.push_bind_unseparated(correct_answer);
    }

    builder.push(" WHERE id = ");
    builder.push_bind(id);

    builder.build().execute(&pool).await.map_err(|e| {
        tracing::error!("Failed to update question: {:?}", e);
        AppError::from(e)
    })?;

    Ok(Json(find_question(&pool, id).await?))
}
