// src/handlers/exam.rs

use axum::{
    Json,
    extract::{Extension, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        exam::{CreateExamRequest, Exam, UpdateExamRequest, validate_marks},
        user::Role,
    },
    utils::{
        extract::{AppJson, AppPath},
        jwt::Claims,
    },
};

const EXAM_COLUMNS: &str = "id, name, description, subject, class_level, program, \
    academic_term, academic_year, duration, exam_date, exam_time, exam_type, \
    pass_mark, total_mark, status, created_by, created_at, updated_at";

/// Loads an exam or fails with 404.
pub async fn find_exam(pool: &SqlitePool, id: i64) -> Result<Exam, AppError> {
    sqlx::query_as::<_, Exam>(&format!("SELECT {EXAM_COLUMNS} FROM exams WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No exam with id {}", id)))
}

/// Owners and admins may change an exam and its questions.
pub fn ensure_exam_owner(exam: &Exam, claims: &Claims) -> Result<(), AppError> {
    if claims.role == Role::Admin || exam.created_by == claims.user_id()? {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Only the teacher who created this exam can modify it".to_string(),
        ))
    }
}

/// Creates an exam owned by the calling teacher.
pub async fn create_exam(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    AppJson(mut payload): AppJson<CreateExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    claims.require_role(&[Role::Teacher, Role::Admin])?;
    payload.sanitize();
    payload.validate()?;
    validate_marks(payload.pass_mark, payload.total_mark).map_err(AppError::BadRequest)?;

    let now = chrono::Utc::now();
    let exam = sqlx::query_as::<_, Exam>(&format!(
        r#"
        INSERT INTO exams
        (name, description, subject, class_level, program, academic_term, academic_year,
         duration, exam_date, exam_time, exam_type, pass_mark, total_mark, status,
         created_by, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING {EXAM_COLUMNS}
        "#
    ))
    .bind(payload.name)
    .bind(payload.description)
    .bind(payload.subject)
    .bind(payload.class_level)
    .bind(payload.program)
    .bind(payload.academic_term)
    .bind(payload.academic_year)
    .bind(payload.duration)
    .bind(payload.exam_date)
    .bind(payload.exam_time)
    .bind(payload.exam_type)
    .bind(payload.pass_mark)
    .bind(payload.total_mark)
    .bind(payload.status)
    .bind(claims.user_id()?)
    .bind(now)
    .bind(now)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create exam: {:?}", e);
        AppError::from(e)
    })?;

    tracing::info!(exam_id = exam.id, created_by = exam.created_by, "Exam created");
    Ok((StatusCode::CREATED, Json(exam)))
}

/// Lists every exam, soonest first.
/// Date filtering for "available" exams happens on the client.
pub async fn list_exams(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let exams = sqlx::query_as::<_, Exam>(&format!(
        "SELECT {EXAM_COLUMNS} FROM exams ORDER BY exam_date ASC, exam_time ASC, id ASC"
    ))
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list exams: {:?}", e);
        AppError::from(e)
    })?;

    Ok(Json(exams))
}

pub async fn get_exam(
    State(pool): State<SqlitePool>,
    AppPath(id): AppPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(find_exam(&pool, id).await?))
}

/// Partially updates an exam.
/// Owner or admin only. The mark invariant is checked against the merged values.
pub async fn update_exam(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    AppPath(id): AppPath<i64>,
    AppJson(mut payload): AppJson<UpdateExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    claims.require_role(&[Role::Teacher, Role::Admin])?;
    payload.sanitize();
    payload.validate()?;

    let current = find_exam(&pool, id).await?;
    ensure_exam_owner(&current, &claims)?;

    if payload.is_empty() {
        return Ok(Json(current));
    }

    let merged = Exam {
        name: payload.name.unwrap_or(current.name),
        description: payload.description.unwrap_or(current.description),
        subject: payload.subject.or(current.subject),
        class_level: payload.class_level.or(current.class_level),
        program: payload.program.or(current.program),
        academic_term: payload.academic_term.or(current.academic_term),
        academic_year: payload.academic_year.or(current.academic_year),
        duration: payload.duration.unwrap_or(current.duration),
        exam_date: payload.exam_date.unwrap_or(current.exam_date),
        exam_time: payload.exam_time.unwrap_or(current.exam_time),
        exam_type: payload.exam_type.unwrap_or(current.exam_type),
        pass_mark: payload.pass_mark.unwrap_or(current.pass_mark),
        total_mark: payload.total_mark.unwrap_or(current.total_mark),
        status: payload.status.unwrap_or(current.status),
        updated_at: chrono::Utc::now(),
        ..current
    };
    validate_marks(merged.pass_mark, merged.total_mark).map_err(AppError::BadRequest)?;

    let exam = sqlx::query_as::<_, Exam>(&format!(
        r#"
        UPDATE exams SET
            name = ?, description = ?, subject = ?, class_level = ?, program = ?,
            academic_term = ?, academic_year = ?, duration = ?, exam_date = ?, exam_time = ?,
            exam_type = ?, pass_mark = ?, total_mark = ?, status = ?, updated_at = ?
        WHERE id = ?
        RETURNING {EXAM_COLUMNS}
        "#
    ))
    .bind(merged.name)
    .bind(merged.description)
    .bind(merged.subject)
    .bind(merged.class_level)
    .bind(merged.program)
    .bind(merged.academic_term)
    .bind(merged.academic_year)
    .bind(merged.duration)
    .bind(merged.exam_date)
    .bind(merged.exam_time)
    .bind(merged.exam_type)
    .bind(merged.pass_mark)
    .bind(merged.total_mark)
    .bind(merged.status)
    .bind(merged.updated_at)
    .bind(id)
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to update exam: {:?}", e);
        AppError::from(e)
    })?
    .ok_or_else(|| AppError::NotFound(format!("No exam with id {}", id)))?;

    tracing::info!(exam_id = exam.id, "Exam updated");
    Ok(Json(exam))
}
