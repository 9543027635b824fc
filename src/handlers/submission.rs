// src/handlers/submission.rs

use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{SqlitePool, types::Json as SqlJson};

use crate::{
    error::AppError,
    grading::{AnswerKey, grade},
    handlers::exam::find_exam,
    models::{
        exam_result::{SubmitExamRequest, SubmitExamResponse},
        user::Role,
    },
    utils::{
        extract::{AppJson, AppPath},
        jwt::Claims,
    },
};

const ALREADY_WRITTEN: &str = "You have already written this exam";

/// Grades a student's answers and stores the result, unpublished.
///
/// * The answer list must only reference questions of this exam, once each.
/// * The score covers every question of the exam; unanswered ones count as wrong.
/// * A student gets one result per exam; a resubmission is a 409.
/// * No check is made against the exam's scheduled window.
pub async fn write_exam(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    AppPath(exam_id): AppPath<i64>,
    AppJson(req): AppJson<SubmitExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    claims.require_role(&[Role::Student])?;
    let student_id = claims.user_id()?;

    let exam = find_exam(&pool, exam_id).await?;

    let already_written = sqlx::query_scalar::<_, i64>(
        "SELECT id FROM exam_results WHERE student_id = ? AND exam_id = ?",
    )
    .bind(student_id)
    .bind(exam.id)
    .fetch_optional(&pool)
    .await?;

    if already_written.is_some() {
        return Err(AppError::Conflict(ALREADY_WRITTEN.to_string()));
    }

    let answer_key = sqlx::query_as::<_, AnswerKey>(
        "SELECT id, question, correct_answer FROM questions WHERE exam_id = ? ORDER BY id",
    )
    .bind(exam.id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to load answer key: {:?}", e);
        AppError::from(e)
    })?;

    let grade = grade(&answer_key, &req.answers).map_err(|e| AppError::BadRequest(e.to_string()))?;

    let result_id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO exam_results
        (student_id, exam_id, score, correct_count, total_questions, status, grade,
         answered_questions, is_published, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, FALSE, ?)
        RETURNING id
        "#,
    )
    .bind(student_id)
    .bind(exam.id)
    .bind(grade.score)
    .bind(grade.correct_count as i64)
    .bind(grade.total_questions as i64)
    .bind(grade.status)
    .bind(grade.letter)
    .bind(SqlJson(&grade.answered))
    .bind(chrono::Utc::now())
    .fetch_one(&pool)
    .await
    .map_err(|e| match AppError::from(e) {
        // Lost a race with a concurrent submission.
        AppError::Conflict(_) => AppError::Conflict(ALREADY_WRITTEN.to_string()),
        other => other,
    })?;

    tracing::info!(
        result_id,
        exam_id = exam.id,
        student_id,
        correct = grade.correct_count,
        total = grade.total_questions,
        "Exam submitted"
    );

    Ok((
        StatusCode::CREATED,
        Json(SubmitExamResponse {
            id: result_id,
            exam_id: exam.id,
            total_questions: grade.total_questions as i64,
            answered_count: grade.answered_count as i64,
            message: "Exam submitted successfully".to_string(),
        }),
    ))
}
