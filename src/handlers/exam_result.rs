// src/handlers/exam_result.rs

use axum::{
    Extension, Json,
    extract::State,
    response::{IntoResponse, Response},
};
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::{
        exam_result::{ExamResult, PublishToggleResponse, StudentResultView},
        user::Role,
    },
    stats::summarize,
    utils::{extract::AppPath, jwt::Claims},
};

const RESULT_SELECT: &str = r#"
    SELECT
        r.id, r.student_id, r.exam_id, e.name AS exam_name, r.score, r.correct_count,
        r.total_questions, r.status, r.grade, r.remarks, r.answered_questions, r.is_published,
        r.created_at
    FROM exam_results r
    JOIN exams e ON e.id = r.exam_id
"#;

async fn results_for_student(pool: &SqlitePool, student_id: i64) -> Result<Vec<ExamResult>, AppError> {
    sqlx::query_as::<_, ExamResult>(&format!(
        "{RESULT_SELECT} WHERE r.student_id = ? ORDER BY r.created_at DESC, r.id DESC"
    ))
    .bind(student_id)
    .fetch_all(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch exam results: {:?}", e);
        AppError::from(e)
    })
}

/// Students get their own results with unpublished scores redacted.
/// Admins get every result in full.
pub async fn list_results(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<Response, AppError> {
    claims.require_role(&[Role::Student, Role::Admin])?;

    if claims.role == Role::Admin {
        let results = sqlx::query_as::<_, ExamResult>(&format!(
            "{RESULT_SELECT} ORDER BY r.created_at DESC, r.id DESC"
        ))
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch exam results: {:?}", e);
            AppError::from(e)
        })?;
        return Ok(Json(results).into_response());
    }

    let views: Vec<StudentResultView> = results_for_student(&pool, claims.user_id()?)
        .await?
        .into_iter()
        .map(|r| r.into_student_view(false))
        .collect();

    Ok(Json(views).into_response())
}

/// Aggregate statistics over the caller's published results.
pub async fn result_statistics(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    claims.require_role(&[Role::Student])?;

    let results = results_for_student(&pool, claims.user_id()?).await?;
    Ok(Json(summarize(&results)))
}

/// Detail view of one result.
///
/// A student can only open their own results (anything else is a 404), and the
/// per-question breakdown appears once the result is published.
pub async fn check_result(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    AppPath(id): AppPath<i64>,
) -> Result<Response, AppError> {
    claims.require_role(&[Role::Student, Role::Admin])?;

    let result = sqlx::query_as::<_, ExamResult>(&format!("{RESULT_SELECT} WHERE r.id = ?"))
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No exam result with id {}", id)))?;

    if claims.role == Role::Admin {
        return Ok(Json(result).into_response());
    }

    if result.student_id != claims.user_id()? {
        return Err(AppError::NotFound(format!("No exam result with id {}", id)));
    }

    Ok(Json(result.into_student_view(true)).into_response())
}

/// Flips `is_published`. The score is untouched.
/// Admin only.
pub async fn toggle_publish(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    AppPath(id): AppPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    claims.require_role(&[Role::Admin])?;

    let is_published = sqlx::query_scalar::<_, bool>(
        "UPDATE exam_results SET is_published = NOT is_published WHERE id = ? RETURNING is_published",
    )
    .bind(id)
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to toggle exam result: {:?}", e);
        AppError::from(e)
    })?
    .ok_or_else(|| AppError::NotFound(format!("No exam result with id {}", id)))?;

    tracing::info!(result_id = id, is_published, "Exam result publication toggled");
    Ok(Json(PublishToggleResponse { id, is_published }))
}
