// src/handlers/user.rs

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
    models::user::{CreateUserRequest, Role, User, UserListParams},
    utils::{
        extract::{AppJson, AppQuery},
        hash::hash_password,
        jwt::Claims,
    },
};

const USER_COLUMNS: &str = "id, name, email, password, role, created_at";

/// Lists accounts, optionally filtered by role.
/// Admin only.
pub async fn list_users(
    State(pool): State<SqlitePool>,
    AppQuery(params): AppQuery<UserListParams>,
) -> Result<impl IntoResponse, AppError> {
    let users = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE (?1 IS NULL OR role = ?1) ORDER BY id DESC"
    ))
    .bind(params.role)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list users: {:?}", e);
        AppError::from(e)
    })?;

    Ok(Json(users))
}

/// Creates an account in any role.
/// Admin only.
pub async fn create_user(
    State(pool): State<SqlitePool>,
    AppJson(payload): AppJson<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let email = payload.email.trim().to_lowercase();
    let user = insert_user(&pool, &payload.name, &email, &payload.password, payload.role)
        .await
        .map_err(|e| match e {
            AppError::Conflict(_) => {
                AppError::Conflict(format!("Email '{}' is already registered", email))
            }
            other => other,
        })?;

    tracing::info!(user_id = user.id, role = %user.role, "User created");
    Ok((StatusCode::CREATED, Json(user)))
}

/// Returns the caller's own account.
pub async fn me(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
        .bind(claims.user_id()?)
        .fetch_optional(&pool)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}

async fn insert_user(
    pool: &SqlitePool,
    name: &str,
    email: &str,
    password: &str,
    role: Role,
) -> Result<User, AppError> {
    let hashed_password = hash_password(password)?;

    let user = sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (name, email, password, role, created_at) VALUES (?, ?, ?, ?, ?) RETURNING {USER_COLUMNS}"
    ))
    .bind(name)
    .bind(email)
    .bind(hashed_password)
    .bind(role)
    .bind(chrono::Utc::now())
    .fetch_one(pool)
    .await?;

    Ok(user)
}

/// Creates the bootstrap admin if no account uses `email` yet.
/// Returns whether an account was created.
pub async fn seed_admin(pool: &SqlitePool, email: &str, password: &str) -> Result<bool, AppError> {
    let email = email.trim().to_lowercase();
    let exists = sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE email = ?")
        .bind(&email)
        .fetch_optional(pool)
        .await?;

    if exists.is_some() {
        return Ok(false);
    }

    tracing::info!("Seeding admin user: {}", email);
    insert_user(pool, "Administrator", &email, password, Role::Admin).await?;
    Ok(true)
}
