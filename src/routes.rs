// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, patch, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{auth, exam, exam_result, question, submission, user},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the main application router.
///
/// * Everything lives under `/api/v1`.
/// * Only `/auth/login` is public; the rest passes `auth_middleware`.
/// * `/users` additionally requires the admin role. Finer role checks are in the handlers.
pub fn create_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let admin_routes = Router::new()
        .route("/users", get(user::list_users).post(user::create_user))
        .route_layer(middleware::from_fn(admin_middleware));

    let exam_routes = Router::new()
        .route("/exams", get(exam::list_exams).post(exam::create_exam))
        .route("/exams/{id}", get(exam::get_exam).patch(exam::update_exam));

    let question_routes = Router::new()
        .route("/questions", get(question::list_questions))
        .route(
            "/questions/{id}",
            post(question::create_question)
                .get(question::get_question)
                .patch(question::update_question),
        )
        .route("/questions/exam/{exam_id}", get(question::list_exam_questions));

    let result_routes = Router::new()
        .route("/students/exam/{exam_id}/write", post(submission::write_exam))
        .route("/exam-results", get(exam_result::list_results))
        .route("/exam-results/statistics", get(exam_result::result_statistics))
        .route("/exam-results/{id}/checking", get(exam_result::check_result))
        .route(
            "/exam-results/{id}/admin-toggle-publish",
            patch(exam_result::toggle_publish),
        );

    // Double protection on admin routes: auth runs first, then the admin check.
    let protected = Router::new()
        .route("/users/me", get(user::me))
        .merge(admin_routes)
        .merge(exam_routes)
        .merge(question_routes)
        .merge(result_routes)
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let api = Router::new()
        .route("/auth/login", post(auth::login))
        .merge(protected);

    Router::new()
        .nest("/api/v1", api)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
