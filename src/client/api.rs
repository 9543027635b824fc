// src/client/api.rs

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tokio::sync::Mutex;
use url::Url;

use crate::{
    client::session::Submitter,
    models::{
        exam::{CreateExamRequest, Exam},
        exam_result::{
            AnswerSubmission, ExamResult, PublishToggleResponse, StudentResultView,
            SubmitExamRequest, SubmitExamResponse,
        },
        question::{CreateQuestionRequest, PublicQuestion, Question},
        user::{LoginRequest, LoginResponse, Role},
    },
    stats::ResultStatistics,
};

pub type ApiResult<T> = Result<T, ApiError>;

/// Every failure an API call can produce, normalized from the status code and
/// the server's `{status, message}` envelope.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid request: {0}")]
    Validation(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    fn from_status(status: StatusCode, message: String) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => ApiError::Unauthorized(message),
            StatusCode::FORBIDDEN => ApiError::Forbidden(message),
            StatusCode::NOT_FOUND => ApiError::NotFound(message),
            StatusCode::CONFLICT => ApiError::Conflict(message),
            s if s.is_client_error() => ApiError::Validation(message),
            s => ApiError::Server {
                status: s.as_u16(),
                message,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    message: String,
}

/// The signed-in identity. Cleared by `logout` or by any 401.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub token: String,
    pub role: Role,
}

/// Typed client for the `/api/v1` surface.
///
/// Clones share the same session, so a 401 seen by one clone signs out all of them.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
    session: Arc<Mutex<Option<AuthSession>>>,
}

impl ApiClient {
    /// `base` is the API root, e.g. `http://localhost:8000/api/v1`.
    pub fn new(mut base: Url) -> Self {
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Self {
            http: reqwest::Client::new(),
            base,
            session: Arc::new(Mutex::new(None)),
        }
    }

    pub async fn session(&self) -> Option<AuthSession> {
        self.session.lock().await.clone()
    }

    pub async fn logout(&self) {
        *self.session.lock().await = None;
    }

    fn request(&self, method: Method, path: &str) -> ApiResult<RequestBuilder> {
        let url = self
            .base
            .join(path)
            .map_err(|e| ApiError::Validation(format!("bad path '{}': {}", path, e)))?;
        Ok(self.http.request(method, url))
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> ApiResult<T> {
        let request = match self.session.lock().await.as_ref() {
            Some(session) => request.bearer_auth(&session.token),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            return Ok(serde_json::from_str(&body)?);
        }

        let message = serde_json::from_str::<ErrorEnvelope>(&body)
            .map(|envelope| envelope.message)
            .unwrap_or_else(|_| status.canonical_reason().unwrap_or("request failed").to_string());

        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!("Session rejected by the server, signing out");
            self.logout().await;
        }

        Err(ApiError::from_status(status, message))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.send(self.request(Method::GET, path)?).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        self.send(self.request(Method::POST, path)?.json(body)).await
    }

    /// Signs in and keeps the bearer token for subsequent calls.
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<AuthSession> {
        self.logout().await;

        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let response: LoginResponse = self.post("auth/login", &body).await?;

        let session = AuthSession {
            token: response.token,
            role: response.role,
        };
        *self.session.lock().await = Some(session.clone());
        Ok(session)
    }

    pub async fn list_exams(&self) -> ApiResult<Vec<Exam>> {
        self.get("exams").await
    }

    pub async fn get_exam(&self, id: i64) -> ApiResult<Exam> {
        self.get(&format!("exams/{}", id)).await
    }

    pub async fn create_exam(&self, exam: &CreateExamRequest) -> ApiResult<Exam> {
        self.post("exams", exam).await
    }

    pub async fn create_question(
        &self,
        exam_id: i64,
        question: &CreateQuestionRequest,
    ) -> ApiResult<Question> {
        self.post(&format!("questions/{}", exam_id), question).await
    }

    /// Questions of an exam as a student sees them, without the answer key.
    pub async fn exam_questions(&self, exam_id: i64) -> ApiResult<Vec<PublicQuestion>> {
        self.get(&format!("questions/exam/{}", exam_id)).await
    }

    pub async fn write_exam(
        &self,
        exam_id: i64,
        answers: &[AnswerSubmission],
    ) -> ApiResult<SubmitExamResponse> {
        let body = SubmitExamRequest {
            answers: answers.to_vec(),
        };
        self.post(&format!("students/exam/{}/write", exam_id), &body)
            .await
    }

    /// The signed-in student's results, redacted until published.
    pub async fn exam_results(&self) -> ApiResult<Vec<StudentResultView>> {
        self.get("exam-results").await
    }

    /// Every result, unredacted. Admin only.
    pub async fn all_results(&self) -> ApiResult<Vec<ExamResult>> {
        self.get("exam-results").await
    }

    pub async fn check_result(&self, id: i64) -> ApiResult<StudentResultView> {
        self.get(&format!("exam-results/{}/checking", id)).await
    }

    pub async fn statistics(&self) -> ApiResult<ResultStatistics> {
        self.get("exam-results/statistics").await
    }

    pub async fn toggle_publish(&self, id: i64) -> ApiResult<PublishToggleResponse> {
        let request = self.request(
            Method::PATCH,
            &format!("exam-results/{}/admin-toggle-publish", id),
        )?;
        self.send(request).await
    }
}

#[async_trait]
impl Submitter for ApiClient {
    async fn submit(
        &self,
        exam_id: i64,
        answers: &[AnswerSubmission],
    ) -> ApiResult<SubmitExamResponse> {
        self.write_exam(exam_id, answers).await
    }
}

/// Exams dated today or later, in input order.
pub fn available_exams(exams: Vec<Exam>, today: NaiveDate) -> Vec<Exam> {
    exams
        .into_iter()
        .filter(|exam| exam.exam_date >= today)
        .collect()
}
