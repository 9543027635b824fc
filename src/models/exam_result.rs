// src/models/exam_result.rs

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};

use crate::models::question::OptionKey;

/// Pass/fail outcome against the fixed 50-point cutoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ResultStatus {
    Passed,
    Failed,
}

/// Letter grade on the score: A from 90, then one letter per 10 points down to
/// E at 50. Anything below is F.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum LetterGrade {
    A,
    B,
    C,
    D,
    E,
    F,
}

impl LetterGrade {
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s >= 90.0 => LetterGrade::A,
            s if s >= 80.0 => LetterGrade::B,
            s if s >= 70.0 => LetterGrade::C,
            s if s >= 60.0 => LetterGrade::D,
            s if s >= 50.0 => LetterGrade::E,
            _ => LetterGrade::F,
        }
    }
}

/// What a student sees in place of the status: unpublished results are "pending".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayStatus {
    Pending,
    Passed,
    Failed,
}

impl From<ResultStatus> for DisplayStatus {
    fn from(status: ResultStatus) -> Self {
        match status {
            ResultStatus::Passed => DisplayStatus::Passed,
            ResultStatus::Failed => DisplayStatus::Failed,
        }
    }
}

/// Per-question outcome captured at grading time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnsweredQuestion {
    pub question_id: i64,
    pub question: String,
    /// `None` when the question was left blank.
    pub selected: Option<OptionKey>,
    pub correct_answer: OptionKey,
    pub is_correct: bool,
}

/// Represents the 'exam_results' table, joined with the exam name.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamResult {
    pub id: i64,
    pub student_id: i64,
    pub exam_id: i64,
    pub exam_name: String,

    /// Percentage of correct answers, 0..=100.
    pub score: f64,
    pub correct_count: i64,
    pub total_questions: i64,
    pub status: ResultStatus,
    pub grade: LetterGrade,
    /// Free-text note on the result, if any.
    pub remarks: Option<String>,
    pub answered_questions: Json<Vec<AnsweredQuestion>>,

    /// Gates the score from the student until an admin publishes it.
    pub is_published: bool,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl ExamResult {
    /// The student-facing projection. Scores stay hidden until published;
    /// the per-question breakdown is included only when `with_breakdown` is set.
    pub fn into_student_view(self, with_breakdown: bool) -> StudentResultView {
        let published = self.is_published;
        StudentResultView {
            id: self.id,
            exam_id: self.exam_id,
            exam_name: self.exam_name,
            score: published.then_some(self.score),
            status: published.then_some(self.status),
            grade: published.then_some(self.grade),
            remarks: published.then_some(self.remarks).flatten(),
            correct_count: published.then_some(self.correct_count),
            total_questions: self.total_questions,
            display_status: if published {
                self.status.into()
            } else {
                DisplayStatus::Pending
            },
            answered_questions: (published && with_breakdown).then_some(self.answered_questions.0),
            is_published: published,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentResultView {
    pub id: i64,
    pub exam_id: i64,
    pub exam_name: String,
    pub score: Option<f64>,
    pub status: Option<ResultStatus>,
    pub grade: Option<LetterGrade>,
    pub remarks: Option<String>,
    pub correct_count: Option<i64>,
    pub total_questions: i64,
    pub display_status: DisplayStatus,
    pub answered_questions: Option<Vec<AnsweredQuestion>>,
    pub is_published: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// One submitted answer. `answer` is an option key or `""` for a blank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerSubmission {
    pub question_id: i64,
    pub answer: String,
}

/// DTO for `POST /students/exam/{exam_id}/write`.
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitExamRequest {
    pub answers: Vec<AnswerSubmission>,
}

/// Receipt for a submission. The score is withheld until publication.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitExamResponse {
    pub id: i64,
    pub exam_id: i64,
    pub total_questions: i64,
    pub answered_count: i64,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishToggleResponse {
    pub id: i64,
    pub is_published: bool,
}
