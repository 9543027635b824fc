// src/models/exam.rs

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::utils::html::{clean_html, clean_opt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ExamType {
    #[default]
    Quiz,
    Midterm,
    Final,
}

/// Whether the exam has been opened to students by its teacher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ExamStatus {
    #[default]
    Pending,
    Live,
}

/// Represents the 'exams' table in the database.
///
/// The academic references (subject, class level, ...) are opaque ids owned by
/// the academic catalogue and are stored without lookup.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exam {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub subject: Option<String>,
    pub class_level: Option<String>,
    pub program: Option<String>,
    pub academic_term: Option<String>,
    pub academic_year: Option<String>,

    /// Length of an attempt in minutes.
    pub duration: i64,

    pub exam_date: NaiveDate,

    /// Start time of day, `HH:MM`.
    pub exam_time: String,

    pub exam_type: ExamType,
    pub pass_mark: i64,
    pub total_mark: i64,
    pub status: ExamStatus,

    /// Authoring teacher.
    pub created_by: i64,

    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Exam {
    /// Countdown length for one attempt.
    pub fn duration_secs(&self) -> u64 {
        u64::try_from(self.duration).unwrap_or(0) * 60
    }
}

fn default_pass_mark() -> i64 {
    50
}

fn default_total_mark() -> i64 {
    100
}

/// DTO for creating an exam.
#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateExamRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1, max = 2000))]
    pub description: String,
    #[validate(length(max = 100))]
    pub subject: Option<String>,
    #[validate(length(max = 100))]
    pub class_level: Option<String>,
    #[validate(length(max = 100))]
    pub program: Option<String>,
    #[validate(length(max = 100))]
    pub academic_term: Option<String>,
    #[validate(length(max = 100))]
    pub academic_year: Option<String>,
    #[validate(range(min = 1, max = 600, message = "Duration must be between 1 and 600 minutes."))]
    pub duration: i64,
    pub exam_date: NaiveDate,
    #[validate(custom(function = validate_exam_time))]
    pub exam_time: String,
    #[serde(default)]
    pub exam_type: ExamType,
    #[serde(default = "default_pass_mark")]
    #[validate(range(min = 0, max = 1000))]
    pub pass_mark: i64,
    #[serde(default = "default_total_mark")]
    #[validate(range(min = 1, max = 1000))]
    pub total_mark: i64,
    #[serde(default)]
    pub status: ExamStatus,
}

/// DTO for updating an exam. Fields are optional.
#[derive(Debug, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateExamRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 2000))]
    pub description: Option<String>,
    #[validate(length(max = 100))]
    pub subject: Option<String>,
    #[validate(length(max = 100))]
    pub class_level: Option<String>,
    #[validate(length(max = 100))]
    pub program: Option<String>,
    #[validate(length(max = 100))]
    pub academic_term: Option<String>,
    #[validate(length(max = 100))]
    pub academic_year: Option<String>,
    #[validate(range(min = 1, max = 600, message = "Duration must be between 1 and 600 minutes."))]
    pub duration: Option<i64>,
    pub exam_date: Option<NaiveDate>,
    #[validate(custom(function = validate_exam_time))]
    pub exam_time: Option<String>,
    pub exam_type: Option<ExamType>,
    #[validate(range(min = 0, max = 1000))]
    pub pass_mark: Option<i64>,
    #[validate(range(min = 1, max = 1000))]
    pub total_mark: Option<i64>,
    pub status: Option<ExamStatus>,
}

impl CreateExamRequest {
    /// Strips unsafe markup from the free-text fields. Runs before validation.
    pub fn sanitize(&mut self) {
        self.name = clean_html(&self.name);
        self.description = clean_html(&self.description);
    }
}

impl UpdateExamRequest {
    pub fn sanitize(&mut self) {
        self.name = clean_opt(self.name.take());
        self.description = clean_opt(self.description.take());
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.subject.is_none()
            && self.class_level.is_none()
            && self.program.is_none()
            && self.academic_term.is_none()
            && self.academic_year.is_none()
            && self.duration.is_none()
            && self.exam_date.is_none()
            && self.exam_time.is_none()
            && self.exam_type.is_none()
            && self.pass_mark.is_none()
            && self.total_mark.is_none()
            && self.status.is_none()
    }
}

/// Accepts `HH:MM` on a 24-hour clock.
fn validate_exam_time(time: &str) -> Result<(), validator::ValidationError> {
    NaiveTime::parse_from_str(time, "%H:%M")
        .map(|_| ())
        .map_err(|_| validator::ValidationError::new("exam_time_must_be_hh_mm"))
}

/// The pass mark may not exceed the total mark.
pub fn validate_marks(pass_mark: i64, total_mark: i64) -> Result<(), String> {
    if pass_mark > total_mark {
        return Err(format!(
            "Pass mark ({}) cannot exceed total mark ({})",
            pass_mark, total_mark
        ));
    }
    Ok(())
}
