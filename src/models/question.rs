// src/models/question.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use validator::Validate;

use crate::utils::html::{clean_html, clean_opt};

/// One of the four option slots of a multiple-choice question.
/// Serialized as `optionA` .. `optionD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "camelCase")]
#[sqlx(rename_all = "camelCase")]
pub enum OptionKey {
    OptionA,
    OptionB,
    OptionC,
    OptionD,
}

impl OptionKey {
    pub const ALL: [OptionKey; 4] = [
        OptionKey::OptionA,
        OptionKey::OptionB,
        OptionKey::OptionC,
        OptionKey::OptionD,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OptionKey::OptionA => "optionA",
            OptionKey::OptionB => "optionB",
            OptionKey::OptionC => "optionC",
            OptionKey::OptionD => "optionD",
        }
    }
}

impl fmt::Display for OptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptionKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OptionKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| format!("'{}' is not an option key", s))
    }
}

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: i64,

    /// Owning exam.
    pub exam_id: i64,

    /// The text content of the question.
    pub question: String,

    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,

    /// The correct option.
    pub correct_answer: OptionKey,

    pub created_by: i64,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for sending question to students (excludes the answer key).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicQuestion {
    pub id: i64,
    pub exam_id: i64,
    pub question: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
}

impl From<Question> for PublicQuestion {
    fn from(q: Question) -> Self {
        Self {
            id: q.id,
            exam_id: q.exam_id,
            question: q.question,
            option_a: q.option_a,
            option_b: q.option_b,
            option_c: q.option_c,
            option_d: q.option_d,
        }
    }
}

/// Question list for an exam, shaped by the caller's role.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ExamQuestions {
    Public(Vec<PublicQuestion>),
    Full(Vec<Question>),
}

/// DTO for creating a new question.
#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 1000))]
    pub question: String,
    #[validate(length(min = 1, max = 500))]
    pub option_a: String,
    #[validate(length(min = 1, max = 500))]
    pub option_b: String,
    #[validate(length(min = 1, max = 500))]
    pub option_c: String,
    #[validate(length(min = 1, max = 500))]
    pub option_d: String,
    pub correct_answer: OptionKey,
}

/// DTO for updating a question. Fields are optional.
#[derive(Debug, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuestionRequest {
    #[validate(length(min = 1, max = 1000))]
    pub question: Option<String>,
    #[validate(length(min = 1, max = 500))]
    pub option_a: Option<String>,
    #[validate(length(min = 1, max = 500))]
    pub option_b: Option<String>,
    #[validate(length(min = 1, max = 500))]
    pub option_c: Option<String>,
    #[validate(length(min = 1, max = 500))]
    pub option_d: Option<String>,
    pub correct_answer: Option<OptionKey>,
}

impl CreateQuestionRequest {
    /// Strips unsafe markup. Runs before validation so lengths apply to what is stored.
    pub fn sanitize(&mut self) {
        for text in [
            &mut self.question,
            &mut self.option_a,
            &mut self.option_b,
            &mut self.option_c,
            &mut self.option_d,
        ] {
            *text = clean_html(text);
        }
    }
}

impl UpdateQuestionRequest {
    pub fn sanitize(&mut self) {
        for text in [
            &mut self.question,
            &mut self.option_a,
            &mut self.option_b,
            &mut self.option_c,
            &mut self.option_d,
        ] {
            *text = clean_opt(text.take());
        }
    }
}
