// src/grading.rs

//! Auto-grading of multiple-choice submissions.
//!
//! A submission is scored against the full answer key of its exam:
//! `score = correct / questions_in_exam * 100`. Blank and missing answers
//! count as wrong. There is no partial credit or negative marking, and the
//! exam's own pass/total marks do not enter the score.

use std::collections::{HashMap, HashSet};

use sqlx::FromRow;

use crate::{
    config::PASSING_SCORE_PERCENTAGE,
    models::{
        exam_result::{AnswerSubmission, AnsweredQuestion, LetterGrade, ResultStatus},
        question::OptionKey,
    },
};

/// Answer key row for one question.
#[derive(Debug, Clone, FromRow)]
pub struct AnswerKey {
    pub id: i64,
    pub question: String,
    pub correct_answer: OptionKey,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GradingError {
    #[error("No answers submitted")]
    EmptySubmission,

    #[error("Question {0} does not belong to this exam")]
    UnknownQuestion(i64),

    #[error("Question {0} was answered more than once")]
    DuplicateQuestion(i64),

    #[error("Answer '{answer}' for question {question_id} is not a valid option")]
    InvalidAnswer { question_id: i64, answer: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Grade {
    pub correct_count: usize,
    pub total_questions: usize,
    pub answered_count: usize,
    pub score: f64,
    pub status: ResultStatus,
    pub letter: LetterGrade,
    pub answered: Vec<AnsweredQuestion>,
}

/// Parses a submitted answer; the empty string is a blank.
pub fn parse_answer(answer: &str) -> Result<Option<OptionKey>, String> {
    if answer.is_empty() {
        return Ok(None);
    }
    answer.parse().map(Some)
}

/// Percentage of correct answers. An exam with no questions scores 0.
pub fn calculate_score(correct_count: usize, total_questions: usize) -> f64 {
    if total_questions == 0 {
        return 0.0;
    }
    (correct_count as f64 / total_questions as f64) * 100.0
}

pub fn status_for(score: f64) -> ResultStatus {
    if score >= PASSING_SCORE_PERCENTAGE {
        ResultStatus::Passed
    } else {
        ResultStatus::Failed
    }
}

/// Grades `answers` against `key`.
///
/// The breakdown follows the order of `key`, which covers every question of
/// the exam whether or not it was answered. An empty sheet is only accepted
/// for an exam without questions, and scores 0.
pub fn grade(key: &[AnswerKey], answers: &[AnswerSubmission]) -> Result<Grade, GradingError> {
    if answers.is_empty() && !key.is_empty() {
        return Err(GradingError::EmptySubmission);
    }

    let known: HashSet<i64> = key.iter().map(|k| k.id).collect();
    let mut selected: HashMap<i64, Option<OptionKey>> = HashMap::with_capacity(answers.len());

    for submission in answers {
        if !known.contains(&submission.question_id) {
            return Err(GradingError::UnknownQuestion(submission.question_id));
        }
        let choice = parse_answer(&submission.answer).map_err(|_| GradingError::InvalidAnswer {
            question_id: submission.question_id,
            answer: submission.answer.clone(),
        })?;
        if selected.insert(submission.question_id, choice).is_some() {
            return Err(GradingError::DuplicateQuestion(submission.question_id));
        }
    }

    let answered: Vec<AnsweredQuestion> = key
        .iter()
        .map(|k| {
            let choice = selected.get(&k.id).copied().flatten();
            AnsweredQuestion {
                question_id: k.id,
                question: k.question.clone(),
                selected: choice,
                correct_answer: k.correct_answer,
                is_correct: choice == Some(k.correct_answer),
            }
        })
        .collect();

    let correct_count = answered.iter().filter(|a| a.is_correct).count();
    let answered_count = answered.iter().filter(|a| a.selected.is_some()).count();
    let score = calculate_score(correct_count, key.len());

    Ok(Grade {
        correct_count,
        total_questions: key.len(),
        answered_count,
        score,
        status: status_for(score),
        letter: LetterGrade::from_score(score),
        answered,
    })
}
