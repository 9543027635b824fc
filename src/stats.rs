// src/stats.rs

use serde::{Deserialize, Serialize};

use crate::{
    config::PASSING_SCORE_PERCENTAGE,
    models::exam_result::{ExamResult, StudentResultView},
};

/// Anything that carries a publishable score.
pub trait Scored {
    fn is_published(&self) -> bool;
    fn score(&self) -> Option<f64>;
}

impl Scored for ExamResult {
    fn is_published(&self) -> bool {
        self.is_published
    }

    fn score(&self) -> Option<f64> {
        Some(self.score)
    }
}

impl Scored for StudentResultView {
    fn is_published(&self) -> bool {
        self.is_published
    }

    fn score(&self) -> Option<f64> {
        self.score
    }
}

/// Aggregates over a student's results.
///
/// `total_exams` counts every result; the remaining fields cover published
/// results only and are all zero when nothing is published yet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultStatistics {
    pub total_exams: usize,
    pub published_exams: usize,
    /// Rounded to one decimal place.
    pub average_score: f64,
    pub highest_score: f64,
    pub lowest_score: f64,
    pub passed_exams: usize,
    pub failed_exams: usize,
}

pub fn summarize<T: Scored>(results: &[T]) -> ResultStatistics {
    let scores: Vec<f64> = results
        .iter()
        .filter(|r| r.is_published())
        .map(|r| r.score().unwrap_or(0.0))
        .collect();

    if scores.is_empty() {
        return ResultStatistics {
            total_exams: results.len(),
            ..Default::default()
        };
    }

    let total: f64 = scores.iter().sum();
    let average = total / scores.len() as f64;
    let highest = scores.iter().copied().fold(f64::MIN, f64::max);
    let lowest = scores.iter().copied().fold(f64::MAX, f64::min);
    let passed = scores
        .iter()
        .filter(|s| **s >= PASSING_SCORE_PERCENTAGE)
        .count();

    ResultStatistics {
        total_exams: results.len(),
        published_exams: scores.len(),
        average_score: (average * 10.0).round() / 10.0,
        highest_score: highest,
        lowest_score: lowest,
        passed_exams: passed,
        failed_exams: scores.len() - passed,
    }
}
