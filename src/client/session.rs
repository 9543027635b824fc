// src/client/session.rs

//! One learner's timed attempt at an exam.
//!
//! The session owns the countdown and the in-memory answer sheet. Nothing is
//! persisted until submission; closing the session discards the attempt.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::{
    client::{
        api::{ApiClient, ApiError, ApiResult},
        clock::Clock,
    },
    config::TIME_WARNING_SECONDS,
    models::{
        exam::Exam,
        exam_result::{AnswerSubmission, SubmitExamResponse},
        question::{OptionKey, PublicQuestion},
    },
};

/// Remaining time at or below which the countdown is shown as a warning.
const WARNING_BAND_SECONDS: u64 = 600;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Loading,
    InProgress,
    Submitting,
    TimeExpired,
    AutoSubmitting,
    Submitted,
}

/// Learner input fed to [`ExamSession::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Answer {
        question_id: i64,
        option: OptionKey,
    },
    Submit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing to count down in the current state.
    Idle,
    Running { remaining: u64 },
    /// The countdown just reached zero.
    Expired,
}

/// Urgency of the remaining time, for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeBand {
    Normal,
    Warning,
    Critical,
}

impl TimeBand {
    pub fn for_remaining(seconds: u64) -> Self {
        if seconds <= TIME_WARNING_SECONDS {
            TimeBand::Critical
        } else if seconds <= WARNING_BAND_SECONDS {
            TimeBand::Warning
        } else {
            TimeBand::Normal
        }
    }
}

/// `H:MM:SS` when an hour or more is left, `M:SS` otherwise.
pub fn format_remaining(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

/// What the success view shows after a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub exam_name: String,
    pub question_count: usize,
    pub answered_count: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("the exam has already been started")]
    AlreadyStarted,

    #[error("the exam is not in progress")]
    NotInProgress,

    #[error("question {0} is not part of this exam")]
    UnknownQuestion(i64),

    #[error("the exam has already been submitted")]
    AlreadySubmitted,

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("the session was closed before submission")]
    Abandoned,
}

/// Delivers a finished answer sheet.
#[async_trait]
pub trait Submitter: Send + Sync {
    async fn submit(
        &self,
        exam_id: i64,
        answers: &[AnswerSubmission],
    ) -> ApiResult<SubmitExamResponse>;
}

#[derive(Debug)]
pub struct ExamSession {
    exam_id: i64,
    exam_name: String,
    questions: Vec<PublicQuestion>,
    answers: HashMap<i64, OptionKey>,
    remaining: u64,
    warning: bool,
    state: SessionState,
    last_error: Option<String>,
    summary: Option<SessionSummary>,
    /// Set once the automatic submission at zero has been attempted.
    auto_submitted: bool,
}

impl ExamSession {
    pub fn loading(exam_id: i64) -> Self {
        Self {
            exam_id,
            exam_name: String::new(),
            questions: Vec::new(),
            answers: HashMap::new(),
            remaining: 0,
            warning: false,
            state: SessionState::Loading,
            last_error: None,
            summary: None,
            auto_submitted: false,
        }
    }

    /// Starts the countdown at `duration × 60` seconds.
    pub fn begin(&mut self, exam: &Exam, questions: Vec<PublicQuestion>) -> Result<(), SessionError> {
        if self.state != SessionState::Loading {
            return Err(SessionError::AlreadyStarted);
        }

        self.exam_id = exam.id;
        self.exam_name = exam.name.clone();
        self.questions = questions;
        self.remaining = exam.duration_secs();
        self.warning = self.remaining <= TIME_WARNING_SECONDS;
        self.state = SessionState::InProgress;
        Ok(())
    }

    /// Fetches the exam and its questions, then starts the attempt.
    pub async fn open(client: &ApiClient, exam_id: i64) -> Result<Self, SessionError> {
        let mut session = Self::loading(exam_id);
        let exam = client.get_exam(exam_id).await?;
        let questions = client.exam_questions(exam_id).await?;
        session.begin(&exam, questions)?;

        tracing::info!(
            exam_id,
            questions = session.questions.len(),
            seconds = session.remaining,
            "Exam session started"
        );
        Ok(session)
    }

    pub fn exam_id(&self) -> i64 {
        self.exam_id
    }

    pub fn exam_name(&self) -> &str {
        &self.exam_name
    }

    pub fn questions(&self) -> &[PublicQuestion] {
        &self.questions
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    pub fn time_band(&self) -> TimeBand {
        TimeBand::for_remaining(self.remaining)
    }

    /// Raised once five minutes or less are left.
    pub fn warning(&self) -> bool {
        self.warning
    }

    pub fn selected(&self, question_id: i64) -> Option<OptionKey> {
        self.answers.get(&question_id).copied()
    }

    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn summary(&self) -> Option<&SessionSummary> {
        self.summary.as_ref()
    }

    /// Records or replaces the choice for one question.
    pub fn answer(&mut self, question_id: i64, option: OptionKey) -> Result<(), SessionError> {
        match self.state {
            SessionState::InProgress => {}
            SessionState::Submitted => return Err(SessionError::AlreadySubmitted),
            _ => return Err(SessionError::NotInProgress),
        }

        if !self.questions.iter().any(|q| q.id == question_id) {
            return Err(SessionError::UnknownQuestion(question_id));
        }

        self.answers.insert(question_id, option);
        Ok(())
    }

    /// Whether the countdown is running. It keeps running while a manual
    /// submission is in flight, since that request may still fail.
    fn counting(&self) -> bool {
        match self.state {
            SessionState::InProgress => true,
            SessionState::Submitting => self.remaining > 0,
            _ => false,
        }
    }

    /// Advances the countdown by one second.
    ///
    /// Reaching zero moves an in-progress attempt to `TimeExpired`. An attempt
    /// that is already submitting stays there until the request settles.
    pub fn tick(&mut self) -> TickOutcome {
        if !self.counting() {
            return TickOutcome::Idle;
        }

        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining <= TIME_WARNING_SECONDS {
            self.warning = true;
        }

        if self.remaining == 0 {
            if self.state == SessionState::InProgress {
                self.state = SessionState::TimeExpired;
            }
            TickOutcome::Expired
        } else {
            TickOutcome::Running {
                remaining: self.remaining,
            }
        }
    }

    /// The answer sheet: every question in order, `""` where left blank.
    pub fn submission(&self) -> Vec<AnswerSubmission> {
        self.questions
            .iter()
            .map(|q| AnswerSubmission {
                question_id: q.id,
                answer: self
                    .answers
                    .get(&q.id)
                    .map(|key| key.as_str().to_string())
                    .unwrap_or_default(),
            })
            .collect()
    }

    /// Sends the answer sheet. On failure the session goes back to the state it
    /// was in, keeps every answer and remembers the error.
    pub async fn submit<S>(&mut self, submitter: &S) -> Result<SessionSummary, SessionError>
    where
        S: Submitter + ?Sized,
    {
        let (previous, answers) = self.start_submit()?;
        let result = submitter.submit(self.exam_id, &answers).await;
        self.finish_submit(previous, result)
    }

    /// Like `submit`, but the countdown keeps running on `clock` until the
    /// request settles.
    async fn submit_counting<C, S>(
        &mut self,
        clock: &mut C,
        submitter: &S,
    ) -> Result<SessionSummary, SessionError>
    where
        C: Clock + ?Sized,
        S: Submitter + ?Sized,
    {
        let (previous, answers) = self.start_submit()?;
        let mut pending = submitter.submit(self.exam_id, &answers);

        let result = loop {
            let counting = self.counting();

            tokio::select! {
                biased;

                result = &mut pending => break result,

                _ = clock.tick(), if counting => {
                    if self.tick() == TickOutcome::Expired {
                        tracing::info!(exam_id = self.exam_id, "Time ran out while submitting");
                    }
                }
            }
        };

        self.finish_submit(previous, result)
    }

    fn start_submit(&mut self) -> Result<(SessionState, Vec<AnswerSubmission>), SessionError> {
        let previous = self.state;
        self.state = match previous {
            SessionState::InProgress => SessionState::Submitting,
            SessionState::TimeExpired => SessionState::AutoSubmitting,
            SessionState::Submitted => return Err(SessionError::AlreadySubmitted),
            _ => return Err(SessionError::NotInProgress),
        };
        Ok((previous, self.submission()))
    }

    fn finish_submit(
        &mut self,
        previous: SessionState,
        result: ApiResult<SubmitExamResponse>,
    ) -> Result<SessionSummary, SessionError> {
        match result {
            Ok(receipt) => {
                let summary = SessionSummary {
                    exam_name: self.exam_name.clone(),
                    question_count: self.questions.len(),
                    answered_count: usize::try_from(receipt.answered_count)
                        .unwrap_or(self.answers.len()),
                };
                tracing::info!(
                    exam_id = self.exam_id,
                    result_id = receipt.id,
                    automatic = previous == SessionState::TimeExpired,
                    "Exam submitted"
                );
                self.state = SessionState::Submitted;
                self.last_error = None;
                self.summary = Some(summary.clone());
                Ok(summary)
            }
            Err(e) => {
                tracing::warn!(exam_id = self.exam_id, "Exam submission failed: {}", e);
                // Time may have run out while the request was pending.
                self.state = if previous == SessionState::InProgress && self.remaining == 0 {
                    SessionState::TimeExpired
                } else {
                    previous
                };
                self.last_error = Some(e.to_string());
                Err(SessionError::Api(e))
            }
        }
    }

    /// Drives the attempt until it is submitted.
    ///
    /// Learner commands take priority over clock ticks, and the clock keeps
    /// counting while a submission is in flight. When the countdown hits zero
    /// the sheet is submitted once; if that fails the session waits for a
    /// manual `Submit`. Dropping every command sender abandons the attempt.
    pub async fn run<C, S>(
        &mut self,
        clock: &mut C,
        submitter: &S,
        mut commands: mpsc::Receiver<SessionCommand>,
    ) -> Result<SessionSummary, SessionError>
    where
        C: Clock + ?Sized,
        S: Submitter + ?Sized,
    {
        loop {
            if let Some(summary) = &self.summary {
                return Ok(summary.clone());
            }

            if self.state == SessionState::TimeExpired && !self.auto_submitted {
                self.auto_submitted = true;
                tracing::info!(exam_id = self.exam_id, "Time is up, submitting");
                // Failure is recorded on the session; only a manual Submit retries.
                let _ = self.submit_counting(clock, submitter).await;
                continue;
            }

            let counting = self.counting();

            tokio::select! {
                biased;

                command = commands.recv() => match command {
                    Some(SessionCommand::Answer { question_id, option }) => {
                        if let Err(e) = self.answer(question_id, option) {
                            tracing::warn!(question_id, "Answer ignored: {}", e);
                        }
                    }
                    Some(SessionCommand::Submit) => {
                        let _ = self.submit_counting(clock, submitter).await;
                    }
                    None => return Err(SessionError::Abandoned),
                },

                _ = clock.tick(), if counting => {
                    self.tick();
                }
            }
        }
    }
}
