// src/client/mod.rs

//! Learner-side library: a typed HTTP client for the API and the timed exam
//! session that drives an attempt from first question to submission.

pub mod api;
pub mod clock;
pub mod session;

pub use api::{ApiClient, ApiError, ApiResult, AuthSession, available_exams};
pub use clock::{Clock, IntervalClock, VirtualClock};
pub use session::{ExamSession, SessionCommand, SessionError, SessionState, Submitter};
