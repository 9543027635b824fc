// src/handlers/mod.rs

pub mod auth;
pub mod exam;
pub mod exam_result;
pub mod question;
pub mod submission;
pub mod user;
