// src/utils/extract.rs

//! Extractors whose rejections go through `AppError`, so a body or path that
//! fails to parse still answers with the `{status, message}` envelope.

use axum::extract::{FromRequest, FromRequestParts, Json, Path, Query};

use crate::error::AppError;

#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(Path), rejection(AppError))]
pub struct AppPath<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(Query), rejection(AppError))]
pub struct AppQuery<T>(pub T);
