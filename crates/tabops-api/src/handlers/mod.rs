//! API route handlers

use axum::extract::{FromRequest, FromRequestParts};

use crate::error::ApiError;

pub mod content;
pub mod downloads;
pub mod health;
pub mod monitoring;

/// JSON body whose rejection uses the `{success, message}` shape
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Query string whose rejection uses the `{success, message}` shape
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);
