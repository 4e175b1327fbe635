//! JSON error responses for the API.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;

use crate::data::profile::ProfileError;

/// Machine-readable error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorCode {
    InvalidBody,
    InvalidAverage,
    EmptyInterests,
    InvalidGrade,
    NotFound,
    Internal,
}

/// An error rendered as `{ "code": ..., "message": ... }`.
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    pub status: StatusCode,
    pub code: ApiErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: ApiErrorCode, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, ApiErrorCode::NotFound, message)
    }

    pub fn program_not_found(index: usize) -> Self {
        Self::not_found(format!("no program at index {index}"))
    }
}

impl From<ProfileError> for ApiError {
    fn from(e: ProfileError) -> Self {
        let code = match e {
            ProfileError::InvalidAverage(_) => ApiErrorCode::InvalidAverage,
            ProfileError::EmptyInterests => ApiErrorCode::EmptyInterests,
            ProfileError::InvalidGrade(_) => ApiErrorCode::InvalidGrade,
        };
        Self::new(StatusCode::BAD_REQUEST, code, e.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            ApiErrorCode::InvalidBody,
            rejection.body_text(),
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(code = ?self.code, message = %self.message, "API error");
        }
        (self.status, Json(self)).into_response()
    }
}
