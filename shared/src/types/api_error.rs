use http::StatusCode;
use thiserror::Error;

use crate::types::json_error::ErrorResponse;

/// Every failure the session core and the resource handlers can report.
///
/// Token failures of any cause (expired, forged, already rotated, missing)
/// collapse into [`ApiError::Unauthorized`] so a caller cannot tell them
/// apart. Credential failures collapse into [`ApiError::InvalidCredentials`]
/// whether the email is unknown or the password wrong.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid or expired token")]
    Unauthorized,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("An internal error occurred")]
    Internal,
}

impl ApiError {
    pub fn to_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Conflict(_) => "CONFLICT",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Internal => "INTERNAL_ERROR",
        }
    }

    pub fn to_message(&self) -> String {
        self.to_string()
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::InvalidCredentials | Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// True for both flavours of authentication failure.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::InvalidCredentials | Self::Unauthorized)
    }

    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse::new(self.to_code(), &self.to_message())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}
