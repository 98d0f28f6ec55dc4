// Authentication error types

use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::error::ApiError;

/// Authentication error types
///
/// The `Display` text of each client-facing variant is exactly the message
/// returned in the response envelope.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Email already exists")]
    EmailAlreadyExists,

    /// Unknown email and wrong password are deliberately the same variant
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Authentication required. Please provide a valid token.")]
    MissingToken,

    #[error("Token expired. Please login again.")]
    ExpiredToken,

    #[error("Authentication failed. Invalid token.")]
    InvalidToken,

    /// Token still valid but its account no longer exists
    #[error("Authentication failed. User not found.")]
    UserNotFound,

    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    #[error("Token generation error: {0}")]
    TokenGeneration(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for AuthError {
    fn from(error: sqlx::Error) -> Self {
        AuthError::Database(error.to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::EmailAlreadyExists => ApiError::Conflict(error.to_string()),
            AuthError::InvalidCredentials
            | AuthError::MissingToken
            | AuthError::ExpiredToken
            | AuthError::InvalidToken
            | AuthError::UserNotFound => ApiError::Unauthorized(error.to_string()),
            AuthError::PasswordHash(_)
            | AuthError::TokenGeneration(_)
            | AuthError::Database(_) => ApiError::Internal(error.to_string()),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}
