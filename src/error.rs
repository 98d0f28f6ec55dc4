// Error handling module for the Content API
// Provides centralized error types and HTTP response conversion

use axum::{
    body::{to_bytes, Body},
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Request, State,
    },
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, warn};
use utoipa::ToSchema;

use crate::config::Environment;
use crate::response::ApiResponse;

/// A single field-level validation failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FieldError {
    #[schema(example = "email")]
    pub field: String,
    #[schema(example = "Email must be valid")]
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Main error type for the API
/// All handlers return Result<T, ApiError>
///
/// Each variant maps to one HTTP status code and renders as the shared
/// `{success, message, errors?}` envelope.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Maps to HTTP 400 Bad Request
    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    /// Maps to HTTP 409 Conflict
    #[error("{0}")]
    Conflict(String),

    /// Bad credentials or a missing/invalid/expired token
    /// Maps to HTTP 401 Unauthorized
    #[error("{0}")]
    Unauthorized(String),

    /// Maps to HTTP 404 Not Found
    #[error("{0}")]
    NotFound(String),

    /// Maps to HTTP 500; details are never sent to clients
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Maps to HTTP 500; details are never sent to clients
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Internal error detail attached to 500 responses as a response extension.
/// Only `expose_error_details` reads it, and only in development.
#[derive(Debug, Clone)]
pub struct ErrorDiagnostics(pub String);

impl ApiError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::Validation(vec![FieldError::new(field, message)])
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Database(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing message, errors list and internal diagnostics.
    /// Logs at a level matching the error class.
    fn to_error_parts(&self) -> (String, Option<Vec<FieldError>>, Option<String>) {
        match self {
            ApiError::Validation(errors) => {
                debug!(?errors, "Validation errors");
                ("Validation failed".to_string(), Some(errors.clone()), None)
            }
            ApiError::Conflict(message) => {
                warn!("Conflict error: {}", message);
                (message.clone(), None, None)
            }
            ApiError::Unauthorized(message) => {
                warn!("Unauthorized access attempt: {}", message);
                (message.clone(), None, None)
            }
            ApiError::NotFound(message) => {
                debug!("Not found: {}", message);
                (message.clone(), None, None)
            }
            ApiError::Database(db_error) => {
                error!("Database error: {:?}", db_error);
                (
                    "A database error occurred".to_string(),
                    None,
                    Some(format!("{:?}", db_error)),
                )
            }
            ApiError::Internal(internal_msg) => {
                error!("Internal error: {}", internal_msg);
                (
                    "An internal server error occurred".to_string(),
                    None,
                    Some(internal_msg.clone()),
                )
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (message, errors, diagnostics) = self.to_error_parts();

        let mut response = (status, Json(ApiResponse::<()>::failure(message, errors))).into_response();
        if let Some(detail) = diagnostics {
            response.extensions_mut().insert(ErrorDiagnostics(detail));
        }
        response
    }
}

/// Convert validator errors to ApiError, one entry per failed rule
impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<FieldError> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, failures)| {
                failures.iter().map(move |failure| {
                    let message = failure
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{} is invalid", field));
                    FieldError::new(camel_case(field), message)
                })
            })
            .collect();
        fields.sort_by(|a, b| a.field.cmp(&b.field));
        ApiError::Validation(fields)
    }
}

/// Request fields are reported by their JSON names
fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper_next = false;
    for c in field.chars() {
        if c == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation("body", rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::validation("query", rejection.body_text())
    }
}

/// Fallback for unmatched routes
pub async fn route_not_found() -> ApiError {
    ApiError::NotFound("Route not found".to_string())
}

/// Response stage that adds a `stack` field with internal error detail to
/// 500 responses. Development mode only.
pub async fn expose_error_details(
    State(environment): State<Environment>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;
    if !environment.is_development() {
        return response;
    }

    let Some(ErrorDiagnostics(detail)) = response.extensions().get::<ErrorDiagnostics>().cloned()
    else {
        return response;
    };

    let (mut parts, body) = response.into_parts();
    let bytes = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            error!("Failed to buffer error response: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let mut value: serde_json::Value = match serde_json::from_slice(&bytes) {
        Ok(value) => value,
        Err(_) => return Response::from_parts(parts, Body::from(bytes)),
    };
    if let Some(object) = value.as_object_mut() {
        object.insert("stack".to_string(), serde_json::Value::String(detail));
    }

    parts.headers.remove(header::CONTENT_LENGTH);
    match serde_json::to_vec(&value) {
        Ok(body) => Response::from_parts(parts, Body::from(body)),
        Err(_) => Response::from_parts(parts, Body::from(bytes)),
    }
}
