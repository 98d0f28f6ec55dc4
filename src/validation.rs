// Validation utilities module
// Custom validation rules plus the extractor that runs sanitizing and
// validation before any handler logic

use std::borrow::Cow;
use std::sync::OnceLock;

use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use regex::Regex;
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationError};

use crate::error::ApiError;

fn image_url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^https?://\S+$").expect("static regex is valid"))
}

fn error_with_message(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Borrowed(message));
    error
}

/// Password must contain at least one letter and one digit
pub fn validate_password_composition(password: &str) -> Result<(), ValidationError> {
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(error_with_message(
            "password_missing_digit",
            "Password must contain at least one number",
        ));
    }
    if !password.chars().any(|c| c.is_ascii_alphabetic()) {
        return Err(error_with_message(
            "password_missing_letter",
            "Password must contain at least one letter",
        ));
    }
    Ok(())
}

/// Image URLs must look like `http(s)://...` with no whitespace
pub fn validate_image_url(url: &str) -> Result<(), ValidationError> {
    if image_url_pattern().is_match(url) {
        Ok(())
    } else {
        Err(error_with_message("invalid_image_url", "Image URL must be valid"))
    }
}

/// Input normalization applied before validation
pub trait Sanitize {
    fn sanitize(&mut self);
}

/// Trim and lowercase an email address
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// JSON body extractor that deserializes, sanitizes and validates.
/// Any failure short-circuits with a 400 envelope.
#[derive(Debug)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + Sanitize,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(mut value) = Json::<T>::from_request(req, state).await?;
        value.sanitize();
        value.validate()?;
        Ok(Self(value))
    }
}
