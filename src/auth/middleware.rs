// Authentication middleware for protected routes

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use crate::auth::{error::AuthError, models::CurrentAccount};
use crate::AppState;

/// Extract the token from an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Request gate: verifies the bearer token, loads the account and attaches it
/// to the request as `CurrentAccount`. Rejects with 401 otherwise.
///
/// Usage: `.route_layer(middleware::from_fn_with_state(state, require_auth))`
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let endpoint = request.uri().path().to_string();

    let token = bearer_token(request.headers())
        .ok_or_else(|| {
            warn!("Authentication failed: No token provided for {}", endpoint);
            AuthError::MissingToken
        })?
        .to_string();

    let account = state
        .auth_service
        .authenticate(&token)
        .await
        .map_err(|e| {
            warn!("Authentication failed for {}: {}", endpoint, e);
            e
        })?;

    debug!(account_id = %account.id, "Authentication successful for {}", endpoint);
    request.extensions_mut().insert(CurrentAccount(account));
    Ok(next.run(request).await)
}

/// Handlers behind `require_auth` take the caller as an argument
#[async_trait]
impl<S> FromRequestParts<S> for CurrentAccount
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentAccount>()
            .cloned()
            .ok_or(AuthError::MissingToken)
    }
}
