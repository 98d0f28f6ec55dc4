// HTTP handlers for authentication endpoints

use axum::{extract::State, http::StatusCode, Json};

use crate::auth::models::{AuthData, LoginRequest, SignupRequest};
use crate::error::ApiError;
use crate::response::ApiResponse;
use crate::validation::ValidatedJson;
use crate::AppState;

/// Register a new account
/// POST /api/signup
#[utoipa::path(
    post,
    path = "/api/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User registered successfully; envelope data holds user and token", body = AuthData),
        (status = 400, description = "Validation failed"),
        (status = 409, description = "Email already exists")
    ),
    tag = "auth"
)]
pub async fn signup_handler(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<SignupRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AuthData>>), ApiError> {
    let data = state.auth_service.signup(request).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("User registered successfully", data)),
    ))
}

/// Log in an existing account
/// POST /api/login
#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful; envelope data holds user and token", body = AuthData),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Invalid email or password")
    ),
    tag = "auth"
)]
pub async fn login_handler(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> Result<Json<ApiResponse<AuthData>>, ApiError> {
    let data = state.auth_service.login(request).await?;

    Ok(Json(ApiResponse::success("Login successful", data)))
}
