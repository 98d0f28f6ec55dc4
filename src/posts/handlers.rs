// HTTP handlers for post endpoints

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    Json,
};

use crate::auth::CurrentAccount;
use crate::error::ApiError;
use crate::posts::{
    models::{CreatePostRequest, PostData, PostListData},
    query::{PostListParams, QueryValidator},
};
use crate::response::ApiResponse;
use crate::validation::ValidatedJson;
use crate::AppState;

/// Create a post owned by the caller
/// POST /api/posts
#[utoipa::path(
    post,
    path = "/api/posts",
    request_body = CreatePostRequest,
    responses(
        (status = 201, description = "Post created successfully; envelope data holds the post", body = PostData),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Missing, invalid or expired token")
    ),
    security(("bearer_auth" = [])),
    tag = "posts"
)]
pub async fn create_post_handler(
    State(state): State<AppState>,
    CurrentAccount(account): CurrentAccount,
    ValidatedJson(request): ValidatedJson<CreatePostRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PostData>>), ApiError> {
    tracing::debug!("Creating post for account {}", account.id);

    let post = state.post_service.create_post(&account, request).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Post created successfully", PostData { post })),
    ))
}

/// List posts with search, date range, tag filters and pagination
/// GET /api/posts
#[utoipa::path(
    get,
    path = "/api/posts",
    params(PostListParams),
    responses(
        (status = 200, description = "Posts fetched successfully; envelope data holds posts and pagination", body = PostListData),
        (status = 400, description = "Validation failed")
    ),
    tag = "posts"
)]
pub async fn list_posts_handler(
    State(state): State<AppState>,
    params: Result<Query<PostListParams>, QueryRejection>,
) -> Result<Json<ApiResponse<PostListData>>, ApiError> {
    let Query(params) = params?;
    tracing::debug!("Fetching posts with query parameters: {:?}", params);

    let query = QueryValidator::validate(params)?;
    let data = state.post_service.list_posts(query).await?;

    tracing::debug!("Query returned {} posts", data.posts.len());
    Ok(Json(ApiResponse::success("Posts fetched successfully", data)))
}
