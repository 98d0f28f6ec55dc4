use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AccountSummary;
use crate::posts::query::Pagination;
use crate::validation::{validate_image_url, Sanitize};

/// Domain model representing a post in the database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Uuid,
    /// Owning account
    pub user_id: Uuid,
    #[serde(rename = "postName")]
    #[schema(example = "Sunset over the bay")]
    pub title: String,
    #[schema(example = "Taken from the pier just after eight")]
    pub description: String,
    #[schema(example = json!(["travel", "photo"]))]
    pub tags: Vec<String>,
    #[schema(example = "https://cdn.example.com/sunset.jpg")]
    pub image_url: Option<String>,
    /// Server time at creation; drives ordering and date filters
    pub upload_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Values needed to insert a post
#[derive(Debug, Clone)]
pub struct NewPost {
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub image_url: Option<String>,
    pub upload_time: DateTime<Utc>,
}

/// Owner fields joined onto listed posts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PostOwner {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

impl From<AccountSummary> for PostOwner {
    fn from(account: AccountSummary) -> Self {
        Self {
            id: account.id,
            name: account.name,
            email: account.email,
        }
    }
}

/// A listed post with its owner denormalized; `owner` is null when the
/// account no longer exists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PostWithOwner {
    #[serde(flatten)]
    pub post: Post,
    pub owner: Option<PostOwner>,
}

/// Request DTO for creating a post. `uploadTime` is not accepted from clients.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    #[serde(default)]
    #[validate(length(min = 3, max = 100, message = "Post name must be between 3 and 100 characters"))]
    #[schema(example = "Sunset over the bay")]
    pub post_name: String,
    #[serde(default)]
    #[validate(length(min = 10, message = "Description must be at least 10 characters"))]
    #[schema(example = "Taken from the pier just after eight")]
    pub description: String,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[validate(custom = "validate_image_url")]
    #[schema(example = "https://cdn.example.com/sunset.jpg")]
    pub image_url: Option<String>,
}

impl Sanitize for CreatePostRequest {
    fn sanitize(&mut self) {
        self.post_name = self.post_name.trim().to_string();
        self.description = self.description.trim().to_string();
        if let Some(url) = self.image_url.as_mut() {
            *url = url.trim().to_string();
        }
    }
}

/// Payload returned by post creation
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PostData {
    pub post: Post,
}

/// Payload returned by post listing
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PostListData {
    pub posts: Vec<PostWithOwner>,
    pub pagination: Pagination,
}
