// Post service - business logic layer

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};

use crate::auth::AccountSummary;
use crate::error::ApiError;
use crate::posts::{
    models::{CreatePostRequest, NewPost, Post, PostListData},
    query::{Pagination, PostQuery},
    repository::PostRepository,
};

/// Service layer for post creation and listing
#[derive(Clone)]
pub struct PostService {
    posts: Arc<dyn PostRepository>,
}

impl PostService {
    pub fn new(posts: Arc<dyn PostRepository>) -> Self {
        Self { posts }
    }

    /// Create a post owned by `owner`.
    /// The upload time is always server time.
    #[instrument(skip(self, owner, request), fields(owner_id = %owner.id))]
    pub async fn create_post(&self, owner: &AccountSummary, request: CreatePostRequest) -> Result<Post, ApiError> {
        let post = self
            .posts
            .insert(NewPost {
                user_id: owner.id,
                title: request.post_name,
                description: request.description,
                tags: request.tags.unwrap_or_default(),
                image_url: request.image_url,
                upload_time: Utc::now(),
            })
            .await?;

        info!(post_id = %post.id, "Post created");
        Ok(post)
    }

    /// Fetch one page of posts plus the pagination block.
    /// The page and the total count run concurrently with the same filter.
    #[instrument(skip(self))]
    pub async fn list_posts(&self, query: PostQuery) -> Result<PostListData, ApiError> {
        let window = query.window();
        let (posts, total) = tokio::try_join!(
            self.posts.find_page(&query.filter, window),
            self.posts.count(&query.filter)
        )?;

        let pagination = Pagination::new(total, query.page, query.limit, posts.len());
        Ok(PostListData { posts, pagination })
    }
}
