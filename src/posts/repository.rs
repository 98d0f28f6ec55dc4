// Post repositories: PostgreSQL and in-memory implementations

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::auth::AccountRepository;
use crate::error::ApiError;
use crate::posts::models::{NewPost, Post, PostOwner, PostWithOwner};
use crate::posts::query::{PageWindow, PostFilter, SqlParam, SqlQueryBuilder};

/// Post store operations
#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn insert(&self, post: NewPost) -> Result<Post, ApiError>;

    /// One page of matching posts, newest upload first, owners joined
    async fn find_page(&self, filter: &PostFilter, window: PageWindow) -> Result<Vec<PostWithOwner>, ApiError>;

    /// Number of posts matching the filter
    async fn count(&self, filter: &PostFilter) -> Result<u64, ApiError>;
}

/// PostgreSQL-backed post repository
#[derive(Clone)]
pub struct PgPostRepository {
    pool: PgPool,
}

impl PgPostRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Listing row: post columns plus the joined owner fields
#[derive(Debug, FromRow)]
struct PostRow {
    id: Uuid,
    user_id: Uuid,
    title: String,
    description: String,
    tags: Vec<String>,
    image_url: Option<String>,
    upload_time: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    owner_name: Option<String>,
    owner_email: Option<String>,
}

impl From<PostRow> for PostWithOwner {
    fn from(row: PostRow) -> Self {
        let owner = match (row.owner_name, row.owner_email) {
            (Some(name), Some(email)) => Some(PostOwner {
                id: row.user_id,
                name,
                email,
            }),
            _ => None,
        };

        Self {
            post: Post {
                id: row.id,
                user_id: row.user_id,
                title: row.title,
                description: row.description,
                tags: row.tags,
                image_url: row.image_url,
                upload_time: row.upload_time,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            owner,
        }
    }
}

#[async_trait]
impl PostRepository for PgPostRepository {
    #[instrument(skip(self, post), fields(user_id = %post.user_id))]
    async fn insert(&self, post: NewPost) -> Result<Post, ApiError> {
        let created = sqlx::query_as::<_, Post>(
            r#"
            INSERT INTO posts (user_id, title, description, tags, image_url, upload_time)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, user_id, title, description, tags, image_url, upload_time, created_at, updated_at
            "#,
        )
        .bind(post.user_id)
        .bind(&post.title)
        .bind(&post.description)
        .bind(&post.tags)
        .bind(&post.image_url)
        .bind(post.upload_time)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    #[instrument(skip(self))]
    async fn find_page(&self, filter: &PostFilter, window: PageWindow) -> Result<Vec<PostWithOwner>, ApiError> {
        let mut builder = SqlQueryBuilder::from_filter(filter);
        builder.set_pagination(window);
        let (sql, params) = builder.build();
        debug!(sql = %sql, "Fetching post page");

        let mut query = sqlx::query_as::<_, PostRow>(&sql);
        for param in params {
            query = match param {
                SqlParam::Text(value) => query.bind(value),
                SqlParam::Timestamp(value) => query.bind(value),
                SqlParam::TextArray(value) => query.bind(value),
            };
        }

        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(PostWithOwner::from).collect())
    }

    #[instrument(skip(self))]
    async fn count(&self, filter: &PostFilter) -> Result<u64, ApiError> {
        let (sql, params) = SqlQueryBuilder::from_filter(filter).build_count();

        let mut query = sqlx::query_scalar::<_, i64>(&sql);
        for param in params {
            query = match param {
                SqlParam::Text(value) => query.bind(value),
                SqlParam::Timestamp(value) => query.bind(value),
                SqlParam::TextArray(value) => query.bind(value),
            };
        }

        let total = query.fetch_one(&self.pool).await?;
        Ok(total.max(0) as u64)
    }
}

/// In-memory post repository for development and testing.
/// Owners are resolved through the account repository at read time.
pub struct InMemoryPostRepository {
    posts: Mutex<Vec<Post>>,
    accounts: Arc<dyn AccountRepository>,
}

impl InMemoryPostRepository {
    pub fn new(accounts: Arc<dyn AccountRepository>) -> Self {
        Self {
            posts: Mutex::new(Vec::new()),
            accounts,
        }
    }

    /// Store a fully formed post as-is, keeping its timestamps
    pub fn seed(&self, post: Post) {
        self.lock().push(post);
    }

    pub fn post_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Post>> {
        // A poisoned list is still structurally valid
        self.posts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl PostRepository for InMemoryPostRepository {
    async fn insert(&self, post: NewPost) -> Result<Post, ApiError> {
        let now = Utc::now();
        let stored = Post {
            id: Uuid::new_v4(),
            user_id: post.user_id,
            title: post.title,
            description: post.description,
            tags: post.tags,
            image_url: post.image_url,
            upload_time: post.upload_time,
            created_at: now,
            updated_at: now,
        };
        self.lock().push(stored.clone());
        Ok(stored)
    }

    async fn find_page(&self, filter: &PostFilter, window: PageWindow) -> Result<Vec<PostWithOwner>, ApiError> {
        let page: Vec<Post> = {
            let posts = self.lock();
            let mut matching: Vec<&Post> = posts.iter().filter(|post| filter.matches(post)).collect();
            matching.sort_by(|a, b| {
                b.upload_time
                    .cmp(&a.upload_time)
                    .then_with(|| b.id.cmp(&a.id))
            });
            matching
                .into_iter()
                .skip(window.skip as usize)
                .take(window.limit as usize)
                .cloned()
                .collect()
        };

        let mut listed = Vec::with_capacity(page.len());
        for post in page {
            let owner = self
                .accounts
                .find_summary_by_id(post.user_id)
                .await?
                .map(PostOwner::from);
            listed.push(PostWithOwner { post, owner });
        }
        Ok(listed)
    }

    async fn count(&self, filter: &PostFilter) -> Result<u64, ApiError> {
        Ok(self.lock().iter().filter(|post| filter.matches(post)).count() as u64)
    }
}
