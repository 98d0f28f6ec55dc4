// Posts module
// Post creation and filtered, paginated listing

pub mod handlers;
pub mod models;
pub mod query;
pub mod repository;
pub mod service;

pub use handlers::{create_post_handler, list_posts_handler};
pub use models::{CreatePostRequest, Post, PostData, PostListData, PostOwner, PostWithOwner};
pub use query::{Pagination, PostListParams, PostQuery, QueryValidator};
pub use repository::{InMemoryPostRepository, PgPostRepository, PostRepository};
pub use service::PostService;
