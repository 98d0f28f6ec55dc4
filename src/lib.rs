// Content API: accounts with bearer-token auth, and posts with search,
// date/tag filters and pagination

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod posts;
pub mod response;
pub mod validation;

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue},
    middleware,
    response::Json,
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use tower_http::{
    cors::{Any, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::{
    login_handler, require_auth, signup_handler, AccountRepository, AccountSummary, AuthData,
    AuthService, InMemoryAccountRepository, LoginRequest, PgAccountRepository, SignupRequest,
    TokenService,
};
use crate::config::AppConfig;
use crate::error::{expose_error_details, route_not_found, FieldError};
use crate::posts::{
    create_post_handler, list_posts_handler, CreatePostRequest, InMemoryPostRepository, Pagination,
    PgPostRepository, Post, PostData, PostListData, PostOwner, PostRepository, PostService,
    PostWithOwner,
};
use crate::response::ApiResponse;

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::auth::handlers::signup_handler,
        crate::auth::handlers::login_handler,
        crate::posts::handlers::create_post_handler,
        crate::posts::handlers::list_posts_handler,
    ),
    components(
        schemas(
            SignupRequest,
            LoginRequest,
            AuthData,
            AccountSummary,
            CreatePostRequest,
            Post,
            PostOwner,
            PostWithOwner,
            PostData,
            PostListData,
            Pagination,
            FieldError
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Signup and login"),
        (name = "posts", description = "Post creation and listing")
    ),
    info(
        title = "Content API",
        version = "1.0.0",
        description = "Accounts with bearer-token authentication and searchable, paginated posts"
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub auth_service: Arc<AuthService>,
    pub post_service: Arc<PostService>,
}

impl AppState {
    /// Wire services over the given repositories
    pub fn new(
        config: AppConfig,
        accounts: Arc<dyn AccountRepository>,
        posts: Arc<dyn PostRepository>,
    ) -> Self {
        let tokens = TokenService::new(&config.jwt_secret, config.token_ttl_secs);
        Self {
            auth_service: Arc::new(AuthService::new(accounts, tokens)),
            post_service: Arc::new(PostService::new(posts)),
            config: Arc::new(config),
        }
    }

    /// State backed by the in-memory stores
    pub fn in_memory(config: AppConfig) -> Self {
        let accounts: Arc<dyn AccountRepository> = Arc::new(InMemoryAccountRepository::new());
        let posts = Arc::new(InMemoryPostRepository::new(accounts.clone()));
        Self::new(config, accounts, posts)
    }

    /// State backed by PostgreSQL
    pub fn postgres(config: AppConfig, pool: PgPool) -> Self {
        Self::new(
            config,
            Arc::new(PgAccountRepository::new(pool.clone())),
            Arc::new(PgPostRepository::new(pool)),
        )
    }
}

/// Liveness probe
/// GET /health
async fn health_check() -> Json<ApiResponse<()>> {
    Json(ApiResponse::<()>::message("OK"))
}

/// Creates and configures the application router
/// Maps all API endpoints to their handlers and adds the middleware stack.
/// Rate limiting is added by the binary.
pub fn create_router(state: AppState) -> Router {
    let environment = state.config.environment;

    // Configure CORS to allow all origins, methods, and headers
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Unsupported methods on known paths fall through to the 404 envelope
        .route("/health", get(health_check).fallback(route_not_found))
        .route("/api/signup", post(signup_handler).fallback(route_not_found))
        .route("/api/login", post(login_handler).fallback(route_not_found))
        .route(
            "/api/posts",
            post(create_post_handler)
                .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
                .get(list_posts_handler)
                .fallback(route_not_found),
        )
        .fallback(route_not_found)
        .layer(middleware::from_fn_with_state(environment, expose_error_details))
        .layer(cors)
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(logging::request_span)
                .on_response(logging::log_response),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests;
