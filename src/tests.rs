// Router tests for the Content API
// Exercise the full middleware stack against the in-memory stores

use super::*;
use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{HeaderName, Method, Request, StatusCode};
use axum_test::TestServer;
use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use crate::config::Environment;
use crate::error::ApiError;
use crate::posts::query::{PageWindow, PostFilter};
use crate::posts::models::NewPost;

// ============================================================================
// Test Helpers
// ============================================================================

struct TestApp {
    server: TestServer,
    accounts: Arc<InMemoryAccountRepository>,
    posts: Arc<InMemoryPostRepository>,
    tokens: TokenService,
}

fn test_app() -> TestApp {
    let config = AppConfig::for_tests();
    let tokens = TokenService::new(&config.jwt_secret, config.token_ttl_secs);
    let accounts = Arc::new(InMemoryAccountRepository::new());
    let posts = Arc::new(InMemoryPostRepository::new(accounts.clone()));
    let state = AppState::new(config, accounts.clone(), posts.clone());

    TestApp {
        server: TestServer::new(create_router(state)).unwrap(),
        accounts,
        posts,
        tokens,
    }
}

fn bearer(token: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer {}", token)).unwrap()
}

fn signup_payload(email: &str) -> Value {
    json!({
        "name": "Ada Lovelace",
        "email": email,
        "password": "secret1"
    })
}

fn post_payload(name: &str) -> Value {
    json!({
        "postName": name,
        "description": "A description that is long enough",
        "tags": ["a", "b"]
    })
}

/// Sign up and return (account id, token)
async fn signup(app: &TestApp, email: &str) -> (Uuid, String) {
    let response = app.server.post("/api/signup").json(&signup_payload(email)).await;
    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    let id = body["data"]["user"]["id"].as_str().unwrap().parse().unwrap();
    let token = body["data"]["token"].as_str().unwrap().to_string();
    (id, token)
}

fn seeded_post(owner: Uuid, title: &str, tags: &[&str], upload_time: DateTime<Utc>) -> Post {
    Post {
        id: Uuid::new_v4(),
        user_id: owner,
        title: title.to_string(),
        description: "A description that is long enough".to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        image_url: None,
        upload_time,
        created_at: upload_time,
        updated_at: upload_time,
    }
}

fn titles(body: &Value) -> Vec<String> {
    body["data"]["posts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["postName"].as_str().unwrap().to_string())
        .collect()
}

fn error_fields(body: &Value) -> Vec<String> {
    body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap().to_string())
        .collect()
}

// ============================================================================
// Signup and Login
// ============================================================================

#[tokio::test]
async fn test_signup_then_login() {
    let app = test_app();

    let response = app
        .server
        .post("/api/signup")
        .json(&signup_payload("  Ada@Example.com "))
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "User registered successfully");
    assert_eq!(body["data"]["user"]["email"], "ada@example.com");
    assert!(body["data"]["user"].get("password").is_none());
    assert!(body["data"]["user"].get("password_hash").is_none());

    let response = app
        .server
        .post("/api/login")
        .json(&json!({"email": "ada@example.com", "password": "secret1"}))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["message"], "Login successful");
    let token = body["data"]["token"].as_str().unwrap();
    let id: Uuid = body["data"]["user"]["id"].as_str().unwrap().parse().unwrap();
    assert_eq!(app.tokens.verify(token).unwrap(), id);
}

#[tokio::test]
async fn test_duplicate_signup_conflicts() {
    let app = test_app();
    signup(&app, "ada@example.com").await;

    let response = app
        .server
        .post("/api/signup")
        .json(&signup_payload("ADA@example.com"))
        .await;
    response.assert_status(StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body, json!({"success": false, "message": "Email already exists"}));
    assert_eq!(app.accounts.account_count(), 1);
}

#[tokio::test]
async fn test_signup_validation_errors() {
    let app = test_app();

    let response = app
        .server
        .post("/api/signup")
        .json(&json!({"name": "A", "email": "not-an-email", "password": "abcdef"}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Validation failed");
    assert_eq!(error_fields(&body), vec!["email", "name", "password"]);
    assert_eq!(app.accounts.account_count(), 0);
}

#[tokio::test]
async fn test_malformed_json_is_a_validation_error() {
    let app = test_app();

    let response = app
        .server
        .post("/api/signup")
        .content_type("application/json")
        .bytes("{not json".into())
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["message"], "Validation failed");
    assert_eq!(error_fields(&body), vec!["body"]);
}

#[tokio::test]
async fn test_login_failures_are_identical() {
    let app = test_app();
    signup(&app, "ada@example.com").await;

    let wrong_password = app
        .server
        .post("/api/login")
        .json(&json!({"email": "ada@example.com", "password": "wrong99"}))
        .await;
    let unknown_email = app
        .server
        .post("/api/login")
        .json(&json!({"email": "nobody@example.com", "password": "secret1"}))
        .await;

    wrong_password.assert_status(StatusCode::UNAUTHORIZED);
    unknown_email.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password.text(), unknown_email.text());
    let body: Value = wrong_password.json();
    assert_eq!(body["message"], "Invalid email or password");
}

// ============================================================================
// Post creation (POST /api/posts)
// ============================================================================

#[tokio::test]
async fn test_create_post_requires_token() {
    let app = test_app();

    let response = app.server.post("/api/posts").json(&post_payload("Hello")).await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(
        body["message"],
        "Authentication required. Please provide a valid token."
    );
    assert_eq!(app.posts.post_count(), 0);
}

#[tokio::test]
async fn test_create_post_rejects_bad_tokens() {
    let app = test_app();
    let (id, _) = signup(&app, "ada@example.com").await;

    let response = app
        .server
        .post("/api/posts")
        .add_header(header::AUTHORIZATION, bearer("not.a.token"))
        .json(&post_payload("Hello"))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["message"], "Authentication failed. Invalid token.");

    let expired = app
        .tokens
        .issue_at(id, Utc::now() - Duration::days(8))
        .unwrap();
    let response = app
        .server
        .post("/api/posts")
        .add_header(header::AUTHORIZATION, bearer(&expired))
        .json(&post_payload("Hello"))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["message"], "Token expired. Please login again.");

    let foreign = TokenService::new("some-other-secret", 3600).issue(id).unwrap();
    let response = app
        .server
        .post("/api/posts")
        .add_header(header::AUTHORIZATION, bearer(&foreign))
        .json(&post_payload("Hello"))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    assert_eq!(app.posts.post_count(), 0);
}

#[tokio::test]
async fn test_create_post_for_deleted_account() {
    let app = test_app();
    let (id, token) = signup(&app, "ada@example.com").await;
    app.accounts.remove(id);

    let response = app
        .server
        .post("/api/posts")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .json(&post_payload("Hello"))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["message"], "Authentication failed. User not found.");
}

#[tokio::test]
async fn test_create_post_ignores_client_upload_time() {
    let app = test_app();
    let (id, token) = signup(&app, "ada@example.com").await;
    let before = Utc::now();

    let response = app
        .server
        .post("/api/posts")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .json(&json!({
            "postName": "  Sunset  ",
            "description": "Taken from the pier just after eight",
            "tags": ["b", "a"],
            "imageUrl": "https://cdn.example.com/sunset.jpg",
            "uploadTime": "2001-01-01T00:00:00Z",
            "userId": Uuid::new_v4()
        }))
        .await;
    response.assert_status(StatusCode::CREATED);

    let body: Value = response.json();
    assert_eq!(body["message"], "Post created successfully");
    let post = &body["data"]["post"];
    assert_eq!(post["postName"], "Sunset");
    assert_eq!(post["userId"], id.to_string());
    assert_eq!(post["tags"], json!(["b", "a"]));
    assert_eq!(post["imageUrl"], "https://cdn.example.com/sunset.jpg");

    let upload_time: DateTime<Utc> = post["uploadTime"].as_str().unwrap().parse().unwrap();
    assert!(upload_time >= before);
    assert!(upload_time <= Utc::now());
}

#[tokio::test]
async fn test_create_post_validation() {
    let app = test_app();
    let (_, token) = signup(&app, "ada@example.com").await;

    let response = app
        .server
        .post("/api/posts")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .json(&json!({
            "postName": "Hi",
            "description": "short",
            "imageUrl": "ftp://example.com/a.png"
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(error_fields(&body), vec!["description", "imageUrl", "postName"]);
    assert_eq!(app.posts.post_count(), 0);
}

// ============================================================================
// Post listing (GET /api/posts)
// ============================================================================

#[tokio::test]
async fn test_list_second_page_of_fifteen() {
    let app = test_app();
    let (id, _) = signup(&app, "ada@example.com").await;
    let base = Utc::now() - Duration::days(1);
    for i in 0..15 {
        app.posts
            .seed(seeded_post(id, &format!("Post {}", i), &[], base + Duration::minutes(i)));
    }

    let response = app
        .server
        .get("/api/posts")
        .add_query_param("page", 2)
        .add_query_param("limit", 10)
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["message"], "Posts fetched successfully");
    assert_eq!(
        titles(&body),
        vec!["Post 4", "Post 3", "Post 2", "Post 1", "Post 0"]
    );
    assert_eq!(
        body["data"]["pagination"],
        json!({
            "totalPosts": 15,
            "totalPages": 2,
            "currentPage": 2,
            "hasNextPage": false,
            "hasPrevPage": true
        })
    );
    assert_eq!(body["data"]["posts"][0]["owner"]["email"], "ada@example.com");
}

#[tokio::test]
async fn test_list_empty_store() {
    let app = test_app();

    let response = app.server.get("/api/posts").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["posts"], json!([]));
    assert_eq!(body["data"]["pagination"]["totalPages"], 0);
    assert_eq!(body["data"]["pagination"]["hasNextPage"], false);
}

#[tokio::test]
async fn test_list_filters_by_tags() {
    let app = test_app();
    let (id, _) = signup(&app, "ada@example.com").await;
    let now = Utc::now();
    app.posts.seed(seeded_post(id, "Foo post", &["foo"], now));
    app.posts.seed(seeded_post(id, "Bar post", &["x", "bar"], now - Duration::minutes(1)));
    app.posts.seed(seeded_post(id, "Other post", &["baz"], now - Duration::minutes(2)));

    let response = app
        .server
        .get("/api/posts")
        .add_query_param("tags", "foo, bar")
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(titles(&body), vec!["Foo post", "Bar post"]);
    assert_eq!(body["data"]["pagination"]["totalPosts"], 2);
}

#[tokio::test]
async fn test_list_filters_by_inclusive_date_range() {
    let app = test_app();
    let (id, _) = signup(&app, "ada@example.com").await;
    let at = |raw: &str| raw.parse::<DateTime<Utc>>().unwrap();
    app.posts.seed(seeded_post(id, "Before", &[], at("2023-12-31T23:59:59Z")));
    app.posts.seed(seeded_post(id, "Start", &[], at("2024-01-01T00:00:00Z")));
    app.posts.seed(seeded_post(id, "Middle", &[], at("2024-01-15T12:00:00Z")));
    app.posts.seed(seeded_post(id, "End", &[], at("2024-01-31T00:00:00Z")));
    app.posts.seed(seeded_post(id, "After", &[], at("2024-01-31T00:00:01Z")));

    let response = app
        .server
        .get("/api/posts")
        .add_query_param("startDate", "2024-01-01")
        .add_query_param("endDate", "2024-01-31T00:00:00Z")
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(titles(&body), vec!["End", "Middle", "Start"]);
}

#[tokio::test]
async fn test_list_search_text_matches_any_term() {
    let app = test_app();
    let (id, _) = signup(&app, "ada@example.com").await;
    let now = Utc::now();
    app.posts.seed(seeded_post(id, "Mountain sunrise", &[], now));
    app.posts.seed(seeded_post(id, "City lights", &["lake"], now - Duration::minutes(1)));
    app.posts.seed(seeded_post(id, "Kitchen notes", &[], now - Duration::minutes(2)));

    let response = app
        .server
        .get("/api/posts")
        .add_query_param("searchText", "LAKE mountain")
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(titles(&body), vec!["Mountain sunrise", "City lights"]);
}

#[tokio::test]
async fn test_list_rejects_bad_pagination() {
    let app = test_app();

    for (key, value, field) in [
        ("limit", "0", "limit"),
        ("limit", "101", "limit"),
        ("page", "0", "page"),
        ("page", "abc", "page"),
        ("startDate", "not-a-date", "startDate"),
    ] {
        let response = app.server.get("/api/posts").add_query_param(key, value).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["message"], "Validation failed");
        assert_eq!(error_fields(&body), vec![field], "{}={}", key, value);
    }
}

#[tokio::test]
async fn test_created_posts_are_listed_with_owner() {
    let app = test_app();
    let (id, token) = signup(&app, "ada@example.com").await;

    for name in ["First", "Second"] {
        app.server
            .post("/api/posts")
            .add_header(header::AUTHORIZATION, bearer(&token))
            .json(&post_payload(name))
            .await
            .assert_status(StatusCode::CREATED);
    }

    let body: Value = app.server.get("/api/posts").await.json();
    let posts = body["data"]["posts"].as_array().unwrap();
    assert_eq!(posts.len(), 2);
    for post in posts {
        assert_eq!(post["userId"], id.to_string());
        assert_eq!(post["owner"]["name"], "Ada Lovelace");
        assert_eq!(post["tags"], json!(["a", "b"]));
    }
}

// ============================================================================
// Surface: fallback, health, headers, error detail
// ============================================================================

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = test_app();

    let response = app.server.get("/api/unknown").await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body, json!({"success": false, "message": "Route not found"}));
}

#[tokio::test]
async fn test_unsupported_method_is_not_found() {
    let app = test_app();

    for response in [
        app.server.delete("/api/posts").await,
        app.server.get("/api/signup").await,
        app.server.put("/api/login").await,
        app.server.post("/health").await,
    ] {
        response.assert_status(StatusCode::NOT_FOUND);
        let body: Value = response.json();
        assert_eq!(body, json!({"success": false, "message": "Route not found"}));
    }
}

#[tokio::test]
async fn test_unsupported_method_skips_auth_gate() {
    let app = create_router(AppState::in_memory(AppConfig::for_tests()));

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::PATCH)
                .uri("/api/posts")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["message"], "Route not found");
}

#[tokio::test]
async fn test_health_and_security_headers() {
    let app = test_app();

    let response = app.server.get("/health").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body, json!({"success": true, "message": "OK"}));

    let headers = response.headers();
    assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
    assert_eq!(headers[header::X_FRAME_OPTIONS], "DENY");
    assert_eq!(headers[HeaderName::from_static("referrer-policy")], "no-referrer");
}

#[tokio::test]
async fn test_openapi_document_lists_endpoints() {
    let app = test_app();

    let response = app.server.get("/api-docs/openapi.json").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert!(body["paths"].get("/api/signup").is_some());
    assert!(body["paths"].get("/api/login").is_some());
    assert!(body["paths"]["/api/posts"].get("get").is_some());
    assert!(body["paths"]["/api/posts"].get("post").is_some());
}

/// Post store that always fails
struct UnavailablePosts;

#[async_trait]
impl PostRepository for UnavailablePosts {
    async fn insert(&self, _post: NewPost) -> Result<Post, ApiError> {
        Err(ApiError::Internal("post store unavailable".to_string()))
    }

    async fn find_page(&self, _filter: &PostFilter, _window: PageWindow) -> Result<Vec<PostWithOwner>, ApiError> {
        Err(ApiError::Internal("post store unavailable".to_string()))
    }

    async fn count(&self, _filter: &PostFilter) -> Result<u64, ApiError> {
        Err(ApiError::Internal("post store unavailable".to_string()))
    }
}

fn failing_server(environment: Environment) -> TestServer {
    let config = AppConfig {
        environment,
        ..AppConfig::for_tests()
    };
    let state = AppState::new(
        config,
        Arc::new(InMemoryAccountRepository::new()),
        Arc::new(UnavailablePosts),
    );
    TestServer::new(create_router(state)).unwrap()
}

#[tokio::test]
async fn test_internal_error_detail_only_in_development() {
    let response = failing_server(Environment::Development).get("/api/posts").await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "An internal server error occurred");
    assert_eq!(body["stack"], "post store unavailable");

    let response = failing_server(Environment::Production).get("/api/posts").await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert!(body.get("stack").is_none());
    assert!(!response.text().contains("unavailable"));
}
