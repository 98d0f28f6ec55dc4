// Authentication module
// JWT bearer-token authentication with signup, login and a request gate

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod password;
pub mod repository;
pub mod service;
pub mod token;

// Re-export commonly used types
pub use error::AuthError;
pub use handlers::{login_handler, signup_handler};
pub use middleware::require_auth;
pub use models::{AccountSummary, AuthData, CurrentAccount, LoginRequest, SignupRequest};
pub use repository::{AccountRepository, InMemoryAccountRepository, PgAccountRepository};
pub use service::AuthService;
pub use token::TokenService;
