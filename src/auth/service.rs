// Authentication service - business logic layer

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::auth::{
    error::AuthError,
    models::{AccountSummary, AuthData, LoginRequest, NewAccount, SignupRequest},
    password::PasswordService,
    repository::AccountRepository,
    token::TokenService,
};

/// Authentication service coordinating signup, login and token checks
#[derive(Clone)]
pub struct AuthService {
    accounts: Arc<dyn AccountRepository>,
    tokens: TokenService,
}

impl AuthService {
    pub fn new(accounts: Arc<dyn AccountRepository>, tokens: TokenService) -> Self {
        Self { accounts, tokens }
    }

    /// Register a new account
    ///
    /// 1. Rejects an email that is already registered
    /// 2. Hashes the password
    /// 3. Persists the account (the store's unique index settles races)
    /// 4. Issues a token
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn signup(&self, request: SignupRequest) -> Result<AuthData, AuthError> {
        info!("Signup attempt");

        if self.accounts.find_by_email(&request.email).await?.is_some() {
            warn!("Signup failed: Email already exists");
            return Err(AuthError::EmailAlreadyExists);
        }

        let password_hash = PasswordService::hash_password_blocking(request.password).await?;

        let account = self
            .accounts
            .create(NewAccount {
                name: request.name,
                email: request.email,
                password_hash,
            })
            .await?;

        let token = self.tokens.issue(account.id)?;

        info!(account_id = %account.id, "User registered successfully");
        Ok(AuthData {
            user: AccountSummary::from(account),
            token,
        })
    }

    /// Log in with email and password.
    /// Unknown email and wrong password fail identically.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn login(&self, request: LoginRequest) -> Result<AuthData, AuthError> {
        info!("Login attempt");

        let Some(account) = self.accounts.find_by_email(&request.email).await? else {
            warn!("Login failed: Invalid credentials");
            return Err(AuthError::InvalidCredentials);
        };

        let matches = PasswordService::verify_password_blocking(
            request.password,
            account.password_hash.clone(),
        )
        .await?;
        if !matches {
            warn!("Login failed: Invalid credentials");
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.tokens.issue(account.id)?;

        info!(account_id = %account.id, "User logged in successfully");
        Ok(AuthData {
            user: AccountSummary::from(account),
            token,
        })
    }

    /// Resolve a bearer token to the account it was issued for
    pub async fn authenticate(&self, token: &str) -> Result<AccountSummary, AuthError> {
        let account_id = self.tokens.verify(token)?;

        self.accounts
            .find_summary_by_id(account_id)
            .await?
            .ok_or_else(|| {
                warn!(%account_id, "Authentication failed: User not found for token");
                AuthError::UserNotFound
            })
    }
}
