// Account repositories: PostgreSQL and in-memory implementations

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::auth::{
    error::AuthError,
    models::{Account, AccountSummary, NewAccount},
};

/// Credential store operations
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Insert an account. A duplicate email fails with `EmailAlreadyExists`.
    async fn create(&self, account: NewAccount) -> Result<Account, AuthError>;

    /// Find an account (including its hash) by normalized email
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AuthError>;

    /// Find an account projection (no hash) by id
    async fn find_summary_by_id(&self, id: Uuid) -> Result<Option<AccountSummary>, AuthError>;
}

/// PostgreSQL-backed account repository
#[derive(Clone)]
pub struct PgAccountRepository {
    pool: PgPool,
}

impl PgAccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountRepository for PgAccountRepository {
    #[instrument(skip(self, account), fields(email = %account.email))]
    async fn create(&self, account: NewAccount) -> Result<Account, AuthError> {
        sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (name, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, name, email, password_hash, created_at, updated_at
            "#,
        )
        .bind(&account.name)
        .bind(&account.email)
        .bind(&account.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            // Concurrent signups race past the pre-check; the unique index decides
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    warn!("Unique violation on account insert");
                    return AuthError::EmailAlreadyExists;
                }
            }
            AuthError::from(e)
        })
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AuthError> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, name, email, password_hash, created_at, updated_at
            FROM accounts
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    async fn find_summary_by_id(&self, id: Uuid) -> Result<Option<AccountSummary>, AuthError> {
        let summary = sqlx::query_as::<_, AccountSummary>(
            "SELECT id, name, email FROM accounts WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(summary)
    }
}

/// In-memory account repository for development and testing.
/// Data is lost when the process exits.
#[derive(Default)]
pub struct InMemoryAccountRepository {
    accounts: Mutex<HashMap<Uuid, Account>>,
}

impl InMemoryAccountRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn account_count(&self) -> usize {
        self.lock().len()
    }

    /// Remove an account, leaving any tokens issued for it dangling
    pub fn remove(&self, id: Uuid) -> Option<Account> {
        self.lock().remove(&id)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, Account>> {
        // A poisoned map is still structurally valid
        self.accounts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl AccountRepository for InMemoryAccountRepository {
    async fn create(&self, account: NewAccount) -> Result<Account, AuthError> {
        let mut accounts = self.lock();
        if accounts.values().any(|a| a.email == account.email) {
            debug!(email = %account.email, "Duplicate email in memory store");
            return Err(AuthError::EmailAlreadyExists);
        }

        let now = Utc::now();
        let stored = Account {
            id: Uuid::new_v4(),
            name: account.name,
            email: account.email,
            password_hash: account.password_hash,
            created_at: now,
            updated_at: now,
        };
        accounts.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AuthError> {
        Ok(self.lock().values().find(|a| a.email == email).cloned())
    }

    async fn find_summary_by_id(&self, id: Uuid) -> Result<Option<AccountSummary>, AuthError> {
        Ok(self.lock().get(&id).cloned().map(AccountSummary::from))
    }
}
