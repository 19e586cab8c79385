/// Credential Storage
///
/// The login core reads and writes credential records only through the
/// `CredentialStore` trait. Postgres backs it in production; the in-memory
/// store serves tests and local runs.
///
/// Expected Postgres table:
///
/// ```sql
/// CREATE TABLE accounts (
///     id UUID PRIMARY KEY,
///     username TEXT NOT NULL UNIQUE,
///     password_hash TEXT NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL
/// );
/// ```

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

use crate::error::StoreError;

/// Stored login credential for one account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    pub account_id: Uuid,
    /// Unique login name
    pub identifier: String,
    /// bcrypt hash, salt and cost included
    pub password_hash: String,
}

impl CredentialRecord {
    pub fn new(identifier: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            account_id: Uuid::new_v4(),
            identifier: identifier.into(),
            password_hash: password_hash.into(),
        }
    }
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<CredentialRecord>, StoreError>;

    /// # Errors
    /// Returns `Duplicate` if the identifier is already taken
    async fn insert(&self, record: CredentialRecord) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    records: RwLock<HashMap<String, CredentialRecord>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<CredentialRecord>, StoreError> {
        let records = self
            .records
            .read()
            .map_err(|_| StoreError::Backend("credential map lock poisoned".to_string()))?;
        Ok(records.get(identifier).cloned())
    }

    async fn insert(&self, record: CredentialRecord) -> Result<(), StoreError> {
        let mut records = self
            .records
            .write()
            .map_err(|_| StoreError::Backend("credential map lock poisoned".to_string()))?;
        if records.contains_key(&record.identifier) {
            return Err(StoreError::Duplicate(record.identifier));
        }
        records.insert(record.identifier.clone(), record);
        Ok(())
    }
}

pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<CredentialRecord>, StoreError> {
        let row = sqlx::query_as::<_, (Uuid, String, String)>(
            "SELECT id, username, password_hash FROM accounts WHERE username = $1",
        )
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(account_id, identifier, password_hash)| CredentialRecord {
            account_id,
            identifier,
            password_hash,
        }))
    }

    async fn insert(&self, record: CredentialRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO accounts (id, username, password_hash, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(record.account_id)
        .bind(&record.identifier)
        .bind(&record.password_hash)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| match StoreError::from(e) {
            StoreError::Duplicate(_) => StoreError::Duplicate(record.identifier.clone()),
            other => other,
        })?;

        Ok(())
    }
}
