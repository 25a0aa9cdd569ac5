//! Encrypted secret storage. Encryption happens in
//! [`crate::services::secrets`]; this module only moves bytes.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

use super::RepositoryError;

/// Listing entry. Values are never loaded for listings.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SecretMeta {
    pub key: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One stored ciphertext.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EncryptedSecret {
    pub key: String,
    pub nonce: Vec<u8>,
    pub ciphertext: Vec<u8>,
}

pub struct SecretRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SecretRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<SecretMeta>, RepositoryError> {
        Ok(
            sqlx::query_as("SELECT key, created_at, updated_at FROM admin.secrets ORDER BY key")
                .fetch_all(self.pool)
                .await?,
        )
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, key: &str) -> Result<Option<EncryptedSecret>, RepositoryError> {
        Ok(
            sqlx::query_as("SELECT key, nonce, ciphertext FROM admin.secrets WHERE key = $1")
                .bind(key)
                .fetch_optional(self.pool)
                .await?,
        )
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn all(&self) -> Result<Vec<EncryptedSecret>, RepositoryError> {
        Ok(
            sqlx::query_as("SELECT key, nonce, ciphertext FROM admin.secrets ORDER BY key")
                .fetch_all(self.pool)
                .await?,
        )
    }

    /// Insert or replace several values atomically.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any write fails; nothing is
    /// stored in that case.
    pub async fn upsert_many(&self, secrets: &[EncryptedSecret]) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        for secret in secrets {
            sqlx::query(
                r"
                INSERT INTO admin.secrets (key, nonce, ciphertext)
                VALUES ($1, $2, $3)
                ON CONFLICT (key) DO UPDATE SET
                    nonce = EXCLUDED.nonce,
                    ciphertext = EXCLUDED.ciphertext,
                    updated_at = now()
                ",
            )
            .bind(&secret.key)
            .bind(&secret.nonce)
            .bind(&secret.ciphertext)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Rewrite every stored value with `reseal` under row locks.
    ///
    /// Rows are read `FOR UPDATE` in the same transaction as the writes, so a
    /// concurrent store or delete waits for the rotation instead of being
    /// overwritten or undone. Returns the number of rows rewritten.
    ///
    /// # Errors
    ///
    /// Returns the first error from `reseal` or the database; nothing is
    /// written in that case.
    pub async fn reseal_all<F, E>(&self, reseal: F) -> Result<usize, E>
    where
        F: Fn(&EncryptedSecret) -> Result<EncryptedSecret, E>,
        E: From<RepositoryError>,
    {
        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;
        let locked: Vec<EncryptedSecret> = sqlx::query_as(
            "SELECT key, nonce, ciphertext FROM admin.secrets ORDER BY key FOR UPDATE",
        )
        .fetch_all(&mut *tx)
        .await
        .map_err(RepositoryError::from)?;

        for secret in &locked {
            let sealed = reseal(secret)?;
            sqlx::query(
                "UPDATE admin.secrets SET nonce = $2, ciphertext = $3, updated_at = now() WHERE key = $1",
            )
            .bind(&sealed.key)
            .bind(&sealed.nonce)
            .bind(&sealed.ciphertext)
            .execute(&mut *tx)
            .await
            .map_err(RepositoryError::from)?;
        }

        tx.commit().await.map_err(RepositoryError::from)?;
        Ok(locked.len())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the key does not exist.
    pub async fn delete(&self, key: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM admin.secrets WHERE key = $1")
            .bind(key)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
