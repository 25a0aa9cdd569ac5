//! Encrypted key/value secrets.
//!
//! Values are sealed with ChaCha20-Poly1305 under `SECRETS_KEY`, each with a
//! fresh random 96-bit nonce. The key name is bound as associated data so a
//! ciphertext cannot be moved to another key. During rotation values sealed
//! under `SECRETS_PREVIOUS_KEY` still open and are re-sealed under the
//! current key.

use std::collections::BTreeMap;
use std::sync::Arc;

use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::RngCore;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use thiserror::Error;

use crate::config::{SecretsConfig, SecretsKey};
use crate::db::secrets::{EncryptedSecret, SecretMeta};
use crate::db::{RepositoryError, SecretRepository};

/// ChaCha20-Poly1305 nonce length in bytes.
pub const NONCE_LENGTH: usize = 12;

/// Longest accepted key name.
pub const MAX_KEY_LENGTH: usize = 64;

#[derive(Debug, Error)]
pub enum SecretsError {
    #[error("Invalid key name: {0}")]
    InvalidKey(String),

    #[error("No secrets provided")]
    EmptyPayload,

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("encryption failed")]
    Encryption,

    /// Neither the current nor the previous key opens the value.
    #[error("cannot decrypt secret {0}")]
    Decryption(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl SecretsError {
    /// Whether the caller sent bad input.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidKey(_) | Self::EmptyPayload | Self::InvalidPayload(_)
        )
    }
}

/// Whether `key` is 1-64 characters of `A-Z a-z 0-9 _ . -`.
#[must_use]
pub fn is_valid_key(key: &str) -> bool {
    (1..=MAX_KEY_LENGTH).contains(&key.len())
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}

/// Parse a bulk payload: either a JSON object or `key=value` lines.
///
/// Blank lines and lines starting with `#` are skipped. Non-string JSON values
/// are stored as their JSON text.
///
/// # Errors
///
/// Returns `SecretsError::InvalidPayload` for malformed input,
/// `SecretsError::InvalidKey` for a bad key name and
/// `SecretsError::EmptyPayload` if nothing remains.
pub fn parse_payload(payload: &str) -> Result<Vec<(String, String)>, SecretsError> {
    let trimmed = payload.trim();
    let pairs: Vec<(String, String)> = if trimmed.starts_with('{') {
        let object: serde_json::Map<String, serde_json::Value> = serde_json::from_str(trimmed)
            .map_err(|e| SecretsError::InvalidPayload(e.to_string()))?;
        object
            .into_iter()
            .map(|(key, value)| {
                let value = match value {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                (key.trim().to_owned(), value)
            })
            .collect()
    } else {
        trimmed
            .lines()
            .enumerate()
            .map(|(i, line)| (i + 1, line.trim()))
            .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
            .map(|(number, line)| {
                line.split_once('=')
                    .map(|(k, v)| (k.trim().to_owned(), v.trim().to_owned()))
                    .ok_or_else(|| {
                        SecretsError::InvalidPayload(format!("line {number}: expected key=value"))
                    })
            })
            .collect::<Result<_, _>>()?
    };

    if let Some((key, _)) = pairs.iter().find(|(key, _)| !is_valid_key(key)) {
        return Err(SecretsError::InvalidKey(key.clone()));
    }
    if pairs.is_empty() {
        return Err(SecretsError::EmptyPayload);
    }
    Ok(pairs)
}

/// Seals and opens secret values.
#[derive(Clone)]
pub struct SecretCipher {
    current: Arc<SecretsKey>,
    previous: Option<Arc<SecretsKey>>,
}

impl std::fmt::Debug for SecretCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretCipher")
            .field("current", &"[REDACTED]")
            .field("previous", &self.previous.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

fn aead(key: &SecretsKey) -> ChaCha20Poly1305 {
    ChaCha20Poly1305::new(Key::from_slice(key.expose_secret()))
}

impl SecretCipher {
    #[must_use]
    pub fn new(config: &SecretsConfig) -> Self {
        Self {
            current: Arc::clone(&config.current),
            previous: config.previous.clone(),
        }
    }

    /// Seal `plaintext` for `key` under the current key.
    ///
    /// # Errors
    ///
    /// Returns `SecretsError::Encryption` if sealing fails.
    pub fn encrypt(&self, key: &str, plaintext: &str) -> Result<EncryptedSecret, SecretsError> {
        let mut nonce = [0u8; NONCE_LENGTH];
        rand::rng().fill_bytes(&mut nonce);
        let ciphertext = aead(&self.current)
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: plaintext.as_bytes(),
                    aad: key.as_bytes(),
                },
            )
            .map_err(|_| SecretsError::Encryption)?;
        Ok(EncryptedSecret {
            key: key.to_owned(),
            nonce: nonce.to_vec(),
            ciphertext,
        })
    }

    /// Open a stored value with the current key, then the previous one.
    /// The flag is `true` when only the previous key worked.
    ///
    /// # Errors
    ///
    /// Returns `SecretsError::Decryption` if no configured key opens it.
    pub fn decrypt(&self, secret: &EncryptedSecret) -> Result<(String, bool), SecretsError> {
        let failed = || SecretsError::Decryption(secret.key.clone());
        if secret.nonce.len() != NONCE_LENGTH {
            return Err(failed());
        }
        let open = |key: &SecretsKey| {
            aead(key)
                .decrypt(
                    Nonce::from_slice(&secret.nonce),
                    Payload {
                        msg: &secret.ciphertext,
                        aad: secret.key.as_bytes(),
                    },
                )
                .ok()
        };

        let (bytes, stale) = match open(&self.current) {
            Some(bytes) => (bytes, false),
            None => {
                let previous = self.previous.as_deref().ok_or_else(failed)?;
                (open(previous).ok_or_else(failed)?, true)
            }
        };
        String::from_utf8(bytes).map(|s| (s, stale)).map_err(|_| failed())
    }
}

/// Secrets store operations.
pub struct SecretsService<'a> {
    repo: SecretRepository<'a>,
    cipher: &'a SecretCipher,
}

impl<'a> SecretsService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, cipher: &'a SecretCipher) -> Self {
        Self {
            repo: SecretRepository::new(pool),
            cipher,
        }
    }

    /// Key names and timestamps.
    ///
    /// # Errors
    ///
    /// Returns `SecretsError::Repository` if the query fails.
    pub async fn list(&self) -> Result<Vec<SecretMeta>, SecretsError> {
        Ok(self.repo.list().await?)
    }

    /// Parse, encrypt and store a payload. Returns the keys written.
    ///
    /// # Errors
    ///
    /// Returns a client error for malformed payloads; nothing is stored then.
    pub async fn store(&self, payload: &str) -> Result<Vec<String>, SecretsError> {
        let sealed = parse_payload(payload)?
            .iter()
            .map(|(key, value)| self.cipher.encrypt(key, value))
            .collect::<Result<Vec<_>, _>>()?;
        self.repo.upsert_many(&sealed).await?;
        Ok(sealed.into_iter().map(|s| s.key).collect())
    }

    /// Decrypted value for `key`, if stored.
    ///
    /// # Errors
    ///
    /// Returns `SecretsError::Decryption` if the value cannot be opened.
    pub async fn get(&self, key: &str) -> Result<Option<String>, SecretsError> {
        match self.repo.get(key).await? {
            Some(secret) => self.cipher.decrypt(&secret).map(|(value, _)| Some(value)),
            None => Ok(None),
        }
    }

    /// # Errors
    ///
    /// Returns `SecretsError::Repository` wrapping `NotFound` for unknown keys.
    pub async fn delete(&self, key: &str) -> Result<(), SecretsError> {
        if !is_valid_key(key) {
            return Err(SecretsError::InvalidKey(key.to_owned()));
        }
        Ok(self.repo.delete(key).await?)
    }

    /// Re-encrypt every value under the current key. Returns how many values
    /// were rewritten.
    ///
    /// # Errors
    ///
    /// Fails without writing anything if any value cannot be opened.
    pub async fn rotate(&self) -> Result<usize, SecretsError> {
        let count = self
            .repo
            .reseal_all(|secret| {
                let (value, _) = self.cipher.decrypt(secret)?;
                self.cipher.encrypt(&secret.key, &value)
            })
            .await?;
        tracing::info!(count, "Secrets re-encrypted");
        Ok(count)
    }

    /// Every secret, decrypted.
    ///
    /// # Errors
    ///
    /// Returns `SecretsError::Decryption` if any value cannot be opened.
    pub async fn export(&self) -> Result<BTreeMap<String, String>, SecretsError> {
        self.repo
            .all()
            .await?
            .iter()
            .map(|secret| {
                self.cipher
                    .decrypt(secret)
                    .map(|(value, _)| (secret.key.clone(), value))
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use secrecy::SecretBox;

    fn key(byte: u8) -> Arc<SecretsKey> {
        Arc::new(SecretBox::new(Box::new([byte; 32])))
    }

    fn cipher(current: u8, previous: Option<u8>) -> SecretCipher {
        SecretCipher {
            current: key(current),
            previous: previous.map(key),
        }
    }

    #[test]
    fn test_is_valid_key() {
        assert!(is_valid_key("smtp_password"));
        assert!(is_valid_key("stripe.live-key"));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("has space"));
        assert!(!is_valid_key(&"k".repeat(65)));
    }

    #[test]
    fn test_parse_json_payload() {
        let pairs = parse_payload(r#"{"smtp_username": "frog", "port": 587}"#).unwrap();
        assert!(pairs.contains(&("smtp_username".to_owned(), "frog".to_owned())));
        assert!(pairs.contains(&("port".to_owned(), "587".to_owned())));
    }

    #[test]
    fn test_parse_line_payload() {
        let pairs = parse_payload("# comment\nsmtp_username = frog\n\nsmtp_password=a=b\n").unwrap();
        assert_eq!(
            pairs,
            vec![
                ("smtp_username".to_owned(), "frog".to_owned()),
                ("smtp_password".to_owned(), "a=b".to_owned()),
            ]
        );
    }

    #[test]
    fn test_parse_rejects_bad_payloads() {
        assert!(matches!(parse_payload("  "), Err(SecretsError::EmptyPayload)));
        assert!(matches!(
            parse_payload("no equals sign"),
            Err(SecretsError::InvalidPayload(_))
        ));
        assert!(matches!(
            parse_payload("bad key=1"),
            Err(SecretsError::InvalidKey(_))
        ));
        assert!(matches!(
            parse_payload("{not json"),
            Err(SecretsError::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_encrypt_decrypt() {
        let cipher = cipher(1, None);
        let sealed = cipher.encrypt("smtp_password", "hunter2").unwrap();
        assert_eq!(sealed.nonce.len(), NONCE_LENGTH);
        assert_ne!(sealed.ciphertext, b"hunter2");
        assert_eq!(cipher.decrypt(&sealed).unwrap(), ("hunter2".to_owned(), false));
    }

    #[test]
    fn test_nonces_are_unique() {
        let cipher = cipher(1, None);
        let a = cipher.encrypt("k", "same").unwrap();
        let b = cipher.encrypt("k", "same").unwrap();
        assert_ne!(a.nonce, b.nonce);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn test_ciphertext_bound_to_key_name() {
        let cipher = cipher(1, None);
        let mut sealed = cipher.encrypt("smtp_password", "hunter2").unwrap();
        sealed.key = "other".to_owned();
        assert!(matches!(
            cipher.decrypt(&sealed),
            Err(SecretsError::Decryption(_))
        ));
    }

    #[test]
    fn test_previous_key_fallback() {
        let old = cipher(1, None);
        let sealed = old.encrypt("k", "v").unwrap();

        let rotated = cipher(2, Some(1));
        assert_eq!(rotated.decrypt(&sealed).unwrap(), ("v".to_owned(), true));

        let resealed = rotated.encrypt("k", "v").unwrap();
        assert_eq!(rotated.decrypt(&resealed).unwrap(), ("v".to_owned(), false));

        let without_previous = cipher(2, None);
        assert!(without_previous.decrypt(&sealed).is_err());
    }
}
