//! Secrets store key material.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand::RngCore;

use whimsical_frog_admin::config::SECRETS_KEY_LENGTH;

/// A fresh base64 key suitable for `SECRETS_KEY`.
#[must_use]
pub fn generate_key() -> String {
    let mut key = [0u8; SECRETS_KEY_LENGTH];
    rand::rng().fill_bytes(&mut key);
    STANDARD.encode(key)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_key_is_accepted_by_admin_config() {
        let key = generate_key();
        assert_eq!(STANDARD.decode(&key).unwrap().len(), SECRETS_KEY_LENGTH);
        assert!(whimsical_frog_admin::config::decode_key("SECRETS_KEY", &key).is_ok());
        assert_ne!(generate_key(), key);
    }
}
