//! Symmetric encryption of the upstream access token at rest.

use super::TokenError;
use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::Rng;
use sha2::{Digest, Sha256};

const NONCE_LEN: usize = 12;

/// AES-256-GCM keyed by the SHA-256 of a configured secret.
///
/// Ciphertexts are `base64(nonce || sealed)`, with a fresh random nonce per call.
#[derive(Clone)]
pub struct TokenCipher {
    cipher: Aes256Gcm,
}

impl TokenCipher {
    pub fn new(secret: &str) -> Result<Self, TokenError> {
        let key = Sha256::digest(secret.as_bytes());
        let cipher = Aes256Gcm::new_from_slice(&key)
            .map_err(|e| TokenError::Cipher(format!("invalid key: {}", e)))?;
        Ok(Self { cipher })
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String, TokenError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::rng().fill(&mut nonce_bytes);

        let sealed = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_bytes())
            .map_err(|_| TokenError::Cipher("encryption failed".to_string()))?;

        let mut out = Vec::with_capacity(NONCE_LEN + sealed.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&sealed);
        Ok(BASE64.encode(out))
    }

    pub fn decrypt(&self, encoded: &str) -> Result<String, TokenError> {
        let raw = BASE64
            .decode(encoded)
            .map_err(|e| TokenError::MalformedRecord(format!("token is not base64: {}", e)))?;
        if raw.len() <= NONCE_LEN {
            return Err(TokenError::MalformedRecord(
                "token ciphertext too short".to_string(),
            ));
        }

        let (nonce, sealed) = raw.split_at(NONCE_LEN);
        let plain = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| TokenError::Cipher("decryption failed, wrong key?".to_string()))?;

        String::from_utf8(plain)
            .map_err(|_| TokenError::MalformedRecord("token is not UTF-8".to_string()))
    }
}
