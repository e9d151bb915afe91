//! Symmetric content keys for the in-memory decryption network
//!
//! A real threshold network never exposes a whole key to anyone. The
//! in-memory stand-in keeps one [`Secret`] per ciphertext handle and only
//! uses it after the access gate grants a request.
//!
//! Ciphertext layout: `nonce (12) || ChaCha20-Poly1305(plaintext) || tag (16)`.
//! The BLAKE3 hash of the plaintext is bound in as associated data, so a
//! ciphertext only opens against the `data_hash` it was published with.

use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of ChaCha20-Poly1305 nonce in bytes
pub const NONCE_SIZE: usize = 12;
/// Size of ChaCha20-Poly1305 key in bytes (256 bits)
pub const SECRET_SIZE: usize = 32;
/// Size of BLAKE3 hash in bytes (256 bits)
pub const BLAKE3_HASH_SIZE: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("ciphertext too short: {0} bytes")]
    Truncated(usize),
    #[error("authentication failed")]
    Authentication,
    #[error("plaintext does not match the published data hash")]
    DataHashMismatch,
    #[error("randomness unavailable: {0}")]
    Rng(String),
}

/// A 256-bit key used to encrypt exactly one piece of content
#[derive(Clone, PartialEq, Zeroize, ZeroizeOnDrop)]
pub struct Secret([u8; SECRET_SIZE]);

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

impl From<[u8; SECRET_SIZE]> for Secret {
    fn from(bytes: [u8; SECRET_SIZE]) -> Self {
        Secret(bytes)
    }
}

/// BLAKE3 hash of a plaintext, the `data_hash` of a ciphertext handle
pub fn data_hash(plaintext: &[u8]) -> [u8; BLAKE3_HASH_SIZE] {
    *blake3::hash(plaintext).as_bytes()
}

impl Secret {
    pub fn generate() -> Result<Self, SecretError> {
        let mut buff = [0; SECRET_SIZE];
        getrandom::getrandom(&mut buff).map_err(|e| SecretError::Rng(e.to_string()))?;
        Ok(Self(buff))
    }

    fn cipher(&self) -> ChaCha20Poly1305 {
        ChaCha20Poly1305::new(Key::from_slice(&self.0))
    }

    /// Encrypt `plaintext`, returning the ciphertext and the plaintext's hash
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<(Vec<u8>, [u8; BLAKE3_HASH_SIZE]), SecretError> {
        let hash = data_hash(plaintext);

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        getrandom::getrandom(&mut nonce_bytes).map_err(|e| SecretError::Rng(e.to_string()))?;
        let nonce = Nonce::from_slice(&nonce_bytes);

        let sealed = self
            .cipher()
            .encrypt(
                nonce,
                Payload {
                    msg: plaintext,
                    aad: &hash,
                },
            )
            .map_err(|_| SecretError::Authentication)?;

        let mut out = Vec::with_capacity(NONCE_SIZE + sealed.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&sealed);
        Ok((out, hash))
    }

    /// Decrypt a ciphertext produced by [`Secret::encrypt`]
    ///
    /// Fails if the ciphertext was tampered with or was published under a
    ///  different `data_hash`.
    pub fn decrypt(
        &self,
        ciphertext: &[u8],
        expected_hash: &[u8; BLAKE3_HASH_SIZE],
    ) -> Result<Vec<u8>, SecretError> {
        if ciphertext.len() < NONCE_SIZE {
            return Err(SecretError::Truncated(ciphertext.len()));
        }
        let (nonce, sealed) = ciphertext.split_at(NONCE_SIZE);
        let plaintext = self
            .cipher()
            .decrypt(
                Nonce::from_slice(nonce),
                Payload {
                    msg: sealed,
                    aad: expected_hash,
                },
            )
            .map_err(|_| SecretError::Authentication)?;

        if &data_hash(&plaintext) != expected_hash {
            return Err(SecretError::DataHashMismatch);
        }
        Ok(plaintext)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_secret_encrypt_decrypt() {
        let secret = Secret::generate().unwrap();
        let data = b"This is my secret message";

        let (ciphertext, hash) = secret.encrypt(data).unwrap();
        let plaintext = secret.decrypt(&ciphertext, &hash).unwrap();

        assert_eq!(plaintext, data.to_vec());
        assert_eq!(hash, *blake3::hash(data).as_bytes());
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let secret = Secret::generate().unwrap();
        let (mut ciphertext, hash) = secret.encrypt(b"integrity check").unwrap();
        ciphertext[NONCE_SIZE + 3] ^= 0xff;
        assert!(matches!(
            secret.decrypt(&ciphertext, &hash),
            Err(SecretError::Authentication)
        ));
    }

    #[test]
    fn test_wrong_data_hash_fails() {
        let secret = Secret::generate().unwrap();
        let (ciphertext, _) = secret.encrypt(b"bound to its hash").unwrap();
        let other = data_hash(b"something else");
        assert!(secret.decrypt(&ciphertext, &other).is_err());
    }

    #[test]
    fn test_empty_plaintext() {
        let secret = Secret::generate().unwrap();
        let (ciphertext, hash) = secret.encrypt(b"").unwrap();
        assert_eq!(secret.decrypt(&ciphertext, &hash).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_truncated_ciphertext() {
        let secret = Secret::generate().unwrap();
        assert!(matches!(
            secret.decrypt(&[0u8; 4], &[0u8; 32]),
            Err(SecretError::Truncated(4))
        ));
    }
}
