//! Password hashing utilities
//!
//! Local passwords are stored as the hex encoded 16 byte output of
//! PBKDF2 (4096 rounds) keyed with a per-user random salt.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::Sha256;
use std::fmt;
use subtle::ConstantTimeEq;

/// PBKDF2 iteration count
pub const PBKDF2_ROUNDS: u32 = 4096;

/// Derived key length in bytes
pub const HASH_LEN: usize = 16;

/// Salt length in bytes before hex encoding
pub const SALT_LEN: usize = 16;

/// PRF used by PBKDF2
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    Sha1,
    #[default]
    Sha256,
}

impl HashAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha1 => "sha1",
            HashAlgorithm::Sha256 => "sha256",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sha1" => Some(HashAlgorithm::Sha1),
            "sha256" => Some(HashAlgorithm::Sha256),
            _ => None,
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored password material
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordHash {
    pub hash: String,
    pub salt: String,
    pub algorithm: HashAlgorithm,
}

impl PasswordHash {
    /// Hash `secret` with a fresh random salt
    pub fn new(secret: &str, algorithm: HashAlgorithm) -> Self {
        let salt = generate_salt();
        let hash = hash_password(secret, &salt, algorithm);
        Self {
            hash,
            salt,
            algorithm,
        }
    }
}

impl fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordHash")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

/// Generate a hex encoded random salt
pub fn generate_salt() -> String {
    let mut salt = [0u8; SALT_LEN];
    rand::rng().fill_bytes(&mut salt);
    hex::encode(salt)
}

/// Derive the hex encoded password hash
pub fn hash_password(secret: &str, salt: &str, algorithm: HashAlgorithm) -> String {
    let mut out = [0u8; HASH_LEN];
    match algorithm {
        HashAlgorithm::Sha1 => {
            pbkdf2::pbkdf2_hmac::<Sha1>(secret.as_bytes(), salt.as_bytes(), PBKDF2_ROUNDS, &mut out)
        }
        HashAlgorithm::Sha256 => {
            pbkdf2::pbkdf2_hmac::<Sha256>(secret.as_bytes(), salt.as_bytes(), PBKDF2_ROUNDS, &mut out)
        }
    }
    hex::encode(out)
}

/// Check `secret` against stored material
pub fn verify_password(secret: &str, stored: &PasswordHash) -> bool {
    let candidate = hash_password(secret, &stored.salt, stored.algorithm);
    candidate.as_bytes().ct_eq(stored.hash.as_bytes()).into()
}

// ============================================================================
// Secret Verifier
// ============================================================================

/// Checks a plaintext secret against a stored hash
pub trait SecretVerifier: Send + Sync {
    fn verify(&self, secret: &str, stored: &PasswordHash) -> bool;
}

/// PBKDF2 verifier used for local accounts
#[derive(Debug, Clone, Copy, Default)]
pub struct Pbkdf2Verifier;

impl SecretVerifier for Pbkdf2Verifier {
    fn verify(&self, secret: &str, stored: &PasswordHash) -> bool {
        verify_password(secret, stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_deterministic_per_salt() {
        let a = hash_password("Passw0rd!", "salt", HashAlgorithm::Sha256);
        let b = hash_password("Passw0rd!", "salt", HashAlgorithm::Sha256);
        assert_eq!(a, b);
        assert_eq!(a.len(), HASH_LEN * 2);

        let c = hash_password("Passw0rd!", "other", HashAlgorithm::Sha256);
        assert_ne!(a, c);

        let d = hash_password("Passw0rd!", "salt", HashAlgorithm::Sha1);
        assert_ne!(a, d);
    }

    #[test]
    fn test_verify_password() {
        let stored = PasswordHash::new("s3cret", HashAlgorithm::Sha256);
        assert!(verify_password("s3cret", &stored));
        assert!(!verify_password("S3cret", &stored));
        assert!(!verify_password("", &stored));

        let verifier = Pbkdf2Verifier;
        assert!(verifier.verify("s3cret", &stored));
    }

    #[test]
    fn test_verify_rejects_truncated_or_empty_hash() {
        let mut stored = PasswordHash::new("s3cret", HashAlgorithm::Sha256);
        stored.hash.truncate(HASH_LEN);
        assert!(!verify_password("s3cret", &stored));

        stored.hash.clear();
        assert!(!verify_password("s3cret", &stored));
        assert!(!verify_password("", &stored));
    }

    #[test]
    fn test_salts_are_random() {
        let a = generate_salt();
        let b = generate_salt();
        assert_eq!(a.len(), SALT_LEN * 2);
        assert_ne!(a, b);
    }

    #[test]
    fn test_debug_hides_hash() {
        let stored = PasswordHash::new("s3cret", HashAlgorithm::Sha1);
        let printed = format!("{:?}", stored);
        assert!(!printed.contains(&stored.hash));
        assert!(!printed.contains(&stored.salt));
    }
}
