//! Salted password hashing for the credential store.
//!
//! Credentials are stored as a single string so `users.json` stays a flat
//! `username -> string` object:
//!
//! ```text
//! pbkdf2-sha256$<iterations>$<salt base64>$<hash base64>
//! ```
//!
//! Anything without that prefix is a legacy plaintext password.

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;

pub const SCHEME: &str = "pbkdf2-sha256";
pub const DEFAULT_PBKDF2_ITERATIONS: u32 = 200_000;
const SALT_LEN: usize = 16;
const KEY_LEN: usize = 32;

/// Hashes and verifies passwords.
pub trait PasswordHasher {
    /// Encode `password` for storage.
    fn hash(&self, password: &str) -> String;

    /// Check `password` against a stored credential.
    fn verify(&self, password: &str, stored: &str) -> bool;
}

/// Returns true if the stored credential predates hashing.
pub fn is_legacy_plaintext(stored: &str) -> bool {
    !stored.starts_with(&format!("{}$", SCHEME))
}

/// PBKDF2-HMAC-SHA256 with a random per-user salt.
#[derive(Debug, Clone, Copy)]
pub struct Pbkdf2Hasher {
    iterations: u32,
}

impl Pbkdf2Hasher {
    pub fn new() -> Self {
        Self::with_iterations(DEFAULT_PBKDF2_ITERATIONS)
    }

    pub fn with_iterations(iterations: u32) -> Self {
        Self {
            iterations: iterations.max(1),
        }
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }
}

impl Default for Pbkdf2Hasher {
    fn default() -> Self {
        Self::new()
    }
}

fn derive_key(password: &str, salt: &[u8], iterations: u32) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut key);
    key
}

/// Compare without short-circuiting on the first differing byte.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

struct Encoded {
    iterations: u32,
    salt: Vec<u8>,
    hash: Vec<u8>,
}

fn parse(stored: &str) -> Option<Encoded> {
    let mut parts = stored.split('$');
    if parts.next()? != SCHEME {
        return None;
    }
    let iterations: u32 = parts.next()?.parse().ok()?;
    let salt = B64.decode(parts.next()?).ok()?;
    let hash = B64.decode(parts.next()?).ok()?;
    if parts.next().is_some() || iterations == 0 || salt.is_empty() || hash.is_empty() {
        return None;
    }
    Some(Encoded {
        iterations,
        salt,
        hash,
    })
}

impl PasswordHasher for Pbkdf2Hasher {
    fn hash(&self, password: &str) -> String {
        let salt: [u8; SALT_LEN] = rand::random();
        let key = derive_key(password, &salt, self.iterations);
        format!(
            "{}${}${}${}",
            SCHEME,
            self.iterations,
            B64.encode(salt),
            B64.encode(key)
        )
    }

    fn verify(&self, password: &str, stored: &str) -> bool {
        if is_legacy_plaintext(stored) {
            return constant_time_eq(password.as_bytes(), stored.as_bytes());
        }
        let Some(record) = parse(stored) else {
            return false;
        };
        let key = derive_key(password, &record.salt, record.iterations);
        constant_time_eq(&key, &record.hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> Pbkdf2Hasher {
        Pbkdf2Hasher::with_iterations(10)
    }

    #[test]
    fn hash_does_not_contain_password() {
        let stored = hasher().hash("hunter2");
        assert!(stored.starts_with("pbkdf2-sha256$10$"));
        assert!(!stored.contains("hunter2"));
        assert!(!is_legacy_plaintext(&stored));
    }

    #[test]
    fn verify_accepts_only_the_right_password() {
        let h = hasher();
        let stored = h.hash("pw1");
        assert!(h.verify("pw1", &stored));
        assert!(!h.verify("pw2", &stored));
        assert!(!h.verify("", &stored));
    }

    #[test]
    fn salts_differ_between_hashes() {
        let h = hasher();
        assert_ne!(h.hash("same"), h.hash("same"));
    }

    #[test]
    fn verify_uses_stored_iteration_count() {
        let stored = Pbkdf2Hasher::with_iterations(3).hash("pw");
        assert!(Pbkdf2Hasher::with_iterations(50).verify("pw", &stored));
    }

    #[test]
    fn legacy_plaintext_is_exact_match() {
        let h = hasher();
        assert!(is_legacy_plaintext("pw1"));
        assert!(h.verify("pw1", "pw1"));
        assert!(!h.verify("PW1", "pw1"));
        assert!(!h.verify("pw1 ", "pw1"));
    }

    #[test]
    fn malformed_encoding_never_verifies() {
        let h = hasher();
        assert!(!h.verify("x", "pbkdf2-sha256$"));
        assert!(!h.verify("x", "pbkdf2-sha256$0$AAAA$AAAA"));
        assert!(!h.verify("x", "pbkdf2-sha256$10$!!$AAAA"));
        assert!(!h.verify("x", "pbkdf2-sha256$10$AAAA$AAAA$extra"));
    }

    #[test]
    fn zero_iterations_is_clamped() {
        assert_eq!(Pbkdf2Hasher::with_iterations(0).iterations(), 1);
    }
}
