//! Username/password registry persisted as `users.json`.

use crate::password::{is_legacy_plaintext, PasswordHasher};
use crate::storage::StorageBackend;
use crate::{Error, Result};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

pub const USERS_FILE: &str = "users.json";

/// Stored mapping of username to encoded credential.
pub type Users = BTreeMap<String, String>;

/// Reject usernames that cannot safely name a task file.
pub fn validate_username(username: &str) -> Result<()> {
    if username.is_empty() {
        return Err(Error::InvalidInput("username must not be empty".to_string()));
    }
    if username == "." || username.contains("..") {
        return Err(Error::InvalidInput(format!(
            "username '{}' must not contain '..'",
            username
        )));
    }
    if username.contains(['/', '\\']) || username.chars().any(char::is_control) {
        return Err(Error::InvalidInput(format!(
            "username '{}' must not contain path separators or control characters",
            username
        )));
    }
    Ok(())
}

pub struct CredentialStore<'a> {
    backend: &'a mut dyn StorageBackend,
    hasher: &'a dyn PasswordHasher,
}

impl<'a> CredentialStore<'a> {
    pub fn new(backend: &'a mut dyn StorageBackend, hasher: &'a dyn PasswordHasher) -> Self {
        Self { backend, hasher }
    }

    /// Load all users. A malformed file is treated as empty.
    pub fn load(&self) -> Result<Users> {
        let Some(raw) = self.backend.read(USERS_FILE)? else {
            return Ok(Users::new());
        };
        match serde_json::from_str(&raw) {
            Ok(users) => Ok(users),
            Err(e) => {
                warn!(error = %e, file = USERS_FILE, "ignoring malformed credential file");
                Ok(Users::new())
            }
        }
    }

    pub fn save(&mut self, users: &Users) -> Result<()> {
        let json = serde_json::to_string_pretty(users)?;
        self.backend.write(USERS_FILE, &json)
    }

    pub fn contains(&self, username: &str) -> Result<bool> {
        Ok(self.load()?.contains_key(username))
    }

    /// Register a new user. Returns `None` if the username is taken.
    pub fn register(&mut self, username: &str, password: &str) -> Result<Option<String>> {
        validate_username(username)?;
        let mut users = self.load()?;
        if users.contains_key(username) {
            debug!(username, "registration rejected: username taken");
            return Ok(None);
        }
        users.insert(username.to_string(), self.hasher.hash(password));
        self.save(&users)?;
        info!(username, "registered user");
        Ok(Some(username.to_string()))
    }

    /// Check credentials. Returns the username on success.
    ///
    /// Legacy plaintext entries are re-encoded with the hasher after a
    /// successful login.
    pub fn login(&mut self, username: &str, password: &str) -> Result<Option<String>> {
        if validate_username(username).is_err() {
            return Ok(None);
        }
        let mut users = self.load()?;
        let Some(stored) = users.get(username) else {
            debug!(username, "login rejected: unknown user");
            return Ok(None);
        };
        if !self.hasher.verify(password, stored) {
            debug!(username, "login rejected: wrong password");
            return Ok(None);
        }

        if is_legacy_plaintext(stored) {
            users.insert(username.to_string(), self.hasher.hash(password));
            match self.save(&users) {
                Ok(()) => info!(username, "upgraded plaintext credential"),
                Err(e) => warn!(username, error = %e, "could not upgrade plaintext credential"),
            }
        }
        info!(username, "logged in");
        Ok(Some(username.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::password::Pbkdf2Hasher;
    use crate::storage::MemoryBackend;

    fn hasher() -> Pbkdf2Hasher {
        Pbkdf2Hasher::with_iterations(10)
    }

    #[test]
    fn load_is_empty_when_file_absent() {
        let mut backend = MemoryBackend::new();
        let h = hasher();
        let store = CredentialStore::new(&mut backend, &h);
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn load_is_empty_when_file_malformed() {
        let mut backend = MemoryBackend::new();
        backend.write(USERS_FILE, "{not json").unwrap();
        let h = hasher();
        let store = CredentialStore::new(&mut backend, &h);
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn register_then_login() {
        let mut backend = MemoryBackend::new();
        let h = hasher();
        let mut store = CredentialStore::new(&mut backend, &h);

        assert_eq!(
            store.register("alice", "pw1").unwrap().as_deref(),
            Some("alice")
        );
        assert_eq!(store.login("alice", "pw1").unwrap().as_deref(), Some("alice"));
        assert!(store.login("alice", "pw2").unwrap().is_none());
        assert!(store.login("bob", "pw1").unwrap().is_none());
    }

    #[test]
    fn duplicate_registration_leaves_store_unchanged() {
        let mut backend = MemoryBackend::new();
        let h = hasher();
        let mut store = CredentialStore::new(&mut backend, &h);
        store.register("alice", "pw1").unwrap();
        let before = store.load().unwrap();

        assert!(store.register("alice", "other").unwrap().is_none());
        assert_eq!(store.load().unwrap(), before);
        assert!(store.login("alice", "pw1").unwrap().is_some());
        assert!(store.login("alice", "other").unwrap().is_none());
    }

    #[test]
    fn stored_credential_is_hashed() {
        let mut backend = MemoryBackend::new();
        let h = hasher();
        {
            let mut store = CredentialStore::new(&mut backend, &h);
            store.register("alice", "pw1").unwrap();
        }
        let raw = backend.read(USERS_FILE).unwrap().unwrap();
        assert!(raw.contains("alice"));
        assert!(raw.contains("pbkdf2-sha256$"));
        assert!(!raw.contains("\"pw1\""));
    }

    #[test]
    fn legacy_plaintext_login_upgrades_entry() {
        let mut backend = MemoryBackend::new();
        backend.write(USERS_FILE, r#"{"carol":"secret"}"#).unwrap();
        let h = hasher();
        let mut store = CredentialStore::new(&mut backend, &h);

        assert!(store.login("carol", "Secret").unwrap().is_none());
        assert_eq!(store.load().unwrap()["carol"], "secret");

        assert!(store.login("carol", "secret").unwrap().is_some());
        let upgraded = store.load().unwrap()["carol"].clone();
        assert!(!is_legacy_plaintext(&upgraded));
        assert!(store.login("carol", "secret").unwrap().is_some());
    }

    #[test]
    fn invalid_usernames_are_rejected() {
        for name in ["", "..", "../evil", "a/b", "a\\b", "tab\there"] {
            assert!(validate_username(name).is_err(), "{:?} should be invalid", name);
        }
        for name in ["alice", "bob.smith", "user_1", "Zoë"] {
            assert!(validate_username(name).is_ok(), "{:?} should be valid", name);
        }
    }

    #[test]
    fn register_rejects_invalid_username() {
        let mut backend = MemoryBackend::new();
        let h = hasher();
        let mut store = CredentialStore::new(&mut backend, &h);
        assert!(matches!(
            store.register("../x", "pw"),
            Err(Error::InvalidInput(_))
        ));
        assert!(store.load().unwrap().is_empty());
    }
}
