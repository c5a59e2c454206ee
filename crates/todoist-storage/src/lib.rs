//! Keychain storage for the Todoist API token.
//!
//! The token is the one secret the server needs. It can come from the
//! command line or the environment; when neither is set the OS credential
//! manager is consulted:
//!
//! - **macOS**: Keychain Services
//! - **Windows**: Credential Manager
//! - **Linux**: Secret Service (GNOME Keyring / KWallet)
//!
//! # Example
//!
//! ```ignore
//! use todoist_storage::{KeychainStore, CredentialStore, TOKEN_KEY};
//!
//! let store = KeychainStore::new();
//! store.store(TOKEN_KEY, "0123abcd")?;
//! assert_eq!(store.get(TOKEN_KEY)?, Some("0123abcd".to_string()));
//! store.delete(TOKEN_KEY)?;
//! ```

use std::collections::HashMap;
use std::sync::RwLock;

use keyring::Entry;
use todoist_core::{Error, Result};
use tracing::{debug, warn};

/// Service name used in OS keychain.
const SERVICE_NAME: &str = "todoist-mcp";

/// Key under which the API token is stored.
pub const TOKEN_KEY: &str = "todoist/token";

/// Credential storage backend.
#[cfg_attr(test, mockall::automock)]
pub trait CredentialStore: Send + Sync {
    /// Store a credential, replacing any previous value.
    fn store(&self, key: &str, value: &str) -> Result<()>;

    /// Returns `Ok(None)` if the credential doesn't exist.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Returns `Ok(())` even if the credential didn't exist.
    fn delete(&self, key: &str) -> Result<()>;

    fn exists(&self, key: &str) -> bool {
        matches!(self.get(key), Ok(Some(_)))
    }
}

// =============================================================================
// KeychainStore
// =============================================================================

/// Credential store backed by the OS keychain.
#[derive(Debug)]
pub struct KeychainStore {
    service_name: String,
}

impl KeychainStore {
    pub fn new() -> Self {
        Self::with_service_name(SERVICE_NAME)
    }

    /// Use a custom service name, e.g. to keep test entries apart.
    pub fn with_service_name(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry> {
        Entry::new(&self.service_name, key).map_err(|e| {
            Error::Storage(format!("Cannot open keychain entry '{}': {}", key, e))
        })
    }
}

impl Default for KeychainStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for KeychainStore {
    fn store(&self, key: &str, value: &str) -> Result<()> {
        debug!(key, service = %self.service_name, "Writing credential to keychain");
        self.entry(key)?
            .set_password(value)
            .map_err(|e| Error::Storage(format!("Cannot write credential '{}': {}", key, e)))
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        debug!(key, service = %self.service_name, "Reading credential from keychain");
        match self.entry(key)?.get_password() {
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(Error::Storage(format!(
                "Cannot read credential '{}': {}",
                key, e
            ))),
        }
    }

    fn delete(&self, key: &str) -> Result<()> {
        debug!(key, service = %self.service_name, "Removing credential from keychain");
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(Error::Storage(format!(
                "Cannot remove credential '{}': {}",
                key, e
            ))),
        }
    }
}

// =============================================================================
// MemoryStore
// =============================================================================

/// In-memory credential store for tests and keychain-less runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store holding just the API token.
    pub fn with_token(token: impl Into<String>) -> Self {
        let mut entries = HashMap::new();
        entries.insert(TOKEN_KEY.to_string(), token.into());
        Self {
            entries: RwLock::new(entries),
        }
    }
}

impl CredentialStore for MemoryStore {
    fn store(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .write()
            .map_err(|e| Error::Storage(format!("Lock poisoned: {}", e)))?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .read()
            .map_err(|e| Error::Storage(format!("Lock poisoned: {}", e)))?;
        Ok(entries.get(key).cloned())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.entries
            .write()
            .map_err(|e| Error::Storage(format!("Lock poisoned: {}", e)))?
            .remove(key);
        Ok(())
    }
}

// =============================================================================
// Token helpers
// =============================================================================

/// Look up the stored API token.
///
/// Keychain failures (no secret service on a headless box, locked keyring)
/// are logged and treated as "no token stored".
pub fn lookup_token(store: &dyn CredentialStore) -> Option<String> {
    match store.get(TOKEN_KEY) {
        Ok(Some(token)) if !token.trim().is_empty() => Some(token),
        Ok(_) => None,
        Err(e) => {
            warn!(error = %e, "Keychain unavailable, ignoring stored token");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;

    #[test]
    fn test_memory_store_basic() {
        let store = MemoryStore::new();

        store.store(TOKEN_KEY, "secret").unwrap();
        assert_eq!(store.get(TOKEN_KEY).unwrap(), Some("secret".to_string()));
        assert!(store.exists(TOKEN_KEY));
        assert!(!store.exists("nonexistent"));

        store.delete(TOKEN_KEY).unwrap();
        assert_eq!(store.get(TOKEN_KEY).unwrap(), None);

        // Deleting twice is fine
        store.delete(TOKEN_KEY).unwrap();
    }

    #[test]
    fn test_memory_store_overwrite() {
        let store = MemoryStore::with_token("first");
        store.store(TOKEN_KEY, "second").unwrap();
        assert_eq!(store.get(TOKEN_KEY).unwrap(), Some("second".to_string()));
    }

    #[test]
    fn test_lookup_token_present() {
        let store = MemoryStore::with_token("abc");
        assert_eq!(lookup_token(&store), Some("abc".to_string()));
    }

    #[test]
    fn test_lookup_token_blank_is_none() {
        let store = MemoryStore::with_token("   ");
        assert_eq!(lookup_token(&store), None);
    }

    #[test]
    fn test_lookup_token_degrades_on_keychain_error() {
        let mut store = MockCredentialStore::new();
        store
            .expect_get()
            .with(eq(TOKEN_KEY))
            .times(1)
            .returning(|_| Err(Error::Storage("no secret service".to_string())));

        assert_eq!(lookup_token(&store), None);
    }

    #[test]
    fn test_lookup_token_missing() {
        let mut store = MockCredentialStore::new();
        store.expect_get().returning(|_| Ok(None));
        assert_eq!(lookup_token(&store), None);
    }

    #[test]
    fn test_keychain_store_service_name() {
        assert_eq!(KeychainStore::new().service_name, "todoist-mcp");
        assert_eq!(KeychainStore::default().service_name, "todoist-mcp");
        assert_eq!(
            KeychainStore::with_service_name("todoist-mcp-test").service_name,
            "todoist-mcp-test"
        );
    }
}
