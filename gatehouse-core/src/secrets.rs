//! Secure credential storage.
//!
//! Secrets are namespaced by a fixed service string plus a per-user or
//! per-node account key. The store never logs secret material; failures are
//! logged with the namespace and account only.

use std::collections::BTreeMap;
use std::sync::Mutex;

use secrecy::{ExposeSecret, SecretString};

/// Namespace for provider credentials written by the auth flows.
pub const AUTH_NAMESPACE: &str = "dev.gatehouse.auth";

/// Namespace for bridge pairing tokens cached on client nodes.
pub const BRIDGE_NAMESPACE: &str = "dev.gatehouse.bridge";

pub trait SecretStore: Send + Sync {
    /// Store `secret`, replacing any existing value. Returns `false` on failure.
    fn save(&self, namespace: &str, account: &str, secret: &SecretString) -> bool;

    /// Load a secret; `None` when absent or unreadable.
    fn load(&self, namespace: &str, account: &str) -> Option<SecretString>;

    /// Remove a secret. Returns `true` if something was removed.
    fn delete(&self, namespace: &str, account: &str) -> bool;
}

/// OS keyring (macOS Keychain, Windows Credential Manager, Linux keyutils).
#[derive(Debug, Default, Clone, Copy)]
pub struct KeyringStore;

impl SecretStore for KeyringStore {
    fn save(&self, namespace: &str, account: &str, secret: &SecretString) -> bool {
        let result = keyring::Entry::new(namespace, account)
            .and_then(|entry| entry.set_password(secret.expose_secret()));
        match result {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(namespace, account, error = %err, "keyring save failed");
                false
            }
        }
    }

    fn load(&self, namespace: &str, account: &str) -> Option<SecretString> {
        let result = keyring::Entry::new(namespace, account).and_then(|entry| entry.get_password());
        match result {
            Ok(value) if !value.is_empty() => Some(SecretString::new(value.into())),
            Ok(_) | Err(keyring::Error::NoEntry) => None,
            Err(err) => {
                tracing::warn!(namespace, account, error = %err, "keyring load failed");
                None
            }
        }
    }

    fn delete(&self, namespace: &str, account: &str) -> bool {
        let result =
            keyring::Entry::new(namespace, account).and_then(|entry| entry.delete_credential());
        match result {
            Ok(()) => true,
            Err(keyring::Error::NoEntry) => false,
            Err(err) => {
                tracing::warn!(namespace, account, error = %err, "keyring delete failed");
                false
            }
        }
    }
}

/// In-process store for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    entries: Mutex<BTreeMap<(String, String), String>>,
    fail_saves: bool,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose `save` always reports failure.
    pub fn failing() -> Self {
        Self {
            entries: Mutex::default(),
            fail_saves: true,
        }
    }

    pub fn with_entry(self, namespace: &str, account: &str, secret: &str) -> Self {
        self.lock()
            .insert((namespace.to_string(), account.to_string()), secret.to_string());
        self
    }

    /// Copy of every stored entry, for before/after comparisons.
    pub fn snapshot(&self) -> BTreeMap<(String, String), String> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<(String, String), String>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SecretStore for MemorySecretStore {
    fn save(&self, namespace: &str, account: &str, secret: &SecretString) -> bool {
        if self.fail_saves {
            return false;
        }
        self.lock().insert(
            (namespace.to_string(), account.to_string()),
            secret.expose_secret().to_string(),
        );
        true
    }

    fn load(&self, namespace: &str, account: &str) -> Option<SecretString> {
        self.lock()
            .get(&(namespace.to_string(), account.to_string()))
            .filter(|v| !v.is_empty())
            .map(|v| SecretString::new(v.clone().into()))
    }

    fn delete(&self, namespace: &str, account: &str) -> bool {
        self.lock()
            .remove(&(namespace.to_string(), account.to_string()))
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_save_load_delete() {
        let store = MemorySecretStore::new();
        assert!(store.load(BRIDGE_NAMESPACE, "bridge-token.n1").is_none());

        assert!(store.save(
            BRIDGE_NAMESPACE,
            "bridge-token.n1",
            &SecretString::new("tok".into())
        ));
        let loaded = store.load(BRIDGE_NAMESPACE, "bridge-token.n1").expect("hit");
        assert_eq!(loaded.expose_secret(), "tok");

        // Namespaces are isolated.
        assert!(store.load(AUTH_NAMESPACE, "bridge-token.n1").is_none());

        assert!(store.delete(BRIDGE_NAMESPACE, "bridge-token.n1"));
        assert!(!store.delete(BRIDGE_NAMESPACE, "bridge-token.n1"));
    }

    #[test]
    fn empty_secret_reads_as_absent() {
        let store = MemorySecretStore::new().with_entry(BRIDGE_NAMESPACE, "a", "");
        assert!(store.load(BRIDGE_NAMESPACE, "a").is_none());
    }

    #[test]
    fn failing_store_reports_false_and_stays_empty() {
        let store = MemorySecretStore::failing();
        assert!(!store.save(AUTH_NAMESPACE, "x", &SecretString::new("s".into())));
        assert!(store.snapshot().is_empty());
    }
}
