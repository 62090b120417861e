use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::storage::{SharedStore, CURRENT_USER_KEY};

use super::Account;

/// Single-slot holder of the signed-in account, persisted under `currentUser`.
#[derive(Clone)]
pub struct SessionStore {
    store: SharedStore,
}

impl SessionStore {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// The current session, or `None` when absent or unreadable.
    pub fn current(&self) -> Option<Account> {
        let raw = match self.store.get(CURRENT_USER_KEY) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(error = %e, "Failed to read session, treating as signed out");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(account) => Some(account),
            Err(e) => {
                warn!(error = %e, "Failed to parse session, treating as signed out");
                None
            }
        }
    }

    /// Replace the current session.
    pub fn set(&self, account: &Account) -> Result<()> {
        let contents = serde_json::to_string(account).context("Failed to serialize session")?;
        self.store.set(CURRENT_USER_KEY, &contents)?;
        debug!(id = %account.id, "Session stored");
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        self.store.remove(CURRENT_USER_KEY)?;
        debug!("Session cleared");
        Ok(())
    }

    pub fn is_authenticated(&self) -> bool {
        self.current().is_some()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::storage::{KeyValueStore, MemoryStore};

    #[test]
    fn test_set_overwrites_single_slot() {
        let session = SessionStore::new(Arc::new(MemoryStore::new()));
        assert!(!session.is_authenticated());

        let first = Account::with_password("a@test.com", "secret1");
        let second = Account::with_password("b@test.com", "secret1");
        session.set(&first).unwrap();
        session.set(&second).unwrap();

        assert_eq!(session.current(), Some(second));
    }

    #[test]
    fn test_clear() {
        let session = SessionStore::new(Arc::new(MemoryStore::new()));
        session.set(&Account::with_password("a@test.com", "secret1")).unwrap();
        session.clear().unwrap();
        assert_eq!(session.current(), None);
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_malformed_session_is_absent() {
        let backing = Arc::new(MemoryStore::new());
        backing.set(CURRENT_USER_KEY, "null-ish").unwrap();
        let session = SessionStore::new(backing);
        assert_eq!(session.current(), None);
    }
}
