use anyhow::Context;
use thiserror::Error;
use tracing::{debug, warn};

use crate::storage::{SharedStore, USERS_KEY};

use super::Account;

#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("An account already exists for {0}")]
    DuplicateEmail(String),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Registered accounts, persisted as one JSON array under `users`.
///
/// Emails are compared exactly (case-sensitive).
#[derive(Clone)]
pub struct CredentialStore {
    store: SharedStore,
}

impl CredentialStore {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// All accounts in stored order. Missing or unreadable data reads as
    /// empty; individual records that fail to parse are skipped.
    pub fn list_accounts(&self) -> Vec<Account> {
        let raw = match self.store.get(USERS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!(error = %e, "Failed to read accounts, treating as empty");
                return Vec::new();
            }
        };

        let records: Vec<serde_json::Value> = match serde_json::from_str(&raw) {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "Failed to parse accounts, treating as empty");
                return Vec::new();
            }
        };

        records
            .into_iter()
            .enumerate()
            .filter_map(|(index, record)| match serde_json::from_value(record) {
                Ok(account) => Some(account),
                Err(e) => {
                    warn!(index, error = %e, "Skipping unreadable account record");
                    None
                }
            })
            .collect()
    }

    /// Every stored account, or an error if any of it is unreadable. Writes
    /// go through this so data that cannot be parsed is never overwritten.
    fn load_accounts(&self) -> anyhow::Result<Vec<Account>> {
        match self.store.get(USERS_KEY)? {
            Some(raw) => serde_json::from_str(&raw).context("Stored accounts are unreadable"),
            None => Ok(Vec::new()),
        }
    }

    /// Append an account and persist before returning it.
    pub fn add_account(&self, candidate: Account) -> Result<Account, CredentialError> {
        let mut accounts = self.load_accounts()?;
        if accounts.iter().any(|a| a.email == candidate.email) {
            return Err(CredentialError::DuplicateEmail(candidate.email));
        }

        accounts.push(candidate.clone());
        let contents = serde_json::to_string(&accounts).context("Failed to serialize accounts")?;
        self.store.set(USERS_KEY, &contents)?;

        debug!(id = %candidate.id, provider = %candidate.provider, total = accounts.len(), "Account added");
        Ok(candidate)
    }

    pub fn find_by_email(&self, email: &str) -> Option<Account> {
        self.list_accounts().into_iter().find(|a| a.email == email)
    }

    /// Password accounts only; federated accounts never match.
    pub fn find_by_credentials(&self, email: &str, password: &str) -> Option<Account> {
        self.list_accounts()
            .into_iter()
            .find(|a| a.email == email && a.matches_password(password))
    }

    pub fn has_email(&self, email: &str) -> bool {
        self.find_by_email(email).is_some()
    }
}
