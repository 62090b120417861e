//! Login, registration, logout and federated identity reconciliation.
//!
//! Screens call through `IdentityService` rather than touching the stores
//! directly. Every failure comes back as an `IdentityError`.

use thiserror::Error;
use tracing::{info, warn};

use crate::storage::SharedStore;

use super::credentials::CredentialError;
use super::federated::{FederatedIdentity, FederatedOutcome};
use super::{Account, CredentialStore, Provider, SessionStore};

/// Minimum password length for new registrations.
pub const MIN_PASSWORD_LENGTH: usize = 6;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("All fields are required")]
    MissingFields,

    #[error("Invalid email format")]
    InvalidEmail,

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Password must be at least 6 characters")]
    PasswordTooShort,
}

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Email already in use")]
    EmailExists,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Storage error: {0:#}")]
    Storage(anyhow::Error),
}

impl From<anyhow::Error> for IdentityError {
    fn from(e: anyhow::Error) -> Self {
        IdentityError::Storage(e)
    }
}

impl From<CredentialError> for IdentityError {
    fn from(e: CredentialError) -> Self {
        match e {
            CredentialError::DuplicateEmail(_) => IdentityError::EmailExists,
            CredentialError::Storage(e) => IdentityError::Storage(e),
        }
    }
}

/// `local@domain.tld`: no whitespace, exactly one `@`, and some dot in the
/// domain with text on both sides of it.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}

/// Registration form checks, in the order the form reports them.
pub fn validate_registration(
    email: &str,
    password: &str,
    confirmation: Option<&str>,
) -> Result<(), ValidationError> {
    if email.is_empty() || password.is_empty() || confirmation.is_some_and(str::is_empty) {
        return Err(ValidationError::MissingFields);
    }
    if !is_valid_email(email) {
        return Err(ValidationError::InvalidEmail);
    }
    if confirmation.is_some_and(|c| c != password) {
        return Err(ValidationError::PasswordMismatch);
    }
    // Length in UTF-16 code units, as the mobile form measured it
    if password.encode_utf16().count() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::PasswordTooShort);
    }
    Ok(())
}

#[derive(Clone)]
pub struct IdentityService {
    credentials: CredentialStore,
    session: SessionStore,
}

impl IdentityService {
    pub fn new(store: SharedStore) -> Self {
        Self {
            credentials: CredentialStore::new(store.clone()),
            session: SessionStore::new(store),
        }
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    /// Create a password account and sign it in.
    pub fn register(&self, email: &str, password: &str) -> Result<Account, IdentityError> {
        self.register_inner(email, password, None)
    }

    /// Same as `register`, also checking the confirmation field.
    pub fn register_with_confirmation(
        &self,
        email: &str,
        password: &str,
        confirmation: &str,
    ) -> Result<Account, IdentityError> {
        self.register_inner(email, password, Some(confirmation))
    }

    fn register_inner(
        &self,
        email: &str,
        password: &str,
        confirmation: Option<&str>,
    ) -> Result<Account, IdentityError> {
        validate_registration(email, password, confirmation)?;

        let account = match self.credentials.add_account(Account::with_password(email, password)) {
            Ok(account) => account,
            Err(e) => {
                warn!(error = %e, "Registration rejected");
                return Err(e.into());
            }
        };
        self.session.set(&account)?;

        info!(id = %account.id, "Account registered");
        Ok(account)
    }

    /// Sign in with email and password. Federated accounts never match.
    ///
    /// Only sets the session; the caller still runs the biometric admission
    /// step before showing the main area.
    pub fn login(&self, email: &str, password: &str) -> Result<Account, IdentityError> {
        if email.is_empty() || password.is_empty() {
            return Err(ValidationError::MissingFields.into());
        }

        let Some(account) = self.credentials.find_by_credentials(email, password) else {
            warn!("Login failed");
            return Err(IdentityError::InvalidCredentials);
        };
        self.session.set(&account)?;

        info!(id = %account.id, "Login successful");
        Ok(account)
    }

    /// Bind a federated sign-in to a local account and sign it in.
    ///
    /// An existing account with the same email is reused whatever its
    /// provider, including password accounts. Nothing proves the caller
    /// controls that password, so this merge is only as safe as the
    /// provider's email verification.
    pub fn reconcile_federated_identity(
        &self,
        provider: Provider,
        external_id: &str,
        email: &str,
    ) -> Result<Account, IdentityError> {
        let account = match self.credentials.find_by_email(email) {
            Some(existing) => {
                if existing.provider != provider {
                    warn!(
                        id = %existing.id,
                        stored = %existing.provider,
                        incoming = %provider,
                        "Federated sign-in bound to account of a different provider"
                    );
                }
                existing
            }
            None => self
                .credentials
                .add_account(Account::federated(provider, external_id, email))?,
        };
        self.session.set(&account)?;

        info!(id = %account.id, provider = %provider, "Federated sign-in");
        Ok(account)
    }

    /// `Ok(None)` when the user cancelled the provider flow.
    pub fn complete_federated_sign_in(
        &self,
        outcome: FederatedOutcome,
    ) -> Result<Option<Account>, IdentityError> {
        match outcome {
            FederatedOutcome::Cancelled => {
                info!("Federated sign-in cancelled");
                Ok(None)
            }
            FederatedOutcome::Completed(FederatedIdentity {
                provider,
                external_id,
                email,
            }) => self
                .reconcile_federated_identity(provider.into(), &external_id, &email)
                .map(Some),
        }
    }

    pub fn current_session(&self) -> Option<Account> {
        self.session.current()
    }

    pub fn is_logged_in(&self) -> bool {
        self.session.is_authenticated()
    }

    /// Clear the session. Registered accounts are kept.
    pub fn logout(&self) -> Result<(), IdentityError> {
        self.session.clear()?;
        info!("Logged out");
        Ok(())
    }
}
