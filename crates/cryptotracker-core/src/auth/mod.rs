//! Client-local identity: accounts, session, biometric unlock.
//!
//! This module provides:
//! - `CredentialStore`: registered accounts keyed by email
//! - `SessionStore`: the single signed-in account
//! - `IdentityService`: login, registration, logout, federated sign-in
//! - `BiometricGate` and `Admission`: the unlock step after sign-in
//!
//! All state lives in an injected `KeyValueStore`.

pub mod account;
pub mod admission;
pub mod biometric;
pub mod credentials;
pub mod federated;
pub mod identity;
pub mod session;

pub use account::{Account, Provider};
pub use admission::{Admission, AdmissionError, AdmissionState};
pub use biometric::{
    BiometricAuthenticator, BiometricError, BiometricGate, BiometricPreference, BiometricToggleError,
    MockBiometrics, UnsupportedBiometrics,
};
pub use credentials::{CredentialError, CredentialStore};
pub use federated::{FederatedIdentity, FederatedOutcome, FederatedProvider, GoogleUserInfoClient};
pub use identity::{IdentityError, IdentityService, ValidationError};
pub use session::SessionStore;
