//! Biometric unlock interposed between sign-in and the main area.
//!
//! The platform prompt (Face ID, Touch ID, BiometricPrompt, Windows Hello)
//! sits behind `BiometricAuthenticator`. `BiometricGate` pairs it with the
//! persisted opt-in preference.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::storage::{SharedStore, BIOMETRIC_ENABLED_KEY};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BiometricError {
    #[error("Biometric authentication is not available on this device")]
    NotAvailable,

    #[error("No biometrics enrolled on this device")]
    NotEnrolled,

    #[error("Biometric authentication failed")]
    AuthenticationFailed,

    #[error("Biometric authentication was cancelled")]
    UserCancelled,

    #[error("Biometric authentication locked out")]
    Lockout,

    #[error("Biometric challenge failed")]
    ChallengeFailed,

    #[error("Platform error: {0}")]
    PlatformError(String),
}

/// What the device can do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BiometricCapability {
    pub hardware_present: bool,
    pub enrolled: bool,
}

impl BiometricCapability {
    pub fn is_usable(&self) -> bool {
        self.hardware_present && self.enrolled
    }
}

/// Text shown in the platform prompt.
#[derive(Debug, Clone)]
pub struct BiometricPrompt {
    pub message: String,
    pub fallback_label: String,
}

impl Default for BiometricPrompt {
    fn default() -> Self {
        Self {
            message: "Unlock cryptotracker".to_string(),
            fallback_label: "Use password".to_string(),
        }
    }
}

/// Platform biometric interface.
pub trait BiometricAuthenticator: Send + Sync {
    fn capability(&self) -> BiometricCapability;

    /// Show the platform prompt and block until it resolves.
    fn authenticate(&self, prompt: &BiometricPrompt) -> Result<(), BiometricError>;
}

/// Devices without biometric hardware.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedBiometrics;

impl BiometricAuthenticator for UnsupportedBiometrics {
    fn capability(&self) -> BiometricCapability {
        BiometricCapability::default()
    }

    fn authenticate(&self, _prompt: &BiometricPrompt) -> Result<(), BiometricError> {
        Err(BiometricError::NotAvailable)
    }
}

/// Scriptable authenticator for tests and demos.
#[derive(Debug)]
pub struct MockBiometrics {
    capability: BiometricCapability,
    succeed: AtomicBool,
}

impl MockBiometrics {
    /// Enrolled device whose prompt succeeds.
    pub fn success() -> Self {
        Self::enrolled(true)
    }

    /// Enrolled device whose prompt fails.
    pub fn failure() -> Self {
        Self::enrolled(false)
    }

    /// Hardware present but nothing enrolled.
    pub fn not_enrolled() -> Self {
        Self {
            capability: BiometricCapability {
                hardware_present: true,
                enrolled: false,
            },
            succeed: AtomicBool::new(false),
        }
    }

    fn enrolled(succeed: bool) -> Self {
        Self {
            capability: BiometricCapability {
                hardware_present: true,
                enrolled: true,
            },
            succeed: AtomicBool::new(succeed),
        }
    }

    /// Change the outcome of subsequent prompts.
    pub fn set_outcome(&self, succeed: bool) {
        self.succeed.store(succeed, Ordering::SeqCst);
    }
}

impl BiometricAuthenticator for MockBiometrics {
    fn capability(&self) -> BiometricCapability {
        self.capability
    }

    fn authenticate(&self, _prompt: &BiometricPrompt) -> Result<(), BiometricError> {
        if !self.capability.is_usable() {
            return Err(BiometricError::NotAvailable);
        }
        if self.succeed.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(BiometricError::AuthenticationFailed)
        }
    }
}

/// Opt-in state for biometric unlock. `Unset` until the user first decides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BiometricPreference {
    Unset,
    Enabled,
    Disabled,
}

impl BiometricPreference {
    /// Anything other than `"true"` / `"false"` reads as `Unset`.
    pub fn from_stored(value: Option<&str>) -> Self {
        match value {
            Some("true") => BiometricPreference::Enabled,
            Some("false") => BiometricPreference::Disabled,
            _ => BiometricPreference::Unset,
        }
    }

    pub fn as_stored(&self) -> Option<&'static str> {
        match self {
            BiometricPreference::Enabled => Some("true"),
            BiometricPreference::Disabled => Some("false"),
            BiometricPreference::Unset => None,
        }
    }
}

impl From<bool> for BiometricPreference {
    fn from(enabled: bool) -> Self {
        if enabled {
            BiometricPreference::Enabled
        } else {
            BiometricPreference::Disabled
        }
    }
}

impl std::fmt::Display for BiometricPreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BiometricPreference::Unset => write!(f, "Not set"),
            BiometricPreference::Enabled => write!(f, "Enabled"),
            BiometricPreference::Disabled => write!(f, "Disabled"),
        }
    }
}

#[derive(Clone)]
pub struct BiometricGate {
    store: SharedStore,
    authenticator: Arc<dyn BiometricAuthenticator>,
    prompt: BiometricPrompt,
}

impl BiometricGate {
    pub fn new(store: SharedStore, authenticator: Arc<dyn BiometricAuthenticator>) -> Self {
        Self {
            store,
            authenticator,
            prompt: BiometricPrompt::default(),
        }
    }

    pub fn with_prompt(mut self, prompt: BiometricPrompt) -> Self {
        self.prompt = prompt;
        self
    }

    /// Hardware present and at least one biometric enrolled.
    pub fn is_supported(&self) -> bool {
        self.authenticator.capability().is_usable()
    }

    /// Stored preference; unreadable storage reads as `Unset`.
    pub fn preference(&self) -> BiometricPreference {
        match self.store.get(BIOMETRIC_ENABLED_KEY) {
            Ok(value) => BiometricPreference::from_stored(value.as_deref()),
            Err(e) => {
                warn!(error = %e, "Failed to read biometric preference");
                BiometricPreference::Unset
            }
        }
    }

    pub fn set_preference(&self, enabled: bool) -> Result<()> {
        self.store_preference(BiometricPreference::from(enabled))
    }

    /// Forget the decision so the opt-in prompt shows again.
    pub fn clear_preference(&self) -> Result<()> {
        self.store_preference(BiometricPreference::Unset)
    }

    fn store_preference(&self, preference: BiometricPreference) -> Result<()> {
        match preference.as_stored() {
            Some(value) => self.store.set(BIOMETRIC_ENABLED_KEY, value)?,
            None => self.store.remove(BIOMETRIC_ENABLED_KEY)?,
        }
        debug!(%preference, "Biometric preference stored");
        Ok(())
    }

    /// Settings toggle: refuses to enable on a device that cannot use it.
    pub fn enable(&self) -> Result<(), BiometricToggleError> {
        let capability = self.authenticator.capability();
        if !capability.hardware_present {
            return Err(BiometricError::NotAvailable.into());
        }
        if !capability.enrolled {
            return Err(BiometricError::NotEnrolled.into());
        }
        self.set_preference(true)?;
        Ok(())
    }

    pub fn disable(&self) -> Result<()> {
        self.set_preference(false)
    }

    /// Run the platform prompt. Mismatch, cancellation and lockout all
    /// surface as `ChallengeFailed`.
    pub fn challenge(&self) -> Result<(), BiometricError> {
        match self.authenticator.authenticate(&self.prompt) {
            Ok(()) => {
                info!("Biometric challenge passed");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Biometric challenge failed");
                Err(BiometricError::ChallengeFailed)
            }
        }
    }
}

/// Errors from the settings toggle.
#[derive(Error, Debug)]
pub enum BiometricToggleError {
    #[error(transparent)]
    Unsupported(#[from] BiometricError),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{KeyValueStore, MemoryStore};

    fn gate(authenticator: impl BiometricAuthenticator + 'static) -> (Arc<MemoryStore>, BiometricGate) {
        let store = Arc::new(MemoryStore::new());
        let gate = BiometricGate::new(store.clone(), Arc::new(authenticator));
        (store, gate)
    }

    #[test]
    fn test_preference_tri_state() {
        assert_eq!(BiometricPreference::from_stored(None), BiometricPreference::Unset);
        assert_eq!(BiometricPreference::from_stored(Some("true")), BiometricPreference::Enabled);
        assert_eq!(BiometricPreference::from_stored(Some("false")), BiometricPreference::Disabled);
        assert_eq!(BiometricPreference::from_stored(Some("yes")), BiometricPreference::Unset);
        assert_eq!(BiometricPreference::from(true).as_stored(), Some("true"));
        assert_eq!(BiometricPreference::Unset.as_stored(), None);
    }

    #[test]
    fn test_preference_persists_as_string() {
        let (store, gate) = gate(MockBiometrics::success());
        assert_eq!(gate.preference(), BiometricPreference::Unset);

        gate.set_preference(false).unwrap();
        assert_eq!(store.get(BIOMETRIC_ENABLED_KEY).unwrap().as_deref(), Some("false"));
        assert_eq!(gate.preference(), BiometricPreference::Disabled);

        gate.set_preference(true).unwrap();
        assert_eq!(store.get(BIOMETRIC_ENABLED_KEY).unwrap().as_deref(), Some("true"));

        gate.clear_preference().unwrap();
        assert_eq!(store.get(BIOMETRIC_ENABLED_KEY).unwrap(), None);
        assert_eq!(gate.preference(), BiometricPreference::Unset);
    }

    #[test]
    fn test_is_supported() {
        assert!(gate(MockBiometrics::success()).1.is_supported());
        assert!(!gate(MockBiometrics::not_enrolled()).1.is_supported());
        assert!(!gate(UnsupportedBiometrics).1.is_supported());
    }

    #[test]
    fn test_enable_checks_capability_first() {
        let (_, unsupported) = gate(UnsupportedBiometrics);
        assert!(matches!(
            unsupported.enable(),
            Err(BiometricToggleError::Unsupported(BiometricError::NotAvailable))
        ));
        assert_eq!(unsupported.preference(), BiometricPreference::Unset);

        let (_, not_enrolled) = gate(MockBiometrics::not_enrolled());
        assert!(matches!(
            not_enrolled.enable(),
            Err(BiometricToggleError::Unsupported(BiometricError::NotEnrolled))
        ));

        let (_, ok) = gate(MockBiometrics::success());
        ok.enable().unwrap();
        assert_eq!(ok.preference(), BiometricPreference::Enabled);
        ok.disable().unwrap();
        assert_eq!(ok.preference(), BiometricPreference::Disabled);
    }

    #[test]
    fn test_challenge_collapses_failures() {
        let (_, failing) = gate(MockBiometrics::failure());
        assert_eq!(failing.challenge(), Err(BiometricError::ChallengeFailed));

        let (_, unsupported) = gate(UnsupportedBiometrics);
        assert_eq!(unsupported.challenge(), Err(BiometricError::ChallengeFailed));
    }

    #[test]
    fn test_mock_outcome_can_change() {
        let mock = Arc::new(MockBiometrics::failure());
        let gate = BiometricGate::new(Arc::new(MemoryStore::new()), mock.clone());
        assert!(gate.challenge().is_err());
        mock.set_outcome(true);
        assert!(gate.challenge().is_ok());
    }
}
