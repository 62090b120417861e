//! Routing from a fresh sign-in to the main area.
//!
//! ```text
//! Unauthenticated --authenticated--> PendingBiometricDecision
//! PendingBiometricDecision --decide--> Admitted            (unsupported or Disabled)
//!                                   -> BiometricPrompt     (Unset)
//!                                   -> BiometricChallenge  (Enabled)
//! BiometricPrompt --decline--> Admitted            (preference = false)
//! BiometricPrompt --accept---> BiometricChallenge  (preference = true)
//! BiometricChallenge --challenge ok--> Admitted
//! BiometricChallenge --challenge failed--> BiometricChallenge (retry)
//! any --sign_out--> Unauthenticated
//! ```
//!
//! A failed challenge leaves the session in place; only the main area stays
//! locked.

use thiserror::Error;
use tracing::debug;

use super::biometric::{BiometricError, BiometricGate, BiometricPreference};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionState {
    Unauthenticated,
    PendingBiometricDecision,
    BiometricPrompt,
    BiometricChallenge,
    Admitted,
}

#[derive(Error, Debug)]
pub enum AdmissionError {
    #[error("Cannot {action} while {state:?}")]
    UnexpectedState {
        action: &'static str,
        state: AdmissionState,
    },

    #[error(transparent)]
    Biometric(#[from] BiometricError),

    #[error("Failed to save biometric preference: {0:#}")]
    Storage(anyhow::Error),
}

impl From<anyhow::Error> for AdmissionError {
    fn from(e: anyhow::Error) -> Self {
        AdmissionError::Storage(e)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    state: AdmissionState,
}

impl Default for Admission {
    fn default() -> Self {
        Self::new()
    }
}

impl Admission {
    pub fn new() -> Self {
        Self {
            state: AdmissionState::Unauthenticated,
        }
    }

    /// Resume with a session that was already persisted (app relaunch).
    pub fn resume(is_logged_in: bool) -> Self {
        Self {
            state: if is_logged_in {
                AdmissionState::PendingBiometricDecision
            } else {
                AdmissionState::Unauthenticated
            },
        }
    }

    pub fn state(&self) -> AdmissionState {
        self.state
    }

    /// Main area reachable.
    pub fn is_admitted(&self) -> bool {
        self.state == AdmissionState::Admitted
    }

    fn expect(&self, expected: AdmissionState, action: &'static str) -> Result<(), AdmissionError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(AdmissionError::UnexpectedState {
                action,
                state: self.state,
            })
        }
    }

    fn transition(&mut self, next: AdmissionState) -> AdmissionState {
        debug!(from = ?self.state, to = ?next, "Admission transition");
        self.state = next;
        next
    }

    /// Login, registration or federated sign-in succeeded.
    pub fn authenticated(&mut self) -> Result<AdmissionState, AdmissionError> {
        self.expect(AdmissionState::Unauthenticated, "authenticate")?;
        Ok(self.transition(AdmissionState::PendingBiometricDecision))
    }

    /// Choose the next step from device capability and stored preference.
    pub fn decide(&mut self, gate: &BiometricGate) -> Result<AdmissionState, AdmissionError> {
        self.expect(AdmissionState::PendingBiometricDecision, "decide")?;

        let next = if !gate.is_supported() {
            AdmissionState::Admitted
        } else {
            match gate.preference() {
                BiometricPreference::Unset => AdmissionState::BiometricPrompt,
                BiometricPreference::Enabled => AdmissionState::BiometricChallenge,
                BiometricPreference::Disabled => AdmissionState::Admitted,
            }
        };
        Ok(self.transition(next))
    }

    /// User opted in from the first-run prompt.
    pub fn accept_prompt(&mut self, gate: &BiometricGate) -> Result<AdmissionState, AdmissionError> {
        self.expect(AdmissionState::BiometricPrompt, "accept biometric prompt")?;
        gate.set_preference(true)?;
        Ok(self.transition(AdmissionState::BiometricChallenge))
    }

    /// User declined the first-run prompt.
    pub fn decline_prompt(&mut self, gate: &BiometricGate) -> Result<AdmissionState, AdmissionError> {
        self.expect(AdmissionState::BiometricPrompt, "decline biometric prompt")?;
        gate.set_preference(false)?;
        Ok(self.transition(AdmissionState::Admitted))
    }

    /// Run the challenge. On failure the state is unchanged so the caller
    /// can retry.
    pub fn challenge(&mut self, gate: &BiometricGate) -> Result<AdmissionState, AdmissionError> {
        self.expect(AdmissionState::BiometricChallenge, "run biometric challenge")?;
        gate.challenge()?;
        Ok(self.transition(AdmissionState::Admitted))
    }

    /// Logout or session loss, from any state.
    pub fn sign_out(&mut self) -> AdmissionState {
        self.transition(AdmissionState::Unauthenticated)
    }
}
