//! Federated (Google / Apple) sign-in results.
//!
//! The provider SDK runs outside this crate; it hands back either a
//! cancellation or the provider's subject id and email, which the identity
//! service reconciles against local accounts.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::api::ApiError;

use super::Provider;

/// Google OpenID Connect userinfo endpoint
const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v3/userinfo";

const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FederatedProvider {
    Google,
    Apple,
}

impl From<FederatedProvider> for Provider {
    fn from(provider: FederatedProvider) -> Self {
        match provider {
            FederatedProvider::Google => Provider::Google,
            FederatedProvider::Apple => Provider::Apple,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederatedIdentity {
    pub provider: FederatedProvider,
    pub external_id: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FederatedOutcome {
    Cancelled,
    Completed(FederatedIdentity),
}

#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    sub: String,
    email: Option<String>,
}

/// Resolves a Google access token into a `FederatedIdentity`.
#[derive(Clone)]
pub struct GoogleUserInfoClient {
    client: Client,
    url: String,
}

impl GoogleUserInfoClient {
    pub fn new() -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            url: GOOGLE_USERINFO_URL.to_string(),
        })
    }

    /// Point at a different userinfo endpoint.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub async fn fetch_identity(&self, access_token: &str) -> Result<FederatedIdentity, ApiError> {
        let response = self
            .client
            .get(&self.url)
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(status, &body));
        }

        let info: GoogleUserInfo = response.json().await?;
        debug!(sub = %info.sub, "Google userinfo received");
        Self::to_identity(info)
    }

    fn to_identity(info: GoogleUserInfo) -> Result<FederatedIdentity, ApiError> {
        let email = info
            .email
            .filter(|e| !e.is_empty())
            .ok_or_else(|| ApiError::InvalidResponse("userinfo has no email".to_string()))?;
        Ok(FederatedIdentity {
            provider: FederatedProvider::Google,
            external_id: info.sub,
            email,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_mapping() {
        assert_eq!(Provider::from(FederatedProvider::Google), Provider::Google);
        assert_eq!(Provider::from(FederatedProvider::Apple), Provider::Apple);
    }

    #[test]
    fn test_userinfo_to_identity() {
        let json = r#"{"sub":"1098765","email":"g@test.com","email_verified":true,"picture":"https://example.com/p.png"}"#;
        let info: GoogleUserInfo = serde_json::from_str(json).unwrap();
        let identity = GoogleUserInfoClient::to_identity(info).unwrap();
        assert_eq!(identity.external_id, "1098765");
        assert_eq!(identity.email, "g@test.com");
        assert_eq!(identity.provider, FederatedProvider::Google);
    }

    #[test]
    fn test_userinfo_without_email_is_rejected() {
        let info: GoogleUserInfo = serde_json::from_str(r#"{"sub":"1"}"#).unwrap();
        assert!(matches!(
            GoogleUserInfoClient::to_identity(info),
            Err(ApiError::InvalidResponse(_))
        ));
    }
}
