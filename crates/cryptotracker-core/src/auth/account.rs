use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// How an account was created. Fixed for the life of the account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum Provider {
    #[default]
    Email,
    Google,
    Apple,
}

impl Provider {
    /// Only email accounts can sign in with a password.
    pub fn accepts_password(&self) -> bool {
        matches!(self, Provider::Email)
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::Email => write!(f, "email"),
            Provider::Google => write!(f, "google"),
            Provider::Apple => write!(f, "apple"),
        }
    }
}

/// A locally persisted identity.
///
/// The password is stored and compared in plaintext, matching the device-local
/// account model this client has always used. It is not a secure credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Account {
    pub id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    // Older registrations were written without a provider
    #[serde(default)]
    pub provider: Provider,
    /// Absent on records written by the first mobile releases.
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Account {
    /// New password account with a fresh id.
    pub fn with_password(email: &str, password: &str) -> Self {
        Self {
            id: generate_account_id(),
            email: email.to_string(),
            password: Some(password.to_string()),
            provider: Provider::Email,
            created_at: Some(Utc::now()),
        }
    }

    /// New federated account keyed by the provider's subject id.
    pub fn federated(provider: Provider, external_id: &str, email: &str) -> Self {
        Self {
            id: external_id.to_string(),
            email: email.to_string(),
            password: None,
            provider,
            created_at: Some(Utc::now()),
        }
    }

    pub fn matches_password(&self, password: &str) -> bool {
        self.provider.accepts_password() && self.password.as_deref() == Some(password)
    }
}

/// Milliseconds since the epoch plus a random suffix, so two registrations in
/// the same millisecond still get distinct ids.
fn generate_account_id() -> String {
    let suffix: u16 = rand::thread_rng().gen();
    format!("{}-{:04x}", Utc::now().timestamp_millis(), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Provider::Google).unwrap(), "\"google\"");
        let p: Provider = serde_json::from_str("\"apple\"").unwrap();
        assert_eq!(p, Provider::Apple);
    }

    #[test]
    fn test_account_json_layout() {
        let account = Account::with_password("u@test.com", "secret1");
        let value = serde_json::to_value(&account).unwrap();
        assert_eq!(value["email"], "u@test.com");
        assert_eq!(value["password"], "secret1");
        assert_eq!(value["provider"], "email");
        assert!(value.get("createdAt").is_some());

        let federated = Account::federated(Provider::Google, "sub-1", "g@test.com");
        let value = serde_json::to_value(&federated).unwrap();
        assert!(value.get("password").is_none());
        assert_eq!(value["id"], "sub-1");
    }

    #[test]
    fn test_missing_provider_defaults_to_email() {
        let json = r#"{"id":"1700000000000","email":"old@test.com","password":"secret1","createdAt":"2024-01-01T00:00:00Z"}"#;
        let account: Account = serde_json::from_str(json).unwrap();
        assert_eq!(account.provider, Provider::Email);
        assert!(account.matches_password("secret1"));
    }

    #[test]
    fn test_mobile_record_without_created_at_round_trips() {
        let json = r#"{"id":"1700000000000","email":"old@test.com","password":"secret1"}"#;
        let account: Account = serde_json::from_str(json).unwrap();
        assert_eq!(account.created_at, None);
        assert_eq!(account.provider, Provider::Email);
        assert!(account.matches_password("secret1"));

        let value = serde_json::to_value(&account).unwrap();
        assert!(value.get("createdAt").is_none());
        assert_eq!(value["id"], "1700000000000");
    }

    #[test]
    fn test_federated_never_matches_password() {
        let mut account = Account::federated(Provider::Apple, "a-1", "a@test.com");
        assert!(!account.matches_password(""));
        account.password = Some("pw".to_string());
        assert!(!account.matches_password("pw"));
    }

    #[test]
    fn test_generated_ids_differ() {
        let a = Account::with_password("a@test.com", "secret1");
        let b = Account::with_password("b@test.com", "secret1");
        assert_ne!(a.id, b.id);
    }
}
