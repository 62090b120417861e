//! Key-value persistence backing the identity stores.
//!
//! The credential store, session store and biometric preference all read and
//! write string values under fixed keys. Backends:
//! - `MemoryStore`: in-process map, used by tests
//! - `FileStore`: one file per key in the app data directory
//! - `KeyringStore`: OS keychain via `keyring`

pub mod file;
pub mod keychain;
pub mod memory;

use std::sync::Arc;

use anyhow::Result;

pub use file::FileStore;
pub use keychain::KeyringStore;
pub use memory::MemoryStore;

/// Key holding the JSON array of registered accounts.
pub const USERS_KEY: &str = "users";

/// Key holding the JSON account of the current session.
pub const CURRENT_USER_KEY: &str = "currentUser";

/// Key holding the biometric preference (`"true"` / `"false"`).
pub const BIOMETRIC_ENABLED_KEY: &str = "biometricEnabled";

/// String key-value storage. `set` replaces the whole value: an interrupted
/// write leaves the previous value readable.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removing a key that does not exist is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}

pub type SharedStore = Arc<dyn KeyValueStore>;
