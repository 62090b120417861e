use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use tracing::debug;

use super::KeyValueStore;

/// Stores each key as `<data_dir>/<key>.json`.
pub struct FileStore {
    data_dir: PathBuf,
}

impl FileStore {
    pub fn new(data_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;
        Ok(Self { data_dir })
    }

    fn key_path(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() || key.contains(['/', '\\']) || key.starts_with('.') {
            bail!("Invalid storage key: {:?}", key);
        }
        Ok(self.data_dir.join(format!("{}.json", key)))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.key_path(key)?;
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read storage file: {}", key))?;
        Ok(Some(contents))
    }

    /// Write to `<key>.json.tmp`, sync, then rename over the old file so a
    /// crash never leaves a truncated value behind.
    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.key_path(key)?;
        let temp_path = path.with_extension("json.tmp");

        let mut file = std::fs::File::create(&temp_path)
            .with_context(|| format!("Failed to create storage file: {}", key))?;
        file.write_all(value.as_bytes())
            .and_then(|()| file.sync_all())
            .with_context(|| format!("Failed to write storage file: {}", key))?;
        drop(file);

        // Account records hold plaintext passwords
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&temp_path, std::fs::Permissions::from_mode(0o600))
                .with_context(|| format!("Failed to restrict storage file: {}", key))?;
        }

        std::fs::rename(&temp_path, &path)
            .with_context(|| format!("Failed to replace storage file: {}", key))?;
        debug!(key, bytes = value.len(), "Stored value");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.key_path(key)?;
        if path.exists() {
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to remove storage file: {}", key))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = FileStore::new(dir.path().to_path_buf()).unwrap();
            store.set("users", "[]").unwrap();
        }
        let store = FileStore::new(dir.path().to_path_buf()).unwrap();
        assert_eq!(store.get("users").unwrap().as_deref(), Some("[]"));
        assert!(dir.path().join("users.json").exists());
    }

    #[test]
    fn test_missing_key_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested")).unwrap();
        assert_eq!(store.get("currentUser").unwrap(), None);

        store.set("currentUser", "{}").unwrap();
        store.remove("currentUser").unwrap();
        assert_eq!(store.get("currentUser").unwrap(), None);
        store.remove("currentUser").unwrap();
    }

    #[test]
    fn test_overwrite_replaces_whole_value() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf()).unwrap();
        store.set("users", r#"[{"email":"a@test.com"},{"email":"b@test.com"}]"#).unwrap();
        store.set("users", "[]").unwrap();

        assert_eq!(store.get("users").unwrap().as_deref(), Some("[]"));
        assert!(!dir.path().join("users.json.tmp").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_files_are_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf()).unwrap();
        store.set("users", "[]").unwrap();

        let mode = std::fs::metadata(dir.path().join("users.json")).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_rejects_path_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf()).unwrap();
        assert!(store.set("../escape", "x").is_err());
        assert!(store.get("a/b").is_err());
        assert!(store.get("").is_err());
    }
}
