//! Cookie-file session persistence
//!
//! The file's presence is the sole signal of cached-session validity:
//! the content is an opaque `name=value; name=value` cookie string. All
//! operations report storage errors without failing the process —
//! an unreadable store just means "re-authenticate".

use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Persists the portal session cookie on durable storage
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the credential, overwriting any prior value
    pub fn save(&self, credential: &str) {
        match std::fs::write(&self.path, credential) {
            Ok(()) => info!("Session cookie saved"),
            Err(e) => error!(error = %e, path = %self.path.display(), "Failed to save session cookie"),
        }
    }

    /// Read the stored credential; absent or unreadable both yield `None`
    pub fn load(&self) -> Option<String> {
        if !self.path.exists() {
            return None;
        }
        match std::fs::read_to_string(&self.path) {
            Ok(content) => {
                let credential = content.trim().to_string();
                if credential.is_empty() {
                    None
                } else {
                    Some(credential)
                }
            }
            Err(e) => {
                error!(error = %e, path = %self.path.display(), "Failed to read session cookie");
                None
            }
        }
    }

    /// Remove the stored credential; no-op when absent. Called whenever
    /// downstream code proves the session invalid.
    pub fn clear(&self) {
        if !self.path.exists() {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => info!("Session cookie cleared"),
            Err(e) => error!(error = %e, path = %self.path.display(), "Failed to clear session cookie"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> SessionStore {
        SessionStore::new(dir.path().join("cookies.txt"))
    }

    #[test]
    fn save_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        assert_eq!(store.load(), None);

        store.save("MoodleSession=abc123; portal_token=xyz");
        assert_eq!(
            store.load(),
            Some("MoodleSession=abc123; portal_token=xyz".to_string())
        );
    }

    #[test]
    fn save_overwrites_prior_value() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.save("old=1");
        store.save("new=2");
        assert_eq!(store.load(), Some("new=2".to_string()));
    }

    #[test]
    fn clear_removes_credential_and_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.save("session=1");
        store.clear();
        assert_eq!(store.load(), None);
        // Second clear on an absent file is a no-op
        store.clear();
    }

    #[test]
    fn empty_file_counts_as_absent() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::write(store.path(), "  \n").unwrap();
        assert_eq!(store.load(), None);
    }
}
