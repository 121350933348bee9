//! Key/value persistence media for credentials.
//!
//! A medium offers per-key get/set/remove and no multi-key transaction; the
//! pair invariant is maintained one level up, in [`crate::CredentialStore`].

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{PoisonError, RwLock},
};

use {
    anyhow::Result,
    tracing::{debug, warn},
};

/// Durable key/value storage. `get` must be cheap: it runs on every request.
pub trait CredentialMedium: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;

    /// Set several keys as one unit: on error, none of them changed.
    ///
    /// The default sets keys one by one and restores the earlier values if a
    /// later set fails. Media that can write everything at once override it.
    fn set_all(&self, entries: &[(&str, &str)]) -> Result<()> {
        let mut written: Vec<(&str, Option<String>)> = Vec::with_capacity(entries.len());
        for &(key, value) in entries {
            let previous = self.get(key);
            if let Err(e) = self.set(key, value) {
                for (key, previous) in written.into_iter().rev() {
                    let restored = match previous {
                        Some(v) => self.set(key, &v),
                        None => self.remove(key),
                    };
                    if let Err(e) = restored {
                        warn!(key, error = %e, "failed to restore credential");
                    }
                }
                return Err(e);
            }
            written.push((key, previous));
        }
        Ok(())
    }
}

/// In-process medium. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryMedium {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryMedium {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialMedium for MemoryMedium {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

/// JSON file medium, e.g. `~/.config/storefront/credentials.json`.
///
/// The file is read once at open and cached; reads never touch the disk.
/// Every mutation rewrites the whole file with mode `0600` on Unix, and the
/// cache only changes once that write succeeded.
#[derive(Debug)]
pub struct FileMedium {
    path: PathBuf,
    cache: RwLock<HashMap<String, String>>,
}

impl FileMedium {
    /// Open the medium at `path`. A missing or corrupt file reads as empty.
    pub fn open(path: PathBuf) -> Self {
        let cache = match std::fs::read_to_string(&path) {
            Ok(data) => serde_json::from_str(&data).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "ignoring unreadable credentials file");
                HashMap::new()
            }),
            Err(_) => HashMap::new(),
        };
        debug!(path = %path.display(), keys = cache.len(), "opened credentials file");
        Self {
            path,
            cache: RwLock::new(cache),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, values: &HashMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let data = serde_json::to_string_pretty(values)?;
        std::fs::write(&self.path, data)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }
}

impl CredentialMedium for FileMedium {
    fn get(&self, key: &str) -> Option<String> {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.set_all(&[(key, value)])
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        if !cache.contains_key(key) {
            return Ok(());
        }
        let mut next = cache.clone();
        next.remove(key);
        self.persist(&next)?;
        *cache = next;
        Ok(())
    }

    fn set_all(&self, entries: &[(&str, &str)]) -> Result<()> {
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = cache.clone();
        for &(key, value) in entries {
            next.insert(key.to_string(), value.to_string());
        }
        self.persist(&next)?;
        *cache = next;
        Ok(())
    }
}
