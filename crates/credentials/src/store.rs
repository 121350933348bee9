use std::{
    path::PathBuf,
    sync::{Arc, PoisonError, RwLock},
};

use {anyhow::Result, tracing::debug};

use crate::{
    medium::{CredentialMedium, FileMedium, MemoryMedium},
    pair::CredentialPair,
};

pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

/// Current credential pair, backed by a persistence medium.
///
/// Both keys are always written or removed together under one lock, so a
/// reader sees either the old pair or the new one. A failed write leaves the
/// old pair in place. A lone access or refresh
/// value reads as no pair at all.
#[derive(Clone)]
pub struct CredentialStore {
    medium: Arc<dyn CredentialMedium>,
    gate: Arc<RwLock<()>>,
}

impl CredentialStore {
    pub fn new(medium: Arc<dyn CredentialMedium>) -> Self {
        Self {
            medium,
            gate: Arc::new(RwLock::new(())),
        }
    }

    /// Store backed by a JSON file at `path`.
    pub fn open_file(path: PathBuf) -> Self {
        Self::new(Arc::new(FileMedium::open(path)))
    }

    /// Store that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryMedium::new()))
    }

    pub fn read(&self) -> Option<CredentialPair> {
        let _guard = self.gate.read().unwrap_or_else(PoisonError::into_inner);
        let access = self.non_empty(ACCESS_TOKEN_KEY)?;
        let refresh = self.non_empty(REFRESH_TOKEN_KEY)?;
        Some(CredentialPair::new(access, refresh))
    }

    pub fn write(&self, pair: &CredentialPair) -> Result<()> {
        let _guard = self.gate.write().unwrap_or_else(PoisonError::into_inner);
        self.medium.set_all(&[
            (ACCESS_TOKEN_KEY, pair.access()),
            (REFRESH_TOKEN_KEY, pair.refresh()),
        ])?;
        debug!("stored credential pair");
        Ok(())
    }

    /// Remove both credentials. Both removals are attempted; the first error is returned.
    pub fn clear(&self) -> Result<()> {
        let _guard = self.gate.write().unwrap_or_else(PoisonError::into_inner);
        let access = self.medium.remove(ACCESS_TOKEN_KEY);
        let refresh = self.medium.remove(REFRESH_TOKEN_KEY);
        debug!("cleared credential pair");
        access.and(refresh)
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().is_some()
    }

    fn non_empty(&self, key: &str) -> Option<String> {
        self.medium.get(key).filter(|v| !v.is_empty())
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}
