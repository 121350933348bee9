use storefront_credentials::CredentialStore;

use crate::refresh::RefreshCoordinator;

/// Mutable state of one signed-in session: the stored credentials and the
/// outstanding-refresh slot.
///
/// Each [`crate::ApiClient`] is handed its context explicitly, so two
/// contexts never share credentials or refresh exchanges.
#[derive(Debug)]
pub struct SessionContext {
    store: CredentialStore,
    refresh: RefreshCoordinator,
}

impl SessionContext {
    pub fn new(store: CredentialStore) -> Self {
        Self {
            store,
            refresh: RefreshCoordinator::new(),
        }
    }

    /// Session whose credentials live only in memory.
    pub fn ephemeral() -> Self {
        Self::new(CredentialStore::in_memory())
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    pub fn refresh(&self) -> &RefreshCoordinator {
        &self.refresh
    }

    pub fn is_authenticated(&self) -> bool {
        self.store.is_authenticated()
    }
}
