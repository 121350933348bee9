use secrecy::{ExposeSecret, Secret, SecretString};

/// The access/refresh credential pair issued by the API.
///
/// Values are held as secrets so they never show up in `Debug` output or logs.
#[derive(Debug)]
pub struct CredentialPair {
    access: SecretString,
    refresh: SecretString,
}

impl CredentialPair {
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access: Secret::new(access.into()),
            refresh: Secret::new(refresh.into()),
        }
    }

    /// Short-lived credential presented on every protected request.
    pub fn access(&self) -> &str {
        self.access.expose_secret()
    }

    /// Long-lived credential presented only to the renewal endpoint.
    pub fn refresh(&self) -> &str {
        self.refresh.expose_secret()
    }

    /// A pair carrying a renewed access credential and this pair's refresh credential.
    pub fn with_access(&self, access: impl Into<String>) -> Self {
        Self::new(access, self.refresh())
    }
}

impl Clone for CredentialPair {
    fn clone(&self) -> Self {
        Self::new(self.access(), self.refresh())
    }
}
