//! Credential storage for the storefront API client.
//!
//! The access/refresh pair lives behind a [`CredentialMedium`] (a JSON file
//! by default) and is read synchronously on every request.

pub mod medium;
pub mod pair;
pub mod store;

pub use {
    medium::{CredentialMedium, FileMedium, MemoryMedium},
    pair::CredentialPair,
    store::{ACCESS_TOKEN_KEY, CredentialStore, REFRESH_TOKEN_KEY},
};
