//! Authenticated client for the storefront API.
//!
//! Requests go through [`ApiClient`], which stamps the stored access
//! credential on every call and, on a 401, refreshes it once through a
//! single shared exchange before replaying the call.

pub mod auth;
pub mod endpoints;
pub mod error;
pub mod pipeline;
pub mod refresh;
pub mod request;
pub mod session;
pub mod transport;

pub use {
    auth::{AuthError, GoogleIdentity, User},
    error::ApiError,
    pipeline::ApiClient,
    refresh::{RefreshCoordinator, RefreshedAccess, RenewalError},
    request::{ApiResponse, OutboundRequest},
    session::SessionContext,
    transport::{HttpTransport, Transport},
};
