//! The authenticated request pipeline.
//!
//! Every request runs through [`ApiClient::authorize`] before it is sent.
//! A 401 answer goes to [`ApiClient::recover`], which refreshes the access
//! credential once (shared with any concurrent failures) and replays the
//! request through the whole pipeline again.

use std::sync::Arc;

use {
    futures::future::{BoxFuture, FutureExt},
    reqwest::Method,
    secrecy::ExposeSecret,
    serde::{Serialize, de::DeserializeOwned},
    storefront_config::StorefrontConfig,
    storefront_credentials::CredentialStore,
    tracing::debug,
};

use crate::{
    endpoints,
    error::ApiError,
    refresh::RenewalError,
    request::{ApiResponse, OutboundRequest},
    session::SessionContext,
    transport::{HttpTransport, Transport},
};

/// Client for the storefront API that keeps its session authenticated.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    session: Arc<SessionContext>,
    refresh_path: String,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn Transport>, session: Arc<SessionContext>) -> Self {
        Self {
            transport,
            session,
            refresh_path: endpoints::TOKEN_REFRESH.to_string(),
        }
    }

    /// Override the renewal endpoint path.
    pub fn with_refresh_path(mut self, path: impl Into<String>) -> Self {
        self.refresh_path = path.into();
        self
    }

    /// HTTP transport and file-backed credentials as described by `config`.
    pub fn from_config(config: &StorefrontConfig) -> Result<Self, ApiError> {
        let transport = HttpTransport::from_config(&config.api)?;
        let store = CredentialStore::open_file(storefront_config::credentials_path(config));
        Ok(
            Self::new(Arc::new(transport), Arc::new(SessionContext::new(store)))
                .with_refresh_path(config.api.refresh_path.clone()),
        )
    }

    pub fn session(&self) -> &Arc<SessionContext> {
        &self.session
    }

    pub fn store(&self) -> &CredentialStore {
        self.session.store()
    }

    /// Pre-send hook: stamp the stored access credential onto `request`.
    ///
    /// Without a stored pair the headers are left exactly as they are.
    pub fn authorize(&self, request: &mut OutboundRequest) {
        if let Some(pair) = self.store().read() {
            request.set_bearer(pair.access());
        }
    }

    /// Post-failure hook.
    ///
    /// Returns `failure` unchanged unless it is a 401 for a request that has
    /// not been retried yet and a refreshed credential can be obtained; in
    /// that case the request is replayed and its outcome returned instead.
    pub async fn recover(
        &self,
        failure: ApiError,
        request: Option<OutboundRequest>,
    ) -> Result<ApiResponse, ApiError> {
        if !failure.is_unauthorized() {
            return Err(failure);
        }
        let Some(mut request) = request else {
            debug!("unauthorized response without request context");
            return Err(failure);
        };
        if request.retried() {
            debug!(path = %request.path(), "unauthorized after replay, giving up");
            return Err(failure);
        }
        request.mark_retried();

        let refreshed = self
            .session
            .refresh()
            .refresh(self.store(), |refresh| self.renewal(refresh))
            .await;
        let Some(access) = refreshed else {
            return Err(failure);
        };

        request.set_bearer(access.expose_secret());
        debug!(method = %request.method(), path = %request.path(), "replaying request");
        #[cfg(feature = "metrics")]
        metrics::counter!("storefront_request_replays_total").increment(1);
        self.execute(request).await
    }

    /// Send `request` through the full pipeline.
    pub fn execute(
        &self,
        request: OutboundRequest,
    ) -> BoxFuture<'_, Result<ApiResponse, ApiError>> {
        async move {
            let mut request = request;
            self.authorize(&mut request);
            match self.transport.send(&request).await {
                Ok(response) => Ok(response),
                Err(failure) => self.recover(failure, Some(request)).await,
            }
        }
        .boxed()
    }

    /// Send `request` straight to the transport, bypassing both hooks.
    pub async fn send_raw(&self, request: &OutboundRequest) -> Result<ApiResponse, ApiError> {
        self.transport.send(request).await
    }

    pub async fn get(&self, path: &str) -> Result<ApiResponse, ApiError> {
        self.execute(OutboundRequest::get(path)).await
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.get(path).await?.json()
    }

    pub async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiResponse, ApiError> {
        self.execute(OutboundRequest::post(path).json(body)?).await
    }

    pub async fn put<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiResponse, ApiError> {
        self.execute(OutboundRequest::new(Method::PUT, path).json(body)?)
            .await
    }

    pub async fn patch<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiResponse, ApiError> {
        self.execute(OutboundRequest::new(Method::PATCH, path).json(body)?)
            .await
    }

    pub async fn delete(&self, path: &str) -> Result<ApiResponse, ApiError> {
        self.execute(OutboundRequest::new(Method::DELETE, path))
            .await
    }

    /// One exchange with the renewal endpoint. Sent raw: the renewal call
    /// carries no access credential and is never itself recovered.
    fn renewal(&self, refresh: String) -> BoxFuture<'static, Result<String, RenewalError>> {
        let transport = Arc::clone(&self.transport);
        let request = OutboundRequest::post(self.refresh_path.as_str())
            .with_body(serde_json::json!({ "refresh": refresh }));
        async move {
            let response = transport.send(&request).await?;
            let body: serde_json::Value = response.json()?;
            body.get("access")
                .and_then(serde_json::Value::as_str)
                .filter(|access| !access.is_empty())
                .map(str::to_owned)
                .ok_or(RenewalError::MissingAccess)
        }
        .boxed()
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("session", &self.session)
            .field("refresh_path", &self.refresh_path)
            .finish_non_exhaustive()
    }
}
