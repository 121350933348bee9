//! Single-flight credential refresh.
//!
//! At most one renewal exchange is outstanding per session. The first caller
//! that needs a fresh access credential starts the exchange and parks it in a
//! shared slot; callers arriving while it runs await the same future. The
//! exchange empties the slot itself as its last step, before any waiter sees
//! the outcome, so the next need always starts a new exchange.

use std::{
    future::Future,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use {
    futures::future::{BoxFuture, FutureExt, Shared},
    secrecy::{Secret, SecretString},
    storefront_credentials::{CredentialPair, CredentialStore},
    tracing::{debug, info, warn},
};

use crate::error::ApiError;

/// Outcome shared by every waiter of one exchange: the new access credential,
/// or `None` when no credential could be obtained.
pub type RefreshedAccess = Option<Arc<SecretString>>;

type InFlight = Shared<BoxFuture<'static, RefreshedAccess>>;

/// Why a renewal exchange did not produce a credential.
#[derive(Debug, thiserror::Error)]
pub enum RenewalError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("renewal response carried no access credential")]
    MissingAccess,
}

#[derive(Default)]
pub struct RefreshCoordinator {
    slot: Arc<Mutex<Option<InFlight>>>,
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an exchange is currently outstanding.
    pub fn in_flight(&self) -> bool {
        lock(&self.slot).is_some()
    }

    /// Obtain a refreshed access credential, joining an outstanding exchange
    /// when there is one.
    ///
    /// `renew` is only invoked when this call starts the exchange. It receives
    /// the stored refresh credential and must yield the new access credential.
    /// With no stored pair, resolves to `None` without calling `renew`.
    pub async fn refresh<F, Fut>(&self, store: &CredentialStore, renew: F) -> RefreshedAccess
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<String, RenewalError>> + Send + 'static,
    {
        let in_flight = {
            let mut slot = lock(&self.slot);
            match slot.as_ref() {
                Some(existing) => {
                    debug!("joining in-flight credential refresh");
                    existing.clone()
                },
                None => {
                    let Some(pair) = store.read() else {
                        debug!("no refresh credential stored, skipping refresh");
                        return None;
                    };
                    debug!("starting credential refresh");
                    let exchange = renew(pair.refresh().to_string());
                    let fut = settle(Arc::clone(&self.slot), store.clone(), pair, exchange)
                        .boxed()
                        .shared();
                    *slot = Some(fut.clone());
                    fut
                },
            }
        };
        in_flight.await
    }
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

fn lock(slot: &Mutex<Option<InFlight>>) -> MutexGuard<'_, Option<InFlight>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Run the exchange, apply its outcome to the store, then free the slot.
async fn settle<Fut>(
    slot: Arc<Mutex<Option<InFlight>>>,
    store: CredentialStore,
    sent: CredentialPair,
    exchange: Fut,
) -> RefreshedAccess
where
    Fut: Future<Output = Result<String, RenewalError>>,
{
    let outcome = match exchange.await {
        Ok(access) => {
            // The renewal endpoint does not rotate refresh credentials, so the
            // one we sent stays valid.
            if let Err(e) = store.write(&sent.with_access(access.as_str())) {
                warn!(error = %e, "failed to persist refreshed credentials");
            }
            info!("access credential refreshed");
            #[cfg(feature = "metrics")]
            metrics::counter!("storefront_token_refresh_total", "outcome" => "success")
                .increment(1);
            Some(Arc::new(Secret::new(access)))
        },
        Err(e) => {
            warn!(error = %e, "credential refresh failed, signing out");
            if let Err(e) = store.clear() {
                warn!(error = %e, "failed to clear credentials");
            }
            #[cfg(feature = "metrics")]
            metrics::counter!("storefront_token_refresh_total", "outcome" => "failure")
                .increment(1);
            None
        },
    };
    lock(&slot).take();
    outcome
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use {
        bytes::Bytes,
        reqwest::{StatusCode, header::HeaderMap},
        secrecy::ExposeSecret,
        tokio::sync::oneshot,
    };

    use super::*;

    fn stored(access: &str, refresh: &str) -> CredentialStore {
        let store = CredentialStore::in_memory();
        store.write(&CredentialPair::new(access, refresh)).unwrap();
        store
    }

    #[tokio::test]
    async fn no_pair_means_no_exchange() {
        let coordinator = RefreshCoordinator::new();
        let calls = AtomicUsize::new(0);

        let out = coordinator
            .refresh(&CredentialStore::in_memory(), |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, RenewalError>("A2".to_string()) }
            })
            .await;

        assert!(out.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn success_writes_new_access_with_sent_refresh() {
        let coordinator = RefreshCoordinator::new();
        let store = stored("A1", "R1");

        let out = coordinator
            .refresh(&store, |refresh| async move {
                assert_eq!(refresh, "R1");
                Ok::<_, RenewalError>("A2".to_string())
            })
            .await;

        assert_eq!(out.unwrap().expose_secret(), "A2");
        let pair = store.read().unwrap();
        assert_eq!((pair.access(), pair.refresh()), ("A2", "R1"));
        assert!(!coordinator.in_flight());
    }

    #[tokio::test]
    async fn failure_clears_the_store() {
        let coordinator = RefreshCoordinator::new();
        let store = stored("A1", "R1");

        let out = coordinator
            .refresh(&store, |_| async {
                Err::<String, _>(RenewalError::Api(ApiError::Status {
                    status: StatusCode::UNAUTHORIZED,
                    headers: HeaderMap::new(),
                    body: Bytes::new(),
                }))
            })
            .await;

        assert!(out.is_none());
        assert!(store.read().is_none());
        assert!(!coordinator.in_flight());
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_exchange() {
        let coordinator = RefreshCoordinator::new();
        let store = stored("A1", "R1");
        let starts = AtomicUsize::new(0);
        let (tx, rx) = oneshot::channel::<()>();

        let first = coordinator.refresh(&store, |_| {
            starts.fetch_add(1, Ordering::SeqCst);
            async move {
                rx.await.unwrap();
                Ok::<_, RenewalError>("A2".to_string())
            }
        });
        let second = coordinator.refresh(&store, |_| {
            starts.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, RenewalError>("A-unexpected".to_string()) }
        });
        let release = async {
            while !coordinator.in_flight() {
                tokio::task::yield_now().await;
            }
            tx.send(()).unwrap();
        };

        let (a, b, ()) = tokio::join!(first, second, release);

        assert_eq!(starts.load(Ordering::SeqCst), 1);
        assert_eq!(a.unwrap().expose_secret(), "A2");
        assert_eq!(b.unwrap().expose_secret(), "A2");
        assert!(!coordinator.in_flight());
    }

    #[tokio::test]
    async fn settled_exchange_is_not_reused() {
        let coordinator = RefreshCoordinator::new();
        let store = stored("A1", "R1");

        let first = coordinator
            .refresh(&store, |_| async { Ok::<_, RenewalError>("A2".to_string()) })
            .await;
        let second = coordinator
            .refresh(&store, |_| async { Ok::<_, RenewalError>("A3".to_string()) })
            .await;

        assert_eq!(first.unwrap().expose_secret(), "A2");
        assert_eq!(second.unwrap().expose_secret(), "A3");
        assert_eq!(store.read().unwrap().access(), "A3");
    }
}
