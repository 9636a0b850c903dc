//! Single-flight token refresh.
//!
//! # States
//! - Idle: no refresh in flight
//! - Refreshing: one refresh call in flight, later callers queued
//!
//! # State Transitions
//! ```text
//! Idle → Refreshing: first caller after a 401; spawns the refresh
//! Refreshing → Refreshing: further callers enqueue a waiter
//! Refreshing → Idle (ok): token stored, waiters resolved in FIFO order
//! Refreshing → Idle (err): credentials cleared, re-auth hook fired,
//!                          waiters rejected in FIFO order
//! ```
//!
//! The waiter queue is only non-empty while refreshing. It is taken and the
//! state reset to Idle under the same lock, so a new refresh can only start
//! after the previous one has been fully drained.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tokio::sync::oneshot;

use crate::auth::credentials::CredentialStore;
use crate::auth::refresher::{ReauthHandler, TokenRefresher};
use crate::errors::ApiError;
use crate::observability::metrics;

/// Why a caller did not get a new credential.
#[derive(Debug, Clone, Error)]
pub enum RefreshError {
    #[error("Token refresh failed: {0}")]
    Failed(ApiError),

    #[error("Token refresh ended without a result")]
    Abandoned,
}

pub type RefreshResult = Result<String, RefreshError>;

#[derive(Debug)]
enum RefreshState {
    Idle,
    Refreshing { waiters: VecDeque<oneshot::Sender<RefreshResult>> },
}

struct Inner {
    state: Mutex<RefreshState>,
    refresher: Arc<dyn TokenRefresher>,
    credentials: Arc<dyn CredentialStore>,
    reauth: Arc<dyn ReauthHandler>,
    login_path: String,
    refresh_calls: AtomicU64,
}

/// Ensures at most one refresh call is in flight per burst of 401s.
#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<Inner>,
}

impl RefreshCoordinator {
    pub fn new(
        refresher: Arc<dyn TokenRefresher>,
        credentials: Arc<dyn CredentialStore>,
        reauth: Arc<dyn ReauthHandler>,
        login_path: impl Into<String>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(RefreshState::Idle),
                refresher,
                credentials,
                reauth,
                login_path: login_path.into(),
                refresh_calls: AtomicU64::new(0),
            }),
        }
    }

    /// Obtain a fresh credential, joining the in-flight refresh if there is one.
    ///
    /// Resolves only once the refresh this caller waits on has settled.
    pub async fn refresh(&self) -> RefreshResult {
        let (tx, rx) = oneshot::channel();
        let start = {
            let mut state = self.inner.lock();
            match &mut *state {
                RefreshState::Refreshing { waiters } => {
                    waiters.push_back(tx);
                    tracing::debug!(queued = waiters.len(), "Joined in-flight token refresh");
                    false
                }
                RefreshState::Idle => {
                    *state = RefreshState::Refreshing {
                        waiters: VecDeque::from([tx]),
                    };
                    true
                }
            }
        };

        if start {
            // Runs detached so a cancelled caller cannot strand the other waiters.
            let inner = self.inner.clone();
            tokio::spawn(async move { inner.run().await });
        }

        rx.await.unwrap_or(Err(RefreshError::Abandoned))
    }

    pub fn is_refreshing(&self) -> bool {
        matches!(*self.inner.lock(), RefreshState::Refreshing { .. })
    }

    /// Callers currently queued on the in-flight refresh.
    pub fn pending(&self) -> usize {
        match &*self.inner.lock() {
            RefreshState::Refreshing { waiters } => waiters.len(),
            RefreshState::Idle => 0,
        }
    }

    /// Number of refresh calls issued so far.
    pub fn refresh_calls(&self) -> u64 {
        self.inner.refresh_calls.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("login_path", &self.inner.login_path)
            .field("refreshing", &self.is_refreshing())
            .field("refresh_calls", &self.refresh_calls())
            .finish()
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, RefreshState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn run(&self) {
        let mut guard = SettleGuard { inner: self, armed: true };

        self.refresh_calls.fetch_add(1, Ordering::Relaxed);
        tracing::info!("Refreshing access token");
        let current = self.credentials.get_token();

        let result = match self.refresher.refresh(current).await {
            Ok(token) => {
                self.credentials.set_token(token.clone());
                metrics::record_token_refresh("success");
                tracing::info!("Access token refreshed");
                Ok(token)
            }
            Err(err) => {
                tracing::warn!(error = %err, "Token refresh failed, clearing session");
                self.credentials.clear();
                metrics::record_token_refresh("failure");
                self.reauth.reauthenticate(&self.login_path);
                Err(RefreshError::Failed(err))
            }
        };

        guard.armed = false;
        self.settle(result);
    }

    /// Reset to Idle and hand `result` to every waiter, oldest first.
    fn settle(&self, result: RefreshResult) {
        let waiters = match std::mem::replace(&mut *self.lock(), RefreshState::Idle) {
            RefreshState::Refreshing { waiters } => waiters,
            RefreshState::Idle => VecDeque::new(),
        };
        tracing::debug!(waiters = waiters.len(), ok = result.is_ok(), "Draining refresh waiters");
        for waiter in waiters {
            // A dropped receiver means that caller went away.
            let _ = waiter.send(result.clone());
        }
    }
}

/// Rejects waiters if the refresh task unwinds before settling.
struct SettleGuard<'a> {
    inner: &'a Inner,
    armed: bool,
}

impl Drop for SettleGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            tracing::error!("Token refresh task aborted before settling");
            metrics::record_token_refresh("abandoned");
            self.inner.settle(Err(RefreshError::Abandoned));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::credentials::MemoryCredentialStore;
    use crate::errors::ApiResult;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio::sync::Notify;

    /// Refresher that blocks until released and counts its calls.
    struct GatedRefresher {
        gate: Notify,
        calls: AtomicUsize,
        outcome: ApiResult<String>,
    }

    impl GatedRefresher {
        fn new(outcome: ApiResult<String>) -> Arc<Self> {
            Arc::new(Self {
                gate: Notify::new(),
                calls: AtomicUsize::new(0),
                outcome,
            })
        }
    }

    #[async_trait]
    impl TokenRefresher for GatedRefresher {
        async fn refresh(&self, _current: Option<String>) -> ApiResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.gate.notified().await;
            self.outcome.clone()
        }
    }

    struct PanickingRefresher;

    #[async_trait]
    impl TokenRefresher for PanickingRefresher {
        async fn refresh(&self, _current: Option<String>) -> ApiResult<String> {
            panic!("refresh blew up");
        }
    }

    fn coordinator(
        refresher: Arc<dyn TokenRefresher>,
    ) -> (RefreshCoordinator, Arc<MemoryCredentialStore>, Arc<Mutex<Vec<String>>>) {
        let store = Arc::new(MemoryCredentialStore::with_token("stale"));
        let reauths = Arc::new(Mutex::new(Vec::new()));
        let sink = reauths.clone();
        let reauth = move |path: &str| sink.lock().unwrap().push(path.to_string());
        let coordinator = RefreshCoordinator::new(refresher, store.clone(), Arc::new(reauth), "/login");
        (coordinator, store, reauths)
    }

    async fn wait_for_pending(coordinator: &RefreshCoordinator, n: usize) {
        for _ in 0..200 {
            if coordinator.pending() == n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("expected {} pending waiters, saw {}", n, coordinator.pending());
    }

    #[tokio::test]
    async fn test_single_flight_success() {
        let refresher = GatedRefresher::new(Ok("fresh".into()));
        let (coordinator, store, reauths) = coordinator(refresher.clone());

        let handles: Vec<_> = (0..5)
            .map(|_| {
                let c = coordinator.clone();
                tokio::spawn(async move { c.refresh().await })
            })
            .collect();

        wait_for_pending(&coordinator, 5).await;
        assert!(coordinator.is_refreshing());
        assert!(handles.iter().all(|h| !h.is_finished()));

        refresher.gate.notify_one();
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), "fresh");
        }

        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(coordinator.refresh_calls(), 1);
        assert_eq!(store.get_token().as_deref(), Some("fresh"));
        assert!(!coordinator.is_refreshing());
        assert_eq!(coordinator.pending(), 0);
        assert!(reauths.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failure_rejects_all_and_clears_session() {
        let refresher = GatedRefresher::new(Err(ApiError::from_response(401, None)));
        let (coordinator, store, reauths) = coordinator(refresher.clone());

        let handles: Vec<_> = (0..5)
            .map(|_| {
                let c = coordinator.clone();
                tokio::spawn(async move { c.refresh().await })
            })
            .collect();

        wait_for_pending(&coordinator, 5).await;
        refresher.gate.notify_one();

        for handle in handles {
            let err = handle.await.unwrap().unwrap_err();
            assert!(matches!(err, RefreshError::Failed(_)));
        }
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.get_token(), None);
        assert_eq!(reauths.lock().unwrap().as_slice(), ["/login".to_string()]);
        assert!(!coordinator.is_refreshing());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_waiters_resolve_in_queue_order() {
        let refresher = GatedRefresher::new(Ok("fresh".into()));
        let (coordinator, _, _) = coordinator(refresher.clone());
        let order = Arc::new(Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for i in 0..6 {
            let c = coordinator.clone();
            let order = order.clone();
            handles.push(tokio::spawn(async move {
                let result = c.refresh().await;
                order.lock().unwrap().push(i);
                result
            }));
            wait_for_pending(&coordinator, i + 1).await;
        }

        refresher.gate.notify_one();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_new_refresh_after_settle() {
        let refresher = GatedRefresher::new(Ok("fresh".into()));
        let (coordinator, _, _) = coordinator(refresher.clone());

        for round in 1..=2 {
            let c = coordinator.clone();
            let handle = tokio::spawn(async move { c.refresh().await });
            wait_for_pending(&coordinator, 1).await;
            refresher.gate.notify_one();
            handle.await.unwrap().unwrap();
            assert_eq!(refresher.calls.load(Ordering::SeqCst), round);
        }
    }

    #[tokio::test]
    async fn test_panicking_refresh_is_abandoned() {
        let (coordinator, _, _) = coordinator(Arc::new(PanickingRefresher));

        let err = coordinator.refresh().await.unwrap_err();
        assert!(matches!(err, RefreshError::Abandoned));
        assert!(!coordinator.is_refreshing());
    }
}
