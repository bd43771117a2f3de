//! Single-flight access token refresh.
//!
//! When several requests fail authentication at once, only the first one
//! calls the refresh endpoint. Everyone else queues behind it and receives
//! the same outcome when that one call settles.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::future::BoxFuture;
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use super::{Credential, SessionStore};

/// Upper bound on a single refresh call.
pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RefreshError {
    #[error("refresh rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("refresh request failed: {0}")]
    Transport(String),

    #[error("refresh response did not contain an access token")]
    MissingToken,

    #[error("refresh timed out after {0:?}")]
    TimedOut(Duration),

    #[error("refresh was abandoned before it completed")]
    Abandoned,
}

/// Exchanges the long-lived session cookie for a new access token.
pub trait TokenRefresher: Send + Sync {
    fn refresh(&self) -> BoxFuture<'_, Result<Credential, RefreshError>>;
}

/// Host hook invoked once per unrecoverable refresh failure, after the
/// session store has been cleared. A front end uses it to send the user
/// back to login.
pub trait SessionExpiredHandler: Send + Sync {
    fn session_expired(&self, reason: &RefreshError);
}

impl<F> SessionExpiredHandler for F
where
    F: Fn(&RefreshError) + Send + Sync,
{
    fn session_expired(&self, reason: &RefreshError) {
        self(reason)
    }
}

type RefreshOutcome = Result<Credential, RefreshError>;
type Waiter = oneshot::Sender<RefreshOutcome>;

#[derive(Default)]
struct RefreshState {
    in_progress: bool,
    waiters: VecDeque<Waiter>,
}

enum Role {
    Leader,
    Queued(oneshot::Receiver<RefreshOutcome>),
}

pub struct RefreshCoordinator {
    refresher: Arc<dyn TokenRefresher>,
    session: Arc<dyn SessionStore>,
    on_expired: Arc<dyn SessionExpiredHandler>,
    timeout: Duration,
    state: Mutex<RefreshState>,
}

impl RefreshCoordinator {
    pub fn new(
        refresher: Arc<dyn TokenRefresher>,
        session: Arc<dyn SessionStore>,
        on_expired: Arc<dyn SessionExpiredHandler>,
    ) -> Self {
        Self {
            refresher,
            session,
            on_expired,
            timeout: DEFAULT_REFRESH_TIMEOUT,
            state: Mutex::new(RefreshState::default()),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn is_refreshing(&self) -> bool {
        self.lock_state().in_progress
    }

    /// Number of callers queued behind the in-flight refresh.
    pub fn pending_waiters(&self) -> usize {
        self.lock_state().waiters.len()
    }

    /// Obtain a fresh access credential, joining an in-flight refresh if
    /// there is one.
    ///
    /// On failure the session store has already been cleared and the
    /// session-expired handler notified.
    pub async fn obtain_fresh_credential(&self) -> Result<Credential, RefreshError> {
        // Check-and-set under one lock so two concurrent 401s cannot both lead.
        let role = {
            let mut state = self.lock_state();
            if state.in_progress {
                let (tx, rx) = oneshot::channel();
                state.waiters.push_back(tx);
                Role::Queued(rx)
            } else {
                state.in_progress = true;
                Role::Leader
            }
        };

        match role {
            Role::Queued(rx) => {
                debug!("Refresh already in flight, waiting for its outcome");
                rx.await.unwrap_or(Err(RefreshError::Abandoned))
            }
            Role::Leader => self.lead_refresh().await,
        }
    }

    async fn lead_refresh(&self) -> RefreshOutcome {
        let mut cycle = RefreshCycle {
            coordinator: self,
            settled: false,
        };

        info!("Refreshing access token");
        let outcome = match tokio::time::timeout(self.timeout, self.refresher.refresh()).await {
            Ok(outcome) => outcome,
            Err(_) => Err(RefreshError::TimedOut(self.timeout)),
        };

        match &outcome {
            Ok(credential) => {
                if let Err(e) = self.session.set(credential.clone()) {
                    warn!(error = %e, "Failed to persist refreshed access token");
                }
            }
            Err(reason) => {
                error!(error = %reason, "Access token refresh failed, ending session");
                if let Err(e) = self.session.clear() {
                    warn!(error = %e, "Failed to clear session");
                }
            }
        }

        let waiters = cycle.settle();
        if let Err(reason) = &outcome {
            self.on_expired.session_expired(reason);
        }
        debug!(
            waiters = waiters.len(),
            success = outcome.is_ok(),
            "Refresh settled"
        );
        for waiter in waiters {
            // A waiter whose caller went away has dropped its receiver.
            let _ = waiter.send(outcome.clone());
        }

        outcome
    }

    fn lock_state(&self) -> MutexGuard<'_, RefreshState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Ties the in-progress flag to the leader's future. If that future is
/// dropped before the refresh settles, the flag is cleared and the queue
/// rejected so later callers are not stuck behind it.
struct RefreshCycle<'a> {
    coordinator: &'a RefreshCoordinator,
    settled: bool,
}

impl RefreshCycle<'_> {
    fn settle(&mut self) -> VecDeque<Waiter> {
        self.settled = true;
        let mut state = self.coordinator.lock_state();
        state.in_progress = false;
        std::mem::take(&mut state.waiters)
    }
}

impl Drop for RefreshCycle<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        warn!("Access token refresh abandoned before completion");
        for waiter in self.settle() {
            let _ = waiter.send(Err(RefreshError::Abandoned));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemorySessionStore;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    struct GatedRefresher {
        calls: AtomicUsize,
        release: Notify,
        outcome: RefreshOutcome,
    }

    impl GatedRefresher {
        fn new(outcome: RefreshOutcome) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                release: Notify::new(),
                outcome,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl TokenRefresher for GatedRefresher {
        fn refresh(&self) -> BoxFuture<'_, RefreshOutcome> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                self.release.notified().await;
                self.outcome.clone()
            })
        }
    }

    #[derive(Default)]
    struct ExpiryCounter(AtomicUsize);

    impl SessionExpiredHandler for ExpiryCounter {
        fn session_expired(&self, _reason: &RefreshError) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn coordinator(
        refresher: Arc<GatedRefresher>,
        session: Arc<MemorySessionStore>,
        expired: Arc<ExpiryCounter>,
    ) -> Arc<RefreshCoordinator> {
        Arc::new(RefreshCoordinator::new(refresher, session, expired))
    }

    async fn wait_for_waiters(coordinator: &RefreshCoordinator, count: usize) {
        while coordinator.pending_waiters() < count {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_refresh() {
        let refresher = GatedRefresher::new(Ok(Credential::new("T2")));
        let session = Arc::new(MemorySessionStore::with_credential(Credential::new("T1")));
        let expired = Arc::new(ExpiryCounter::default());
        let coordinator = coordinator(refresher.clone(), session.clone(), expired.clone());

        let handles: Vec<_> = (0..3)
            .map(|_| {
                let c = coordinator.clone();
                tokio::spawn(async move { c.obtain_fresh_credential().await })
            })
            .collect();

        wait_for_waiters(&coordinator, 2).await;
        assert!(coordinator.is_refreshing());
        refresher.release.notify_one();

        for handle in handles {
            assert_eq!(handle.await.unwrap(), Ok(Credential::new("T2")));
        }
        assert_eq!(refresher.calls(), 1);
        assert_eq!(session.get(), Some(Credential::new("T2")));
        assert_eq!(expired.0.load(Ordering::SeqCst), 0);
        assert!(!coordinator.is_refreshing());
    }

    #[tokio::test]
    async fn test_failed_refresh_rejects_all_and_clears_session() {
        let rejection = RefreshError::Rejected {
            status: 403,
            message: "Refresh token expired".to_string(),
        };
        let refresher = GatedRefresher::new(Err(rejection.clone()));
        let session = Arc::new(MemorySessionStore::with_credential(Credential::new("T1")));
        session.set_display_name(Some("teller".to_string())).unwrap();
        let expired = Arc::new(ExpiryCounter::default());
        let coordinator = coordinator(refresher.clone(), session.clone(), expired.clone());

        let handles: Vec<_> = (0..3)
            .map(|_| {
                let c = coordinator.clone();
                tokio::spawn(async move { c.obtain_fresh_credential().await })
            })
            .collect();

        wait_for_waiters(&coordinator, 2).await;
        refresher.release.notify_one();

        for handle in handles {
            assert_eq!(handle.await.unwrap(), Err(rejection.clone()));
        }
        assert_eq!(refresher.calls(), 1);
        assert!(session.get().is_none());
        assert!(session.display_name().is_none());
        assert_eq!(expired.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_next_cycle_starts_after_settle() {
        let refresher = GatedRefresher::new(Ok(Credential::new("T2")));
        let session = Arc::new(MemorySessionStore::new());
        let coordinator = coordinator(
            refresher.clone(),
            session,
            Arc::new(ExpiryCounter::default()),
        );

        refresher.release.notify_one();
        assert!(coordinator.obtain_fresh_credential().await.is_ok());
        refresher.release.notify_one();
        assert!(coordinator.obtain_fresh_credential().await.is_ok());

        assert_eq!(refresher.calls(), 2);
    }

    #[tokio::test]
    async fn test_hung_refresh_times_out() {
        let refresher = GatedRefresher::new(Ok(Credential::new("never")));
        let session = Arc::new(MemorySessionStore::with_credential(Credential::new("T1")));
        let expired = Arc::new(ExpiryCounter::default());
        let coordinator = RefreshCoordinator::new(refresher, session.clone(), expired.clone())
            .with_timeout(Duration::from_millis(50));

        let outcome = coordinator.obtain_fresh_credential().await;

        assert_eq!(
            outcome,
            Err(RefreshError::TimedOut(Duration::from_millis(50)))
        );
        assert!(session.get().is_none());
        assert_eq!(expired.0.load(Ordering::SeqCst), 1);
        assert!(!coordinator.is_refreshing());
    }

    #[tokio::test]
    async fn test_dropped_leader_unwedges_coordinator() {
        let refresher = GatedRefresher::new(Ok(Credential::new("T2")));
        let session = Arc::new(MemorySessionStore::with_credential(Credential::new("T1")));
        let coordinator = coordinator(
            refresher.clone(),
            session.clone(),
            Arc::new(ExpiryCounter::default()),
        );

        let leader = {
            let c = coordinator.clone();
            tokio::spawn(async move { c.obtain_fresh_credential().await })
        };
        while !coordinator.is_refreshing() {
            tokio::task::yield_now().await;
        }
        let queued = {
            let c = coordinator.clone();
            tokio::spawn(async move { c.obtain_fresh_credential().await })
        };
        wait_for_waiters(&coordinator, 1).await;

        leader.abort();

        assert_eq!(queued.await.unwrap(), Err(RefreshError::Abandoned));
        assert!(!coordinator.is_refreshing());
        // An abandoned refresh is not a verdict on the session.
        assert_eq!(session.get(), Some(Credential::new("T1")));

        refresher.release.notify_one();
        assert_eq!(
            coordinator.obtain_fresh_credential().await,
            Ok(Credential::new("T2"))
        );
    }
}
