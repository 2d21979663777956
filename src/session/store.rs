//! In-memory session store with expiry sweeping.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::broadcast;
use tokio::time;
use uuid::Uuid;

use crate::config::LoginPolicy;
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::session::{SessionError, SessionManager};

/// How often expired sessions are swept.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
struct SessionEntry {
    value: Value,
    ttl: Duration,
    expires_at: Instant,
}

impl SessionEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at <= now
    }
}

/// Thread-safe session map shared by request handlers and the sweeper.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<DashMap<String, SessionEntry>>,
    default_ttl_secs: Arc<AtomicU64>,
    sweep_interval: Duration,
    sweeper: Arc<Mutex<Option<Shutdown>>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(SWEEP_INTERVAL)
    }
}

impl SessionStore {
    pub fn new(sweep_interval: Duration) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            default_ttl_secs: Arc::new(AtomicU64::new(LoginPolicy::default().session_timeout * 60)),
            sweep_interval,
            sweeper: Arc::new(Mutex::new(None)),
        }
    }

    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs.load(Ordering::Relaxed))
    }

    /// Store `value` under a fresh id with the default expiry.
    pub fn create(&self, value: Value) -> String {
        let id = Uuid::new_v4().simple().to_string();
        self.set(&id, value, None);
        id
    }

    /// Insert or replace a session. `ttl` of `None` uses the default.
    pub fn set(&self, id: &str, value: Value, ttl: Option<Duration>) {
        let ttl = ttl.unwrap_or_else(|| self.default_ttl());
        self.inner.insert(
            id.to_string(),
            SessionEntry {
                value,
                ttl,
                expires_at: Instant::now() + ttl,
            },
        );
        metrics::record_sessions(self.inner.len());
    }

    /// Read a live session and push its expiry forward.
    pub fn get(&self, id: &str) -> Option<Value> {
        let now = Instant::now();
        let mut entry = self.inner.get_mut(id)?;
        if entry.is_expired(now) {
            drop(entry);
            self.remove(id);
            return None;
        }
        entry.expires_at = now + entry.ttl;
        Some(entry.value.clone())
    }

    /// Remove and return a live session.
    pub fn take(&self, id: &str) -> Option<Value> {
        let (_, entry) = self.inner.remove(id)?;
        metrics::record_sessions(self.inner.len());
        (!entry.is_expired(Instant::now())).then_some(entry.value)
    }

    pub fn remove(&self, id: &str) {
        if self.inner.remove(id).is_some() {
            metrics::record_sessions(self.inner.len());
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Drop expired sessions, returning how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.inner.len();
        self.inner.retain(|_, entry| !entry.is_expired(now));
        let removed = before.saturating_sub(self.inner.len());
        if removed > 0 {
            tracing::debug!(removed, remaining = self.inner.len(), "Expired sessions removed");
        }
        metrics::record_sessions(self.inner.len());
        removed
    }

    pub fn is_running(&self) -> bool {
        self.sweeper.lock().map(|s| s.is_some()).unwrap_or(false)
    }

    async fn run_sweeper(self, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker = time::interval(self.sweep_interval);
        // First tick fires immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep_expired();
                }
                _ = shutdown.recv() => {
                    tracing::debug!("Session sweeper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

impl SessionManager for SessionStore {
    fn init(&self, policy: &LoginPolicy) -> Result<(), SessionError> {
        if policy.session_timeout == 0 {
            return Err(SessionError::ZeroTimeout);
        }
        if self.is_running() {
            return Err(SessionError::AlreadyRunning);
        }
        self.default_ttl_secs
            .store(policy.session_timeout * 60, Ordering::Relaxed);
        tracing::debug!(
            session_timeout_mins = policy.session_timeout,
            "Session manager initialized"
        );
        Ok(())
    }

    fn start(&self) {
        let Ok(mut sweeper) = self.sweeper.lock() else {
            tracing::error!("Session sweeper state poisoned, not starting");
            return;
        };
        if sweeper.is_some() {
            return;
        }

        let shutdown = Shutdown::new();
        let rx = shutdown.subscribe();
        tokio::spawn(self.clone().run_sweeper(rx));
        *sweeper = Some(shutdown);

        tracing::info!(interval = ?self.sweep_interval, "Session timeout manager started");
    }

    fn stop(&self) {
        let shutdown = match self.sweeper.lock() {
            Ok(mut sweeper) => sweeper.take(),
            Err(_) => None,
        };
        if let Some(shutdown) = shutdown {
            shutdown.trigger();
            tracing::info!("Session timeout manager stopped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_session_operations() {
        let store = SessionStore::default();
        let id = store.create(json!({"user": "admin"}));

        assert_eq!(store.get(&id), Some(json!({"user": "admin"})));
        assert_eq!(store.len(), 1);

        assert_eq!(store.take(&id), Some(json!({"user": "admin"})));
        assert!(store.get(&id).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_expired_session_not_returned() {
        let store = SessionStore::default();
        store.set("s1", json!(1), Some(Duration::ZERO));
        store.set("s2", json!(2), None);

        assert!(store.get("s1").is_none());
        assert_eq!(store.sweep_expired(), 0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_sweep_removes_expired() {
        let store = SessionStore::default();
        store.set("a", json!(1), Some(Duration::ZERO));
        store.set("b", json!(2), Some(Duration::ZERO));
        store.set("c", json!(3), None);

        assert_eq!(store.sweep_expired(), 2);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_init_adopts_policy() {
        let store = SessionStore::default();
        let policy = LoginPolicy {
            session_timeout: 5,
            ..Default::default()
        };
        store.init(&policy).unwrap();
        assert_eq!(store.default_ttl(), Duration::from_secs(300));

        let zero = LoginPolicy {
            session_timeout: 0,
            ..Default::default()
        };
        assert!(matches!(store.init(&zero), Err(SessionError::ZeroTimeout)));
    }

    #[test]
    fn test_stop_without_start() {
        let store = SessionStore::default();
        store.stop();
        assert!(!store.is_running());
    }

    #[tokio::test]
    async fn test_sweeper_runs_until_stopped() {
        let store = SessionStore::new(Duration::from_millis(20));
        store.set("gone", json!(null), Some(Duration::from_millis(5)));
        store.start();
        assert!(store.is_running());

        time::sleep(Duration::from_millis(100)).await;
        assert!(store.is_empty());

        store.stop();
        assert!(!store.is_running());
        store.stop();
    }
}
