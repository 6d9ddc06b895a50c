//! Shared UI status: a loading indicator and a single auto-expiring error slot.
//!
//! The store is cheap to clone; every clone observes and mutates the same state.
//! Consumers either poll [`UiStatusStore::snapshot`] or [`UiStatusStore::subscribe`]
//! to be woken on every change.

use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock, Weak};
use std::time::Duration;
use tokio::sync::watch;

/// Delay after which a stored error is cleared if nothing else clears it first.
pub const DEFAULT_ERROR_TTL: Duration = Duration::from_millis(5000);

static GLOBAL: OnceLock<UiStatusStore> = OnceLock::new();

/// An error shown to the user: either a plain message or a structured payload
/// returned by the server (e.g. a list of validation failures).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum UiError {
    Message(String),
    Structured(serde_json::Value),
}

impl UiError {
    pub fn message(msg: impl Into<String>) -> Self {
        UiError::Message(msg.into())
    }
}

impl fmt::Display for UiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UiError::Message(msg) => f.write_str(msg),
            UiError::Structured(value) => {
                // Validation errors arrive as [{"loc": [...], "msg": "...", ...}, ...]
                let msgs: Option<Vec<&str>> = value
                    .as_array()
                    .map(|items| items.iter().filter_map(|i| i.get("msg")?.as_str()).collect());
                match msgs {
                    Some(msgs) if !msgs.is_empty() => f.write_str(&msgs.join("; ")),
                    _ => write!(f, "{value}"),
                }
            }
        }
    }
}

/// Snapshot of the store as seen by UI consumers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UiStatus {
    pub is_loading: bool,
    pub error: Option<UiError>,
}

#[derive(Debug, Default)]
struct LoadingState {
    in_flight: usize,
    manual: bool,
}

impl LoadingState {
    fn is_loading(&self) -> bool {
        self.in_flight > 0 || self.manual
    }
}

struct Inner {
    tx: watch::Sender<UiStatus>,
    loading: Mutex<LoadingState>,
    // Bumped on every error write; an expiry timer only clears the error it was armed for.
    error_generation: AtomicU64,
    error_ttl_ms: AtomicU64,
}

#[derive(Clone)]
pub struct UiStatusStore {
    inner: Arc<Inner>,
}

impl fmt::Debug for UiStatusStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UiStatusStore")
            .field("status", &*self.inner.tx.borrow())
            .field("error_ttl", &self.error_ttl())
            .finish()
    }
}

impl Default for UiStatusStore {
    fn default() -> Self {
        Self::new()
    }
}

impl UiStatusStore {
    pub fn new() -> Self {
        Self::with_error_ttl(DEFAULT_ERROR_TTL)
    }

    pub fn with_error_ttl(error_ttl: Duration) -> Self {
        let (tx, _) = watch::channel(UiStatus::default());
        Self {
            inner: Arc::new(Inner {
                tx,
                loading: Mutex::new(LoadingState::default()),
                error_generation: AtomicU64::new(0),
                error_ttl_ms: AtomicU64::new(ttl_millis(error_ttl)),
            }),
        }
    }

    /// The process-wide store, created on first use.
    pub fn global() -> UiStatusStore {
        GLOBAL.get_or_init(UiStatusStore::new).clone()
    }

    pub fn error_ttl(&self) -> Duration {
        Duration::from_millis(self.inner.error_ttl_ms.load(Ordering::Relaxed))
    }

    /// Change the expiry delay for errors written from now on.
    pub fn set_error_ttl(&self, ttl: Duration) {
        self.inner
            .error_ttl_ms
            .store(ttl_millis(ttl), Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> UiStatus {
        self.inner.tx.borrow().clone()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.tx.borrow().is_loading
    }

    pub fn error(&self) -> Option<UiError> {
        self.inner.tx.borrow().error.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<UiStatus> {
        self.inner.tx.subscribe()
    }

    /// Manually force the loading indicator on or off.
    ///
    /// Requests tracked through [`begin_request`](Self::begin_request) keep the
    /// indicator on even after `set_loading(false)` until they finish.
    pub fn set_loading(&self, loading: bool) {
        self.update_loading(|state| state.manual = loading);
    }

    /// Record the start of an in-flight request.
    pub fn begin_request(&self) {
        self.update_loading(|state| state.in_flight += 1);
    }

    /// Record the end of an in-flight request.
    pub fn end_request(&self) {
        self.update_loading(|state| state.in_flight = state.in_flight.saturating_sub(1));
    }

    fn update_loading(&self, f: impl FnOnce(&mut LoadingState)) {
        let mut state = self.inner.loading.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut state);
        let loading = state.is_loading();
        // Publish while still holding the counter lock so concurrent updates
        // cannot publish out of order.
        self.inner.tx.send_if_modified(|status| {
            if status.is_loading == loading {
                return false;
            }
            status.is_loading = loading;
            true
        });
    }

    /// Replace the current error. `Some` arms the expiry timer, `None` clears.
    pub fn set_error(&self, error: Option<UiError>) {
        let Some(error) = error else {
            self.clear_error();
            return;
        };

        let mut generation = 0;
        self.inner.tx.send_modify(|status| {
            generation = self.inner.error_generation.fetch_add(1, Ordering::Relaxed) + 1;
            status.error = Some(error);
        });
        self.arm_expiry(generation);
    }

    pub fn clear_error(&self) {
        self.inner
            .tx
            .send_if_modified(|status| status.error.take().is_some());
    }

    fn arm_expiry(&self, generation: u64) {
        let ttl = self.error_ttl();
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                tracing::warn!("no async runtime available; error will not auto-clear");
                return;
            }
        };

        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        handle.spawn(async move {
            tokio::time::sleep(ttl).await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let expired = inner.tx.send_if_modified(|status| {
                if inner.error_generation.load(Ordering::Relaxed) != generation {
                    return false;
                }
                status.error.take().is_some()
            });
            if expired {
                tracing::debug!(generation, "error expired");
            }
        });
    }
}

// Saturates instead of wrapping for TTLs beyond u64::MAX milliseconds.
fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX)
}
