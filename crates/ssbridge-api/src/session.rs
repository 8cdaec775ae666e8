// Session store
//
// One shared session id per station. Every outgoing call reads it without
// locking; only login and logout replace it. The reconnect guard lives here
// too so that every holder of the store sees the same in-flight flag.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use secrecy::SecretString;

/// An authenticated session as issued by `SYNO.API.Auth`.
#[derive(Debug)]
pub struct Session {
    token: SecretString,
    valid_since: DateTime<Utc>,
    generation: u64,
}

impl Session {
    /// The session id sent as `_sid` on every call.
    pub fn token(&self) -> &SecretString {
        &self.token
    }

    /// When the login that produced this session completed.
    pub fn valid_since(&self) -> DateTime<Utc> {
        self.valid_since
    }

    /// Monotonic counter bumped on every rotation. Lets callers tell
    /// whether the token changed underneath them.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Shared, lock-free holder of the current [`Session`].
#[derive(Debug)]
pub struct SessionStore {
    current: ArcSwapOption<Session>,
    generation: AtomicU64,
    reconnecting: AtomicBool,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            current: ArcSwapOption::empty(),
            generation: AtomicU64::new(0),
            reconnecting: AtomicBool::new(false),
        }
    }

    /// Snapshot of the current session, if logged in.
    pub fn current(&self) -> Option<Arc<Session>> {
        self.current.load_full()
    }

    pub fn is_active(&self) -> bool {
        self.current.load().is_some()
    }

    /// Replace the session wholesale after a successful login.
    pub fn rotate(&self, token: SecretString) -> Arc<Session> {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let session = Arc::new(Session {
            token,
            valid_since: Utc::now(),
            generation,
        });
        self.current.store(Some(Arc::clone(&session)));
        session
    }

    /// Drop the session locally.
    pub fn clear(&self) {
        self.current.store(None);
    }

    /// Claim the reconnect slot.
    ///
    /// Returns `None` if another caller already holds it. The slot is
    /// released when the returned guard is dropped.
    pub fn try_begin_reconnect(&self) -> Option<ReconnectGuard<'_>> {
        self.reconnecting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ReconnectGuard { store: self })
    }

    pub fn reconnect_in_progress(&self) -> bool {
        self.reconnecting.load(Ordering::Acquire)
    }
}

/// Proof of holding the reconnect slot. Releases it on drop.
#[derive(Debug)]
pub struct ReconnectGuard<'a> {
    store: &'a SessionStore,
}

impl Drop for ReconnectGuard<'_> {
    fn drop(&mut self) {
        self.store.reconnecting.store(false, Ordering::Release);
    }
}
