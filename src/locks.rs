//! Per-file editing locks for quill.
//!
//! Every browser tab that edits a document must hold the lock for that
//! document's base name. Locks live only in memory and expire after a short
//! TTL unless the owning client refreshes them, so a tab that disappears
//! without unlocking frees the file within one TTL.
//!
//! # Lock Model
//!
//! - At most one live lock per resource name.
//! - A lock is identified by an opaque token chosen by the server (or echoed
//!   back from the client on refresh).
//! - Expired locks are evicted lazily, whenever an operation observes them.
//!   There is no background sweeper.
//!
//! All operations run inside a single critical section over the lock table,
//! so two concurrent acquisitions of the same name can never both succeed.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Lock lifetime when the client stops refreshing.
///
/// Clients refresh every `DEFAULT_LOCK_TTL / 2`.
pub const DEFAULT_LOCK_TTL: Duration = Duration::from_secs(1);

/// Source of the current instant for expiry decisions.
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> Instant;
}

/// Clock backed by [`Instant::now`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A single entry in the lock table.
#[derive(Debug, Clone)]
struct LockEntry {
    token: String,
    expires_at: Instant,
}

impl LockEntry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Outcome of an acquire-or-refresh request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acquisition {
    /// No live lock existed; a new one was installed with this token.
    Created(String),
    /// The caller already owned the live lock; its expiry was extended.
    Refreshed(String),
    /// Another token holds an unexpired lock. Nothing was changed.
    Refused,
}

impl Acquisition {
    /// The token now owning the lock, if the request was granted.
    pub fn token(&self) -> Option<&str> {
        match self {
            Acquisition::Created(token) | Acquisition::Refreshed(token) => Some(token),
            Acquisition::Refused => None,
        }
    }

    pub fn is_granted(&self) -> bool {
        !matches!(self, Acquisition::Refused)
    }
}

/// In-memory registry of per-file locks.
///
/// The table itself is never exposed; callers go through the five lock
/// operations only.
#[derive(Debug)]
pub struct LockRegistry {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    table: Mutex<HashMap<String, LockEntry>>,
}

impl Default for LockRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_LOCK_TTL)
    }
}

impl LockRegistry {
    /// Create a registry using the system clock.
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    /// Create a registry reading time from `clock`.
    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            table: Mutex::new(HashMap::new()),
        }
    }

    fn table(&self) -> MutexGuard<'_, HashMap<String, LockEntry>> {
        // The critical section never panics midway through a mutation, so a
        // poisoned table is still consistent.
        self.table.lock().unwrap_or_else(|poison| poison.into_inner())
    }

    /// Acquire a lock on `name`, or refresh it if `proposed_token` already owns it.
    ///
    /// When no live lock exists the lock is installed under `proposed_token`,
    /// or under a freshly generated token if `proposed_token` is empty.
    pub fn acquire(&self, name: &str, proposed_token: &str) -> Acquisition {
        let now = self.clock.now();
        let expires_at = now + self.ttl;
        let mut table = self.table();

        if let Some(entry) = table.get_mut(name)
            && entry.is_live(now)
        {
            if !proposed_token.is_empty() && entry.token == proposed_token {
                entry.expires_at = expires_at;
                tracing::debug!(file = name, "lock refreshed");
                return Acquisition::Refreshed(entry.token.clone());
            }
            tracing::debug!(file = name, "lock refused: held by another token");
            return Acquisition::Refused;
        }

        let token = if proposed_token.is_empty() {
            new_token()
        } else {
            proposed_token.to_string()
        };
        table.insert(
            name.to_string(),
            LockEntry {
                token: token.clone(),
                expires_at,
            },
        );
        tracing::debug!(file = name, "lock created");
        Acquisition::Created(token)
    }

    /// Extend the lock on `name` held by `token`.
    ///
    /// Shares [`LockRegistry::acquire`] semantics; an empty token is never
    /// accepted as a refresh.
    pub fn refresh(&self, name: &str, token: &str) -> bool {
        if token.is_empty() {
            return false;
        }
        self.acquire(name, token).is_granted()
    }

    /// Remove the lock on `name` if `token` owns it.
    pub fn release(&self, name: &str, token: &str) -> bool {
        let mut table = self.table();
        match table.get(name) {
            Some(entry) if entry.token == token => {
                table.remove(name);
                tracing::debug!(file = name, "lock released");
                true
            }
            _ => false,
        }
    }

    /// True iff `token` owns an unexpired lock on `name`.
    ///
    /// An expired lock found here is evicted.
    pub fn validate(&self, name: &str, token: &str) -> bool {
        let now = self.clock.now();
        let mut table = self.table();
        let Some(entry) = table.get(name) else {
            return false;
        };
        if !entry.is_live(now) {
            table.remove(name);
            tracing::debug!(file = name, "expired lock evicted");
            return false;
        }
        entry.token == token
    }

    /// Move the lock held by `token` from `old_name` to `new_name`.
    ///
    /// The moved lock keeps its token and gets a fresh expiry. Returns false
    /// and changes nothing unless `token` owns a live lock on `old_name`.
    pub fn transfer(&self, old_name: &str, new_name: &str, token: &str) -> bool {
        let now = self.clock.now();
        let mut table = self.table();
        match table.get(old_name) {
            Some(entry) if entry.is_live(now) && entry.token == token => {}
            _ => return false,
        }
        table.remove(old_name);
        table.insert(
            new_name.to_string(),
            LockEntry {
                token: token.to_string(),
                expires_at: now + self.ttl,
            },
        );
        tracing::debug!(from = old_name, to = new_name, "lock transferred");
        true
    }
}

/// Generate a random 32-character hex lock token.
pub fn new_token() -> String {
    Uuid::new_v4().simple().to_string()
}
