use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::models::OwnedLibrary;

/// Per-user recommendation state kept between requests
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    /// Latest owned-book snapshot reported by the client
    pub library: Arc<OwnedLibrary>,
    /// A recommendation fetch is outstanding
    pub in_flight: bool,
}

impl SessionState {
    pub fn with_library(self, library: OwnedLibrary) -> Self {
        Self {
            library: Arc::new(library),
            ..self
        }
    }

    /// Marks a fetch as started, or `None` when one is already running
    pub fn start_fetch(self) -> Option<Self> {
        if self.in_flight {
            return None;
        }
        Some(Self {
            in_flight: true,
            ..self
        })
    }

    pub fn finish_fetch(self) -> Self {
        Self {
            in_flight: false,
            ..self
        }
    }
}

/// Library snapshots idle for longer than this are dropped
pub const DEFAULT_SESSION_IDLE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug)]
struct SessionEntry {
    state: SessionState,
    touched: Instant,
}

impl SessionEntry {
    fn new(state: SessionState) -> Self {
        Self {
            state,
            touched: Instant::now(),
        }
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        !self.state.in_flight && self.touched.elapsed() > ttl
    }
}

/// All sessions, keyed by user id.
///
/// Entries back in the default state are removed, and idle library
/// snapshots expire after `idle_ttl`.
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, SessionEntry>>,
    idle_ttl: Duration,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::with_idle_ttl(DEFAULT_SESSION_IDLE_TTL)
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_idle_ttl(idle_ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            idle_ttl,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, SessionEntry>> {
        // State transitions never panic mid-update, so a poisoned map is still consistent
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Current state of a user's session; a fresh default when unknown
    pub fn snapshot(&self, user_id: &str) -> SessionState {
        self.lock()
            .get(user_id)
            .map(|entry| entry.state.clone())
            .unwrap_or_default()
    }

    /// Number of users with retained state
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn replace_library(&self, user_id: &str, library: OwnedLibrary) {
        let mut sessions = self.lock();
        self.evict_expired(&mut sessions);

        let state = sessions
            .remove(user_id)
            .map(|entry| entry.state)
            .unwrap_or_default()
            .with_library(library);
        store_entry(&mut sessions, user_id, state);
    }

    /// Claims the user's in-flight flag. The flag is released when the guard drops.
    pub fn try_begin_fetch(self: &Arc<Self>, user_id: &str) -> Option<InFlightGuard> {
        let mut sessions = self.lock();
        let state = sessions
            .get(user_id)
            .map(|entry| entry.state.clone())
            .unwrap_or_default();
        let started = state.start_fetch()?;
        store_entry(&mut sessions, user_id, started);

        Some(InFlightGuard {
            registry: Arc::clone(self),
            user_id: user_id.to_string(),
        })
    }

    fn end_fetch(&self, user_id: &str) {
        let mut sessions = self.lock();
        if let Some(entry) = sessions.remove(user_id) {
            store_entry(&mut sessions, user_id, entry.state.finish_fetch());
        }
    }

    fn evict_expired(&self, sessions: &mut HashMap<String, SessionEntry>) {
        let before = sessions.len();
        sessions.retain(|_, entry| !entry.is_expired(self.idle_ttl));

        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::debug!(evicted, "Expired idle sessions");
        }
    }
}

/// Inserts `state`, or drops the entry when it carries nothing worth keeping
fn store_entry(sessions: &mut HashMap<String, SessionEntry>, user_id: &str, state: SessionState) {
    if !state.in_flight && state.library.is_empty() {
        sessions.remove(user_id);
    } else {
        sessions.insert(user_id.to_string(), SessionEntry::new(state));
    }
}

/// Holds a user's in-flight flag for the duration of one fetch
#[derive(Debug)]
pub struct InFlightGuard {
    registry: Arc<SessionRegistry>,
    user_id: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.registry.end_fetch(&self.user_id);
    }
}
