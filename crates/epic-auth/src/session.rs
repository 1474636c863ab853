//! Pending authorization sessions
//!
//! Between `/login` and the provider callback, the only record of an
//! in-flight authorization is the session stored here: the PKCE verifier,
//! the external id that asked for the link, and an absolute expiry. The
//! cache lives in memory only; a restart drops all pending flows and users
//! simply start again from `/login`.
//!
//! Sessions are single-use. `take` removes the entry before the caller
//! attempts the token exchange, so a failed exchange still burns the state
//! and a replayed callback finds nothing.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::Mutex;
use tracing::debug;

use crate::constants::SESSION_TTL_SECS;

/// Current unix time in seconds.
///
/// All expiry bookkeeping (sessions and stored tokens) uses this clock.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// One in-flight authorization, keyed by its state value.
#[derive(Debug, Clone)]
pub struct PendingAuth {
    /// PKCE verifier to present at token exchange.
    pub code_verifier: String,
    /// External id that initiated the flow; the callback trusts this field,
    /// never the state string itself.
    pub external_id: String,
    /// Absolute expiry, unix seconds.
    pub expires_at: u64,
}

impl PendingAuth {
    /// Session expiring `SESSION_TTL_SECS` from now.
    pub fn new(code_verifier: String, external_id: String) -> Self {
        Self {
            code_verifier,
            external_id,
            expires_at: unix_now() + SESSION_TTL_SECS,
        }
    }
}

/// In-memory map of pending authorizations.
///
/// Concurrent logins for the same external id each get their own state and
/// their own entry; consuming one leaves the others intact.
pub struct SessionCache {
    state: Mutex<HashMap<String, PendingAuth>>,
}

impl SessionCache {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(HashMap::new()),
        }
    }

    /// Register a pending session under its state value.
    ///
    /// Each insert also drops entries past their expiry, so abandoned logins
    /// cannot grow the map without bound.
    pub async fn insert(&self, state: String, pending: PendingAuth) {
        let now = unix_now();
        let mut sessions = self.state.lock().await;
        sessions.retain(|_, s| s.expires_at > now);
        sessions.insert(state, pending);
    }

    /// Remove and return the session for a state value.
    ///
    /// Returns `None` for unknown states and for entries past their expiry;
    /// an expired entry is removed on the way out. A second `take` of the
    /// same state always returns `None`.
    pub async fn take(&self, state: &str) -> Option<PendingAuth> {
        let mut sessions = self.state.lock().await;
        let pending = sessions.remove(state)?;
        if unix_now() >= pending.expires_at {
            debug!(external_id = %pending.external_id, "pending authorization expired");
            return None;
        }
        Some(pending)
    }

    /// Number of pending sessions (expired entries included until evicted).
    pub async fn len(&self) -> usize {
        let sessions = self.state.lock().await;
        sessions.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for SessionCache {
    fn default() -> Self {
        Self::new()
    }
}
