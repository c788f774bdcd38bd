//! In-memory store for captured login sessions.
//!
//! Sessions live until deleted or the process exits. There is no persistence
//! and no expiry; the store is an explicit object handed to whoever needs it,
//! not ambient state.

use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

// ---- Public types -----------------------------------------------------------

/// A captured login session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Store-minted identifier, `sess-{unix-millis}-{counter}`.
    pub id: String,
    /// Login page URL the session came from.
    pub source_url: String,
    /// Raw `Set-Cookie` strings captured at login.
    pub cookies: Vec<String>,
    /// URL of the final login response; protected fetches resolve against it.
    pub final_url: String,
    /// Response headers of the final login response.
    pub response_headers: Vec<(String, String)>,
    /// RFC 3339 creation time.
    pub created_at: String,
}

/// What a finished login hands to the store.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub source_url: String,
    pub cookies: Vec<String>,
    pub final_url: String,
    pub response_headers: Vec<(String, String)>,
}

/// Concurrency-safe in-memory session store.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Session>>,
    counter: AtomicU64,
}

// ---- Public API -------------------------------------------------------------

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a freshly captured session and return its minted id.
    pub async fn put(&self, new: NewSession) -> String {
        let id = self.mint_id();
        let session = Session {
            id: id.clone(),
            source_url: new.source_url,
            cookies: new.cookies,
            final_url: new.final_url,
            response_headers: new.response_headers,
            created_at: Utc::now().to_rfc3339(),
        };
        self.sessions.lock().await.insert(id.clone(), session);
        id
    }

    /// Look up a session by id.
    pub async fn get(&self, id: &str) -> Option<Session> {
        self.sessions.lock().await.get(id).cloned()
    }

    /// Remove a session. Returns whether it existed; removing an unknown id
    /// is not an error.
    pub async fn delete(&self, id: &str) -> bool {
        self.sessions.lock().await.remove(id).is_some()
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }

    /// Ids are unique for the process lifetime: wall-clock millis plus a
    /// counter that breaks same-millisecond ties.
    fn mint_id(&self) -> String {
        let ts = Utc::now().timestamp_millis();
        let counter = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("sess-{ts}-{counter}")
    }
}

// ---- Tests ------------------------------------------------------------------
