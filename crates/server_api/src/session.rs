use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
    time::{Duration, Instant},
};

use shared::{
    domain::{ClassificationRequest, HistoryEntry, SessionId, HISTORY_CAPACITY},
    protocol::{ClassifyOutcome, SessionView},
};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::info;

use crate::cache::ResponseCache;

/// Everything one visitor's form owns. Dropped with the session.
#[derive(Debug)]
pub struct SessionState {
    pub description: String,
    pub supplier: String,
    pub debug_raw: bool,
    pub last_outcome: Option<ClassifyOutcome>,
    history: VecDeque<HistoryEntry>,
    pub(crate) cache: ResponseCache,
    last_seen: Instant,
}

impl SessionState {
    pub fn new(cache_capacity: usize) -> Self {
        Self {
            description: String::new(),
            supplier: String::new(),
            debug_raw: false,
            last_outcome: None,
            history: VecDeque::with_capacity(HISTORY_CAPACITY + 1),
            cache: ResponseCache::new(cache_capacity),
            last_seen: Instant::now(),
        }
    }

    pub fn request(&self) -> ClassificationRequest {
        ClassificationRequest::new(&self.description, &self.supplier)
    }

    pub fn can_classify(&self) -> bool {
        self.request().is_classifiable()
    }

    pub fn record(&mut self, entry: HistoryEntry) {
        self.history.push_front(entry);
        self.history.truncate(HISTORY_CAPACITY);
    }

    pub fn history(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.history.iter()
    }

    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.history.front()
    }

    pub fn view(&self, session_id: SessionId) -> SessionView {
        SessionView {
            session_id,
            description: self.description.clone(),
            supplier: self.supplier.clone(),
            debug_raw: self.debug_raw,
            can_classify: self.can_classify(),
            last_outcome: self.last_outcome.clone(),
            history: self.history.iter().cloned().collect(),
            download_available: !self.history.is_empty(),
        }
    }

    fn touch(&mut self) {
        self.last_seen = Instant::now();
    }
}

/// Registry of live sessions. Each session sits behind its own mutex so
/// actions on one session run one at a time.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<SessionId, Arc<Mutex<SessionState>>>>>,
    cache_capacity: usize,
}

impl SessionStore {
    pub fn new(cache_capacity: usize) -> Self {
        Self {
            sessions: Arc::default(),
            cache_capacity,
        }
    }

    pub async fn create(&self) -> SessionId {
        let session_id = SessionId::random();
        let state = Arc::new(Mutex::new(SessionState::new(self.cache_capacity)));
        self.sessions.write().await.insert(session_id, state);
        info!(%session_id, "session created");
        session_id
    }

    /// Locks the session for the duration of one action.
    ///
    /// An idle session is locked while the registry guard is held, so a sweep
    /// cannot remove it in between. A busy session is awaited outside the
    /// registry guard and then checked again; `None` if it was removed while
    /// waiting.
    pub async fn lock(&self, session_id: SessionId) -> Option<OwnedMutexGuard<SessionState>> {
        let state = {
            let sessions = self.sessions.read().await;
            let state = sessions.get(&session_id).cloned()?;
            if let Ok(mut guard) = state.clone().try_lock_owned() {
                guard.touch();
                return Some(guard);
            }
            state
        };

        let mut guard = state.clone().lock_owned().await;
        let registered = self
            .sessions
            .read()
            .await
            .get(&session_id)
            .is_some_and(|current| Arc::ptr_eq(current, &state));
        if !registered {
            return None;
        }
        guard.touch();
        Some(guard)
    }

    pub async fn remove(&self, session_id: SessionId) -> bool {
        let removed = self.sessions.write().await.remove(&session_id).is_some();
        if removed {
            info!(%session_id, "session closed");
        }
        removed
    }

    /// Drops sessions idle for at least `ttl`. Sessions busy with an action
    /// are kept.
    pub async fn sweep_expired(&self, ttl: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|session_id, state| match state.try_lock() {
            Ok(state) if state.last_seen.elapsed() >= ttl => {
                info!(%session_id, "session expired");
                false
            }
            _ => true,
        });
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
