use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use livetrans_core::{RegistryError, SessionId};
use tracing::debug;

use crate::debounce::{Action, DebounceEngine};
use crate::session::{Session, SessionSnapshot};

/// Registry of all live sessions.
///
/// Each entry is touched only by the transport loop that owns it, so the
/// sharded map is the only synchronization: different sessions proceed in
/// parallel, and opening or closing one never disturbs another's record.
pub struct SessionRegistry {
    sessions: DashMap<SessionId, Session>,
    engine: DebounceEngine,
    next_id: AtomicU64,
    active: AtomicUsize,
    /// Zero means unlimited.
    max_sessions: usize,
}

impl SessionRegistry {
    pub fn new(engine: DebounceEngine) -> Self {
        Self::with_capacity_limit(engine, 0)
    }

    pub fn with_capacity_limit(engine: DebounceEngine, max_sessions: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            engine,
            next_id: AtomicU64::new(1),
            active: AtomicUsize::new(0),
            max_sessions,
        }
    }

    /// Allocate a fresh session with an empty buffer and no prior attempt.
    pub fn open(&self, now: Instant) -> Result<SessionId, RegistryError> {
        self.reserve_slot()?;

        let raw = match self.next_id.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
            SessionId::from_raw(n).checked_next().map(SessionId::get)
        }) {
            Ok(raw) => raw,
            Err(_) => {
                let _ = self.active.fetch_sub(1, Ordering::SeqCst);
                return Err(RegistryError::Exhausted);
            }
        };

        let id = SessionId::from_raw(raw);
        let _ = self.sessions.insert(id, Session::new(id, now));
        debug!(session_id = %id, active = self.len(), "session opened");
        Ok(id)
    }

    fn reserve_slot(&self) -> Result<(), RegistryError> {
        let limit = self.max_sessions;
        self.active
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (limit == 0 || n < limit).then_some(n + 1)
            })
            .map(|_| ())
            .map_err(|_| RegistryError::CapacityExceeded { limit })
    }

    /// Remove every trace of `id` in one step.
    ///
    /// A second close of the same id reports `NotFound` and touches nothing else.
    pub fn close(&self, id: SessionId) -> Result<Session, RegistryError> {
        let (_, session) = self.sessions.remove(&id).ok_or(RegistryError::NotFound(id))?;
        let _ = self.active.fetch_sub(1, Ordering::SeqCst);
        debug!(session_id = %id, active = self.len(), "session closed");
        Ok(session)
    }

    /// Run the debounce engine for one fragment of `id`.
    pub fn observe(&self, id: SessionId, fragment: &str, now: Instant) -> Result<Action, RegistryError> {
        let mut session = self.sessions.get_mut(&id).ok_or(RegistryError::NotFound(id))?;
        session.fragments += 1;
        Ok(self.engine.observe(&mut session.state, fragment, now))
    }

    /// The translation was delivered: start the next utterance clean.
    pub fn translation_succeeded(&self, id: SessionId, now: Instant) -> Result<(), RegistryError> {
        let mut session = self.sessions.get_mut(&id).ok_or(RegistryError::NotFound(id))?;
        session.translations += 1;
        session.state.reset(now);
        Ok(())
    }

    /// The translation failed: keep the buffer so a later fragment can retry.
    pub fn translation_failed(&self, id: SessionId) -> Result<(), RegistryError> {
        let mut session = self.sessions.get_mut(&id).ok_or(RegistryError::NotFound(id))?;
        session.failures += 1;
        Ok(())
    }

    pub fn snapshot(&self, id: SessionId) -> Option<SessionSnapshot> {
        self.sessions.get(&id).map(|s| s.snapshot())
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(DebounceEngine::default())
    }
}

/// Owning handle to an open session; closes it exactly once.
///
/// Dropping the guard closes the session, so a transport loop that unwinds
/// or returns early still releases its state.
pub struct SessionGuard {
    registry: Arc<SessionRegistry>,
    id: SessionId,
    closed: bool,
}

impl SessionGuard {
    pub fn open(registry: Arc<SessionRegistry>, now: Instant) -> Result<Self, RegistryError> {
        let id = registry.open(now)?;
        Ok(Self {
            registry,
            id,
            closed: false,
        })
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Close now. Returns the final record the first time, `None` afterwards.
    pub fn close(&mut self) -> Option<Session> {
        if self.closed {
            return None;
        }
        self.closed = true;
        self.registry.close(self.id).ok()
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
