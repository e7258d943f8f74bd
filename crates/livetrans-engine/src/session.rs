use std::time::Instant;

use livetrans_core::SessionId;

/// Mutable debounce state of one session: the pending text and the time of
/// the last translation attempt.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionState {
    buffer: String,
    buffer_chars: usize,
    /// `None` until the first attempt or reset; treated as "infinitely long ago".
    last_attempt: Option<Instant>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Length of the buffer in characters, not bytes.
    pub fn buffer_len(&self) -> usize {
        self.buffer_chars
    }

    pub fn last_attempt(&self) -> Option<Instant> {
        self.last_attempt
    }

    pub(crate) fn set_buffer(&mut self, fragment: &str) {
        fragment.clone_into(&mut self.buffer);
        self.buffer_chars = fragment.chars().count();
    }

    pub(crate) fn mark_attempt(&mut self, now: Instant) {
        self.last_attempt = Some(now);
    }

    /// Start a new utterance: empty buffer, attempt clock restarted at `now`.
    pub fn reset(&mut self, now: Instant) {
        self.buffer.clear();
        self.buffer_chars = 0;
        self.last_attempt = Some(now);
    }
}

/// Registry record for one connected client.
#[derive(Clone, Debug)]
pub struct Session {
    pub id: SessionId,
    pub opened_at: Instant,
    pub state: SessionState,
    pub fragments: u64,
    pub translations: u64,
    pub failures: u64,
}

impl Session {
    pub fn new(id: SessionId, now: Instant) -> Self {
        Self {
            id,
            opened_at: now,
            state: SessionState::new(),
            fragments: 0,
            translations: 0,
            failures: 0,
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id,
            buffer: self.state.buffer().to_owned(),
            last_attempt: self.state.last_attempt(),
            fragments: self.fragments,
            translations: self.translations,
            failures: self.failures,
        }
    }
}

/// Read-only copy of a session, detached from the registry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub id: SessionId,
    pub buffer: String,
    pub last_attempt: Option<Instant>,
    pub fragments: u64,
    pub translations: u64,
    pub failures: u64,
}
