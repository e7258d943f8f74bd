//! The translate-now-or-wait decision for streaming transcripts.
//!
//! Transcribers emit growing partial hypotheses of the same utterance, so
//! translating every fragment would waste the engine and flood the client.
//! A fragment is translated when it looks complete (terminal punctuation) or,
//! as a latency bound for transcripts that rarely punctuate, when enough
//! words have piled up and enough time has passed since the last attempt.

use std::time::{Duration, Instant};

use tracing::trace;

use crate::session::SessionState;

/// Tuning for [`DebounceEngine`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DebounceConfig {
    /// Elapsed time since the last attempt must be strictly greater than this.
    pub min_interval: Duration,
    /// Word count must be strictly greater than this.
    pub min_words: usize,
    /// Characters that mark the end of a sentence.
    pub terminal_marks: Vec<char>,
    /// Whether a fragment that is empty after trimming counts as terminal.
    pub empty_is_terminal: bool,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_secs(1),
            min_words: 4,
            terminal_marks: vec!['.', '?', '!'],
            empty_is_terminal: true,
        }
    }
}

/// Outcome of observing one fragment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    /// Keep buffering; nothing to send.
    Hold,
    /// Translate this text now.
    Translate(String),
}

impl Action {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Hold => "hold",
            Self::Translate(_) => "translate",
        }
    }
}

/// Stateless decision logic; all per-session state lives in [`SessionState`].
#[derive(Clone, Debug, Default)]
pub struct DebounceEngine {
    config: DebounceConfig,
}

impl DebounceEngine {
    pub fn new(config: DebounceConfig) -> Self {
        Self { config }
    }

    /// Feed one fragment into `state` and decide what to do.
    ///
    /// A fragment shorter (in characters) than the pending buffer is a
    /// corrected re-transcription: the buffer and attempt clock are reset
    /// before the fragment is evaluated. The buffer always ends up holding
    /// `fragment`. On [`Action::Translate`] the attempt time is recorded
    /// immediately so a slow or failing translation does not re-trigger on
    /// the next fragment.
    pub fn observe(&self, state: &mut SessionState, fragment: &str, now: Instant) -> Action {
        let fragment_len = fragment.chars().count();
        if fragment_len < state.buffer_len() {
            trace!(
                previous = state.buffer_len(),
                current = fragment_len,
                "fragment regressed, starting new utterance"
            );
            state.reset(now);
        }

        state.set_buffer(fragment);

        if !self.should_translate(state, fragment, now) {
            return Action::Hold;
        }

        state.mark_attempt(now);
        Action::Translate(state.buffer().to_owned())
    }

    fn should_translate(&self, state: &SessionState, fragment: &str, now: Instant) -> bool {
        if self.is_terminal(fragment) {
            return true;
        }
        let waited = state
            .last_attempt()
            .map_or(true, |last| now.saturating_duration_since(last) > self.config.min_interval);
        waited && word_count(fragment) > self.config.min_words
    }

    /// Whether `fragment` ends a sentence.
    pub fn is_terminal(&self, fragment: &str) -> bool {
        let trimmed = fragment.trim();
        match trimmed.chars().next_back() {
            None => self.config.empty_is_terminal,
            Some(last) => self.config.terminal_marks.contains(&last),
        }
    }
}

/// Number of whitespace-delimited tokens.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> DebounceEngine {
        DebounceEngine::default()
    }

    fn at(base: Instant, secs: f64) -> Instant {
        base + Duration::from_secs_f64(secs)
    }

    /// State whose last attempt happened at `base`.
    fn attempted_at(base: Instant) -> SessionState {
        let mut state = SessionState::new();
        state.reset(base);
        state
    }

    #[test]
    fn terminal_punctuation_triggers_immediately() {
        let base = Instant::now();
        let mut state = attempted_at(base);
        let action = engine().observe(&mut state, "Hello there.", at(base, 0.01));
        assert_eq!(action, Action::Translate("Hello there.".into()));
        assert_eq!(state.last_attempt(), Some(at(base, 0.01)));
    }

    #[test]
    fn question_and_exclamation_are_terminal() {
        let e = engine();
        assert!(e.is_terminal("Where are you?"));
        assert!(e.is_terminal("Watch out!"));
        assert!(e.is_terminal("  done.  "));
        assert!(!e.is_terminal("Hello,"));
        assert!(!e.is_terminal("hi there"));
    }

    #[test]
    fn empty_fragment_counts_as_terminal_by_default() {
        let e = engine();
        assert!(e.is_terminal(""));
        assert!(e.is_terminal("   "));

        let strict = DebounceEngine::new(DebounceConfig {
            empty_is_terminal: false,
            ..DebounceConfig::default()
        });
        assert!(!strict.is_terminal(""));
    }

    #[test]
    fn empty_fragment_after_pending_text_resets_then_translates() {
        let base = Instant::now();
        let e = engine();
        let mut state = attempted_at(base);
        assert_eq!(e.observe(&mut state, "so we were", at(base, 0.2)), Action::Hold);

        let now = at(base, 0.4);
        assert_eq!(e.observe(&mut state, "", now), Action::Translate(String::new()));
        assert_eq!(state.buffer(), "");
        assert_eq!(state.last_attempt(), Some(now));

        let strict = DebounceEngine::new(DebounceConfig {
            empty_is_terminal: false,
            ..DebounceConfig::default()
        });
        let mut state = attempted_at(base);
        let _ = strict.observe(&mut state, "so we were", at(base, 0.2));
        assert_eq!(strict.observe(&mut state, "", now), Action::Hold);
        assert_eq!(state.buffer(), "");
        assert_eq!(state.last_attempt(), Some(now));
    }

    #[test]
    fn five_words_after_interval_triggers() {
        let base = Instant::now();
        let mut state = attempted_at(base);
        let action = engine().observe(&mut state, "the quick brown fox jumps", at(base, 1.2));
        assert_eq!(action, Action::Translate("the quick brown fox jumps".into()));
    }

    #[test]
    fn five_words_on_fresh_session_triggers() {
        let mut state = SessionState::new();
        let action = engine().observe(&mut state, "the quick brown fox jumps", Instant::now());
        assert!(matches!(action, Action::Translate(_)));
    }

    #[test]
    fn few_words_without_punctuation_hold() {
        let base = Instant::now();
        for elapsed in [0.0, 0.5, 1.5, 60.0] {
            let mut state = attempted_at(base);
            let action = engine().observe(&mut state, "hi there", at(base, elapsed));
            assert_eq!(action, Action::Hold, "elapsed {elapsed}");
            assert_eq!(state.buffer(), "hi there");
        }
    }

    #[test]
    fn four_words_is_not_enough() {
        let mut state = SessionState::new();
        let action = engine().observe(&mut state, "one two three four", Instant::now());
        assert_eq!(action, Action::Hold);
    }

    #[test]
    fn interval_must_be_strictly_exceeded() {
        let base = Instant::now();
        let mut state = attempted_at(base);
        let action = engine().observe(&mut state, "one two three four five", at(base, 1.0));
        assert_eq!(action, Action::Hold);
    }

    #[test]
    fn hold_then_translate_once_interval_passes() {
        let base = Instant::now();
        let e = engine();
        let mut state = attempted_at(base);

        let first = e.observe(&mut state, "I am going to the store today", at(base, 0.1));
        assert_eq!(first, Action::Hold);
        assert_eq!(state.last_attempt(), Some(base));

        let second = e.observe(&mut state, "I am going to the store today now", at(base, 1.2));
        assert_eq!(
            second,
            Action::Translate("I am going to the store today now".into())
        );
        assert_eq!(state.last_attempt(), Some(at(base, 1.2)));
    }

    #[test]
    fn regression_resets_before_evaluating() {
        let base = Instant::now();
        let e = engine();
        let mut state = attempted_at(base);

        assert_eq!(
            e.observe(&mut state, "I think that we should", at(base, 0.2)),
            Action::Hold
        );

        // Shorter re-transcription five seconds later: the reset moves the
        // attempt clock to now, so the word/time fallback cannot fire.
        let now = at(base, 5.0);
        let action = e.observe(&mut state, "I think we go now", now);
        assert_eq!(action, Action::Hold);
        assert_eq!(state.buffer(), "I think we go now");
        assert_eq!(state.last_attempt(), Some(now));
    }

    #[test]
    fn regression_with_punctuation_still_translates() {
        let base = Instant::now();
        let e = engine();
        let mut state = attempted_at(base);
        let _ = e.observe(&mut state, "what time is it right", at(base, 0.1));

        let action = e.observe(&mut state, "What time?", at(base, 0.3));
        assert_eq!(action, Action::Translate("What time?".into()));
    }

    #[test]
    fn equal_length_is_not_a_regression() {
        let base = Instant::now();
        let e = engine();
        let mut state = attempted_at(base);
        let _ = e.observe(&mut state, "abcd", at(base, 0.1));
        let _ = e.observe(&mut state, "wxyz", at(base, 0.2));
        assert_eq!(state.last_attempt(), Some(base));
    }

    #[test]
    fn buffer_tracks_latest_fragment() {
        let base = Instant::now();
        let e = engine();
        let mut state = attempted_at(base);
        for (i, fragment) in ["so", "so I", "so I was", "so I was thinking"].iter().enumerate() {
            let _ = e.observe(&mut state, fragment, at(base, 0.1 * i as f64));
            assert_eq!(state.buffer(), *fragment);
            assert_eq!(state.buffer_len(), fragment.chars().count());
        }
    }

    #[test]
    fn regression_measured_in_chars_not_bytes() {
        let base = Instant::now();
        let e = engine();
        let mut state = attempted_at(base);
        let _ = e.observe(&mut state, "ab", at(base, 0.1));
        // Two chars, four bytes: same length, no reset.
        let _ = e.observe(&mut state, "éé", at(base, 0.2));
        assert_eq!(state.last_attempt(), Some(base));
    }

    #[test]
    fn translate_records_attempt_so_next_fragment_waits() {
        let base = Instant::now();
        let e = engine();
        let mut state = SessionState::new();

        let first = e.observe(&mut state, "one two three four five", at(base, 0.0));
        assert!(matches!(first, Action::Translate(_)));

        let second = e.observe(&mut state, "one two three four five six", at(base, 0.5));
        assert_eq!(second, Action::Hold);
    }

    #[test]
    fn custom_thresholds() {
        let e = DebounceEngine::new(DebounceConfig {
            min_interval: Duration::from_millis(100),
            min_words: 1,
            terminal_marks: vec!['。'],
            empty_is_terminal: false,
        });
        let base = Instant::now();
        let mut state = attempted_at(base);
        assert!(matches!(e.observe(&mut state, "hello world", at(base, 0.2)), Action::Translate(_)));
        assert!(e.is_terminal("終わり。"));
        assert!(!e.is_terminal("end."));
    }

    #[test]
    fn word_count_splits_on_any_whitespace() {
        assert_eq!(word_count("  a\tb\nc  d "), 4);
        assert_eq!(word_count(""), 0);
    }

    #[test]
    fn action_labels() {
        assert_eq!(Action::Hold.label(), "hold");
        assert_eq!(Action::Translate(String::new()).label(), "translate");
    }
}
