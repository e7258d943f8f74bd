//! Settings types with their compiled defaults.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings object.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RelaySettings {
    pub server: ServerSettings,
    pub debounce: DebounceSettings,
    pub translator: TranslatorSettings,
    pub logging: LoggingSettings,
}

impl RelaySettings {
    /// Reject values the relay cannot run with.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(SettingsError::InvalidValue(msg.to_string()));

        if !self.server.ws_path.starts_with('/') {
            return invalid("server.wsPath must start with '/'");
        }
        if self.server.max_message_size == 0 {
            return invalid("server.maxMessageSize must be positive");
        }
        if self.server.ping_interval_secs == 0 || self.server.ping_timeout_secs == 0 {
            return invalid("server ping interval and timeout must be positive");
        }
        if self.server.send_queue == 0 {
            return invalid("server.sendQueue must be positive");
        }
        if self.debounce.min_interval_ms == 0 {
            return invalid("debounce.minIntervalMs must be positive");
        }
        if self.debounce.terminal_marks.iter().any(|m| m.chars().count() != 1) {
            return invalid("debounce.terminalMarks entries must be single characters");
        }
        if self.translator.timeout_ms == 0 {
            return invalid("translator.timeoutMs must be positive");
        }
        if self.translator.source_lang.eq_ignore_ascii_case(&self.translator.target_lang) {
            return invalid("translator source and target languages must differ");
        }
        Ok(())
    }
}

/// Network and connection settings.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Bind port (0 for auto-assign).
    pub port: u16,
    /// Path of the WebSocket endpoint.
    pub ws_path: String,
    /// Largest inbound message accepted, in bytes.
    pub max_message_size: usize,
    /// Seconds between keep-alive pings.
    pub ping_interval_secs: u64,
    /// Seconds a ping may go unanswered before the connection is dropped.
    pub ping_timeout_secs: u64,
    /// Maximum concurrent sessions (0 = unlimited).
    pub max_sessions: usize,
    /// Outbound messages buffered per connection.
    pub send_queue: usize,
    /// Seconds to wait for connections to drain on shutdown.
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            ws_path: "/ws/translate".to_string(),
            max_message_size: 10 * 1024 * 1024,
            ping_interval_secs: 30,
            ping_timeout_secs: 30,
            max_sessions: 0,
            send_queue: 64,
            shutdown_timeout_secs: 10,
        }
    }
}

/// When to translate a streaming transcript.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct DebounceSettings {
    pub min_interval_ms: u64,
    pub min_words: usize,
    pub terminal_marks: Vec<String>,
    pub empty_is_terminal: bool,
}

impl Default for DebounceSettings {
    fn default() -> Self {
        Self {
            min_interval_ms: 1000,
            min_words: 4,
            terminal_marks: vec![".".into(), "?".into(), "!".into()],
            empty_is_terminal: true,
        }
    }
}

/// Which translation engine to use.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslatorKind {
    /// MyMemory HTTP API.
    #[default]
    MyMemory,
    /// Return the input unchanged (offline development).
    Echo,
}

impl std::str::FromStr for TranslatorKind {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mymemory" => Ok(Self::MyMemory),
            "echo" => Ok(Self::Echo),
            other => Err(SettingsError::InvalidValue(format!("unknown translator: {other}"))),
        }
    }
}

/// Translation engine settings.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct TranslatorSettings {
    pub kind: TranslatorKind,
    pub source_lang: String,
    pub target_lang: String,
    pub base_url: String,
    /// Sent to MyMemory for a larger daily quota.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    /// Inputs longer than this are cut at a character boundary.
    pub max_query_bytes: usize,
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub circuit_breaker_threshold: u32,
    pub circuit_breaker_cooldown_secs: u64,
}

impl Default for TranslatorSettings {
    fn default() -> Self {
        Self {
            kind: TranslatorKind::MyMemory,
            source_lang: "en".to_string(),
            target_lang: "es".to_string(),
            base_url: "https://api.mymemory.translated.net".to_string(),
            contact_email: None,
            max_query_bytes: 500,
            timeout_ms: 10_000,
            max_retries: 0,
            circuit_breaker_threshold: 5,
            circuit_breaker_cooldown_secs: 30,
        }
    }
}

/// Log output settings.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    pub level: String,
    pub json: bool,
    /// Per-module level overrides, e.g. `{"livetrans_engine": "trace"}`.
    pub module_levels: BTreeMap<String, String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            module_levels: BTreeMap::new(),
        }
    }
}
