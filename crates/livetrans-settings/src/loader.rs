//! Settings loading with deep merge and environment variable overrides.
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::types::{RelaySettings, TranslatorKind};

/// Resolve the path to the settings file (`~/.livetrans/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".livetrans").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<RelaySettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults; a malformed one is an error.
pub fn load_settings_from_path(path: &Path) -> Result<RelaySettings> {
    let mut settings = load_file(path)?;
    apply_overrides(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

fn load_file(path: &Path) -> Result<RelaySettings> {
    let defaults = serde_json::to_value(RelaySettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `LIVETRANS_*` overrides read through `lookup`.
///
/// Unparseable or out-of-range values are ignored with a warning.
pub fn apply_overrides<F>(settings: &mut RelaySettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let env = EnvReader { lookup };

    // ── Server ──────────────────────────────────────────────────────
    if let Some(v) = env.string("LIVETRANS_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = env.u64_in("LIVETRANS_PORT", 0, u64::from(u16::MAX)) {
        settings.server.port = v as u16;
    }
    if let Some(v) = env.string("LIVETRANS_WS_PATH") {
        settings.server.ws_path = v;
    }
    if let Some(v) = env.u64_in("LIVETRANS_MAX_SESSIONS", 0, 1_000_000) {
        settings.server.max_sessions = v as usize;
    }
    if let Some(v) = env.u64_in("LIVETRANS_MAX_MESSAGE_SIZE", 1024, 256 * 1024 * 1024) {
        settings.server.max_message_size = v as usize;
    }
    if let Some(v) = env.u64_in("LIVETRANS_PING_INTERVAL_SECS", 1, 3600) {
        settings.server.ping_interval_secs = v;
    }
    if let Some(v) = env.u64_in("LIVETRANS_PING_TIMEOUT_SECS", 1, 3600) {
        settings.server.ping_timeout_secs = v;
    }

    // ── Debounce ────────────────────────────────────────────────────
    if let Some(v) = env.u64_in("LIVETRANS_MIN_INTERVAL_MS", 1, 600_000) {
        settings.debounce.min_interval_ms = v;
    }
    if let Some(v) = env.u64_in("LIVETRANS_MIN_WORDS", 0, 10_000) {
        settings.debounce.min_words = v as usize;
    }

    // ── Translator ──────────────────────────────────────────────────
    if let Some(v) = env.string("LIVETRANS_TRANSLATOR") {
        match v.parse::<TranslatorKind>() {
            Ok(kind) => settings.translator.kind = kind,
            Err(e) => warn!(key = "LIVETRANS_TRANSLATOR", error = %e, "ignoring env var"),
        }
    }
    if let Some(v) = env.string("LIVETRANS_SOURCE_LANG") {
        settings.translator.source_lang = v;
    }
    if let Some(v) = env.string("LIVETRANS_TARGET_LANG") {
        settings.translator.target_lang = v;
    }
    if let Some(v) = env.string("LIVETRANS_TRANSLATOR_URL") {
        settings.translator.base_url = v;
    }
    if let Some(v) = env.string("LIVETRANS_CONTACT_EMAIL") {
        settings.translator.contact_email = Some(v);
    }
    if let Some(v) = env.u64_in("LIVETRANS_TRANSLATOR_TIMEOUT_MS", 100, 600_000) {
        settings.translator.timeout_ms = v;
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = env.string("LIVETRANS_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = env.boolean("LIVETRANS_LOG_JSON") {
        settings.logging.json = v;
    }
}

// ── Pure parsing functions ──────────────────────────────────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u64` within an inclusive range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.trim().is_empty())
    }

    fn boolean(&self, name: &str) -> Option<bool> {
        let val = (self.lookup)(name)?;
        let result = parse_bool(&val);
        if result.is_none() {
            warn!(key = name, value = %val, "invalid boolean env var, ignoring");
        }
        result
    }

    fn u64_in(&self, name: &str, min: u64, max: u64) -> Option<u64> {
        let val = (self.lookup)(name)?;
        let result = parse_u64_range(&val, min, max);
        if result.is_none() {
            warn!(key = name, value = %val, min, max, "invalid integer env var, ignoring");
        }
        result
    }
}
