//! # livetrans-settings
//!
//! Settings are loaded from layers, later ones winning:
//! 1. **Compiled defaults**: [`RelaySettings::default()`]
//! 2. **User file**: `~/.livetrans/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `LIVETRANS_*` overrides
//!
//! The binary applies its command-line flags on top.

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{apply_overrides, deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;
