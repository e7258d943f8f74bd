//! Per-session buffering and the decision of when to translate.
//!
//! The [`DebounceEngine`] looks at each incoming fragment together with the
//! session's pending buffer and last attempt time, and answers either
//! [`Action::Hold`] or [`Action::Translate`]. The [`SessionRegistry`] owns one
//! [`Session`] record per connected client and runs the engine against it.

pub mod debounce;
pub mod registry;
pub mod session;

pub use debounce::{Action, DebounceConfig, DebounceEngine};
pub use registry::{SessionGuard, SessionRegistry};
pub use session::{Session, SessionSnapshot, SessionState};
