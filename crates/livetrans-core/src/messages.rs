use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::errors::TranslateError;
use crate::ids::SessionId;

/// One translation call in flight. Never persisted.
#[derive(Clone, Debug)]
pub struct TranslationRequest {
    pub session_id: SessionId,
    pub text: String,
    pub submitted_at: Instant,
}

impl TranslationRequest {
    pub fn new(session_id: SessionId, text: impl Into<String>) -> Self {
        Self {
            session_id,
            text: text.into(),
            submitted_at: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.submitted_at.elapsed()
    }

    /// Turn the translator's outcome into the message sent back to the client.
    pub fn into_response(self, outcome: Result<String, TranslateError>) -> TranslationResponse {
        match outcome {
            Ok(translation) => TranslationResponse::Success {
                translation,
                original: self.text,
            },
            Err(e) => TranslationResponse::Error {
                error: e.to_string(),
                original: self.text,
            },
        }
    }
}

/// Outbound message, tagged by `status`.
///
/// ```json
/// {"status": "success", "translation": "...", "original": "..."}
/// {"status": "error", "error": "...", "original": "..."}
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum TranslationResponse {
    Success { translation: String, original: String },
    Error { error: String, original: String },
}

impl TranslationResponse {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn original(&self) -> &str {
        match self {
            Self::Success { original, .. } | Self::Error { original, .. } => original,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
