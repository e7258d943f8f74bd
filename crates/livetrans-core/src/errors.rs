use std::time::Duration;

use crate::ids::SessionId;

/// Failure of a translation call.
///
/// Classified as retryable (transient transport or service trouble) or not,
/// so decorators can decide whether another attempt is worthwhile.
#[derive(Clone, Debug, thiserror::Error)]
pub enum TranslateError {
    // Not retryable
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("translation engine error: {0}")]
    Engine(String),

    // Retryable
    #[error("rate limited")]
    RateLimited { retry_after: Option<Duration> },
    #[error("server error {status}: {body}")]
    ServerError { status: u16, body: String },
    #[error("network error: {0}")]
    Network(String),

    // Operational
    #[error("timeout after {0:?}")]
    Timeout(Duration),
    #[error("translator unavailable: {0}")]
    Unavailable(String),
}

impl TranslateError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::ServerError { .. } | Self::Network(_)
        )
    }

    /// Whether this failure says the engine itself is unhealthy.
    ///
    /// Input-shaped failures belong to one caller and must not open a
    /// breaker shared by every session.
    pub fn indicates_outage(&self) -> bool {
        self.is_retryable() || matches!(self, Self::Timeout(_))
    }

    pub fn suggested_delay(&self) -> Option<Duration> {
        if let Self::RateLimited { retry_after } = self {
            *retry_after
        } else {
            None
        }
    }

    /// Short classification string for logging/metrics.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::AuthenticationFailed(_) => "authentication_failed",
            Self::MalformedResponse(_) => "malformed_response",
            Self::Engine(_) => "engine",
            Self::RateLimited { .. } => "rate_limited",
            Self::ServerError { .. } => "server_error",
            Self::Network(_) => "network",
            Self::Timeout(_) => "timeout",
            Self::Unavailable(_) => "unavailable",
        }
    }

    /// Classify an HTTP status code into the appropriate error variant.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => Self::AuthenticationFailed(body),
            400 | 413 | 414 | 422 => Self::InvalidInput(body),
            429 => Self::RateLimited { retry_after: None },
            500..=599 => Self::ServerError { status, body },
            _ => Self::Engine(format!("unexpected status {status}: {body}")),
        }
    }
}

/// Failure of a session registry operation.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("session {0} not found")]
    NotFound(SessionId),
    #[error("session identifiers exhausted")]
    Exhausted,
    #[error("session capacity of {limit} reached")]
    CapacityExceeded { limit: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(TranslateError::RateLimited { retry_after: None }.is_retryable());
        assert!(TranslateError::ServerError { status: 502, body: "bad gateway".into() }.is_retryable());
        assert!(TranslateError::Network("reset".into()).is_retryable());
    }

    #[test]
    fn not_retryable() {
        assert!(!TranslateError::InvalidInput("empty".into()).is_retryable());
        assert!(!TranslateError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(!TranslateError::Unavailable("circuit open".into()).is_retryable());
        assert!(!TranslateError::MalformedResponse("no field".into()).is_retryable());
    }

    #[test]
    fn outage_classification() {
        assert!(TranslateError::Network("reset".into()).indicates_outage());
        assert!(TranslateError::Timeout(Duration::from_secs(1)).indicates_outage());
        assert!(TranslateError::ServerError { status: 503, body: String::new() }.indicates_outage());
        assert!(!TranslateError::InvalidInput("too long".into()).indicates_outage());
        assert!(!TranslateError::MalformedResponse("no field".into()).indicates_outage());
        assert!(!TranslateError::Engine("unexpected".into()).indicates_outage());
    }

    #[test]
    fn suggested_delay_only_for_rate_limit() {
        let rl = TranslateError::RateLimited {
            retry_after: Some(Duration::from_secs(2)),
        };
        assert_eq!(rl.suggested_delay(), Some(Duration::from_secs(2)));
        assert_eq!(TranslateError::Network("x".into()).suggested_delay(), None);
    }

    #[test]
    fn from_status_mapping() {
        assert!(matches!(
            TranslateError::from_status(403, "quota".into()),
            TranslateError::AuthenticationFailed(_)
        ));
        assert!(matches!(
            TranslateError::from_status(414, "too long".into()),
            TranslateError::InvalidInput(_)
        ));
        assert!(TranslateError::from_status(429, String::new()).is_retryable());
        assert!(TranslateError::from_status(503, "down".into()).is_retryable());
        assert!(matches!(
            TranslateError::from_status(302, "moved".into()),
            TranslateError::Engine(_)
        ));
    }

    #[test]
    fn display_is_client_readable() {
        let err = TranslateError::ServerError { status: 500, body: "boom".into() };
        assert_eq!(err.to_string(), "server error 500: boom");
        assert_eq!(TranslateError::Timeout(Duration::from_secs(3)).to_string(), "timeout after 3s");
    }

    #[test]
    fn registry_error_display() {
        let err = RegistryError::NotFound(SessionId::from_raw(9));
        assert_eq!(err.to_string(), "session sess_9 not found");
        let err = RegistryError::CapacityExceeded { limit: 2 };
        assert_eq!(err.to_string(), "session capacity of 2 reached");
    }
}
