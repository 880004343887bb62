use thiserror::Error;

/// Failure surfaced by a [`GenerativeBackend`](super::GenerativeBackend) call.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Backend returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Authentication failed: {0}")]
    Auth(String),
}

impl BackendError {
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }

    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    /// Faults worth retrying even under a conservative policy: connection
    /// problems, timeouts, throttling and server-side errors.
    pub fn is_transient(&self) -> bool {
        match self {
            BackendError::Transport(_) => true,
            BackendError::Status { status, .. } => {
                matches!(*status, 408 | 429) || (500..=599).contains(status)
            }
            BackendError::MalformedResponse(_) => false,
            BackendError::Auth(_) => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Backend call failed: {0}")]
    Backend(#[from] BackendError),

    #[error("Generation failed after {attempts} attempt(s): {source}")]
    RetryExhausted {
        attempts: u32,
        #[source]
        source: BackendError,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ChatError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(BackendError::status(429, "quota").is_transient());
        assert!(BackendError::status(503, "unavailable").is_transient());
        assert!(BackendError::status(408, "timeout").is_transient());
        assert!(!BackendError::status(400, "bad request").is_transient());
        assert!(!BackendError::status(403, "denied").is_transient());
        assert!(!BackendError::malformed("no candidates").is_transient());
        assert!(!BackendError::auth("expired").is_transient());
    }

    #[test]
    fn test_retry_exhausted_message_carries_last_error() {
        let error = ChatError::RetryExhausted {
            attempts: 3,
            source: BackendError::status(500, "boom"),
        };

        assert_eq!(
            error.to_string(),
            "Generation failed after 3 attempt(s): Backend returned HTTP 500: boom"
        );
        assert!(std::error::Error::source(&error).is_some());
    }
}
