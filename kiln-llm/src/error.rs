/// Errors raised by completion clients
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    #[error("Rate limited: {message}")]
    RateLimit {
        message: String,
        retry_after: Option<u64>,
    },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Failed to parse response: {message}")]
    Parse { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl LlmError {
    /// Map a non-success HTTP status and body to the matching variant.
    pub fn from_status(status: u16, body: String, retry_after: Option<u64>) -> Self {
        match status {
            401 | 403 => LlmError::Authentication { message: body },
            429 => LlmError::RateLimit {
                message: body,
                retry_after,
            },
            400 | 404 | 422 => LlmError::InvalidRequest { message: body },
            _ => LlmError::Api {
                status,
                message: body,
            },
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::RateLimit { .. } | LlmError::Network { .. } => true,
            LlmError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            LlmError::Parse {
                message: err.to_string(),
            }
        } else {
            LlmError::Network {
                message: err.to_string(),
            }
        }
    }
}

impl From<serde_json::Error> for LlmError {
    fn from(err: serde_json::Error) -> Self {
        LlmError::Parse {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            LlmError::from_status(401, "bad key".into(), None),
            LlmError::Authentication { .. }
        ));
        assert!(matches!(
            LlmError::from_status(429, "slow down".into(), Some(12)),
            LlmError::RateLimit {
                retry_after: Some(12),
                ..
            }
        ));
        assert!(matches!(
            LlmError::from_status(400, "bad".into(), None),
            LlmError::InvalidRequest { .. }
        ));
        assert!(matches!(
            LlmError::from_status(529, "overloaded".into(), None),
            LlmError::Api { status: 529, .. }
        ));
    }

    #[test]
    fn test_retryable() {
        assert!(LlmError::from_status(503, String::new(), None).is_retryable());
        assert!(!LlmError::from_status(401, String::new(), None).is_retryable());
    }
}
