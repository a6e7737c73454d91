use thiserror::Error;

/// Errors raised by a remote service call.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    /// Credential invalid or expired (HTTP 401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Account tier limits exceeded (HTTP 420), e.g. too many lists or watchlist items.
    #[error("account limits reached: {0}")]
    AccountLimits(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("not authenticated")]
    NotAuthenticated,
}

impl SourceError {
    /// Map a non-success HTTP status to its error variant.
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            401 => SourceError::Unauthorized(message),
            404 => SourceError::NotFound(message),
            420 => SourceError::AccountLimits(message),
            429 => SourceError::RateLimited(message),
            _ => SourceError::Http { status, message },
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, SourceError::Unauthorized(_) | SourceError::NotAuthenticated)
    }

    pub fn is_account_limits(&self) -> bool {
        matches!(self, SourceError::AccountLimits(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, SourceError::NotFound(_))
    }

    /// Transient failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            SourceError::Network(_) | SourceError::RateLimited(_) => true,
            SourceError::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            return SourceError::Decode(e.to_string());
        }
        match e.status() {
            Some(status) => SourceError::from_status(status.as_u16(), e.to_string()),
            None => SourceError::Network(e.to_string()),
        }
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(e: serde_json::Error) -> Self {
        SourceError::Decode(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(SourceError::from_status(401, String::new()).is_unauthorized());
        assert!(SourceError::from_status(420, String::new()).is_account_limits());
        assert!(SourceError::from_status(404, String::new()).is_not_found());
        assert!(SourceError::from_status(429, String::new()).is_retryable());
        assert!(SourceError::from_status(503, String::new()).is_retryable());
        assert!(!SourceError::from_status(400, String::new()).is_retryable());
        assert!(!SourceError::from_status(420, String::new()).is_retryable());
        assert!(!SourceError::Decode("bad".to_string()).is_retryable());
    }
}
