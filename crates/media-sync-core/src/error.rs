use media_sync_sources::SourceError;
use media_sync_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    /// The run was cancelled. Never retried, never reported as a failure.
    #[error("operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Remote(#[from] SourceError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Invalid backup file.\n{0}")]
    InvalidBackup(String),

    #[error("invalid rating {0}, expected a value between 0 and 10")]
    InvalidRating(u8),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("scheduler error: {0}")]
    Scheduler(String),
}

impl SyncError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SyncError::Cancelled)
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, SyncError::Remote(e) if e.is_unauthorized())
    }

    pub fn is_account_limits(&self) -> bool {
        matches!(self, SyncError::Remote(e) if e.is_account_limits())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, SyncError::Remote(e) if e.is_not_found())
    }

    /// Transient network or store I/O failures.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Remote(e) => e.is_retryable(),
            SyncError::Store(StoreError::Io(_)) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let unauthorized: SyncError = SourceError::Unauthorized("expired".to_string()).into();
        assert!(unauthorized.is_unauthorized());
        assert!(!unauthorized.is_retryable());

        let limits: SyncError = SourceError::AccountLimits("lists".to_string()).into();
        assert!(limits.is_account_limits());

        let network: SyncError = SourceError::Network("reset".to_string()).into();
        assert!(network.is_retryable());

        assert!(SyncError::Cancelled.is_cancelled());
        assert!(!SyncError::Cancelled.is_retryable());
    }

    #[test]
    fn test_invalid_backup_message() {
        let error = SyncError::InvalidBackup("expected value at line 1".to_string());
        assert_eq!(error.to_string(), "Invalid backup file.\nexpected value at line 1");
    }
}
