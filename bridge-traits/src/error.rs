//! Errors reported by host bridges.
//!
//! Play refusals are not errors in this sense; see
//! [`PlayRejection`](crate::media::PlayRejection).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    /// The host refused the media source outright (unknown scheme, empty URI).
    #[error("Media source rejected: {source_uri}: {reason}")]
    SourceRejected { source_uri: String, reason: String },

    /// A command reached a surface that was already detached.
    #[error("Media surface is detached")]
    Detached,
}

impl BridgeError {
    /// Whether retrying the same call later could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, BridgeError::OperationFailed(_))
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(BridgeError::OperationFailed("busy".into()).is_transient());
        assert!(!BridgeError::Detached.is_transient());
        assert!(!BridgeError::NotAvailable("audio".into()).is_transient());
    }

    #[test]
    fn test_source_rejected_message() {
        let err = BridgeError::SourceRejected {
            source_uri: "ftp://clip".into(),
            reason: "unsupported scheme".into(),
        };
        assert_eq!(
            err.to_string(),
            "Media source rejected: ftp://clip: unsupported scheme"
        );
    }
}
