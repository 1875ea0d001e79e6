//! Error types for the push notification client.
//!
//! Nothing in the activation flow is fatal: every variant here is caught where it
//! occurs, logged, and turned into a fallback (no channel, or an "unexpected
//! activation" message). The enum exists so those failure points have names.

use std::fmt;

use thiserror::Error;

/// A 32-bit platform status code, in the HRESULT style used by the notification service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct ErrorCode(pub i32);

impl ErrorCode {
    pub const S_OK: ErrorCode = ErrorCode(0);
    pub const E_ABORT: ErrorCode = ErrorCode(0x8000_4004_u32 as i32);
    pub const E_FAIL: ErrorCode = ErrorCode(0x8000_4005_u32 as i32);

    /// Failure codes have the severity bit set.
    pub fn is_failure(self) -> bool {
        self.0 < 0
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.0 as u32)
    }
}

impl From<i32> for ErrorCode {
    fn from(value: i32) -> Self {
        ErrorCode(value)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PushError {
    #[error("Activator not supported: {0}")]
    ServiceUnsupported(String),
    #[error("Channel request retrying (retry {retry_count}): {error_code}")]
    NegotiationTransientRetry { retry_count: u32, error_code: ErrorCode },
    #[error("Channel request failed: {error_code}")]
    NegotiationFailure { error_code: ErrorCode },
    #[error("Channel request timed out after {0:?}")]
    NegotiationTimeout(std::time::Duration),
    #[error("Unexpected activation kind: {0}")]
    UnexpectedActivationKind(String),
    #[error("State transition error: {0}")]
    StateTransition(String),
    #[error("Platform error: {operation} - {error_code}")]
    Platform {
        operation: String,
        error_code: ErrorCode,
    },
}

impl PushError {
    pub fn platform(operation: impl Into<String>, error_code: ErrorCode) -> Self {
        PushError::Platform {
            operation: operation.into(),
            error_code,
        }
    }

    /// The platform status code carried by this error, if any.
    pub fn error_code(&self) -> Option<ErrorCode> {
        match self {
            PushError::NegotiationTransientRetry { error_code, .. }
            | PushError::NegotiationFailure { error_code }
            | PushError::Platform { error_code, .. } => Some(*error_code),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, PushError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_display_is_hex() {
        assert_eq!(ErrorCode::E_FAIL.to_string(), "0x80004005");
        assert_eq!(ErrorCode::S_OK.to_string(), "0x00000000");
        assert!(ErrorCode::E_ABORT.is_failure());
        assert!(!ErrorCode::S_OK.is_failure());
    }

    #[test]
    fn test_error_code_extraction() {
        let err = PushError::NegotiationTransientRetry {
            retry_count: 2,
            error_code: ErrorCode::E_FAIL,
        };
        assert_eq!(err.error_code(), Some(ErrorCode::E_FAIL));
        assert!(err.to_string().contains("retry 2"));

        let err = PushError::UnexpectedActivationKind("file".to_string());
        assert_eq!(err.error_code(), None);
    }
}
