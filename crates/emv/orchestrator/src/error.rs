use crate::Step;

/// Code reported for a kernel service that went away
pub const DISCONNECTED_CODE: i32 = -100;
/// Code reported for a call the kernel refused outright
pub const REJECTED_CODE: i32 = -101;

/// Failure at the kernel IPC boundary
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KernelError {
    /// The kernel answered a call with an error code
    #[error("Kernel call failed with code {code}: {message}")]
    Remote {
        /// Kernel error code
        code: i32,
        /// Kernel error message
        message: String,
    },

    /// The kernel service is not reachable
    #[error("Kernel service disconnected")]
    Disconnected,

    /// The kernel refused the call in its current state
    #[error("Kernel rejected {0}")]
    Rejected(&'static str),
}

impl KernelError {
    /// Create a remote error
    pub fn remote(code: i32, message: impl Into<String>) -> Self {
        Self::Remote {
            code,
            message: message.into(),
        }
    }

    /// Numeric code carried into the consumer-visible outcome
    pub const fn code(&self) -> i32 {
        match self {
            Self::Remote { code, .. } => *code,
            Self::Disconnected => DISCONNECTED_CODE,
            Self::Rejected(_) => REJECTED_CODE,
        }
    }
}

/// Orchestrator errors returned to the consumer
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A transaction is already running
    #[error("A transaction is already in progress")]
    Busy,

    /// No transaction is running
    #[error("No transaction in progress")]
    NoSession,

    /// A consumer reply arrived at the wrong step
    #[error("Reply expected at step {expected} but the transaction is at {current}")]
    UnexpectedReply {
        /// Step the reply answers
        expected: Step,
        /// Step the transaction is at
        current: Step,
    },

    /// Application index outside the candidate list
    #[error("Application index {index} out of range ({count} candidates)")]
    InvalidApplication {
        /// Requested index
        index: usize,
        /// Number of candidates offered
        count: usize,
    },

    /// Amount does not fit the 12-digit amount field
    #[error("Amount {0} exceeds the numeric amount field")]
    InvalidAmount(u64),
}

/// Result type for orchestrator operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_error_codes() {
        assert_eq!(KernelError::remote(-7, "busy").code(), -7);
        assert_eq!(KernelError::Disconnected.code(), DISCONNECTED_CODE);
        assert_eq!(KernelError::Rejected("importPinStatus").code(), REJECTED_CODE);
    }

    #[test]
    fn test_display() {
        let err = Error::UnexpectedReply {
            expected: Step::ShowPinPad,
            current: Step::OnlineProcess,
        };
        assert_eq!(
            err.to_string(),
            "Reply expected at step ShowPinPad but the transaction is at OnlineProcess"
        );
        assert_eq!(
            KernelError::remote(-4001, "no card").to_string(),
            "Kernel call failed with code -4001: no card"
        );
    }
}
