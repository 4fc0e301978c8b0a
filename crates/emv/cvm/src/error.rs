//! Error type for CVM data parsing

/// Errors raised while parsing CVM data objects
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CvmError {
    /// CVM List is shorter than its 8-byte amount prefix
    #[error("CVM List too short: {0} bytes")]
    ListTooShort(usize),

    /// CVM Results is not exactly 3 bytes
    #[error("CVM Results must be 3 bytes, got {0}")]
    InvalidResultsLength(usize),

    /// Input was not valid hex
    #[error("Invalid hex in CVM data")]
    InvalidHex,
}
