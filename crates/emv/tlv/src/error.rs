//! Error type for TLV parsing and encoding

/// Errors raised while parsing or encoding TLV data
///
/// Stream decoding never surfaces these to the caller; they end the stream and
/// are logged. The strict single-record functions return them directly.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TlvError {
    /// Input ended in the middle of a record
    #[error("Unexpected end of data while parsing {0}")]
    UnexpectedEnd(&'static str),

    /// Long-form length announced zero or more than four length bytes
    #[error("Invalid length encoding: {0} length bytes")]
    InvalidLengthSize(usize),

    /// Value is too long to encode in the supported length forms
    #[error("Length {0} exceeds 4 encodable bytes")]
    LengthOverflow(usize),

    /// Tag is empty, longer than three bytes or otherwise unusable
    #[error("Invalid tag: {0}")]
    InvalidTag(String),

    /// Hex input could not be decoded
    #[error("Invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}
