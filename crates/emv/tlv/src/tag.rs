//! Tag identifier for BER-TLV data objects

use std::fmt;
use std::str::FromStr;

use crate::TlvError;

/// BER-TLV tag (1 to 3 bytes)
///
/// The tag bytes are stored big-endian in a `u32`, so `9F02` is `Tag::new(0x9F02)`.
/// Comparison is numeric, which makes hex case irrelevant; display is always
/// uppercase and padded to the tag's byte width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "String"))]
pub struct Tag(u32);

impl Tag {
    /// Create a tag from its big-endian numeric value
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Numeric value of the tag
    pub const fn value(&self) -> u32 {
        self.0
    }

    /// Number of bytes the tag occupies on the wire
    pub const fn byte_len(&self) -> usize {
        if self.0 > 0xFFFF {
            3
        } else if self.0 > 0xFF {
            2
        } else {
            1
        }
    }

    /// Build a tag from its wire bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TlvError> {
        if bytes.is_empty() || bytes.len() > 3 || (bytes.len() > 1 && bytes[0] == 0) {
            return Err(TlvError::InvalidTag(hex::encode_upper(bytes)));
        }
        Ok(Self(
            bytes.iter().fold(0u32, |acc, b| (acc << 8) | u32::from(*b)),
        ))
    }

    /// Wire bytes of the tag
    pub fn to_bytes(&self) -> Vec<u8> {
        let bytes = self.0.to_be_bytes();
        bytes[4 - self.byte_len()..].to_vec()
    }

    /// Whether the tag denotes a constructed data object (bit 6 of the first byte)
    pub fn is_constructed(&self) -> bool {
        self.to_bytes()[0] & 0x20 != 0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.byte_len() {
            1 => write!(f, "{:02X}", self.0),
            2 => write!(f, "{:04X}", self.0),
            _ => write!(f, "{:06X}", self.0),
        }
    }
}

impl FromStr for Tag {
    type Err = TlvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s.trim())?;
        Self::from_bytes(&bytes)
    }
}

impl TryFrom<String> for Tag {
    type Error = TlvError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<u32> for Tag {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_uppercase_and_padded() {
        assert_eq!(Tag::new(0x5A).to_string(), "5A");
        assert_eq!(Tag::new(0x9f02).to_string(), "9F02");
        assert_eq!(Tag::new(0xDF8101).to_string(), "DF8101");
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        let lower: Tag = "9f6b".parse().unwrap();
        let upper: Tag = "9F6B".parse().unwrap();
        assert_eq!(lower, upper);
        assert_eq!(lower, Tag::new(0x9F6B));
    }

    #[test]
    fn test_invalid_tags() {
        assert!("".parse::<Tag>().is_err());
        assert!("9F0203AA".parse::<Tag>().is_err());
        assert!("9G".parse::<Tag>().is_err());
    }

    #[test]
    fn test_leading_zero_byte_rejected() {
        assert!(matches!("005A".parse::<Tag>(), Err(TlvError::InvalidTag(tag)) if tag == "005A"));
        assert!(Tag::from_bytes(&[0x00, 0x9F, 0x02]).is_err());
        assert_eq!("00".parse::<Tag>().unwrap(), Tag::new(0x00));
    }

    #[test]
    fn test_to_bytes() {
        assert_eq!(Tag::new(0x8E).to_bytes(), vec![0x8E]);
        assert_eq!(Tag::new(0x5F2A).to_bytes(), vec![0x5F, 0x2A]);
        assert!(Tag::new(0x70).is_constructed());
        assert!(!Tag::new(0x5A).is_constructed());
    }
}
