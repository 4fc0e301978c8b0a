//! Binary-coded decimal helpers for numeric EMV data objects
//!
//! Parse failures return `None`; callers treat a missing or malformed value the
//! same as an absent tag.

use derive_more::Display;

/// Number of hex characters in an `n 12` amount field
const AMOUNT_HEX_LEN: usize = 12;

/// Largest amount representable in six BCD bytes
pub const MAX_AMOUNT_MINOR: u64 = 999_999_999_999;

/// Parse a BCD amount in minor units from hex (e.g. the value of `9F02`)
///
/// Only the first 12 hex characters are read. Empty input, fewer than 12
/// characters or a non-decimal nibble give `None`.
pub fn parse_amount_minor(hex: &str) -> Option<u64> {
    let digits = hex.get(..AMOUNT_HEX_LEN)?;
    digits.chars().try_fold(0u64, |acc, c| {
        c.to_digit(10).map(|d| acc * 10 + u64::from(d))
    })
}

/// Encode an amount in minor units as six BCD bytes
pub fn amount_to_bcd(minor: u64) -> Option<[u8; 6]> {
    if minor > MAX_AMOUNT_MINOR {
        return None;
    }
    let mut out = [0u8; 6];
    let mut rest = minor;
    for byte in out.iter_mut().rev() {
        let lo = (rest % 10) as u8;
        let hi = ((rest / 10) % 10) as u8;
        *byte = (hi << 4) | lo;
        rest /= 100;
    }
    Some(out)
}

/// Parse packed BCD digits into an integer
///
/// Returns `None` on an empty input, a non-decimal nibble or overflow.
pub fn parse_numeric(bytes: &[u8]) -> Option<u64> {
    if bytes.is_empty() {
        return None;
    }
    bytes.iter().try_fold(0u64, |acc, b| {
        let (hi, lo) = (b >> 4, b & 0x0F);
        if hi > 9 || lo > 9 {
            return None;
        }
        acc.checked_mul(100)?.checked_add(u64::from(hi * 10 + lo))
    })
}

/// Card expiry date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[display("{month:02}/{year:02}")]
pub struct Expiry {
    /// Two-digit year
    pub year: u8,
    /// Month, 1 to 12
    pub month: u8,
    /// Day of month when the source carried one
    pub day: Option<u8>,
}

/// Parse a BCD expiry date, YYMM (`59`) or YYMMDD (`5F24`)
pub fn parse_expiry(bytes: &[u8]) -> Option<Expiry> {
    let digit_pair = |b: u8| -> Option<u8> {
        let (hi, lo) = (b >> 4, b & 0x0F);
        (hi <= 9 && lo <= 9).then_some(hi * 10 + lo)
    };

    let (year, month, day) = match bytes {
        [yy, mm] => (digit_pair(*yy)?, digit_pair(*mm)?, None),
        [yy, mm, dd] => (digit_pair(*yy)?, digit_pair(*mm)?, Some(digit_pair(*dd)?)),
        _ => return None,
    };

    if !(1..=12).contains(&month) {
        return None;
    }
    Some(Expiry { year, month, day })
}
