//! BER-TLV decoding
//!
//! The `parse_*` functions are strict and report every fault. The `decode*`
//! functions walk a stream of records and stop at the first fault, returning
//! what was parsed so far.

use bytes::Bytes;
use tracing::{debug, trace, warn};

use crate::{Tag, TlvError, TlvList, TlvMap, TlvRecord};

/// Largest number of bytes a long-form length may use
const MAX_LENGTH_BYTES: usize = 4;

/// Parse a tag from the start of `input`
///
/// Returns the tag and the number of bytes consumed.
pub fn parse_tag(input: &[u8]) -> Result<(Tag, usize), TlvError> {
    let first = *input.first().ok_or(TlvError::UnexpectedEnd("tag"))?;
    if first & 0x1F != 0x1F {
        return Ok((Tag::new(u32::from(first)), 1));
    }

    let second = *input.get(1).ok_or(TlvError::UnexpectedEnd("tag"))?;
    if second & 0x80 == 0 {
        return Ok((Tag::from_bytes(&input[..2])?, 2));
    }

    if input.len() < 3 {
        return Err(TlvError::UnexpectedEnd("tag"));
    }
    Ok((Tag::from_bytes(&input[..3])?, 3))
}

/// Parse a BER length from the start of `input`
///
/// Returns the length value and the number of bytes consumed.
pub fn parse_length(input: &[u8]) -> Result<(usize, usize), TlvError> {
    let first = *input.first().ok_or(TlvError::UnexpectedEnd("length"))?;
    if first & 0x80 == 0 {
        return Ok((usize::from(first), 1));
    }

    let count = usize::from(first & 0x7F);
    if count == 0 || count > MAX_LENGTH_BYTES {
        return Err(TlvError::InvalidLengthSize(count));
    }
    let bytes = input
        .get(1..=count)
        .ok_or(TlvError::UnexpectedEnd("length"))?;
    let length = bytes.iter().fold(0usize, |acc, b| (acc << 8) | usize::from(*b));

    Ok((length, 1 + count))
}

/// Parse one complete record from the start of `input`
///
/// Returns the record and the number of bytes consumed.
pub fn parse_record(input: &[u8]) -> Result<(TlvRecord, usize), TlvError> {
    let (tag, tag_len) = parse_tag(input)?;
    let (length, length_len) = parse_length(&input[tag_len..])?;

    let start = tag_len + length_len;
    let end = start
        .checked_add(length)
        .filter(|end| *end <= input.len())
        .ok_or(TlvError::UnexpectedEnd("value"))?;

    let value = Bytes::copy_from_slice(&input[start..end]);
    Ok((TlvRecord::new(tag, value), end))
}

/// Decode a stream of records
///
/// Stops at the end of input, at a `00` padding byte where a tag is expected, or at
/// the first malformed record. Records parsed before the stop are returned.
pub fn decode(input: &[u8]) -> TlvList {
    let mut list = TlvList::new();
    let mut pos = 0;

    while pos < input.len() {
        if input[pos] == 0x00 {
            trace!(offset = pos, "Padding byte, ending TLV stream");
            break;
        }

        match parse_record(&input[pos..]) {
            Ok((record, consumed)) => {
                trace!(tag = %record.tag(), length = record.len(), "Decoded TLV record");
                list.push(record);
                pos += consumed;
            }
            Err(e) => {
                debug!(
                    offset = pos,
                    parsed = list.len(),
                    "Malformed TLV data, keeping parsed records: {}",
                    e
                );
                break;
            }
        }
    }

    list
}

/// Decode a stream of records given as hex
///
/// Whitespace is ignored. The input is cut at the first non-hex character and an
/// odd trailing nibble is dropped before decoding.
pub fn decode_hex(input: &str) -> TlvList {
    let cleaned: String = input.chars().filter(|c| !c.is_whitespace()).collect();

    let valid = cleaned
        .find(|c: char| !c.is_ascii_hexdigit())
        .unwrap_or(cleaned.len());
    if valid < cleaned.len() {
        warn!(offset = valid, "Invalid hex character in TLV input, truncating");
    }

    let even = valid - valid % 2;
    if even < valid {
        warn!(length = valid, "Odd-length hex TLV input, dropping trailing nibble");
    }

    match hex::decode(&cleaned[..even]) {
        Ok(bytes) => decode(&bytes),
        Err(e) => {
            warn!("Could not decode hex TLV input: {}", e);
            TlvList::new()
        }
    }
}

/// Decode a stream of records into a tag-keyed map
pub fn decode_to_map(input: &[u8]) -> TlvMap {
    decode(input).to_map()
}

/// Decode a hex stream of records into a tag-keyed map
pub fn decode_hex_to_map(input: &str) -> TlvMap {
    decode_hex(input).to_map()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tag_forms() {
        assert_eq!(parse_tag(&[0x5A, 0x08]).unwrap(), (Tag::new(0x5A), 1));
        assert_eq!(parse_tag(&[0x9F, 0x02, 0x06]).unwrap(), (Tag::new(0x9F02), 2));
        assert_eq!(
            parse_tag(&[0xDF, 0x81, 0x01, 0x01]).unwrap(),
            (Tag::new(0xDF8101), 3)
        );
        assert_eq!(parse_tag(&[0x9F]), Err(TlvError::UnexpectedEnd("tag")));
    }

    #[test]
    fn test_parse_length_forms() {
        assert_eq!(parse_length(&[0x7F]).unwrap(), (127, 1));
        assert_eq!(parse_length(&[0x81, 0x80]).unwrap(), (128, 2));
        assert_eq!(parse_length(&[0x82, 0x01, 0x00]).unwrap(), (256, 3));
        assert_eq!(
            parse_length(&[0x84, 0x00, 0x01, 0x00, 0x00]).unwrap(),
            (0x10000, 5)
        );
        assert_eq!(
            parse_length(&[0x85, 0, 0, 0, 0, 1]),
            Err(TlvError::InvalidLengthSize(5))
        );
        assert_eq!(parse_length(&[0x80]), Err(TlvError::InvalidLengthSize(0)));
        assert_eq!(
            parse_length(&[0x82, 0x01]),
            Err(TlvError::UnexpectedEnd("length"))
        );
    }

    #[test]
    fn test_decode_amount() {
        let list = decode_hex("9F0206000000000100");
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].tag(), Tag::new(0x9F02));
        assert_eq!(list[0].len(), 6);
        assert_eq!(list[0].value_hex(), "000000000100");
    }

    #[test]
    fn test_decode_lowercase_and_multiple() {
        let map = decode_hex_to_map("5a0841111111111111119f3403420302");
        assert_eq!(
            map.value_hex(Tag::new(0x5A)).as_deref(),
            Some("4111111111111111")
        );
        assert_eq!(map.value_hex(Tag::new(0x9F34)).as_deref(), Some("420302"));
    }

    #[test]
    fn test_decode_stops_at_padding() {
        let list = decode(&[0x95, 0x01, 0x80, 0x00, 0x00, 0x9B, 0x02, 0xE8, 0x00]);
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].tag(), Tag::new(0x95));
    }

    #[test]
    fn test_decode_odd_length_keeps_prefix() {
        // Second record is cut inside its value, trailing nibble is odd
        let list = decode_hex("9F02060000000001005A0841111");
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].tag(), Tag::new(0x9F02));
    }

    #[test]
    fn test_decode_length_past_end() {
        // 5F2A claims 2 bytes, 9F02 claims 6 bytes but only 2 follow
        let list = decode_hex("5F2A0209789F02060000");
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].value_hex(), "0978");
    }

    #[test]
    fn test_decode_invalid_hex_truncates() {
        let list = decode_hex("9505008000E800ZZ9B02E800");
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].tag(), Tag::new(0x95));
    }

    #[test]
    fn test_decode_empty() {
        assert!(decode(&[]).is_empty());
        assert!(decode_hex("").is_empty());
        assert!(decode_hex("9").is_empty());
    }
}
