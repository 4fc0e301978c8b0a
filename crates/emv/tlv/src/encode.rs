//! BER-TLV encoding

use bytes::{BufMut, Bytes, BytesMut};

use crate::{TlvError, TlvRecord};

/// Encode a BER length
///
/// Lengths up to `0xFFFFFF` are supported; anything longer is rejected.
pub fn encode_length(length: usize) -> Result<Vec<u8>, TlvError> {
    match length {
        0..=0x7F => Ok(vec![length as u8]),
        0x80..=0xFF => Ok(vec![0x81, length as u8]),
        0x100..=0xFFFF => Ok(vec![0x82, (length >> 8) as u8, length as u8]),
        0x1_0000..=0xFF_FFFF => Ok(vec![
            0x83,
            (length >> 16) as u8,
            (length >> 8) as u8,
            length as u8,
        ]),
        _ => Err(TlvError::LengthOverflow(length)),
    }
}

/// Encode a single record
pub fn encode(record: &TlvRecord) -> Result<Bytes, TlvError> {
    let tag = record.tag().to_bytes();
    let length = encode_length(record.len())?;

    let mut buf = BytesMut::with_capacity(tag.len() + length.len() + record.len());
    buf.put_slice(&tag);
    buf.put_slice(&length);
    buf.put_slice(record.value());
    Ok(buf.freeze())
}

/// Encode records back to back, in iteration order
pub fn encode_all<'a, I>(records: I) -> Result<Bytes, TlvError>
where
    I: IntoIterator<Item = &'a TlvRecord>,
{
    let mut buf = BytesMut::new();
    for record in records {
        buf.put_slice(&encode(record)?);
    }
    Ok(buf.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Tag, decode};

    #[test]
    fn test_length_boundaries() {
        assert_eq!(hex::encode_upper(encode_length(0).unwrap()), "00");
        assert_eq!(hex::encode_upper(encode_length(127).unwrap()), "7F");
        assert_eq!(hex::encode_upper(encode_length(128).unwrap()), "8180");
        assert_eq!(hex::encode_upper(encode_length(255).unwrap()), "81FF");
        assert_eq!(hex::encode_upper(encode_length(256).unwrap()), "820100");
        assert_eq!(hex::encode_upper(encode_length(65536).unwrap()), "83010000");
        assert_eq!(
            encode_length(16_777_216),
            Err(TlvError::LengthOverflow(16_777_216))
        );
    }

    #[test]
    fn test_encode_amount() {
        let record = TlvRecord::new(Tag::new(0x9F02), vec![0x00, 0x00, 0x00, 0x00, 0x01, 0x00]);
        let encoded = encode(&record).unwrap();
        assert_eq!(hex::encode_upper(&encoded), "9F0206000000000100");

        let decoded = decode(&encoded);
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0], record);
    }

    #[test]
    fn test_encode_long_value_round_trips() {
        let record = TlvRecord::new(Tag::new(0xDF8101), vec![0xAB; 300]);
        let encoded = encode(&record).unwrap();
        assert_eq!(&encoded[..6], &[0xDF, 0x81, 0x01, 0x82, 0x01, 0x2C]);
        assert_eq!(decode(&encoded)[0], record);
    }

    #[test]
    fn test_encode_all_preserves_order() {
        let records = [
            TlvRecord::new(Tag::new(0x5F2A), vec![0x09, 0x78]),
            TlvRecord::new(Tag::new(0x9A), vec![0x26, 0x10, 0x16]),
        ];
        let encoded = encode_all(&records).unwrap();
        assert_eq!(hex::encode_upper(&encoded), "5F2A0209789A03261016");
    }
}
