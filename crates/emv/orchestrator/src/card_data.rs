//! Cardholder data extracted from kernel TLVs

use bytes::Bytes;
use nexum_emv_tlv::{
    TlvMap,
    bcd::{self, Expiry},
    tags,
};

/// Shortest PAN accepted
const MIN_PAN_LEN: usize = 12;
/// Longest PAN accepted
const MAX_PAN_LEN: usize = 19;
/// Track 2 field separator nibble
const TRACK2_SEPARATOR: char = 'D';

/// Tags read once record reading completes
pub const CARD_DATA_TAGS: &[nexum_emv_tlv::Tag] = &[
    tags::PAN,
    tags::TRACK_2_EQUIVALENT,
    tags::TRACK_2_DATA,
    tags::CARDHOLDER_NAME,
    tags::EXPIRATION_DATE,
    tags::EXPIRY_DATE_SHORT,
    tags::PAN_SEQUENCE_NUMBER,
    tags::AID,
    tags::TERMINAL_AID,
    tags::APPLICATION_LABEL,
    tags::APPLICATION_PREFERRED_NAME,
    tags::TRANSACTION_CURRENCY_CODE,
    tags::AMOUNT_AUTHORISED,
    tags::CVM_LIST,
    tags::CVM_RESULTS,
];

/// Card data visible to the consumer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardData {
    /// Full PAN
    pub pan: Option<String>,
    /// PAN sequence number
    pub pan_sequence: Option<u8>,
    /// Cardholder name, trimmed
    pub cardholder_name: Option<String>,
    /// Application expiry
    pub expiry: Option<Expiry>,
    /// Application identifier
    pub aid: Option<Bytes>,
    /// Application label or preferred name
    pub application_label: Option<String>,
    /// ISO 4217 numeric currency code
    pub currency_code: Option<u16>,
    /// Amount the kernel holds, in minor units
    pub amount: Option<u64>,
}

impl CardData {
    /// Extract card data from decoded kernel TLVs
    pub fn from_tlv(map: &TlvMap, contactless: bool) -> Self {
        Self {
            pan: extract_pan(map, contactless),
            pan_sequence: map
                .value(tags::PAN_SEQUENCE_NUMBER)
                .and_then(bcd::parse_numeric)
                .and_then(|n| u8::try_from(n).ok()),
            cardholder_name: map.value(tags::CARDHOLDER_NAME).and_then(ascii_text),
            expiry: map
                .value(tags::EXPIRATION_DATE)
                .and_then(bcd::parse_expiry)
                .or_else(|| map.value(tags::EXPIRY_DATE_SHORT).and_then(bcd::parse_expiry)),
            aid: aid(map),
            application_label: map
                .value(tags::APPLICATION_PREFERRED_NAME)
                .and_then(ascii_text)
                .or_else(|| map.value(tags::APPLICATION_LABEL).and_then(ascii_text)),
            currency_code: map
                .value(tags::TRANSACTION_CURRENCY_CODE)
                .and_then(bcd::parse_numeric)
                .and_then(|n| u16::try_from(n).ok()),
            amount: map
                .value_hex(tags::AMOUNT_AUTHORISED)
                .and_then(|hex| bcd::parse_amount_minor(&hex)),
        }
    }

    /// Masked PAN, for display and logs
    pub fn masked_pan(&self) -> Option<String> {
        self.pan.as_deref().map(mask_pan)
    }
}

/// Card AID (`4F`), falling back to the terminal AID (`9F06`)
pub fn aid(map: &TlvMap) -> Option<Bytes> {
    [tags::AID, tags::TERMINAL_AID]
        .into_iter()
        .filter_map(|tag| map.get(tag))
        .find(|record| !record.is_empty())
        .map(|record| record.value_bytes())
}

/// PAN from `5A`, else Track 2 (`57`), else for contactless `9F6B`
pub fn extract_pan(map: &TlvMap, contactless: bool) -> Option<String> {
    if let Some(pan) = map.value(tags::PAN).and_then(|v| normalize_pan(&hex::encode_upper(v))) {
        return Some(pan);
    }
    if let Some(pan) = map.value(tags::TRACK_2_EQUIVALENT).and_then(pan_from_track2) {
        return Some(pan);
    }
    if contactless {
        return map.value(tags::TRACK_2_DATA).and_then(pan_from_track2);
    }
    None
}

/// PAN digits before the Track 2 separator
pub fn pan_from_track2(track2: &[u8]) -> Option<String> {
    let hex = hex::encode_upper(track2);
    let digits = hex.split(TRACK2_SEPARATOR).next()?;
    normalize_pan(digits)
}

/// Strip `F` padding and validate a PAN
pub fn normalize_pan(raw: &str) -> Option<String> {
    let pan = raw.trim().trim_end_matches(['F', 'f']);
    let valid = (MIN_PAN_LEN..=MAX_PAN_LEN).contains(&pan.len())
        && pan.bytes().all(|b| b.is_ascii_digit());
    valid.then(|| pan.to_owned())
}

/// Keep the first six and last four digits
pub fn mask_pan(pan: &str) -> String {
    let len = pan.chars().count();
    if len <= 10 {
        return "*".repeat(len);
    }
    pan.chars()
        .enumerate()
        .map(|(i, c)| if i < 6 || i >= len - 4 { c } else { '*' })
        .collect()
}

fn ascii_text(value: &[u8]) -> Option<String> {
    let text: String = value
        .iter()
        .filter(|b| b.is_ascii() && !b.is_ascii_control())
        .map(|&b| char::from(b))
        .collect();
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_owned())
}

#[cfg(test)]
mod tests {
    use nexum_emv_tlv::decode_hex_to_map;

    use super::*;

    #[test]
    fn test_pan_from_5a_strips_padding() {
        let map = decode_hex_to_map("5A0A6799998900000060019F");
        assert_eq!(extract_pan(&map, false).as_deref(), Some("6799998900000060019"));
    }

    #[test]
    fn test_pan_from_track2() {
        let map = decode_hex_to_map("57134761739001010010D22122011143804400000F");
        assert_eq!(extract_pan(&map, false).as_deref(), Some("4761739001010010"));
    }

    #[test]
    fn test_pan_from_contactless_track2_only() {
        let map = decode_hex_to_map("9F6B135413330089600010D25122010000000000000F");
        assert_eq!(extract_pan(&map, false), None);
        assert_eq!(extract_pan(&map, true).as_deref(), Some("5413330089600010"));
    }

    #[test]
    fn test_mask_pan() {
        assert_eq!(mask_pan("4761739001010010"), "476173******0010");
        assert_eq!(mask_pan("1234"), "****");
    }

    #[test]
    fn test_mask_pan_non_ascii() {
        assert_eq!(mask_pan("4761é39001010010"), "4761é3******0010");
        assert_eq!(mask_pan("€€€€€€€€€€€€"), "€€€€€€**€€€€");
        assert_eq!(mask_pan("é"), "*");
    }

    #[test]
    fn test_card_data_from_tlv() {
        let map = decode_hex_to_map(concat!(
            "5A0847617390010100105F200F56495341204143515549524552202F",
            "5F24032512315F3401014F07A0000000031010500B56495341204352454449545F2A020978",
            "9F0206000000012345"
        ));
        let card = CardData::from_tlv(&map, false);

        assert_eq!(card.pan.as_deref(), Some("4761739001010010"));
        assert_eq!(card.cardholder_name.as_deref(), Some("VISA ACQUIRER /"));
        assert_eq!(card.expiry.map(|e| e.to_string()).as_deref(), Some("12/25"));
        assert_eq!(card.pan_sequence, Some(1));
        assert_eq!(card.aid.as_deref(), Some(&hex::decode("A0000000031010").unwrap()[..]));
        assert_eq!(card.application_label.as_deref(), Some("VISA CREDIT"));
        assert_eq!(card.currency_code, Some(978));
        assert_eq!(card.amount, Some(12_345));
        assert_eq!(card.masked_pan().as_deref(), Some("476173******0010"));
    }

    #[test]
    fn test_normalize_pan_rejects_garbage() {
        assert_eq!(normalize_pan("12345"), None);
        assert_eq!(normalize_pan("47617390010100AB"), None);
        assert_eq!(normalize_pan("4761739001010010FF").as_deref(), Some("4761739001010010"));
    }
}
