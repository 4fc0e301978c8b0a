//! Best-effort decline diagnostics
//!
//! Nothing here changes the outcome of a transaction; the values are only
//! logged to help explain a decline.

use nexum_emv_tlv::{Tag, TlvMap, decode_to_map, tags};
use tracing::{debug, warn};

use crate::{Kernel, ResultCode, TlvSpace};

/// Tags read after a decline
pub const DIAGNOSTIC_TAGS: &[Tag] = &[
    tags::AID,
    tags::TERMINAL_AID,
    tags::CAPK_INDEX,
    tags::TVR,
    tags::TSI,
];

/// TVR bit descriptions, by byte then bit 8 down to bit 1
const TVR_BITS: [[Option<&str>; 8]; 5] = [
    [
        Some("Offline data authentication was not performed"),
        Some("SDA failed"),
        Some("ICC data missing"),
        Some("Card appears on terminal exception file"),
        Some("DDA failed"),
        Some("CDA failed"),
        Some("SDA selected"),
        None,
    ],
    [
        Some("ICC and terminal have different application versions"),
        Some("Expired application"),
        Some("Application not yet effective"),
        Some("Requested service not allowed for card product"),
        Some("New card"),
        None,
        None,
        None,
    ],
    [
        Some("Cardholder verification was not successful"),
        Some("Unrecognised CVM"),
        Some("PIN try limit exceeded"),
        Some("PIN entry required and PIN pad not present or not working"),
        Some("PIN entry required, PIN pad present, but PIN was not entered"),
        Some("Online PIN entered"),
        None,
        None,
    ],
    [
        Some("Transaction exceeds floor limit"),
        Some("Lower consecutive offline limit exceeded"),
        Some("Upper consecutive offline limit exceeded"),
        Some("Transaction selected randomly for online processing"),
        Some("Merchant forced transaction online"),
        None,
        None,
        None,
    ],
    [
        Some("Default TDOL used"),
        Some("Issuer authentication failed"),
        Some("Script processing failed before final GENERATE AC"),
        Some("Script processing failed after final GENERATE AC"),
        None,
        None,
        None,
        None,
    ],
];

/// Descriptions of the TVR bits that are set
pub fn tvr_flags(tvr: &[u8]) -> Vec<&'static str> {
    tvr.iter()
        .zip(TVR_BITS.iter())
        .flat_map(|(byte, bits)| {
            bits.iter()
                .enumerate()
                .filter(move |(i, _)| *byte & (0x80u8 >> *i) != 0)
                .filter_map(|(_, desc)| *desc)
        })
        .collect()
}

/// Values read after a decline
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    /// AID, hex
    pub aid: Option<String>,
    /// CA public key index
    pub capk_index: Option<u8>,
    /// Terminal Verification Results, hex
    pub tvr: Option<String>,
    /// Decoded TVR flags
    pub tvr_flags: Vec<&'static str>,
    /// Transaction Status Information, hex
    pub tsi: Option<String>,
}

impl Diagnostics {
    /// Extract diagnostics from decoded kernel data
    pub fn from_tlv(map: &TlvMap) -> Self {
        Self {
            aid: map
                .first_value(&[tags::AID, tags::TERMINAL_AID])
                .map(hex::encode_upper),
            capk_index: map.value(tags::CAPK_INDEX).and_then(|v| v.first().copied()),
            tvr: map.value_hex(tags::TVR),
            tvr_flags: map.value(tags::TVR).map(tvr_flags).unwrap_or_default(),
            tsi: map.value_hex(tags::TSI),
        }
    }

    /// Read diagnostics from the kernel; read failures leave fields empty
    pub fn collect<K: Kernel + ?Sized>(kernel: &K, space: TlvSpace) -> Self {
        match kernel.get_tlv_list(space, DIAGNOSTIC_TAGS) {
            Ok(blob) => Self::from_tlv(&decode_to_map(&blob)),
            Err(e) => {
                debug!("Diagnostic read failed: {}", e);
                Self::default()
            }
        }
    }

    /// Log the decline with whatever was read
    pub fn log(&self, code: ResultCode, description: &str) {
        warn!(
            %code,
            description,
            aid = self.aid.as_deref().unwrap_or("-"),
            capk_index = ?self.capk_index,
            tvr = self.tvr.as_deref().unwrap_or("-"),
            tsi = self.tsi.as_deref().unwrap_or("-"),
            "Transaction declined"
        );
        for flag in &self.tvr_flags {
            warn!("TVR: {}", flag);
        }
    }
}

#[cfg(test)]
mod tests {
    use nexum_emv_tlv::decode_hex_to_map;

    use super::*;

    #[test]
    fn test_tvr_flags() {
        let tvr = hex::decode("8000048000").unwrap();
        assert_eq!(
            tvr_flags(&tvr),
            vec![
                "Offline data authentication was not performed",
                "Online PIN entered",
                "Transaction exceeds floor limit",
            ]
        );
        assert!(tvr_flags(&[0u8; 5]).is_empty());
    }

    #[test]
    fn test_from_tlv() {
        let map = decode_hex_to_map("4F07A00000000410108F01F1950500000080009B02E800");
        let diag = Diagnostics::from_tlv(&map);

        assert_eq!(diag.aid.as_deref(), Some("A0000000041010"));
        assert_eq!(diag.capk_index, Some(0xF1));
        assert_eq!(diag.tvr.as_deref(), Some("0000008000"));
        assert_eq!(diag.tvr_flags, vec!["Transaction exceeds floor limit"]);
        assert_eq!(diag.tsi.as_deref(), Some("E800"));
    }

    #[test]
    fn test_from_empty() {
        assert_eq!(Diagnostics::from_tlv(&TlvMap::new()), Diagnostics::default());
    }
}
