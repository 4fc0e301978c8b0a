//! CVM List and its rules

use nexum_emv_tlv::{TlvMap, tags};
use tracing::debug;

use crate::{CvmError, PinKind};

/// Bit 7 of the method byte: apply the next rule if this one fails
const CONTINUE_ON_FAILURE: u8 = 0x40;
/// Low six bits of the method byte carry the method itself
const METHOD_MASK: u8 = 0x3F;
/// Bytes taken by the X and Y amount fields at the head of the list
const AMOUNTS_LEN: usize = 8;

/// Cardholder verification method (first byte of a rule, masked)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CvmMethod {
    /// Fail CVM processing
    Fail,
    /// Plaintext PIN verified by the ICC
    PlaintextPin,
    /// Enciphered PIN verified online
    OnlinePin,
    /// Plaintext PIN verified by the ICC and signature
    PlaintextPinAndSignature,
    /// Enciphered PIN verified by the ICC
    EncipheredPin,
    /// Enciphered PIN verified by the ICC and signature
    EncipheredPinAndSignature,
    /// Signature on paper or screen
    Signature,
    /// No CVM required
    NoCvm,
    /// Not available / consumer device CVM performed
    NotAvailable,
    /// Method code not handled here
    Other(u8),
}

impl CvmMethod {
    /// Decode a method byte, ignoring the continue-on-failure bit
    pub const fn from_byte(byte: u8) -> Self {
        match byte & METHOD_MASK {
            0x00 => Self::Fail,
            0x01 => Self::PlaintextPin,
            0x02 => Self::OnlinePin,
            0x03 => Self::PlaintextPinAndSignature,
            0x04 => Self::EncipheredPin,
            0x05 => Self::EncipheredPinAndSignature,
            0x1E => Self::Signature,
            0x1F => Self::NoCvm,
            0x3F => Self::NotAvailable,
            other => Self::Other(other),
        }
    }

    /// PIN kind this method asks for
    ///
    /// Codes `01` and `04` are offline PIN; `02` and `05` are routed online.
    /// Code `03` carries a signature component and is not treated as a PIN method.
    pub const fn pin_kind(&self) -> Option<PinKind> {
        match self {
            Self::PlaintextPin | Self::EncipheredPin => Some(PinKind::Offline),
            Self::OnlinePin | Self::EncipheredPinAndSignature => Some(PinKind::Online),
            _ => None,
        }
    }
}

/// Condition under which a rule applies (second byte of a rule)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CvmCondition {
    /// Always
    Always,
    /// If unattended cash
    UnattendedCash,
    /// If not unattended cash, not manual cash and not purchase with cashback
    NotCashOrCashback,
    /// If the terminal supports the CVM
    TerminalSupportsCvm,
    /// If manual cash
    ManualCash,
    /// If purchase with cashback
    PurchaseWithCashback,
    /// If transaction is in the application currency and under X
    UnderX,
    /// If transaction is in the application currency and over X
    OverX,
    /// If transaction is in the application currency and under Y
    UnderY,
    /// If transaction is in the application currency and over Y
    OverY,
    /// Reserved or proprietary condition
    Other(u8),
}

impl CvmCondition {
    /// Decode a condition byte
    pub const fn from_byte(byte: u8) -> Self {
        match byte {
            0x00 => Self::Always,
            0x01 => Self::UnattendedCash,
            0x02 => Self::NotCashOrCashback,
            0x03 => Self::TerminalSupportsCvm,
            0x04 => Self::ManualCash,
            0x05 => Self::PurchaseWithCashback,
            0x06 => Self::UnderX,
            0x07 => Self::OverX,
            0x08 => Self::UnderY,
            0x09 => Self::OverY,
            other => Self::Other(other),
        }
    }

    /// Whether the terminal treats this condition as satisfied
    pub const fn is_satisfied(&self) -> bool {
        matches!(self, Self::Always | Self::TerminalSupportsCvm)
    }
}

/// A single two-byte CVM rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CvmRule {
    /// Verification method
    pub method: CvmMethod,
    /// Apply the next rule if this one fails
    pub continue_on_failure: bool,
    /// Condition for applying the rule
    pub condition: CvmCondition,
}

impl CvmRule {
    /// Decode a rule from its method and condition bytes
    pub const fn from_bytes(method: u8, condition: u8) -> Self {
        Self {
            method: CvmMethod::from_byte(method),
            continue_on_failure: method & CONTINUE_ON_FAILURE != 0,
            condition: CvmCondition::from_byte(condition),
        }
    }

    /// Whether the rule's condition is satisfied at this terminal
    pub const fn qualifies(&self) -> bool {
        self.condition.is_satisfied()
    }
}

/// Parsed CVM List (`8E`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CvmList {
    /// Amount X, kept as read
    pub amount_x: u32,
    /// Amount Y, kept as read
    pub amount_y: u32,
    /// Rules in card priority order
    pub rules: Vec<CvmRule>,
}

impl CvmList {
    /// Parse a CVM List from its raw value
    pub fn parse(bytes: &[u8]) -> Result<Self, CvmError> {
        if bytes.len() < AMOUNTS_LEN {
            return Err(CvmError::ListTooShort(bytes.len()));
        }

        let amount_x = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let amount_y = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);

        let body = &bytes[AMOUNTS_LEN..];
        if body.len() % 2 != 0 {
            debug!(length = bytes.len(), "CVM List has a dangling byte, ignoring it");
        }
        let rules = body
            .chunks_exact(2)
            .map(|pair| CvmRule::from_bytes(pair[0], pair[1]))
            .collect();

        Ok(Self {
            amount_x,
            amount_y,
            rules,
        })
    }

    /// Parse a CVM List from hex
    pub fn from_hex(hex: &str) -> Result<Self, CvmError> {
        let bytes = hex::decode(hex.trim()).map_err(|_| CvmError::InvalidHex)?;
        Self::parse(&bytes)
    }

    /// Read the CVM List out of decoded kernel data, if present and well formed
    pub fn from_tlv(map: &TlvMap) -> Option<Self> {
        let value = map.value(tags::CVM_LIST)?;
        Self::parse(value)
            .inspect_err(|e| debug!("Ignoring CVM List: {}", e))
            .ok()
    }

    /// Rules whose condition is satisfied, in list order
    pub fn qualifying_rules(&self) -> impl Iterator<Item = &CvmRule> {
        self.rules.iter().filter(|r| r.qualifies())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_masks_continue_bit() {
        let rule = CvmRule::from_bytes(0x42, 0x03);
        assert_eq!(rule.method, CvmMethod::OnlinePin);
        assert!(rule.continue_on_failure);
        assert_eq!(rule.condition, CvmCondition::TerminalSupportsCvm);
    }

    #[test]
    fn test_pin_kinds() {
        assert_eq!(CvmMethod::from_byte(0x01).pin_kind(), Some(PinKind::Offline));
        assert_eq!(CvmMethod::from_byte(0x44).pin_kind(), Some(PinKind::Offline));
        assert_eq!(CvmMethod::from_byte(0x02).pin_kind(), Some(PinKind::Online));
        assert_eq!(CvmMethod::from_byte(0x05).pin_kind(), Some(PinKind::Online));
        assert_eq!(CvmMethod::from_byte(0x1E).pin_kind(), None);
        assert_eq!(CvmMethod::from_byte(0x03).pin_kind(), None);
    }

    #[test]
    fn test_parse_list() {
        let list = CvmList::from_hex("000000000000000042031E031F03").unwrap();
        assert_eq!(list.amount_x, 0);
        assert_eq!(list.rules.len(), 3);
        assert_eq!(list.rules[1].method, CvmMethod::Signature);
        assert_eq!(list.rules[2].method, CvmMethod::NoCvm);
    }

    #[test]
    fn test_parse_list_amounts_and_dangling_byte() {
        let list = CvmList::from_hex("000003E800001388020006").unwrap();
        assert_eq!(list.amount_x, 1000);
        assert_eq!(list.amount_y, 5000);
        assert_eq!(list.rules.len(), 1);
    }

    #[test]
    fn test_parse_list_errors() {
        assert_eq!(CvmList::from_hex("0000"), Err(CvmError::ListTooShort(2)));
        assert_eq!(CvmList::from_hex("zz"), Err(CvmError::InvalidHex));
    }

    #[test]
    fn test_qualifying_rules() {
        let list = CvmList::from_hex("000000000000000002061E0842031F00").unwrap();
        let qualifying: Vec<_> = list.qualifying_rules().collect();
        assert_eq!(qualifying.len(), 2);
        assert_eq!(qualifying[0].method, CvmMethod::OnlinePin);
        assert_eq!(qualifying[1].method, CvmMethod::NoCvm);
    }
}
