//! CVM Results (`9F34`)

use nexum_emv_tlv::{TlvMap, tags};
use tracing::debug;

use crate::{CvmError, CvmMethod};

/// Outcome byte of the CVM Results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CvmResultCode {
    /// Unknown (e.g. signature pending)
    Unknown,
    /// Failed
    Failed,
    /// Successful
    Successful,
    /// Proprietary value
    Other(u8),
}

impl CvmResultCode {
    /// Decode the result byte
    pub const fn from_byte(byte: u8) -> Self {
        match byte {
            0x00 => Self::Unknown,
            0x01 => Self::Failed,
            0x02 => Self::Successful,
            other => Self::Other(other),
        }
    }
}

/// CVM Results as reported by the kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CvmResults {
    /// Raw method byte, continue-on-failure bit included
    pub method_byte: u8,
    /// Raw condition byte
    pub condition: u8,
    /// Result of the performed method
    pub result: CvmResultCode,
}

impl CvmResults {
    /// Parse the 3-byte value of `9F34`
    pub fn parse(bytes: &[u8]) -> Result<Self, CvmError> {
        match bytes {
            [method, condition, result] => Ok(Self {
                method_byte: *method,
                condition: *condition,
                result: CvmResultCode::from_byte(*result),
            }),
            _ => Err(CvmError::InvalidResultsLength(bytes.len())),
        }
    }

    /// Parse CVM Results from hex
    pub fn from_hex(hex: &str) -> Result<Self, CvmError> {
        let bytes = hex::decode(hex.trim()).map_err(|_| CvmError::InvalidHex)?;
        Self::parse(&bytes)
    }

    /// Read CVM Results out of decoded kernel data, if present and well formed
    pub fn from_tlv(map: &TlvMap) -> Option<Self> {
        let value = map.value(tags::CVM_RESULTS)?;
        Self::parse(value)
            .inspect_err(|e| debug!("Ignoring CVM Results: {}", e))
            .ok()
    }

    /// Method that was performed
    pub const fn method(&self) -> CvmMethod {
        CvmMethod::from_byte(self.method_byte)
    }

    /// Whether the cardholder was already verified on a consumer device
    ///
    /// Mobile wallets report "no CVM" or "not available" with a successful result
    /// once Face/Touch ID or a device passcode has been checked.
    pub const fn device_verified(&self) -> bool {
        matches!(self.method(), CvmMethod::NoCvm | CvmMethod::NotAvailable)
            && matches!(self.result, CvmResultCode::Successful)
    }
}
