//! Kernel outcome codes

use std::fmt;

/// Outcome codes the kernel reports on the transaction-result callback
pub mod codes {
    /// Generic success
    pub const SUCCESS: i32 = 0;
    /// Approved offline by the card
    pub const OFFLINE_APPROVED: i32 = 1;
    /// Declined offline by the card
    pub const OFFLINE_DECLINED: i32 = 2;
    /// Approved by the issuer
    pub const ONLINE_APPROVED: i32 = 3;
    /// Declined by the issuer
    pub const ONLINE_DECLINED: i32 = 4;
    /// Card must be presented again
    pub const PRESENT_CARD_AGAIN: i32 = 5;
    /// Cardholder must check their device, then present again
    pub const SEE_PHONE: i32 = 6;
    /// Processing terminated by the kernel
    pub const TERMINATED: i32 = 7;
    /// Transaction not accepted by the card
    pub const NOT_ACCEPTED: i32 = 8;

    /// Orchestrator code: the card offered no application
    pub const NO_APPLICATION: i32 = -200;
    /// Orchestrator code: terminal PIN entry failed
    pub const PIN_ENTRY_FAILED: i32 = -201;
}

/// Decoded outcome code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultCode {
    /// Generic success
    Success,
    /// Approved offline
    OfflineApproved,
    /// Declined offline
    OfflineDeclined,
    /// Approved online
    OnlineApproved,
    /// Declined online
    OnlineDeclined,
    /// Present the card again
    PresentCardAgain,
    /// See phone, then present again
    SeePhone,
    /// Terminated by the kernel
    Terminated,
    /// Not accepted by the card
    NotAccepted,
    /// Unlisted code
    Other(i32),
}

/// How an outcome is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultClass {
    /// Transaction approved
    Approved,
    /// Card must be presented again
    Retry,
    /// Declined or failed
    Declined,
}

impl ResultCode {
    /// Decode a raw kernel code
    pub const fn from_raw(code: i32) -> Self {
        match code {
            codes::SUCCESS => Self::Success,
            codes::OFFLINE_APPROVED => Self::OfflineApproved,
            codes::OFFLINE_DECLINED => Self::OfflineDeclined,
            codes::ONLINE_APPROVED => Self::OnlineApproved,
            codes::ONLINE_DECLINED => Self::OnlineDeclined,
            codes::PRESENT_CARD_AGAIN => Self::PresentCardAgain,
            codes::SEE_PHONE => Self::SeePhone,
            codes::TERMINATED => Self::Terminated,
            codes::NOT_ACCEPTED => Self::NotAccepted,
            other => Self::Other(other),
        }
    }

    /// Raw kernel code
    pub const fn raw(&self) -> i32 {
        match self {
            Self::Success => codes::SUCCESS,
            Self::OfflineApproved => codes::OFFLINE_APPROVED,
            Self::OfflineDeclined => codes::OFFLINE_DECLINED,
            Self::OnlineApproved => codes::ONLINE_APPROVED,
            Self::OnlineDeclined => codes::ONLINE_DECLINED,
            Self::PresentCardAgain => codes::PRESENT_CARD_AGAIN,
            Self::SeePhone => codes::SEE_PHONE,
            Self::Terminated => codes::TERMINATED,
            Self::NotAccepted => codes::NOT_ACCEPTED,
            Self::Other(code) => *code,
        }
    }

    /// Approved, retry or declined
    pub const fn class(&self) -> ResultClass {
        match self {
            Self::Success | Self::OfflineApproved | Self::OnlineApproved => ResultClass::Approved,
            Self::PresentCardAgain | Self::SeePhone => ResultClass::Retry,
            _ => ResultClass::Declined,
        }
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "Success"),
            Self::OfflineApproved => write!(f, "Approved offline"),
            Self::OfflineDeclined => write!(f, "Declined offline"),
            Self::OnlineApproved => write!(f, "Approved online"),
            Self::OnlineDeclined => write!(f, "Declined online"),
            Self::PresentCardAgain => write!(f, "Present card again"),
            Self::SeePhone => write!(f, "See phone"),
            Self::Terminated => write!(f, "Transaction terminated"),
            Self::NotAccepted => write!(f, "Not accepted"),
            Self::Other(code) => write!(f, "Result code {code}"),
        }
    }
}
