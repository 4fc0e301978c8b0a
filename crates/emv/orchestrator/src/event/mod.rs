//! Kernel callbacks and consumer-facing step events

pub mod channel;
pub use channel::*;

pub mod listener;
pub use listener::*;

pub mod step;
pub use step::*;

use std::fmt;

use bytes::Bytes;

use crate::CardType;

/// Detection error code: no card presented in time
pub const TIMEOUT_CODE: i32 = -1;
/// Detection error code: cardholder or operator cancelled
pub const USER_CANCELLED_CODE: i32 = -2;
/// Detection error code: card removed before processing finished
pub const CARD_REMOVED_CODE: i32 = -3;

/// Raw PIN type the kernel uses for an online PIN request
pub const PIN_TYPE_ONLINE: i32 = 0;

/// Card presentation reported by the kernel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardPresence {
    /// Chip card inserted
    Chip {
        /// Answer to reset
        atr: Bytes,
    },
    /// Contactless card or device tapped
    Nfc {
        /// Contactless UID
        uid: Bytes,
    },
}

impl CardPresence {
    /// Interface the card was presented on
    pub const fn card_type(&self) -> CardType {
        match self {
            Self::Chip { .. } => CardType::Contact,
            Self::Nfc { .. } => CardType::Contactless,
        }
    }
}

/// Application offered for selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppCandidate {
    /// Application identifier
    pub aid: Bytes,
    /// Display label
    pub label: String,
    /// Card-assigned priority, lower first
    pub priority: u8,
}

/// Callbacks raised by the EMV kernel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KernelEvent {
    /// Card detected on an interface
    CardFound(CardPresence),
    /// Several applications are available
    AppCandidates(Vec<AppCandidate>),
    /// Application selected
    FinalAppSelected {
        /// Selected AID when the kernel supplies it
        aid: Option<Bytes>,
    },
    /// Card number read, awaiting confirmation
    ConfirmCardNumber {
        /// PAN as read
        card_no: String,
    },
    /// Record reading finished
    DataExchangeComplete,
    /// Kernel needs PIN entry
    RequestPinPad {
        /// Raw PIN type, [`PIN_TYPE_ONLINE`] or offline
        pin_type: i32,
        /// Seconds left for entry, or remaining offline tries depending on kernel
        remaining_time: u32,
    },
    /// Kernel needs a signature
    RequestSignature,
    /// Cardholder certificate check
    CertificateVerify {
        /// Certificate type
        kind: i32,
        /// Certificate number
        info: String,
    },
    /// Authorization request must go online
    OnlineProcessingRequired,
    /// Terminal risk management checkpoint
    TermRiskManagement,
    /// Checkpoint before the first GENERATE AC
    PreFirstGenAc,
    /// Data storage request
    DataStorage {
        /// Container identifiers
        container_ids: Vec<String>,
        /// Container contents
        container_values: Vec<String>,
    },
    /// Transaction finished
    TransactionResult {
        /// Kernel outcome code
        code: i32,
        /// Kernel outcome text
        description: String,
    },
    /// Cardholder verified on their device, card must be presented again
    ConfirmationCodeVerified,
    /// Kernel asks for terminal-side data exchange
    RequestDataExchange {
        /// PAN as read
        card_no: String,
    },
    /// Detection or processing error
    Error {
        /// Error code, see [`DetectionError`]
        code: i32,
        /// Kernel message
        message: String,
    },
}

impl KernelEvent {
    /// Short callback name, for logs
    pub const fn name(&self) -> &'static str {
        match self {
            Self::CardFound(_) => "card_found",
            Self::AppCandidates(_) => "app_candidates",
            Self::FinalAppSelected { .. } => "final_app_selected",
            Self::ConfirmCardNumber { .. } => "confirm_card_number",
            Self::DataExchangeComplete => "data_exchange_complete",
            Self::RequestPinPad { .. } => "request_pin_pad",
            Self::RequestSignature => "request_signature",
            Self::CertificateVerify { .. } => "certificate_verify",
            Self::OnlineProcessingRequired => "online_processing_required",
            Self::TermRiskManagement => "term_risk_management",
            Self::PreFirstGenAc => "pre_first_gen_ac",
            Self::DataStorage { .. } => "data_storage",
            Self::TransactionResult { .. } => "transaction_result",
            Self::ConfirmationCodeVerified => "confirmation_code_verified",
            Self::RequestDataExchange { .. } => "request_data_exchange",
            Self::Error { .. } => "error",
        }
    }
}

/// Errors reported on the kernel error callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DetectionError {
    /// No card presented in time
    Timeout,
    /// Cancelled by the cardholder or operator
    UserCancelled,
    /// Card removed before processing finished
    CardRemovedEarly,
    /// Any other kernel error code
    Other(i32),
}

impl DetectionError {
    /// Classify a raw error code
    pub const fn from_code(code: i32) -> Self {
        match code {
            TIMEOUT_CODE => Self::Timeout,
            USER_CANCELLED_CODE => Self::UserCancelled,
            CARD_REMOVED_CODE => Self::CardRemovedEarly,
            other => Self::Other(other),
        }
    }
}

impl fmt::Display for DetectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "Card detection timed out"),
            Self::UserCancelled => write!(f, "Cancelled by user"),
            Self::CardRemovedEarly => write!(f, "Card removed too early"),
            Self::Other(code) => write!(f, "Card error {code}"),
        }
    }
}
