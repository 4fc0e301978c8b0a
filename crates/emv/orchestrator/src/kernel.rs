//! Import contract of the EMV kernel
//!
//! The kernel is a black box reached over IPC. Every call may fail with a
//! [`KernelError`]; callers decide how the failure maps onto the transaction.

use std::{fmt, sync::Arc, time::Duration};

use bytes::Bytes;
use nexum_emv_cvm::PinKind;
use nexum_emv_tlv::{Tag, TlvRecord};

use crate::KernelError;

/// Result of a kernel call
pub type KernelResult<T> = std::result::Result<T, KernelError>;

/// How the card was presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CardType {
    /// Inserted chip card
    Contact,
    /// Tapped card or device
    Contactless,
}

impl CardType {
    /// Kernel flow for this card type
    pub const fn flow(&self) -> FlowType {
        match self {
            Self::Contact => FlowType::Standard,
            Self::Contactless => FlowType::Speedup,
        }
    }
}

impl fmt::Display for CardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Contact => write!(f, "contact"),
            Self::Contactless => write!(f, "contactless"),
        }
    }
}

/// Kernel processing flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowType {
    /// Full EMV flow with confirm-card-number
    Standard,
    /// Shortened contactless flow, no confirm-card-number callback
    Speedup,
}

/// Kind of transaction being run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TransactionKind {
    /// Goods and services
    #[default]
    Purchase,
    /// Refund to the cardholder
    Refund,
    /// Reversal of an earlier purchase
    Void,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Purchase => write!(f, "purchase"),
            Self::Refund => write!(f, "refund"),
            Self::Void => write!(f, "void"),
        }
    }
}

/// Payment scheme, used to pick the contactless TLV space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    /// Visa (`A000000003`)
    Visa,
    /// Mastercard and Maestro (`A000000004`, `A000000005`)
    Mastercard,
    /// American Express (`A000000025`)
    Amex,
    /// JCB (`A000000065`)
    Jcb,
    /// Discover (`A000000152`)
    Discover,
    /// UnionPay (`A000000333`)
    UnionPay,
    /// Any other registered application provider
    Other,
}

impl Scheme {
    /// Scheme from the RID at the head of an AID
    pub fn from_aid(aid: &[u8]) -> Self {
        match aid.get(..5) {
            Some([0xA0, 0x00, 0x00, 0x00, 0x03]) => Self::Visa,
            Some([0xA0, 0x00, 0x00, 0x00, 0x04 | 0x05]) => Self::Mastercard,
            Some([0xA0, 0x00, 0x00, 0x00, 0x25]) => Self::Amex,
            Some([0xA0, 0x00, 0x00, 0x00, 0x65]) => Self::Jcb,
            Some([0xA0, 0x00, 0x00, 0x01, 0x52]) => Self::Discover,
            Some([0xA0, 0x00, 0x00, 0x03, 0x33]) => Self::UnionPay,
            _ => Self::Other,
        }
    }
}

/// Namespace a TLV read is served from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TlvSpace {
    /// Common kernel data
    Standard,
    /// Brand-specific contactless kernel data
    Contactless(Scheme),
}

impl TlvSpace {
    /// Space for a card type and, when known, its AID
    pub fn for_card(card_type: Option<CardType>, aid: Option<&[u8]>) -> Self {
        match (card_type, aid) {
            (Some(CardType::Contactless), Some(aid)) => Self::Contactless(Scheme::from_aid(aid)),
            _ => Self::Standard,
        }
    }
}

/// Options for a card detection request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectOptions {
    /// Poll the contact interface
    pub contact: bool,
    /// Poll the contactless interface
    pub contactless: bool,
    /// Time after which the kernel reports a timeout error
    pub timeout: Duration,
}

/// Parameters of a kernel transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartRequest {
    /// Amount in minor units
    pub amount: u64,
    /// Transaction kind
    pub kind: TransactionKind,
    /// Kernel flow
    pub flow: FlowType,
    /// Card interface in use
    pub card_type: CardType,
    /// ISO 4217 numeric currency code
    pub currency_code: u16,
    /// Time the kernel allows for PIN entry
    pub pin_timeout: Duration,
}

impl StartRequest {
    /// Amount as the decimal minor-unit string kernels expect
    pub fn amount_string(&self) -> String {
        self.amount.to_string()
    }
}

/// PIN entry outcome imported into the kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PinStatus {
    /// PIN entered
    Success,
    /// Cardholder bypassed PIN entry
    Bypass,
    /// Cardholder cancelled
    Cancel,
    /// PIN pad failure or timeout
    Fail,
}

impl fmt::Display for PinStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Bypass => write!(f, "bypass"),
            Self::Cancel => write!(f, "cancel"),
            Self::Fail => write!(f, "fail"),
        }
    }
}

/// Issuer decision relayed to the kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum OnlineDecision {
    /// Issuer approved
    Approved,
    /// Issuer declined
    Declined,
    /// No issuer response could be obtained
    Unreachable,
}

/// Authorization response handed back to the kernel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnlineResponse {
    /// Issuer decision
    pub decision: OnlineDecision,
    /// Response data (`8A`, `91`, scripts)
    pub records: Vec<TlvRecord>,
}

impl OnlineResponse {
    /// Issuer approval with response data
    pub const fn approved(records: Vec<TlvRecord>) -> Self {
        Self {
            decision: OnlineDecision::Approved,
            records,
        }
    }

    /// Issuer decline with response data
    pub const fn declined(records: Vec<TlvRecord>) -> Self {
        Self {
            decision: OnlineDecision::Declined,
            records,
        }
    }

    /// Host not reachable
    pub const fn unreachable() -> Self {
        Self {
            decision: OnlineDecision::Unreachable,
            records: Vec::new(),
        }
    }
}

/// Operations the orchestrator invokes on the EMV kernel
///
/// Implementations forward to the kernel service and must not call back into
/// the orchestrator synchronously; callbacks travel through the
/// [`KernelEventSender`](crate::KernelEventSender).
pub trait Kernel: Send + Sync {
    /// Start card detection
    fn check_card(&self, options: &DetectOptions) -> KernelResult<()>;

    /// Stop a running detection or transaction
    fn cancel_detection(&self) -> KernelResult<()>;

    /// Reset the kernel's per-transaction state
    fn init_process(&self) -> KernelResult<()>;

    /// Begin EMV processing of the detected card
    fn start_transaction(&self, request: &StartRequest) -> KernelResult<()>;

    /// Select the candidate application at `index`
    fn import_app_select(&self, index: usize) -> KernelResult<()>;

    /// Accept or refuse the final application selection
    fn import_final_select_status(&self, accept: bool) -> KernelResult<()>;

    /// Accept or refuse the card number
    fn import_card_number_status(&self, accept: bool) -> KernelResult<()>;

    /// Report the outcome of a kernel-requested PIN entry
    fn import_pin_status(&self, kind: PinKind, status: PinStatus) -> KernelResult<()>;

    /// Accept or refuse the cardholder certificate
    fn import_certificate_status(&self, accept: bool) -> KernelResult<()>;

    /// Report whether a signature was captured
    fn import_signature_status(&self, accept: bool) -> KernelResult<()>;

    /// Hand the issuer response to the kernel
    fn import_online_processing_status(&self, response: &OnlineResponse) -> KernelResult<()>;

    /// Acknowledge terminal risk management
    fn import_term_risk_mgmt_status(&self, accept: bool) -> KernelResult<()>;

    /// Acknowledge the pre-first-GENERATE AC checkpoint
    fn import_pre_first_gen_ac_status(&self, accept: bool) -> KernelResult<()>;

    /// Answer a data storage request
    fn import_data_storage(&self, container_ids: &[String], container_values: &[String]) -> KernelResult<()>;

    /// Power down the card interface
    fn card_power_off(&self) -> KernelResult<()>;

    /// Whether a card is still in the field or slot
    fn card_present(&self) -> KernelResult<bool>;

    /// Read a single data object
    fn get_tlv(&self, space: TlvSpace, tag: Tag) -> KernelResult<Option<Bytes>>;

    /// Read several data objects as a concatenated TLV blob
    fn get_tlv_list(&self, space: TlvSpace, tags: &[Tag]) -> KernelResult<Bytes>;
}

impl<K: Kernel + ?Sized> Kernel for Arc<K> {
    fn check_card(&self, options: &DetectOptions) -> KernelResult<()> {
        (**self).check_card(options)
    }

    fn cancel_detection(&self) -> KernelResult<()> {
        (**self).cancel_detection()
    }

    fn init_process(&self) -> KernelResult<()> {
        (**self).init_process()
    }

    fn start_transaction(&self, request: &StartRequest) -> KernelResult<()> {
        (**self).start_transaction(request)
    }

    fn import_app_select(&self, index: usize) -> KernelResult<()> {
        (**self).import_app_select(index)
    }

    fn import_final_select_status(&self, accept: bool) -> KernelResult<()> {
        (**self).import_final_select_status(accept)
    }

    fn import_card_number_status(&self, accept: bool) -> KernelResult<()> {
        (**self).import_card_number_status(accept)
    }

    fn import_pin_status(&self, kind: PinKind, status: PinStatus) -> KernelResult<()> {
        (**self).import_pin_status(kind, status)
    }

    fn import_certificate_status(&self, accept: bool) -> KernelResult<()> {
        (**self).import_certificate_status(accept)
    }

    fn import_signature_status(&self, accept: bool) -> KernelResult<()> {
        (**self).import_signature_status(accept)
    }

    fn import_online_processing_status(&self, response: &OnlineResponse) -> KernelResult<()> {
        (**self).import_online_processing_status(response)
    }

    fn import_term_risk_mgmt_status(&self, accept: bool) -> KernelResult<()> {
        (**self).import_term_risk_mgmt_status(accept)
    }

    fn import_pre_first_gen_ac_status(&self, accept: bool) -> KernelResult<()> {
        (**self).import_pre_first_gen_ac_status(accept)
    }

    fn import_data_storage(&self, container_ids: &[String], container_values: &[String]) -> KernelResult<()> {
        (**self).import_data_storage(container_ids, container_values)
    }

    fn card_power_off(&self) -> KernelResult<()> {
        (**self).card_power_off()
    }

    fn card_present(&self) -> KernelResult<bool> {
        (**self).card_present()
    }

    fn get_tlv(&self, space: TlvSpace, tag: Tag) -> KernelResult<Option<Bytes>> {
        (**self).get_tlv(space, tag)
    }

    fn get_tlv_list(&self, space: TlvSpace, tags: &[Tag]) -> KernelResult<Bytes> {
        (**self).get_tlv_list(space, tags)
    }
}
