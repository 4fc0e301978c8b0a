//! Per-transaction state

use bytes::Bytes;
use nexum_emv_cvm::{CvmContext, CvmList, CvmResults, PinKind};
use nexum_emv_tlv::TlvMap;
use tracing::{debug, info};

use crate::{AppCandidate, CardType, PinStatus, Step, TlvSpace, TransactionKind, card_data};

/// Origin of a PIN prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PinTrigger {
    /// The kernel asked for the PIN
    Kernel(PinKind),
    /// The terminal asked for the PIN because of the amount or the CVM List
    Manual,
}

impl PinTrigger {
    /// Verification path of the entered PIN; manual PINs go online
    pub const fn kind(&self) -> PinKind {
        match self {
            Self::Kernel(kind) => *kind,
            Self::Manual => PinKind::Online,
        }
    }
}

/// Consumer's answer to a PIN prompt
#[derive(Clone, PartialEq, Eq)]
pub enum PinEntry {
    /// PIN entered; online PINs carry the encrypted PIN block
    Entered {
        /// Encrypted PIN block
        pin_block: Option<Bytes>,
    },
    /// Cardholder bypassed entry
    Bypassed,
    /// Cardholder cancelled
    Cancelled,
    /// PIN pad failure or timeout
    Failed,
}

impl PinEntry {
    /// Status imported into the kernel
    pub const fn status(&self) -> PinStatus {
        match self {
            Self::Entered { .. } => PinStatus::Success,
            Self::Bypassed => PinStatus::Bypass,
            Self::Cancelled => PinStatus::Cancel,
            Self::Failed => PinStatus::Fail,
        }
    }
}

impl std::fmt::Debug for PinEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PinEntry({})", self.status())
    }
}

/// PIN progress within a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PinState {
    /// No PIN requested
    #[default]
    None,
    /// Prompt shown, waiting for the consumer
    Pending(PinTrigger),
    /// PIN entered
    Collected(PinKind),
    /// Cardholder bypassed entry
    Bypassed,
    /// Kernel PIN entry was cancelled or failed; the kernel decides what follows
    KernelAttempted(PinKind),
}

/// State of the running transaction
#[derive(Debug, Clone)]
pub struct TransactionSession {
    amount: u64,
    kind: TransactionKind,
    manual_pin_configured: bool,
    manual_pin_required: bool,
    step: Step,
    card_type: Option<CardType>,
    pan: Option<String>,
    aid: Option<Bytes>,
    candidates: Vec<AppCandidate>,
    pin: PinState,
    pin_block: Option<Bytes>,
    cvm_list: Option<CvmList>,
    cvm_results: Option<CvmResults>,
    tlv: TlvMap,
}

impl TransactionSession {
    /// Create a session waiting for a card
    pub fn new(amount: u64, kind: TransactionKind, manual_pin_required: bool) -> Self {
        Self {
            amount,
            kind,
            manual_pin_configured: manual_pin_required,
            manual_pin_required,
            step: Step::CardDetect,
            card_type: None,
            pan: None,
            aid: None,
            candidates: Vec::new(),
            pin: PinState::None,
            pin_block: None,
            cvm_list: None,
            cvm_results: None,
            tlv: TlvMap::new(),
        }
    }

    /// Forget everything learned from the previous presentation
    ///
    /// Amount, kind and the configured manual-PIN flag survive.
    pub fn reset_for_presentation(&mut self) {
        *self = Self::new(self.amount, self.kind, self.manual_pin_configured);
    }

    /// Amount in minor units
    pub const fn amount(&self) -> u64 {
        self.amount
    }

    /// Transaction kind
    pub const fn kind(&self) -> TransactionKind {
        self.kind
    }

    /// Current step
    pub const fn step(&self) -> Step {
        self.step
    }

    pub(crate) const fn set_step(&mut self, step: Step) {
        self.step = step;
    }

    /// Whether the terminal still has to collect a PIN by itself
    pub const fn manual_pin_required(&self) -> bool {
        self.manual_pin_required
    }

    pub(crate) fn clear_manual_pin(&mut self, reason: &str) {
        if self.manual_pin_required {
            info!(reason, "Manual PIN no longer required");
            self.manual_pin_required = false;
        }
    }

    /// Card interface, once detected
    pub const fn card_type(&self) -> Option<CardType> {
        self.card_type
    }

    pub(crate) const fn set_card_type(&mut self, card_type: CardType) {
        self.card_type = Some(card_type);
    }

    /// Full PAN, once known
    pub fn pan(&self) -> Option<&str> {
        self.pan.as_deref()
    }

    pub(crate) fn record_pan(&mut self, pan: &str) {
        match card_data::normalize_pan(pan) {
            Some(pan) => self.pan = Some(pan),
            None => debug!("Ignoring malformed card number"),
        }
    }

    /// Selected AID
    pub fn aid(&self) -> Option<&[u8]> {
        self.aid.as_deref()
    }

    pub(crate) fn set_aid(&mut self, aid: Bytes) {
        self.aid = Some(aid);
    }

    pub(crate) fn candidates(&self) -> &[AppCandidate] {
        &self.candidates
    }

    pub(crate) fn set_candidates(&mut self, candidates: Vec<AppCandidate>) {
        self.candidates = candidates;
    }

    /// PIN progress
    pub const fn pin(&self) -> PinState {
        self.pin
    }

    pub(crate) const fn set_pin(&mut self, pin: PinState) {
        self.pin = pin;
    }

    /// Kind of PIN entered, if any
    pub const fn pin_collected(&self) -> Option<PinKind> {
        match self.pin {
            PinState::Collected(kind) => Some(kind),
            _ => None,
        }
    }

    pub(crate) fn pin_block(&self) -> Option<Bytes> {
        self.pin_block.clone()
    }

    pub(crate) fn set_pin_block(&mut self, pin_block: Option<Bytes>) {
        self.pin_block = pin_block;
    }

    /// CVM List read from the card
    pub const fn cvm_list(&self) -> Option<&CvmList> {
        self.cvm_list.as_ref()
    }

    /// CVM Results reported by the kernel
    pub const fn cvm_results(&self) -> Option<&CvmResults> {
        self.cvm_results.as_ref()
    }

    /// Whether the kernel reports a consumer-device verification
    pub fn device_verified(&self) -> bool {
        self.cvm_results.is_some_and(|r| r.device_verified())
    }

    /// Card data read from the kernel
    pub const fn tlv(&self) -> &TlvMap {
        &self.tlv
    }

    /// TLV space reads are served from
    pub fn tlv_space(&self) -> TlvSpace {
        TlvSpace::for_card(self.card_type, self.aid())
    }

    /// Merge freshly read kernel data and refresh the derived fields
    pub(crate) fn absorb(&mut self, map: TlvMap) {
        self.tlv.merge(map);

        if let Some(list) = CvmList::from_tlv(&self.tlv) {
            self.cvm_list = Some(list);
        }
        if let Some(results) = CvmResults::from_tlv(&self.tlv) {
            self.cvm_results = Some(results);
        }
        if self.aid.is_none() {
            if let Some(aid) = card_data::aid(&self.tlv) {
                self.aid = Some(aid);
            }
        }
        if self.pan.is_none() {
            let contactless = self.card_type == Some(CardType::Contactless);
            self.pan = card_data::extract_pan(&self.tlv, contactless);
        }

        if self.device_verified() {
            self.clear_manual_pin("cardholder verified on device");
        }
    }

    /// Inputs for the CVM engine
    pub fn cvm_context(&self) -> CvmContext<'_> {
        CvmContext {
            cvm_list: self.cvm_list.as_ref(),
            cvm_results: self.cvm_results.as_ref(),
            amount: self.amount,
            aid: self.aid(),
        }
    }
}
