//! Steps of a transaction as seen by the consumer

use std::fmt;

use bytes::Bytes;
use nexum_emv_cvm::CvmDecision;

use crate::{
    CardData, CardType, PinStatus, PinTrigger, TransactionKind,
    event::{AppCandidate, CardPresence},
};

/// Final result of a kernel transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransResult {
    /// Approved
    Success,
    /// Declined or aborted
    Fail,
    /// Card must be presented again; detection restarts
    PresentCardAgain,
}

/// Transaction step reported to the consumer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    /// Waiting for a card
    CardDetect,
    /// Card detected, kernel transaction starting
    CardFound,
    /// Cardholder or operator chooses an application
    AppSelect,
    /// Application selected
    FinalAppSelect,
    /// Card number read
    ConfirmCardNo,
    /// Card records read
    DataExchangeComplete,
    /// PIN pad must be shown
    ShowPinPad,
    /// PIN entry finished
    PinResult,
    /// Signature must be captured
    Signature,
    /// Cardholder certificate check
    CertVerify,
    /// Authorization request ready to be sent online
    OnlineProcess,
    /// Terminal risk management
    TermRiskManagement,
    /// Before the first GENERATE AC
    PreFirstGenAc,
    /// Data storage exchange
    DataStorage,
    /// Kernel result
    TransResult(TransResult),
    /// Card could not be read or detection failed
    CardError,
    /// Cancelled by user
    UserCancelled,
}

impl Step {
    /// Whether the transaction ends at this step
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::TransResult(TransResult::Success | TransResult::Fail)
                | Self::CardError
                | Self::UserCancelled
        )
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Summary of an approved transaction for the settlement record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    /// Amount in minor units
    pub amount: u64,
    /// Transaction kind
    pub kind: TransactionKind,
    /// Card interface
    pub card_type: Option<CardType>,
    /// Masked PAN
    pub masked_pan: Option<String>,
    /// Application identifier
    pub aid: Option<Bytes>,
    /// Verification method to print on the receipt
    pub cvm: CvmDecision,
}

/// Outcome carried by terminal steps
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// Readable description
    pub description: String,
    /// Kernel or orchestrator code
    pub code: i32,
    /// Settlement details for approved transactions
    pub settlement: Option<Settlement>,
}

impl Outcome {
    /// Outcome without settlement details
    pub fn new(description: impl Into<String>, code: i32) -> Self {
        Self {
            description: description.into(),
            code,
            settlement: None,
        }
    }
}

/// PIN pad request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinPrompt {
    /// Who asked for the PIN
    pub trigger: PinTrigger,
    /// Seconds allowed for entry
    pub remaining_time: u32,
    /// PAN for PIN block formatting
    pub pan: Option<String>,
}

/// Data for the online authorization request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnlineRequest {
    /// Amount in minor units
    pub amount: u64,
    /// Transaction kind
    pub kind: TransactionKind,
    /// Card interface
    pub card_type: Option<CardType>,
    /// Full PAN
    pub pan: Option<String>,
    /// Encrypted PIN block from an online PIN entry
    pub pin_block: Option<Bytes>,
    /// Card data read so far
    pub card: CardData,
    /// TLV blob of the configured online tags
    pub icc_data: Bytes,
}

/// Step-specific data
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepPayload {
    /// Nothing beyond the step itself
    None,
    /// Presentation that was detected
    Card(CardPresence),
    /// Applications to choose from
    Candidates(Vec<AppCandidate>),
    /// Selected application
    Application {
        /// AID when known
        aid: Option<Bytes>,
    },
    /// Masked card number
    CardNumber(String),
    /// Card data read from the kernel
    CardData(Box<CardData>),
    /// PIN pad request
    PinPrompt(PinPrompt),
    /// Outcome of PIN entry
    PinStatus(PinStatus),
    /// Certificate to check
    Certificate {
        /// Certificate type
        kind: i32,
        /// Certificate number
        info: String,
    },
    /// Authorization request
    Online(Box<OnlineRequest>),
    /// Data storage request
    DataStorage {
        /// Container identifiers
        container_ids: Vec<String>,
        /// Container contents
        container_values: Vec<String>,
    },
    /// Terminal or retry outcome
    Outcome(Outcome),
}

/// Event delivered to the [`StepListener`](crate::StepListener)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepEvent {
    /// Step reached
    pub step: Step,
    /// Step data
    pub payload: StepPayload,
}

impl StepEvent {
    /// Create an event
    pub const fn new(step: Step, payload: StepPayload) -> Self {
        Self { step, payload }
    }

    /// Outcome, for terminal and retry steps
    pub const fn outcome(&self) -> Option<&Outcome> {
        match &self.payload {
            StepPayload::Outcome(outcome) => Some(outcome),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_steps() {
        assert!(Step::TransResult(TransResult::Success).is_terminal());
        assert!(Step::TransResult(TransResult::Fail).is_terminal());
        assert!(Step::CardError.is_terminal());
        assert!(Step::UserCancelled.is_terminal());
        assert!(!Step::TransResult(TransResult::PresentCardAgain).is_terminal());
        assert!(!Step::OnlineProcess.is_terminal());
    }

    #[test]
    fn test_display() {
        assert_eq!(Step::ShowPinPad.to_string(), "ShowPinPad");
        assert_eq!(
            Step::TransResult(TransResult::PresentCardAgain).to_string(),
            "TransResult(PresentCardAgain)"
        );
    }
}
