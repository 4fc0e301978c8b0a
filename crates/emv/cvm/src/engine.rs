//! CVM decisions

use derive_more::Display;
use tracing::{debug, trace};

use crate::{CvmList, CvmMethod, CvmPolicy, CvmResultCode, CvmResults, CvmRule, CvmStrategy};

/// Where an entered PIN is verified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum PinKind {
    /// Verified by the issuer
    #[display("online")]
    Online,
    /// Verified by the card
    #[display("offline")]
    Offline,
}

/// Cardholder verification outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum CvmDecision {
    /// No verification
    #[display("no CVM")]
    NoCvm,
    /// PIN verified online
    #[display("online PIN")]
    OnlinePin,
    /// PIN verified by the card
    #[display("offline PIN")]
    OfflinePin,
    /// Cardholder signature
    #[display("signature")]
    Signature,
}

impl CvmDecision {
    /// Decision corresponding to a PIN kind
    pub const fn from_pin(kind: PinKind) -> Self {
        match kind {
            PinKind::Online => Self::OnlinePin,
            PinKind::Offline => Self::OfflinePin,
        }
    }

    /// Whether the decision asks for a PIN
    pub const fn requires_pin(&self) -> bool {
        matches!(self, Self::OnlinePin | Self::OfflinePin)
    }
}

/// Evidence available for one decision
#[derive(Debug, Clone, Copy, Default)]
pub struct CvmContext<'a> {
    /// Card CVM List
    pub cvm_list: Option<&'a CvmList>,
    /// Kernel CVM Results
    pub cvm_results: Option<&'a CvmResults>,
    /// Transaction amount in minor units
    pub amount: u64,
    /// Selected application identifier
    pub aid: Option<&'a [u8]>,
}

/// Decision plus the terminal-side PIN compensation flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CvmAssessment {
    /// Verification outcome
    pub decision: CvmDecision,
    /// The terminal has to prompt for a PIN itself
    pub manual_pin_required: bool,
}

/// Decision a single rule leads to, if its method is one we act on
const fn rule_decision(rule: &CvmRule) -> Option<CvmDecision> {
    if let Some(kind) = rule.method.pin_kind() {
        return Some(CvmDecision::from_pin(kind));
    }
    match rule.method {
        CvmMethod::Signature => Some(CvmDecision::Signature),
        CvmMethod::NoCvm => Some(CvmDecision::NoCvm),
        _ => None,
    }
}

/// First decisive qualifying rule, in list order
fn scan(list: &CvmList) -> Option<CvmDecision> {
    list.qualifying_rules().find_map(|rule| {
        let decision = rule_decision(rule);
        trace!(?rule, ?decision, "CVM rule");
        decision
    })
}

/// Decide from the CVM List alone
///
/// Returns `None` when there is no list or none of its rules is decisive.
pub fn evaluate(ctx: &CvmContext<'_>, policy: &CvmPolicy) -> Option<CvmDecision> {
    let list = ctx.cvm_list?;

    match policy.brands.strategy_for(ctx.aid) {
        CvmStrategy::Generic => scan(list),
        CvmStrategy::ListAuthoritative => {
            let mut qualifying = list.qualifying_rules();
            match (qualifying.next(), qualifying.next()) {
                (None, _) => None,
                (Some(only), None) => {
                    debug!(rule = ?only, "Single CVM rule, applying regardless of amount");
                    rule_decision(only)
                }
                (Some(_), Some(_)) if !policy.above_threshold(ctx.amount) => {
                    debug!(
                        amount = ctx.amount,
                        threshold = policy.manual_cvm_threshold,
                        "Several CVM rules below threshold, no CVM"
                    );
                    Some(CvmDecision::NoCvm)
                }
                (Some(_), Some(_)) => scan(list),
            }
        }
    }
}

/// Decision implied by the kernel's CVM Results
fn results_decision(results: &CvmResults) -> Option<CvmDecision> {
    if results.result == CvmResultCode::Failed {
        return None;
    }
    if let Some(kind) = results.method().pin_kind() {
        return Some(CvmDecision::from_pin(kind));
    }
    (results.method() == CvmMethod::Signature).then_some(CvmDecision::Signature)
}

/// Decide from all available evidence
///
/// The CVM List is consulted first. The CVM Results only fill in when the list
/// is absent or inconclusive. Anything else is no CVM.
pub fn decide(ctx: &CvmContext<'_>, policy: &CvmPolicy) -> CvmDecision {
    evaluate(ctx, policy)
        .or_else(|| ctx.cvm_results.and_then(results_decision))
        .unwrap_or(CvmDecision::NoCvm)
}

/// Whether the terminal must collect a PIN on its own for `amount`
///
/// `kernel_prompts_pin` reflects the terminal configuration handed to the kernel:
/// when the kernel is set up to request PIN natively there is nothing to compensate.
pub const fn manual_pin_required(amount: u64, policy: &CvmPolicy, kernel_prompts_pin: bool) -> bool {
    policy.above_threshold(amount) && !kernel_prompts_pin
}

/// Full assessment: decision plus manual PIN flag
///
/// A device-verified mobile wallet never needs a manual PIN.
pub fn assess(ctx: &CvmContext<'_>, policy: &CvmPolicy, kernel_prompts_pin: bool) -> CvmAssessment {
    let device_verified = ctx.cvm_results.is_some_and(CvmResults::device_verified);
    CvmAssessment {
        decision: decide(ctx, policy),
        manual_pin_required: manual_pin_required(ctx.amount, policy, kernel_prompts_pin)
            && !device_verified,
    }
}

/// Whether a PIN still has to be collected before going online
pub const fn pin_outstanding(
    decision: CvmDecision,
    pin_collected: Option<PinKind>,
    device_verified: bool,
) -> bool {
    decision.requires_pin() && pin_collected.is_none() && !device_verified
}

/// Verification method reported for a completed transaction
///
/// A collected PIN always wins over signature. Otherwise the CVM List's first
/// decisive rule labels the transaction signature only if it is `1E`; the CVM
/// Results are used only when the list is absent or inconclusive.
pub fn settlement_cvm(
    pin_collected: Option<PinKind>,
    list: Option<&CvmList>,
    results: Option<&CvmResults>,
) -> CvmDecision {
    if let Some(kind) = pin_collected {
        return CvmDecision::from_pin(kind);
    }

    match list.and_then(scan) {
        Some(CvmDecision::Signature) => CvmDecision::Signature,
        Some(_) => CvmDecision::NoCvm,
        None => match results.map(CvmResults::method) {
            Some(CvmMethod::Signature) => CvmDecision::Signature,
            _ => CvmDecision::NoCvm,
        },
    }
}
