//! Run a full transaction against the scripted kernel

use std::{error::Error, path::Path, time::Duration};

use colored::Colorize;
use nexum_emv_orchestrator::{
    CardPresence, Kernel, OnlineResponse, Orchestrator, PinEntry, Step, StepEvent, StepEventSender,
    StepPayload, TransResult, TransactionKind, kernel_event_channel, step_event_channel,
};
use nexum_emv_tlv::{Bytes, TlvRecord, decode_hex_to_map, tags};
use tracing::{debug, info, warn};

use crate::utils::{
    self, display,
    kernel::{CardScript, ScriptedKernel},
};

/// Card data used when none is supplied: a Visa debit card whose CVM List
/// starts with online PIN
pub const DEFAULT_CARD_TLV: &str = concat!(
    "4F07A0000000031010",
    "500B5649534120444542495420",
    "5A0847617390010100105F3401015F24032812315F200A4341524448204F4E4520",
    "8E0C000000000000000042031E03",
    "9F3403420300",
    "950500000080009B02E800",
);

/// Encrypted PIN block the simulated PIN pad hands back
const SIMULATED_PIN_BLOCK: [u8; 8] = [0x0C, 0x8F, 0x3A, 0x61, 0x9D, 0x02, 0xB4, 0x7E];

/// How the simulated host answers the authorization request
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum IssuerAnswer {
    /// Approve with response code `00`
    Approve,
    /// Decline with response code `05`
    Decline,
    /// Host does not answer
    Unreachable,
}

/// Transaction kind argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum KindArg {
    /// Goods and services
    Purchase,
    /// Refund
    Refund,
    /// Void of an earlier purchase
    Void,
}

impl From<KindArg> for TransactionKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Purchase => Self::Purchase,
            KindArg::Refund => Self::Refund,
            KindArg::Void => Self::Void,
        }
    }
}

/// Options for a simulated transaction
#[derive(Debug, Clone)]
pub struct SimulateOptions<'a> {
    /// Amount in minor units
    pub amount: u64,
    /// Transaction kind
    pub kind: KindArg,
    /// Present the card over NFC instead of the chip reader
    pub contactless: bool,
    /// Card data as hex TLV, merged over the default card
    pub tlv: Option<&'a str>,
    /// Application identifier to select
    pub aid: Option<&'a str>,
    /// Host answer
    pub issuer: IssuerAnswer,
    /// Bypass PIN entry when prompted
    pub bypass_pin: bool,
    /// Ask for a second tap after device verification
    pub see_phone: bool,
    /// Terminal configuration file
    pub config: Option<&'a Path>,
    /// Seconds to wait for each step before cancelling
    pub step_timeout: u64,
}

/// Drive one transaction through the orchestrator, answering every prompt
pub fn simulate_command(options: &SimulateOptions<'_>) -> Result<(), Box<dyn Error>> {
    match run_simulation(options)? {
        Some(last) => debug!(step = %last.step, "Simulation finished"),
        None => println!("{}", display::warning("Transaction did not finish")),
    }
    Ok(())
}

/// Run the simulated transaction and return its terminal step event
pub fn run_simulation(options: &SimulateOptions<'_>) -> Result<Option<StepEvent>, Box<dyn Error>> {
    let config = utils::load_config(options.config)?;

    let mut data = decode_hex_to_map(DEFAULT_CARD_TLV);
    if let Some(tlv) = options.tlv {
        data.merge(decode_hex_to_map(tlv));
    }
    let aid = match options.aid {
        Some(aid) => utils::parse_hex(aid)?,
        None => data
            .value(tags::AID)
            .map(Bytes::copy_from_slice)
            .unwrap_or_default(),
    };
    let presence = if options.contactless {
        CardPresence::Nfc {
            uid: Bytes::from_static(&[0x04, 0x3C, 0x7A, 0x12]),
        }
    } else {
        CardPresence::Chip {
            atr: Bytes::from_static(&[0x3B, 0x6E, 0x00, 0x00, 0x80, 0x31]),
        }
    };

    let (kernel_tx, kernel_rx) = kernel_event_channel();
    let (step_tx, step_rx) = step_event_channel();
    let kernel = ScriptedKernel::new(
        kernel_tx,
        CardScript {
            presence,
            aid,
            data,
            see_phone: options.see_phone,
        },
    );
    let orchestrator = Orchestrator::new(kernel, step_tx, config);

    info!(amount = options.amount, kind = ?options.kind, "Starting simulated transaction");
    orchestrator.start(options.amount, options.kind.into())?;

    let timeout = Duration::from_secs(options.step_timeout);
    loop {
        for event in step_rx.try_iter() {
            print_step(&event);
            if event.step.is_terminal() {
                return Ok(Some(event));
            }
            if let Err(e) = respond(&orchestrator, &event, options) {
                abandon(&orchestrator);
                return Err(e);
            }
        }

        match kernel_rx.recv_timeout(timeout) {
            Ok(event) => orchestrator.handle(event),
            Err(e) => {
                warn!("No kernel callback received: {}", e);
                abandon(&orchestrator);
                let mut last = None;
                for event in step_rx.try_iter() {
                    print_step(&event);
                    last = Some(event);
                }
                return Ok(last);
            }
        }
    }
}

fn abandon<K: Kernel>(orchestrator: &Orchestrator<K, StepEventSender>) {
    if let Err(e) = orchestrator.cancel() {
        debug!("Cancel failed: {}", e);
    }
}

/// Answer the prompt a step raises, as the operator would
fn respond<K: Kernel>(
    orchestrator: &Orchestrator<K, StepEventSender>,
    event: &StepEvent,
    options: &SimulateOptions<'_>,
) -> Result<(), Box<dyn Error>> {
    match &event.step {
        Step::AppSelect => orchestrator.select_application(0)?,
        Step::ShowPinPad if options.bypass_pin => orchestrator.submit_pin(PinEntry::Bypassed)?,
        Step::ShowPinPad => orchestrator.submit_pin(PinEntry::Entered {
            pin_block: Some(Bytes::from_static(&SIMULATED_PIN_BLOCK)),
        })?,
        Step::Signature => orchestrator.submit_signature(true)?,
        Step::OnlineProcess => orchestrator.submit_online_result(issuer_response(options.issuer))?,
        _ => {}
    }
    Ok(())
}

fn issuer_response(answer: IssuerAnswer) -> OnlineResponse {
    let response_code = |code: &'static [u8]| {
        vec![TlvRecord::new(
            tags::AUTHORISATION_RESPONSE_CODE,
            Bytes::from_static(code),
        )]
    };
    match answer {
        IssuerAnswer::Approve => OnlineResponse::approved(response_code(b"00")),
        IssuerAnswer::Decline => OnlineResponse::declined(response_code(b"05")),
        IssuerAnswer::Unreachable => OnlineResponse::unreachable(),
    }
}

fn print_step(event: &StepEvent) {
    let step = event.step.to_string();
    match &event.payload {
        StepPayload::Outcome(outcome) => {
            let line = format!("{step}: {} ({})", outcome.description, outcome.code);
            match event.step {
                Step::TransResult(TransResult::Success) => println!("{}", display::success(&line)),
                Step::TransResult(TransResult::PresentCardAgain) => {
                    println!("{}", display::warning(&line))
                }
                _ => println!("{}", display::failure(&line)),
            }
            if let Some(settlement) = &outcome.settlement {
                println!(
                    "{}",
                    display::key_value_box(
                        "Settlement",
                        vec![
                            ("Amount", settlement.amount.to_string()),
                            ("Kind", settlement.kind.to_string()),
                            ("Interface", display::or_dash(settlement.card_type)),
                            ("PAN", display::or_dash(settlement.masked_pan.as_deref())),
                            (
                                "AID",
                                display::or_dash(settlement.aid.as_ref().map(hex::encode_upper))
                            ),
                            ("CVM", settlement.cvm.to_string()),
                        ],
                    )
                );
            }
        }
        StepPayload::CardData(card) => {
            println!("{} {}", "▸".blue(), step.bold());
            println!(
                "    PAN {}  expiry {}  label {}",
                display::or_dash(card.masked_pan()),
                display::or_dash(card.expiry),
                display::or_dash(card.application_label.as_deref())
            );
        }
        StepPayload::PinPrompt(prompt) => {
            println!(
                "{} {} ({:?}, {}s)",
                "▸".blue(),
                step.bold(),
                prompt.trigger,
                prompt.remaining_time
            );
        }
        StepPayload::Online(request) => {
            println!("{} {}", "▸".blue(), step.bold());
            println!(
                "    amount {}  PIN block {}  ICC data {}",
                request.amount,
                if request.pin_block.is_some() { "yes" } else { "no" },
                hex::encode_upper(&request.icc_data)
            );
        }
        StepPayload::Application { aid } => {
            println!(
                "{} {} {}",
                "▸".blue(),
                step.bold(),
                display::or_dash(aid.as_ref().map(hex::encode_upper))
            );
        }
        _ => println!("{} {}", "▸".blue(), step.bold()),
    }
}

#[cfg(test)]
mod tests {
    use nexum_emv_cvm::CvmDecision;
    use nexum_emv_orchestrator::codes;

    use super::*;

    fn options() -> SimulateOptions<'static> {
        SimulateOptions {
            amount: 1_000,
            kind: KindArg::Purchase,
            contactless: false,
            tlv: None,
            aid: None,
            issuer: IssuerAnswer::Approve,
            bypass_pin: false,
            see_phone: false,
            config: None,
            step_timeout: 5,
        }
    }

    fn finish(options: &SimulateOptions<'_>) -> StepEvent {
        run_simulation(options)
            .unwrap()
            .expect("transaction should finish")
    }

    #[test]
    fn test_default_card_approved_with_online_pin() {
        let last = finish(&options());
        assert_eq!(last.step, Step::TransResult(TransResult::Success));

        let outcome = last.outcome().unwrap();
        assert_eq!(outcome.code, codes::ONLINE_APPROVED);
        let settlement = outcome.settlement.as_ref().unwrap();
        assert_eq!(settlement.cvm, CvmDecision::OnlinePin);
        assert_eq!(settlement.masked_pan.as_deref(), Some("476173******0010"));
    }

    #[test]
    fn test_issuer_decline_fails() {
        let last = finish(&SimulateOptions {
            issuer: IssuerAnswer::Decline,
            ..options()
        });
        assert_eq!(last.step, Step::TransResult(TransResult::Fail));
        assert_eq!(last.outcome().unwrap().code, codes::ONLINE_DECLINED);
    }

    #[test]
    fn test_unreachable_host_fails() {
        let last = finish(&SimulateOptions {
            issuer: IssuerAnswer::Unreachable,
            ..options()
        });
        assert_eq!(last.step, Step::TransResult(TransResult::Fail));
    }

    #[test]
    fn test_bypassed_pin_settles_without_cvm() {
        let last = finish(&SimulateOptions {
            bypass_pin: true,
            ..options()
        });
        assert_eq!(last.step, Step::TransResult(TransResult::Success));
        let settlement = last.outcome().unwrap().settlement.clone().unwrap();
        assert_eq!(settlement.cvm, CvmDecision::NoCvm);
    }

    #[test]
    fn test_wallet_second_tap_skips_pin() {
        let last = finish(&SimulateOptions {
            amount: 80_000,
            contactless: true,
            tlv: Some("9F34033F0002"),
            see_phone: true,
            ..options()
        });
        assert_eq!(last.step, Step::TransResult(TransResult::Success));
        let settlement = last.outcome().unwrap().settlement.clone().unwrap();
        assert_eq!(settlement.cvm, CvmDecision::NoCvm);
    }
}
