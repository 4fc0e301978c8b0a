//! Cardholder verification around the online handoff

mod common;

use common::*;
use nexum_emv_cvm::{CvmDecision, CvmPolicy, PinKind};
use nexum_emv_orchestrator::{
    KernelEvent, OrchestratorConfig, PIN_TYPE_ONLINE, PinEntry, PinState, PinTrigger, Scheme, Step, StepPayload,
    TlvSpace, TransResult, TransactionKind, USER_CANCELLED_CODE, codes,
};
use nexum_emv_tlv::Bytes;

fn online_steps(h: &Harness) -> Vec<Step> {
    h.steps()
        .into_iter()
        .filter(|s| matches!(s, Step::ShowPinPad | Step::PinResult | Step::OnlineProcess))
        .collect()
}

#[test]
fn test_mobile_wallet_skips_manual_pin() {
    let h = Harness::new();
    h.kernel.load("9F34033F0002");

    h.orchestrator.start(100_000, TransactionKind::Purchase).unwrap();
    assert!(h.orchestrator.session().unwrap().manual_pin_required());

    h.handle(nfc());
    h.handle(final_select(MASTERCARD_AID));
    h.handle(KernelEvent::OnlineProcessingRequired);

    assert_eq!(online_steps(&h), vec![Step::OnlineProcess]);
    let session = h.orchestrator.session().unwrap();
    assert!(!session.manual_pin_required());
    assert!(session.device_verified());
}

#[test]
fn test_amount_at_threshold_prompts_manual_pin() {
    let h = Harness::new();
    h.kernel.load("5A0847617390010100104F07A0000000031010");

    h.orchestrator.start(60_000, TransactionKind::Purchase).unwrap();
    h.handle(chip());
    h.handle(KernelEvent::OnlineProcessingRequired);

    let events = h.events();
    let prompt = events.last().unwrap();
    assert_eq!(prompt.step, Step::ShowPinPad);
    let StepPayload::PinPrompt(prompt) = &prompt.payload else {
        panic!("expected PIN prompt");
    };
    assert_eq!(prompt.trigger, PinTrigger::Manual);
    assert_eq!(prompt.pan.as_deref(), Some("4761739001010010"));

    h.orchestrator
        .submit_pin(PinEntry::Entered {
            pin_block: Some(Bytes::from_static(&[0xAB; 8])),
        })
        .unwrap();

    let events = h.events();
    assert_eq!(events[0].step, Step::PinResult);
    let StepPayload::Online(request) = &events[1].payload else {
        panic!("expected online request");
    };
    assert_eq!(request.pin_block, Some(Bytes::from_static(&[0xAB; 8])));
    assert_eq!(h.kernel.count(|c| matches!(c, Call::Pin(..))), 0);

    h.handle(result(codes::ONLINE_APPROVED, "Approved"));
    let events = h.events();
    let settlement = events[0].outcome().unwrap().settlement.clone().unwrap();
    assert_eq!(settlement.cvm, CvmDecision::OnlinePin);
}

#[test]
fn test_below_threshold_goes_online_without_pin() {
    let h = Harness::new();
    h.orchestrator.start(59_999, TransactionKind::Purchase).unwrap();
    h.handle(chip());
    h.handle(KernelEvent::OnlineProcessingRequired);

    assert_eq!(online_steps(&h), vec![Step::OnlineProcess]);
}

#[test]
fn test_kernel_prompting_pin_disables_manual_pin() {
    let config = OrchestratorConfig::default().with_kernel_prompts_pin(true);
    let h = Harness::with_config(config);

    h.orchestrator.start(90_000, TransactionKind::Purchase).unwrap();
    assert!(!h.orchestrator.session().unwrap().manual_pin_required());
}

#[test]
fn test_kernel_pin_request_clears_manual_flag() {
    let h = Harness::new();
    h.orchestrator.start(100_000, TransactionKind::Purchase).unwrap();
    h.handle(chip());
    h.handle(KernelEvent::RequestPinPad {
        pin_type: 1,
        remaining_time: 3,
    });
    assert!(!h.orchestrator.session().unwrap().manual_pin_required());

    h.orchestrator
        .submit_pin(PinEntry::Entered { pin_block: None })
        .unwrap();
    h.handle(KernelEvent::OnlineProcessingRequired);

    assert_eq!(
        online_steps(&h),
        vec![Step::ShowPinPad, Step::PinResult, Step::OnlineProcess]
    );
    assert!(matches!(
        h.orchestrator.session().unwrap().pin(),
        PinState::Collected(_)
    ));
}

#[test]
fn test_unsuccessful_kernel_pin_is_not_prompted_again() {
    for entry in [PinEntry::Failed, PinEntry::Cancelled] {
        let h = Harness::new();
        h.kernel
            .load("8E0C000000000000000042031E034F07A00000000310105A084761739001010010");

        h.orchestrator.start(1_000, TransactionKind::Purchase).unwrap();
        h.handle(chip());
        h.handle(KernelEvent::RequestPinPad {
            pin_type: PIN_TYPE_ONLINE,
            remaining_time: 30,
        });
        h.orchestrator.submit_pin(entry.clone()).unwrap();
        h.handle(KernelEvent::OnlineProcessingRequired);

        assert_eq!(
            online_steps(&h),
            vec![Step::ShowPinPad, Step::PinResult, Step::OnlineProcess],
            "{entry:?}"
        );
        assert_eq!(
            h.orchestrator.session().unwrap().pin(),
            PinState::KernelAttempted(PinKind::Online)
        );
        assert_eq!(h.kernel.count(|c| matches!(c, Call::Pin(..))), 1);
    }
}

#[test]
fn test_mastercard_single_rule_forces_pin() {
    let h = Harness::new();
    h.kernel.load("8E0A00000000000000000200");

    h.orchestrator.start(1_000, TransactionKind::Purchase).unwrap();
    h.handle(chip());
    h.handle(final_select(MASTERCARD_AID));
    h.handle(KernelEvent::OnlineProcessingRequired);

    assert_eq!(online_steps(&h), vec![Step::ShowPinPad]);
}

#[test]
fn test_mastercard_two_rules_below_threshold_no_pin() {
    let h = Harness::new();
    h.kernel.load("8E0C00000000000000001E031F03");

    h.orchestrator.start(50_000, TransactionKind::Purchase).unwrap();
    h.handle(chip());
    h.handle(final_select(MASTERCARD_AID));
    h.handle(KernelEvent::OnlineProcessingRequired);

    assert_eq!(online_steps(&h), vec![Step::OnlineProcess]);
}

#[test]
fn test_generic_brand_list_pin_rule() {
    let h = Harness::new();
    h.kernel.load("8E0C000000000000000042031F03");

    h.orchestrator.start(1_000, TransactionKind::Purchase).unwrap();
    h.handle(chip());
    h.handle(final_select(VISA_AID));
    h.handle(KernelEvent::OnlineProcessingRequired);

    assert_eq!(online_steps(&h), vec![Step::ShowPinPad]);
}

#[test]
fn test_empty_brand_table_treats_mastercard_generically() {
    let config = OrchestratorConfig::default().with_cvm(
        CvmPolicy::default().with_brands(nexum_emv_cvm::BrandTable::empty()),
    );
    let h = Harness::with_config(config);
    h.kernel.load("8E0C00000000000000001E031F03");

    h.orchestrator.start(1_000, TransactionKind::Purchase).unwrap();
    h.handle(chip());
    h.handle(final_select(MASTERCARD_AID));
    h.handle(KernelEvent::OnlineProcessingRequired);

    assert_eq!(online_steps(&h), vec![Step::OnlineProcess]);
}

#[test]
fn test_manual_pin_bypass_goes_online() {
    let h = Harness::new();
    h.orchestrator.start(75_000, TransactionKind::Purchase).unwrap();
    h.handle(chip());
    h.handle(KernelEvent::OnlineProcessingRequired);
    h.orchestrator.submit_pin(PinEntry::Bypassed).unwrap();

    assert_eq!(
        online_steps(&h),
        vec![Step::ShowPinPad, Step::PinResult, Step::OnlineProcess]
    );
}

#[test]
fn test_manual_pin_cancel_aborts() {
    let h = Harness::new();
    h.orchestrator.start(75_000, TransactionKind::Purchase).unwrap();
    h.handle(chip());
    h.handle(KernelEvent::OnlineProcessingRequired);
    h.orchestrator.submit_pin(PinEntry::Cancelled).unwrap();

    let events = h.events();
    let last = events.last().unwrap();
    assert_eq!(last.step, Step::UserCancelled);
    assert_eq!(last.outcome().unwrap().code, USER_CANCELLED_CODE);
    assert!(h.kernel.calls().contains(&Call::CancelDetection));
    assert!(!h.orchestrator.is_active());
}

#[test]
fn test_manual_pin_failure_fails_transaction() {
    let h = Harness::new();
    h.orchestrator.start(75_000, TransactionKind::Purchase).unwrap();
    h.handle(chip());
    h.handle(KernelEvent::OnlineProcessingRequired);
    h.orchestrator.submit_pin(PinEntry::Failed).unwrap();

    let events = h.events();
    let last = events.last().unwrap();
    assert_eq!(last.step, Step::TransResult(TransResult::Fail));
    assert_eq!(last.outcome().unwrap().code, codes::PIN_ENTRY_FAILED);
}

#[test]
fn test_speedup_pan_from_contactless_track2() {
    let h = Harness::new();
    h.kernel.load_space(
        TlvSpace::Contactless(Scheme::Mastercard),
        "9F6B135413330089600010D25122010000000000000F5F24032512319F34031F0002",
    );

    h.orchestrator.start(1_000, TransactionKind::Purchase).unwrap();
    h.handle(nfc());
    h.handle(final_select(MASTERCARD_AID));
    h.handle(KernelEvent::DataExchangeComplete);

    let events = h.events();
    let StepPayload::CardData(card) = &events.last().unwrap().payload else {
        panic!("expected card data");
    };
    assert_eq!(card.pan.as_deref(), Some("5413330089600010"));
    assert_eq!(
        h.orchestrator.session().unwrap().pan(),
        Some("5413330089600010")
    );
    assert!(
        h.kernel
            .reads()
            .iter()
            .any(|(space, _)| *space == TlvSpace::Contactless(Scheme::Mastercard))
    );
}

#[test]
fn test_settlement_signature_from_list() {
    let h = Harness::new();
    h.kernel.load("8E0A00000000000000001E03");

    h.orchestrator.start(1_000, TransactionKind::Purchase).unwrap();
    h.handle(chip());
    h.handle(final_select(VISA_AID));
    h.handle(KernelEvent::RequestSignature);
    h.orchestrator.submit_signature(true).unwrap();
    h.handle(result(codes::OFFLINE_APPROVED, "Approved"));

    let events = h.events();
    let settlement = events
        .last()
        .and_then(|e| e.outcome())
        .and_then(|o| o.settlement.clone())
        .unwrap();
    assert_eq!(settlement.cvm, CvmDecision::Signature);
}
