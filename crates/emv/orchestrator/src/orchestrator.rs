//! Transaction state machine
//!
//! Kernel callbacks and consumer replies are serialized through the session
//! lock. Step events raised while handling one of them are collected and
//! delivered to the listener once the session lock is released. The delivery
//! lock is held from before the transition until its events are delivered, so
//! listeners see steps in transition order across threads and may re-enter.

use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use nexum_emv_cvm::{PinKind, decide, pin_outstanding, settlement_cvm};
use nexum_emv_tlv::{Tag, TlvMap, bcd::MAX_AMOUNT_MINOR, decode_to_map, tags};
use parking_lot::{Mutex, ReentrantMutex};
use tracing::{debug, error, info, instrument, trace, warn};

use crate::{
    AppCandidate, CardData, CardPresence, CardType, DetectionError, Diagnostics, Error, Kernel,
    KernelError, KernelEvent, KernelEventReceiver, OnlineRequest, OnlineResponse,
    OrchestratorConfig, Outcome, PIN_TYPE_ONLINE, PinEntry, PinPrompt, PinState, PinTrigger,
    Result, ResultClass, ResultCode, Settlement, StartRequest, Step, StepEvent, StepListener,
    StepPayload, TlvSpace, TransResult, TransactionKind, TransactionSession, USER_CANCELLED_CODE,
    card_data::{self, CARD_DATA_TAGS},
    codes,
};

/// Tags refreshed right before the online handoff
const ONLINE_EVIDENCE_TAGS: &[Tag] = &[
    tags::CVM_RESULTS,
    tags::CVM_LIST,
    tags::AID,
    tags::TERMINAL_AID,
    tags::PAN,
    tags::TRACK_2_EQUIVALENT,
    tags::TRACK_2_DATA,
];

/// Tags refreshed when the kernel reports approval
const SETTLEMENT_TAGS: &[Tag] = &[tags::CVM_RESULTS, tags::CVM_LIST];

type Outbox = Vec<StepEvent>;

fn emit(session: &mut TransactionSession, outbox: &mut Outbox, step: Step, payload: StepPayload) {
    debug!(%step, "Transaction step");
    session.set_step(step);
    outbox.push(StepEvent::new(step, payload));
}

fn expect_step(session: &TransactionSession, expected: Step) -> Result<()> {
    if session.step() == expected {
        Ok(())
    } else {
        Err(Error::UnexpectedReply {
            expected,
            current: session.step(),
        })
    }
}

/// Drives one EMV transaction at a time against a [`Kernel`]
pub struct Orchestrator<K, L> {
    kernel: K,
    listener: L,
    config: OrchestratorConfig,
    session: Mutex<Option<TransactionSession>>,
    delivery: ReentrantMutex<()>,
    process_started: AtomicBool,
}

impl<K, L> std::fmt::Debug for Orchestrator<K, L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("config", &self.config)
            .field("process_started", &self.process_started)
            .finish_non_exhaustive()
    }
}

impl<K: Kernel, L: StepListener> Orchestrator<K, L> {
    /// Create an orchestrator with no transaction running
    pub fn new(kernel: K, listener: L, config: OrchestratorConfig) -> Self {
        Self {
            kernel,
            listener,
            config,
            session: Mutex::new(None),
            delivery: ReentrantMutex::new(()),
            process_started: AtomicBool::new(false),
        }
    }

    /// Terminal configuration
    pub const fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Kernel the orchestrator drives
    pub const fn kernel(&self) -> &K {
        &self.kernel
    }

    /// Whether a transaction is running
    pub fn is_active(&self) -> bool {
        self.session.lock().is_some()
    }

    /// Snapshot of the running transaction
    pub fn session(&self) -> Option<TransactionSession> {
        self.session.lock().clone()
    }

    /// Start a transaction and begin card detection
    ///
    /// Fails with [`Error::Busy`] while another transaction runs. A kernel
    /// failure to start detection is reported as a `CardError` step.
    #[instrument(skip(self), level = "debug")]
    pub fn start(&self, amount: u64, kind: TransactionKind) -> Result<()> {
        if amount > MAX_AMOUNT_MINOR {
            return Err(Error::InvalidAmount(amount));
        }

        let _delivery = self.delivery.lock();
        let mut outbox = Outbox::new();
        {
            let mut guard = self.session.lock();
            if guard.is_some() {
                return Err(Error::Busy);
            }

            let manual_pin_required = self.config.manual_pin_required(amount);
            info!(amount, %kind, manual_pin_required, "Starting transaction");

            let mut session = TransactionSession::new(amount, kind, manual_pin_required);
            self.process_started.store(false, Ordering::Release);
            self.detect(&mut session, &mut outbox);

            if !session.step().is_terminal() {
                *guard = Some(session);
            }
        }
        self.deliver(outbox);
        Ok(())
    }

    /// Process one kernel callback
    ///
    /// Callbacks arriving without a running transaction are dropped.
    #[instrument(skip_all, fields(event = event.name()))]
    pub fn handle(&self, event: KernelEvent) {
        let handled = self.transition(|session, outbox| {
            self.dispatch(session, event, outbox);
            Ok(())
        });
        if handled.is_err() {
            debug!("No transaction in progress, dropping kernel callback");
        }
    }

    /// Process kernel callbacks until the channel closes
    pub fn run(&self, events: &KernelEventReceiver) {
        for event in events.iter() {
            self.handle(event);
        }
        debug!("Kernel event channel closed");
    }

    /// Process kernel callbacks until the running transaction ends
    pub fn run_transaction(&self, events: &KernelEventReceiver) {
        while self.is_active() {
            match events.recv() {
                Ok(event) => self.handle(event),
                Err(_) => {
                    warn!("Kernel event channel closed during a transaction");
                    break;
                }
            }
        }
    }

    /// Choose one of the offered applications
    #[instrument(skip(self), level = "debug")]
    pub fn select_application(&self, index: usize) -> Result<()> {
        self.transition(|session, outbox| {
            expect_step(session, Step::AppSelect)?;
            let count = session.candidates().len();
            if index >= count {
                return Err(Error::InvalidApplication { index, count });
            }
            let result = self.kernel.import_app_select(index);
            self.check(session, outbox, "import_app_select", result);
            Ok(())
        })
    }

    /// Answer the pending PIN prompt
    #[instrument(skip(self), level = "debug")]
    pub fn submit_pin(&self, entry: PinEntry) -> Result<()> {
        self.transition(|session, outbox| {
            expect_step(session, Step::ShowPinPad)?;
            let PinState::Pending(trigger) = session.pin() else {
                return Err(Error::UnexpectedReply {
                    expected: Step::ShowPinPad,
                    current: session.step(),
                });
            };

            match trigger {
                PinTrigger::Kernel(kind) => self.finish_kernel_pin(session, outbox, kind, entry),
                PinTrigger::Manual => self.finish_manual_pin(session, outbox, entry),
            }
            Ok(())
        })
    }

    /// Report whether the signature was captured
    #[instrument(skip(self), level = "debug")]
    pub fn submit_signature(&self, accepted: bool) -> Result<()> {
        self.transition(|session, outbox| {
            expect_step(session, Step::Signature)?;
            let result = self.kernel.import_signature_status(accepted);
            self.check(session, outbox, "import_signature_status", result);
            Ok(())
        })
    }

    /// Hand the issuer response to the kernel
    #[instrument(skip_all, fields(decision = ?response.decision), level = "debug")]
    pub fn submit_online_result(&self, response: OnlineResponse) -> Result<()> {
        self.transition(|session, outbox| {
            expect_step(session, Step::OnlineProcess)?;
            let result = self.kernel.import_online_processing_status(&response);
            self.check(session, outbox, "import_online_processing_status", result);
            Ok(())
        })
    }

    /// Cancel the running transaction
    ///
    /// Callbacks the kernel raises afterwards are ignored.
    #[instrument(skip(self), level = "debug")]
    pub fn cancel(&self) -> Result<()> {
        self.transition(|session, outbox| {
            info!(step = %session.step(), "Cancelling transaction");
            self.abort_kernel();
            emit(
                session,
                outbox,
                Step::UserCancelled,
                StepPayload::Outcome(Outcome::new("Cancelled by user", USER_CANCELLED_CODE)),
            );
            Ok(())
        })
    }

    /// Run `f` on the session under the lock, then deliver its step events
    ///
    /// The delivery lock is taken before the session lock so a listener
    /// blocked in delivery never holds the session.
    fn transition<T>(
        &self,
        f: impl FnOnce(&mut TransactionSession, &mut Outbox) -> Result<T>,
    ) -> Result<T> {
        let _delivery = self.delivery.lock();
        let mut outbox = Outbox::new();
        let result = {
            let mut guard = self.session.lock();
            let session = guard.as_mut().ok_or(Error::NoSession)?;
            let result = f(session, &mut outbox);

            if session.step().is_terminal() {
                debug!(step = %session.step(), "Transaction finished");
                *guard = None;
                self.process_started.store(false, Ordering::Release);
            }
            result
        };
        self.deliver(outbox);
        result
    }

    fn deliver(&self, outbox: Outbox) {
        for event in outbox {
            trace!(step = %event.step, "Delivering step event");
            self.listener.on_step(event);
        }
    }

    fn dispatch(&self, session: &mut TransactionSession, event: KernelEvent, outbox: &mut Outbox) {
        trace!(step = %session.step(), "Kernel callback");
        match event {
            KernelEvent::CardFound(presence) => self.on_card_found(session, presence, outbox),
            KernelEvent::AppCandidates(candidates) => {
                self.on_app_candidates(session, candidates, outbox)
            }
            KernelEvent::FinalAppSelected { aid } => self.on_final_app_selected(session, aid, outbox),
            KernelEvent::ConfirmCardNumber { card_no } => {
                session.record_pan(&card_no);
                let masked = session.pan().map(card_data::mask_pan).unwrap_or_default();
                emit(session, outbox, Step::ConfirmCardNo, StepPayload::CardNumber(masked));
                let result = self.kernel.import_card_number_status(true);
                self.check(session, outbox, "import_card_number_status", result);
            }
            KernelEvent::DataExchangeComplete => {
                self.refresh_card_data(session);
                let card = self.card_data(session);
                emit(
                    session,
                    outbox,
                    Step::DataExchangeComplete,
                    StepPayload::CardData(Box::new(card)),
                );
            }
            KernelEvent::RequestPinPad {
                pin_type,
                remaining_time,
            } => self.on_request_pin_pad(session, pin_type, remaining_time, outbox),
            KernelEvent::RequestSignature => {
                emit(session, outbox, Step::Signature, StepPayload::None);
            }
            KernelEvent::CertificateVerify { kind, info } => {
                emit(
                    session,
                    outbox,
                    Step::CertVerify,
                    StepPayload::Certificate { kind, info },
                );
                let result = self.kernel.import_certificate_status(true);
                self.check(session, outbox, "import_certificate_status", result);
            }
            KernelEvent::OnlineProcessingRequired => self.on_online_required(session, outbox),
            KernelEvent::TermRiskManagement => {
                emit(session, outbox, Step::TermRiskManagement, StepPayload::None);
                let result = self.kernel.import_term_risk_mgmt_status(true);
                self.check(session, outbox, "import_term_risk_mgmt_status", result);
            }
            KernelEvent::PreFirstGenAc => {
                emit(session, outbox, Step::PreFirstGenAc, StepPayload::None);
                let result = self.kernel.import_pre_first_gen_ac_status(true);
                self.check(session, outbox, "import_pre_first_gen_ac_status", result);
            }
            KernelEvent::DataStorage {
                container_ids,
                container_values,
            } => {
                emit(
                    session,
                    outbox,
                    Step::DataStorage,
                    StepPayload::DataStorage {
                        container_ids: container_ids.clone(),
                        container_values: container_values.clone(),
                    },
                );
                let result = self.kernel.import_data_storage(&container_ids, &container_values);
                self.check(session, outbox, "import_data_storage", result);
            }
            KernelEvent::TransactionResult { code, description } => {
                self.on_transaction_result(session, code, description, outbox)
            }
            KernelEvent::ConfirmationCodeVerified => {
                info!("Cardholder verified on device, card must be presented again");
                let code = ResultCode::SeePhone;
                self.present_again(session, outbox, Outcome::new(code.to_string(), code.raw()));
            }
            KernelEvent::RequestDataExchange { card_no } => {
                debug!("Kernel requested data exchange");
                session.record_pan(&card_no);
            }
            KernelEvent::Error { code, message } => self.on_error(session, code, message, outbox),
        }
    }

    fn on_card_found(&self, session: &mut TransactionSession, presence: CardPresence, outbox: &mut Outbox) {
        if self
            .process_started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Card already being processed, ignoring duplicate card-found");
            return;
        }

        let card_type = presence.card_type();
        info!(%card_type, "Card detected");
        session.set_card_type(card_type);
        emit(session, outbox, Step::CardFound, StepPayload::Card(presence));

        let request = StartRequest {
            amount: session.amount(),
            kind: session.kind(),
            flow: card_type.flow(),
            card_type,
            currency_code: self.config.currency_code,
            pin_timeout: self.config.pin_timeout(),
        };
        let result = self
            .kernel
            .init_process()
            .and_then(|()| self.kernel.start_transaction(&request));
        self.check(session, outbox, "start_transaction", result);
    }

    fn on_app_candidates(
        &self,
        session: &mut TransactionSession,
        candidates: Vec<AppCandidate>,
        outbox: &mut Outbox,
    ) {
        match candidates.len() {
            0 => {
                warn!("Card offered no application");
                if let Err(e) = self.kernel.card_power_off() {
                    debug!("Card power off failed: {}", e);
                }
                emit(
                    session,
                    outbox,
                    Step::TransResult(TransResult::Fail),
                    StepPayload::Outcome(Outcome::new(
                        "No supported application",
                        codes::NO_APPLICATION,
                    )),
                );
            }
            1 => {
                debug!(label = %candidates[0].label, "Single application, selecting it");
                session.set_candidates(candidates);
                let result = self.kernel.import_app_select(0);
                self.check(session, outbox, "import_app_select", result);
            }
            count => {
                info!(count, "Several applications, waiting for selection");
                session.set_candidates(candidates.clone());
                emit(session, outbox, Step::AppSelect, StepPayload::Candidates(candidates));
            }
        }
    }

    fn on_final_app_selected(
        &self,
        session: &mut TransactionSession,
        aid: Option<Bytes>,
        outbox: &mut Outbox,
    ) {
        let aid = aid
            .filter(|aid| !aid.is_empty())
            .or_else(|| self.read_tag(TlvSpace::Standard, tags::AID))
            .or_else(|| self.read_tag(TlvSpace::Standard, tags::TERMINAL_AID));

        if let Some(aid) = &aid {
            debug!(aid = %hex::encode_upper(aid), "Application selected");
            session.set_aid(aid.clone());
        }
        emit(
            session,
            outbox,
            Step::FinalAppSelect,
            StepPayload::Application { aid },
        );
        let result = self.kernel.import_final_select_status(true);
        self.check(session, outbox, "import_final_select_status", result);
    }

    fn on_request_pin_pad(
        &self,
        session: &mut TransactionSession,
        pin_type: i32,
        remaining_time: u32,
        outbox: &mut Outbox,
    ) {
        let kind = if pin_type == PIN_TYPE_ONLINE {
            PinKind::Online
        } else {
            PinKind::Offline
        };
        info!(%kind, "Kernel requested PIN");
        session.clear_manual_pin("kernel requested PIN");

        if session.pan().is_none() {
            self.refresh_card_data(session);
        }
        let trigger = PinTrigger::Kernel(kind);
        session.set_pin(PinState::Pending(trigger));
        let prompt = PinPrompt {
            trigger,
            remaining_time,
            pan: session.pan().map(str::to_owned),
        };
        emit(session, outbox, Step::ShowPinPad, StepPayload::PinPrompt(prompt));
    }

    fn finish_kernel_pin(
        &self,
        session: &mut TransactionSession,
        outbox: &mut Outbox,
        kind: PinKind,
        entry: PinEntry,
    ) {
        let status = entry.status();
        info!(%kind, %status, "PIN entry finished");
        match entry {
            PinEntry::Entered { pin_block } => {
                session.set_pin(PinState::Collected(kind));
                session.set_pin_block(pin_block);
            }
            PinEntry::Bypassed => session.set_pin(PinState::Bypassed),
            PinEntry::Cancelled | PinEntry::Failed => {
                session.set_pin(PinState::KernelAttempted(kind))
            }
        }
        emit(session, outbox, Step::PinResult, StepPayload::PinStatus(status));
        let result = self.kernel.import_pin_status(kind, status);
        self.check(session, outbox, "import_pin_status", result);
    }

    fn finish_manual_pin(&self, session: &mut TransactionSession, outbox: &mut Outbox, entry: PinEntry) {
        let status = entry.status();
        info!(%status, "Terminal PIN entry finished");
        match entry {
            PinEntry::Entered { pin_block } => {
                session.set_pin(PinState::Collected(PinTrigger::Manual.kind()));
                session.set_pin_block(pin_block);
                session.clear_manual_pin("PIN collected");
                emit(session, outbox, Step::PinResult, StepPayload::PinStatus(status));
                self.go_online(session, outbox);
            }
            PinEntry::Bypassed => {
                session.set_pin(PinState::Bypassed);
                session.clear_manual_pin("PIN bypassed");
                emit(session, outbox, Step::PinResult, StepPayload::PinStatus(status));
                self.go_online(session, outbox);
            }
            PinEntry::Cancelled => {
                self.abort_kernel();
                emit(
                    session,
                    outbox,
                    Step::UserCancelled,
                    StepPayload::Outcome(Outcome::new("PIN entry cancelled", USER_CANCELLED_CODE)),
                );
            }
            PinEntry::Failed => {
                session.set_pin(PinState::None);
                emit(session, outbox, Step::PinResult, StepPayload::PinStatus(status));
                self.abort_kernel();
                emit(
                    session,
                    outbox,
                    Step::TransResult(TransResult::Fail),
                    StepPayload::Outcome(Outcome::new("PIN entry failed", codes::PIN_ENTRY_FAILED)),
                );
            }
        }
    }

    fn on_online_required(&self, session: &mut TransactionSession, outbox: &mut Outbox) {
        let evidence = self.read_tlv(session.tlv_space(), ONLINE_EVIDENCE_TAGS);
        session.absorb(evidence);

        let decision = decide(&session.cvm_context(), &self.config.cvm);
        debug!(
            %decision,
            manual_pin_required = session.manual_pin_required(),
            device_verified = session.device_verified(),
            "CVM decision before going online"
        );

        let needs_pin = match session.pin() {
            PinState::Collected(_) | PinState::Bypassed | PinState::KernelAttempted(_) => false,
            PinState::None | PinState::Pending(_) => {
                session.manual_pin_required()
                    || pin_outstanding(decision, None, session.device_verified())
            }
        };
        if needs_pin {
            info!("PIN required before going online, prompting on the terminal");
            session.set_pin(PinState::Pending(PinTrigger::Manual));
            let prompt = PinPrompt {
                trigger: PinTrigger::Manual,
                remaining_time: self.config.pin_timeout_secs,
                pan: session.pan().map(str::to_owned),
            };
            emit(session, outbox, Step::ShowPinPad, StepPayload::PinPrompt(prompt));
            return;
        }

        self.go_online(session, outbox);
    }

    fn go_online(&self, session: &mut TransactionSession, outbox: &mut Outbox) {
        if session.pan().is_none() {
            self.refresh_card_data(session);
        }

        let icc_data = self
            .kernel
            .get_tlv_list(session.tlv_space(), &self.config.online_tags)
            .unwrap_or_else(|e| {
                warn!("Reading online request data failed: {}", e);
                Bytes::new()
            });

        let request = OnlineRequest {
            amount: session.amount(),
            kind: session.kind(),
            card_type: session.card_type(),
            pan: session.pan().map(str::to_owned),
            pin_block: session.pin_block(),
            card: self.card_data(session),
            icc_data,
        };
        info!(
            pan = %session.pan().map(card_data::mask_pan).unwrap_or_default(),
            pin = request.pin_block.is_some(),
            "Authorization request ready"
        );
        emit(
            session,
            outbox,
            Step::OnlineProcess,
            StepPayload::Online(Box::new(request)),
        );
    }

    fn on_transaction_result(
        &self,
        session: &mut TransactionSession,
        raw: i32,
        description: String,
        outbox: &mut Outbox,
    ) {
        let code = ResultCode::from_raw(raw);
        match code.class() {
            ResultClass::Approved => {
                let evidence = self.read_tlv(session.tlv_space(), SETTLEMENT_TAGS);
                session.absorb(evidence);

                let settlement = Settlement {
                    amount: session.amount(),
                    kind: session.kind(),
                    card_type: session.card_type(),
                    masked_pan: session.pan().map(card_data::mask_pan),
                    aid: session.aid().map(Bytes::copy_from_slice),
                    cvm: settlement_cvm(
                        session.pin_collected(),
                        session.cvm_list(),
                        session.cvm_results(),
                    ),
                };
                info!(%code, cvm = %settlement.cvm, "Transaction approved");
                emit(
                    session,
                    outbox,
                    Step::TransResult(TransResult::Success),
                    StepPayload::Outcome(Outcome {
                        description,
                        code: raw,
                        settlement: Some(settlement),
                    }),
                );
            }
            ResultClass::Retry => {
                info!(%code, "Card must be presented again");
                self.present_again(session, outbox, Outcome::new(description, raw));
            }
            ResultClass::Declined => {
                Diagnostics::collect(&self.kernel, session.tlv_space()).log(code, &description);
                emit(
                    session,
                    outbox,
                    Step::TransResult(TransResult::Fail),
                    StepPayload::Outcome(Outcome::new(description, raw)),
                );
            }
        }
    }

    fn on_error(&self, session: &mut TransactionSession, code: i32, message: String, outbox: &mut Outbox) {
        let error = DetectionError::from_code(code);
        let description = if message.is_empty() {
            error.to_string()
        } else {
            format!("{error}: {message}")
        };

        let step = match error {
            DetectionError::UserCancelled => {
                info!("Transaction cancelled on the terminal");
                Step::UserCancelled
            }
            _ => {
                warn!(code, %error, kernel_message = %message, "Card error");
                Step::CardError
            }
        };
        emit(
            session,
            outbox,
            step,
            StepPayload::Outcome(Outcome::new(description, code)),
        );
    }

    /// Power the card off, report the retry and restart detection
    fn present_again(&self, session: &mut TransactionSession, outbox: &mut Outbox, outcome: Outcome) {
        if let Err(e) = self.kernel.card_power_off() {
            debug!("Card power off failed: {}", e);
        }
        match self.kernel.card_present() {
            Ok(true) => info!("Card still in the reader, waiting for it to be presented again"),
            Ok(false) => debug!("Card removed"),
            Err(e) => debug!("Card presence check failed: {}", e),
        }
        emit(
            session,
            outbox,
            Step::TransResult(TransResult::PresentCardAgain),
            StepPayload::Outcome(outcome),
        );
        session.reset_for_presentation();
        self.process_started.store(false, Ordering::Release);
        self.detect(session, outbox);
    }

    fn detect(&self, session: &mut TransactionSession, outbox: &mut Outbox) {
        emit(session, outbox, Step::CardDetect, StepPayload::None);
        let result = self.kernel.check_card(&self.config.detect_options());
        self.check(session, outbox, "check_card", result);
    }

    fn abort_kernel(&self) {
        if let Err(e) = self.kernel.cancel_detection() {
            warn!("Kernel cancel failed: {}", e);
        }
    }

    /// Convert a failed kernel call into the nearest terminal step
    fn check(
        &self,
        session: &mut TransactionSession,
        outbox: &mut Outbox,
        call: &'static str,
        result: std::result::Result<(), KernelError>,
    ) {
        let Err(err) = result else {
            return;
        };
        error!(call, code = err.code(), "Kernel call failed: {}", err);

        let step = if self.process_started.load(Ordering::Acquire) {
            Step::TransResult(TransResult::Fail)
        } else {
            Step::CardError
        };
        emit(
            session,
            outbox,
            step,
            StepPayload::Outcome(Outcome::new(err.to_string(), err.code())),
        );
    }

    fn card_data(&self, session: &TransactionSession) -> CardData {
        let contactless = session.card_type() == Some(CardType::Contactless);
        let mut card = CardData::from_tlv(session.tlv(), contactless);
        if card.pan.is_none() {
            card.pan = session.pan().map(str::to_owned);
        }
        if card.aid.is_none() {
            card.aid = session.aid().map(Bytes::copy_from_slice);
        }
        card
    }

    fn refresh_card_data(&self, session: &mut TransactionSession) {
        let map = self.read_tlv(session.tlv_space(), CARD_DATA_TAGS);
        session.absorb(map);
    }

    /// Read `tags`, brand space values taking precedence over standard ones
    fn read_tlv(&self, space: TlvSpace, tags: &[Tag]) -> TlvMap {
        let mut map = self.read_space(TlvSpace::Standard, tags);
        if space != TlvSpace::Standard {
            for record in self.read_space(space, tags).records() {
                if !record.is_empty() {
                    map.insert(record.clone());
                }
            }
        }
        map
    }

    fn read_space(&self, space: TlvSpace, tags: &[Tag]) -> TlvMap {
        match self.kernel.get_tlv_list(space, tags) {
            Ok(blob) => decode_to_map(&blob),
            Err(e) => {
                warn!(?space, "TLV read failed: {}", e);
                TlvMap::new()
            }
        }
    }

    fn read_tag(&self, space: TlvSpace, tag: Tag) -> Option<Bytes> {
        self.kernel
            .get_tlv(space, tag)
            .inspect_err(|e| debug!(%tag, "TLV read failed: {}", e))
            .ok()
            .flatten()
            .filter(|value| !value.is_empty())
    }
}
