//! Shared fixtures: a recording kernel and an orchestrator harness

#![allow(dead_code, unreachable_pub)]

use std::{collections::HashMap, sync::Arc};

use nexum_emv_cvm::PinKind;
use nexum_emv_orchestrator::{
    AppCandidate, CardPresence, DetectOptions, Kernel, KernelError, KernelEvent, KernelResult,
    OnlineDecision, OnlineResponse, Orchestrator, OrchestratorConfig, PinStatus, StartRequest, Step,
    StepEvent, StepEventReceiver, StepEventSender, TlvSpace, step_event_channel,
};
use nexum_emv_tlv::{Bytes, Tag, TlvMap, decode_hex_to_map, encode_all};
use crossbeam_channel::{Receiver, Sender, unbounded};
use parking_lot::Mutex;

pub const VISA_AID: &str = "A0000000031010";
pub const MASTERCARD_AID: &str = "A0000000041010";

/// Kernel import recorded by [`RecordingKernel`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CheckCard(DetectOptions),
    CancelDetection,
    InitProcess,
    StartTransaction(StartRequest),
    AppSelect(usize),
    FinalSelect(bool),
    CardNumber(bool),
    Pin(PinKind, PinStatus),
    Certificate(bool),
    Signature(bool),
    Online(OnlineDecision),
    TermRiskManagement(bool),
    PreFirstGenAc(bool),
    DataStorage(Vec<String>, Vec<String>),
    PowerOff,
    CardPresent,
}

/// Kernel double that records imports and serves TLVs from memory
#[derive(Debug, Default)]
pub struct RecordingKernel {
    calls: Mutex<Vec<Call>>,
    reads: Mutex<Vec<(TlvSpace, Vec<Tag>)>>,
    data: Mutex<HashMap<TlvSpace, TlvMap>>,
    failures: Mutex<HashMap<&'static str, KernelError>>,
    present: Mutex<bool>,
    observer: Mutex<Option<Sender<Call>>>,
}

impl RecordingKernel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Load TLV data into the standard space
    pub fn load(&self, hex: &str) {
        self.load_space(TlvSpace::Standard, hex);
    }

    /// Load TLV data into `space`
    pub fn load_space(&self, space: TlvSpace, hex: &str) {
        self.data
            .lock()
            .entry(space)
            .or_default()
            .merge(decode_hex_to_map(hex));
    }

    /// Stream of recorded imports, for a kernel played from another thread
    pub fn observe(&self) -> Receiver<Call> {
        let (tx, rx) = unbounded();
        *self.observer.lock() = Some(tx);
        rx
    }

    /// Whether the card stays in the reader after power off
    pub fn set_present(&self, present: bool) {
        *self.present.lock() = present;
    }

    /// Make the named import fail
    pub fn fail(&self, call: &'static str, error: KernelError) {
        self.failures.lock().insert(call, error);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| matches(c)).count()
    }

    pub fn start_transactions(&self) -> usize {
        self.count(|c| matches!(c, Call::StartTransaction(_)))
    }

    pub fn reads(&self) -> Vec<(TlvSpace, Vec<Tag>)> {
        self.reads.lock().clone()
    }

    fn record(&self, name: &'static str, call: Call) -> KernelResult<()> {
        if let Some(error) = self.failures.lock().get(name) {
            return Err(error.clone());
        }
        if let Some(observer) = self.observer.lock().as_ref() {
            let _ = observer.send(call.clone());
        }
        self.calls.lock().push(call);
        Ok(())
    }
}

impl Kernel for RecordingKernel {
    fn check_card(&self, options: &DetectOptions) -> KernelResult<()> {
        self.record("check_card", Call::CheckCard(*options))
    }

    fn cancel_detection(&self) -> KernelResult<()> {
        self.record("cancel_detection", Call::CancelDetection)
    }

    fn init_process(&self) -> KernelResult<()> {
        self.record("init_process", Call::InitProcess)
    }

    fn start_transaction(&self, request: &StartRequest) -> KernelResult<()> {
        self.record("start_transaction", Call::StartTransaction(request.clone()))
    }

    fn import_app_select(&self, index: usize) -> KernelResult<()> {
        self.record("import_app_select", Call::AppSelect(index))
    }

    fn import_final_select_status(&self, accept: bool) -> KernelResult<()> {
        self.record("import_final_select_status", Call::FinalSelect(accept))
    }

    fn import_card_number_status(&self, accept: bool) -> KernelResult<()> {
        self.record("import_card_number_status", Call::CardNumber(accept))
    }

    fn import_pin_status(&self, kind: PinKind, status: PinStatus) -> KernelResult<()> {
        self.record("import_pin_status", Call::Pin(kind, status))
    }

    fn import_certificate_status(&self, accept: bool) -> KernelResult<()> {
        self.record("import_certificate_status", Call::Certificate(accept))
    }

    fn import_signature_status(&self, accept: bool) -> KernelResult<()> {
        self.record("import_signature_status", Call::Signature(accept))
    }

    fn import_online_processing_status(&self, response: &OnlineResponse) -> KernelResult<()> {
        self.record(
            "import_online_processing_status",
            Call::Online(response.decision),
        )
    }

    fn import_term_risk_mgmt_status(&self, accept: bool) -> KernelResult<()> {
        self.record("import_term_risk_mgmt_status", Call::TermRiskManagement(accept))
    }

    fn import_pre_first_gen_ac_status(&self, accept: bool) -> KernelResult<()> {
        self.record("import_pre_first_gen_ac_status", Call::PreFirstGenAc(accept))
    }

    fn import_data_storage(&self, container_ids: &[String], container_values: &[String]) -> KernelResult<()> {
        self.record(
            "import_data_storage",
            Call::DataStorage(container_ids.to_vec(), container_values.to_vec()),
        )
    }

    fn card_power_off(&self) -> KernelResult<()> {
        self.record("card_power_off", Call::PowerOff)
    }

    fn card_present(&self) -> KernelResult<bool> {
        self.record("card_present", Call::CardPresent)?;
        Ok(*self.present.lock())
    }

    fn get_tlv(&self, space: TlvSpace, tag: Tag) -> KernelResult<Option<Bytes>> {
        self.reads.lock().push((space, vec![tag]));
        Ok(self
            .data
            .lock()
            .get(&space)
            .and_then(|map| map.get(tag))
            .map(|record| record.value_bytes()))
    }

    fn get_tlv_list(&self, space: TlvSpace, tags: &[Tag]) -> KernelResult<Bytes> {
        if let Some(error) = self.failures.lock().get("get_tlv_list") {
            return Err(error.clone());
        }
        self.reads.lock().push((space, tags.to_vec()));

        let data = self.data.lock();
        let Some(map) = data.get(&space) else {
            return Ok(Bytes::new());
        };
        let records: Vec<_> = tags.iter().filter_map(|tag| map.get(*tag)).collect();
        encode_all(records).map_err(|e| KernelError::remote(-1, e.to_string()))
    }
}

/// Orchestrator wired to a [`RecordingKernel`] and a step channel
pub struct Harness {
    pub kernel: Arc<RecordingKernel>,
    pub orchestrator: Orchestrator<Arc<RecordingKernel>, StepEventSender>,
    events: StepEventReceiver,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(OrchestratorConfig::default())
    }

    pub fn with_config(config: OrchestratorConfig) -> Self {
        init_tracing();
        let kernel = RecordingKernel::new();
        let (tx, rx) = step_event_channel();
        Self {
            orchestrator: Orchestrator::new(kernel.clone(), tx, config),
            kernel,
            events: rx,
        }
    }

    /// Step events delivered since the last call
    pub fn events(&self) -> Vec<StepEvent> {
        self.events.try_iter().collect()
    }

    /// Steps delivered since the last call
    pub fn steps(&self) -> Vec<Step> {
        self.events().into_iter().map(|e| e.step).collect()
    }

    pub fn handle(&self, event: KernelEvent) {
        self.orchestrator.handle(event);
    }

    pub fn start_transactions(&self) -> usize {
        self.kernel
            .count(|c| matches!(c, Call::StartTransaction(_)))
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

pub fn chip() -> KernelEvent {
    KernelEvent::CardFound(CardPresence::Chip {
        atr: Bytes::from_static(&[0x3B, 0x6E, 0x00, 0x00]),
    })
}

pub fn nfc() -> KernelEvent {
    KernelEvent::CardFound(CardPresence::Nfc {
        uid: Bytes::from_static(&[0x04, 0x5A, 0x21, 0x9C]),
    })
}

pub fn aid(hex: &str) -> Bytes {
    Bytes::from(hex::decode(hex).unwrap())
}

pub fn candidate(aid_hex: &str, label: &str) -> AppCandidate {
    AppCandidate {
        aid: aid(aid_hex),
        label: label.to_owned(),
        priority: 1,
    }
}

pub fn final_select(aid_hex: &str) -> KernelEvent {
    KernelEvent::FinalAppSelected {
        aid: Some(aid(aid_hex)),
    }
}

pub fn result(code: i32, description: &str) -> KernelEvent {
    KernelEvent::TransactionResult {
        code,
        description: description.to_owned(),
    }
}
