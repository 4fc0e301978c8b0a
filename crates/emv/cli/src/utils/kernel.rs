//! In-process kernel that plays back a scripted card

use std::sync::atomic::{AtomicU32, Ordering};

use nexum_emv_cvm::PinKind;
use nexum_emv_orchestrator::{
    CardPresence, DetectOptions, Kernel, KernelError, KernelEvent, KernelEventSender, KernelResult,
    OnlineDecision, OnlineResponse, PinStatus, StartRequest, TlvSpace, codes,
};
use nexum_emv_tlv::{Bytes, Tag, TlvMap, encode_all};
use tracing::{debug, info};

/// Card behaviour the simulated kernel reproduces
#[derive(Debug, Clone)]
pub struct CardScript {
    /// How the card is presented
    pub presence: CardPresence,
    /// Application the kernel selects
    pub aid: Bytes,
    /// Data objects the card exposes
    pub data: TlvMap,
    /// Ask for a second tap after device verification
    pub see_phone: bool,
}

/// Kernel double that answers imports by raising the next callbacks
#[derive(Debug)]
pub struct ScriptedKernel {
    events: KernelEventSender,
    script: CardScript,
    presentations: AtomicU32,
}

impl ScriptedKernel {
    /// Create a kernel raising callbacks on `events`
    pub const fn new(events: KernelEventSender, script: CardScript) -> Self {
        Self {
            events,
            script,
            presentations: AtomicU32::new(0),
        }
    }

    fn raise(&self, event: KernelEvent) -> KernelResult<()> {
        debug!(event = event.name(), "Simulated kernel callback");
        self.events.send(event).map_err(|_| KernelError::Disconnected)
    }
}

impl Kernel for ScriptedKernel {
    fn check_card(&self, options: &DetectOptions) -> KernelResult<()> {
        let presented = self.presentations.fetch_add(1, Ordering::AcqRel) + 1;
        info!(presented, timeout = ?options.timeout, "Waiting for card");
        self.raise(KernelEvent::CardFound(self.script.presence.clone()))
    }

    fn cancel_detection(&self) -> KernelResult<()> {
        Ok(())
    }

    fn init_process(&self) -> KernelResult<()> {
        Ok(())
    }

    fn start_transaction(&self, request: &StartRequest) -> KernelResult<()> {
        debug!(amount = %request.amount_string(), flow = ?request.flow, "Kernel transaction started");
        if self.script.see_phone && self.presentations.load(Ordering::Acquire) == 1 {
            return self.raise(KernelEvent::ConfirmationCodeVerified);
        }
        self.raise(KernelEvent::FinalAppSelected {
            aid: Some(self.script.aid.clone()),
        })
    }

    fn import_app_select(&self, _index: usize) -> KernelResult<()> {
        self.raise(KernelEvent::FinalAppSelected {
            aid: Some(self.script.aid.clone()),
        })
    }

    fn import_final_select_status(&self, accept: bool) -> KernelResult<()> {
        if !accept {
            return self.raise(KernelEvent::TransactionResult {
                code: codes::TERMINATED,
                description: "Application not accepted".to_owned(),
            });
        }
        self.raise(KernelEvent::DataExchangeComplete)?;
        self.raise(KernelEvent::OnlineProcessingRequired)
    }

    fn import_card_number_status(&self, _accept: bool) -> KernelResult<()> {
        Ok(())
    }

    fn import_pin_status(&self, kind: PinKind, status: PinStatus) -> KernelResult<()> {
        debug!(%kind, %status, "PIN status imported");
        Ok(())
    }

    fn import_certificate_status(&self, _accept: bool) -> KernelResult<()> {
        Ok(())
    }

    fn import_signature_status(&self, accept: bool) -> KernelResult<()> {
        let (code, description) = if accept {
            (codes::OFFLINE_APPROVED, "Approved")
        } else {
            (codes::OFFLINE_DECLINED, "Signature refused")
        };
        self.raise(KernelEvent::TransactionResult {
            code,
            description: description.to_owned(),
        })
    }

    fn import_online_processing_status(&self, response: &OnlineResponse) -> KernelResult<()> {
        let (code, description) = match response.decision {
            OnlineDecision::Approved => (codes::ONLINE_APPROVED, "Approved"),
            OnlineDecision::Declined => (codes::ONLINE_DECLINED, "Declined by issuer"),
            OnlineDecision::Unreachable => (codes::OFFLINE_DECLINED, "Issuer unavailable"),
        };
        self.raise(KernelEvent::TransactionResult {
            code,
            description: description.to_owned(),
        })
    }

    fn import_term_risk_mgmt_status(&self, _accept: bool) -> KernelResult<()> {
        Ok(())
    }

    fn import_pre_first_gen_ac_status(&self, _accept: bool) -> KernelResult<()> {
        Ok(())
    }

    fn import_data_storage(&self, _container_ids: &[String], _container_values: &[String]) -> KernelResult<()> {
        Ok(())
    }

    fn card_power_off(&self) -> KernelResult<()> {
        debug!("Card powered off");
        Ok(())
    }

    fn card_present(&self) -> KernelResult<bool> {
        Ok(true)
    }

    fn get_tlv(&self, _space: TlvSpace, tag: Tag) -> KernelResult<Option<Bytes>> {
        Ok(self.script.data.get(tag).map(|record| record.value_bytes()))
    }

    fn get_tlv_list(&self, _space: TlvSpace, tags: &[Tag]) -> KernelResult<Bytes> {
        let records = tags.iter().filter_map(|tag| self.script.data.get(*tag));
        encode_all(records).map_err(|e| KernelError::remote(-1, e.to_string()))
    }
}
