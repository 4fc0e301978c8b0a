//! EMV transaction orchestrator
//!
//! Sequences a black-box EMV kernel through card detection, application
//! selection, cardholder verification, online authorization and result
//! interpretation. The kernel is reached through the [`Kernel`] trait; its
//! callbacks come back as [`KernelEvent`] values on a channel created with
//! [`kernel_event_channel`]. Consumers observe [`StepEvent`]s through a
//! [`StepListener`] and answer PIN, signature, application and online prompts
//! through the [`Orchestrator`] methods.
//!
//! # Examples
//!
//! ```no_run
//! use nexum_emv_orchestrator::{
//!     Kernel, KernelEventReceiver, Orchestrator, OrchestratorConfig, StepEvent, TransactionKind,
//! };
//!
//! fn purchase<K: Kernel>(kernel: K, events: KernelEventReceiver) -> nexum_emv_orchestrator::Result<()> {
//!     let orchestrator = Orchestrator::new(
//!         kernel,
//!         |event: StepEvent| println!("{}", event.step),
//!         OrchestratorConfig::default(),
//!     );
//!
//!     orchestrator.start(1_000, TransactionKind::Purchase)?;
//!     orchestrator.run_transaction(&events);
//!     Ok(())
//! }
//! ```
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

pub mod card_data;
mod config;
pub mod diagnostics;
mod error;
pub mod event;
mod kernel;
mod orchestrator;
mod result;
mod session;

pub use card_data::CardData;
pub use config::{
    DEFAULT_CURRENCY_CODE, DEFAULT_DETECT_TIMEOUT_SECS, DEFAULT_PIN_TIMEOUT_SECS,
    OrchestratorConfig,
};
pub use diagnostics::Diagnostics;
pub use error::{DISCONNECTED_CODE, Error, KernelError, REJECTED_CODE, Result};
pub use event::{
    AppCandidate, CARD_REMOVED_CODE, CardPresence, DetectionError, KernelEvent,
    KernelEventReceiver, KernelEventSender, Outcome, OnlineRequest, PIN_TYPE_ONLINE, PinPrompt,
    Settlement, Step, StepEvent, StepEventReceiver, StepEventSender, StepListener, StepPayload,
    TIMEOUT_CODE, TransResult, USER_CANCELLED_CODE, bounded_kernel_event_channel,
    kernel_event_channel, step_event_channel,
};
pub use kernel::{
    CardType, DetectOptions, FlowType, Kernel, KernelResult, OnlineDecision, OnlineResponse,
    PinStatus, Scheme, StartRequest, TlvSpace, TransactionKind,
};
pub use orchestrator::Orchestrator;
pub use result::{ResultClass, ResultCode, codes};
pub use session::{PinEntry, PinState, PinTrigger, TransactionSession};

// Re-export the CVM and TLV crates the public API is built on
pub use nexum_emv_cvm as cvm;
pub use nexum_emv_tlv as tlv;
