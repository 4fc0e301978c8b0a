//! Cardholder Verification Method (CVM) decision engine
//!
//! Pure functions over the card's CVM List (`8E`), the kernel's CVM Results
//! (`9F34`), the transaction amount and the application identifier. They decide
//! whether a transaction needs online PIN, offline PIN, a signature or no
//! verification at all, and whether the terminal has to collect a PIN itself
//! because the kernel will not ask for one.
//!
//! Brand specific behaviour comes from the [`BrandTable`] in a [`CvmPolicy`], keyed
//! by AID prefix.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

mod engine;
mod error;
mod policy;
mod results;
mod rule;

pub use engine::{
    CvmAssessment, CvmContext, CvmDecision, PinKind, assess, decide, evaluate,
    manual_pin_required, pin_outstanding, settlement_cvm,
};
pub use error::CvmError;
pub use policy::{
    BrandRule, BrandTable, CvmPolicy, CvmStrategy, DEFAULT_MANUAL_CVM_THRESHOLD,
};
pub use results::{CvmResultCode, CvmResults};
pub use rule::{CvmCondition, CvmList, CvmMethod, CvmRule};
