//! Terminal configuration for the orchestrator

use std::time::Duration;

use nexum_emv_cvm::{CvmPolicy, manual_pin_required};
use nexum_emv_tlv::{Tag, tags};

use crate::DetectOptions;

/// Default card detection timeout in seconds
pub const DEFAULT_DETECT_TIMEOUT_SECS: u64 = 60;
/// Default PIN entry timeout in seconds
pub const DEFAULT_PIN_TIMEOUT_SECS: u32 = 60;
/// Default transaction currency (EUR)
pub const DEFAULT_CURRENCY_CODE: u16 = 978;

/// Configuration options for the orchestrator
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct OrchestratorConfig {
    /// CVM threshold and brand strategies
    pub cvm: CvmPolicy,

    /// The kernel prompts for PIN on its own above the CVM limit
    pub kernel_prompts_pin: bool,

    /// Poll the contact interface
    pub contact: bool,

    /// Poll the contactless interface
    pub contactless: bool,

    /// Card detection timeout in seconds
    pub detect_timeout_secs: u64,

    /// PIN entry timeout in seconds
    pub pin_timeout_secs: u32,

    /// ISO 4217 numeric currency code
    pub currency_code: u16,

    /// Tags packed into the online authorization request
    pub online_tags: Vec<Tag>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            cvm: CvmPolicy::default(),
            kernel_prompts_pin: false,
            contact: true,
            contactless: true,
            detect_timeout_secs: DEFAULT_DETECT_TIMEOUT_SECS,
            pin_timeout_secs: DEFAULT_PIN_TIMEOUT_SECS,
            currency_code: DEFAULT_CURRENCY_CODE,
            online_tags: tags::ONLINE_REQUEST_TAGS.to_vec(),
        }
    }
}

impl OrchestratorConfig {
    /// Create a configuration with default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the CVM policy
    pub fn with_cvm(mut self, cvm: CvmPolicy) -> Self {
        self.cvm = cvm;
        self
    }

    /// Set whether the kernel prompts for PIN itself
    pub const fn with_kernel_prompts_pin(mut self, kernel_prompts_pin: bool) -> Self {
        self.kernel_prompts_pin = kernel_prompts_pin;
        self
    }

    /// Set the interfaces to poll
    pub const fn with_interfaces(mut self, contact: bool, contactless: bool) -> Self {
        self.contact = contact;
        self.contactless = contactless;
        self
    }

    /// Set the card detection timeout
    pub const fn with_detect_timeout(mut self, secs: u64) -> Self {
        self.detect_timeout_secs = secs;
        self
    }

    /// Set the PIN entry timeout
    pub const fn with_pin_timeout(mut self, secs: u32) -> Self {
        self.pin_timeout_secs = secs;
        self
    }

    /// Set the transaction currency
    pub const fn with_currency_code(mut self, currency_code: u16) -> Self {
        self.currency_code = currency_code;
        self
    }

    /// Set the tags sent with the online request
    pub fn with_online_tags(mut self, online_tags: Vec<Tag>) -> Self {
        self.online_tags = online_tags;
        self
    }

    /// Options for a card detection request
    pub const fn detect_options(&self) -> DetectOptions {
        DetectOptions {
            contact: self.contact,
            contactless: self.contactless,
            timeout: Duration::from_secs(self.detect_timeout_secs),
        }
    }

    /// PIN entry timeout
    pub const fn pin_timeout(&self) -> Duration {
        Duration::from_secs(self.pin_timeout_secs as u64)
    }

    /// Whether a transaction of `amount` starts with the manual-PIN flag set
    pub const fn manual_pin_required(&self, amount: u64) -> bool {
        manual_pin_required(amount, &self.cvm, self.kernel_prompts_pin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_pin_flag() {
        let config = OrchestratorConfig::new();
        assert!(!config.manual_pin_required(59_999));
        assert!(config.manual_pin_required(60_000));

        let config = config.with_kernel_prompts_pin(true);
        assert!(!config.manual_pin_required(60_000));
    }

    #[test]
    fn test_detect_options() {
        let options = OrchestratorConfig::new()
            .with_interfaces(false, true)
            .with_detect_timeout(30)
            .detect_options();
        assert!(!options.contact);
        assert!(options.contactless);
        assert_eq!(options.timeout, Duration::from_secs(30));
    }
}
