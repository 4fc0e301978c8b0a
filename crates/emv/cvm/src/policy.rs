//! Terminal CVM policy: manual-CVM threshold and brand strategies

/// Default amount, in minor units, from which the terminal insists on a PIN
pub const DEFAULT_MANUAL_CVM_THRESHOLD: u64 = 60_000;

/// How a brand's CVM List is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CvmStrategy {
    /// First satisfied rule decides
    #[default]
    Generic,
    /// The CVM List overrides the kernel's CVM Results; a single rule applies
    /// regardless of amount, several rules below the threshold mean no CVM
    ListAuthoritative,
}

/// Strategy assignment for one AID prefix
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
pub struct BrandRule {
    /// Brand name, for logs
    pub name: String,
    /// AID prefix, usually the 5-byte RID
    #[cfg_attr(feature = "serde", serde(with = "hex::serde"))]
    pub aid_prefix: Vec<u8>,
    /// Strategy for matching applications
    pub strategy: CvmStrategy,
}

impl BrandRule {
    /// Create a rule
    pub fn new(name: impl Into<String>, aid_prefix: impl Into<Vec<u8>>, strategy: CvmStrategy) -> Self {
        Self {
            name: name.into(),
            aid_prefix: aid_prefix.into(),
            strategy,
        }
    }

    fn matches(&self, aid: &[u8]) -> bool {
        !self.aid_prefix.is_empty() && aid.starts_with(&self.aid_prefix)
    }
}

/// Brand policy table, first matching prefix wins
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct BrandTable {
    rules: Vec<BrandRule>,
}

impl BrandTable {
    /// Create a table from explicit rules
    pub const fn new(rules: Vec<BrandRule>) -> Self {
        Self { rules }
    }

    /// Table without any brand override: every application is generic
    pub const fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Rule matching `aid`, if any
    pub fn lookup(&self, aid: &[u8]) -> Option<&BrandRule> {
        self.rules.iter().find(|r| r.matches(aid))
    }

    /// Strategy for `aid`; unknown or missing AIDs are generic
    pub fn strategy_for(&self, aid: Option<&[u8]>) -> CvmStrategy {
        aid.and_then(|aid| self.lookup(aid))
            .map(|r| r.strategy)
            .unwrap_or_default()
    }

    /// Rules in lookup order
    pub fn rules(&self) -> &[BrandRule] {
        &self.rules
    }
}

impl Default for BrandTable {
    /// Mastercard and Maestro RIDs use the list-authoritative strategy
    fn default() -> Self {
        Self::new(vec![
            BrandRule::new(
                "Mastercard",
                [0xA0, 0x00, 0x00, 0x00, 0x04],
                CvmStrategy::ListAuthoritative,
            ),
            BrandRule::new(
                "Maestro",
                [0xA0, 0x00, 0x00, 0x00, 0x05],
                CvmStrategy::ListAuthoritative,
            ),
        ])
    }
}

/// Inputs to the CVM engine that come from terminal configuration
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CvmPolicy {
    /// Amount in minor units at or above which verification is enforced
    pub manual_cvm_threshold: u64,
    /// Brand strategies keyed by AID prefix
    pub brands: BrandTable,
}

impl Default for CvmPolicy {
    fn default() -> Self {
        Self {
            manual_cvm_threshold: DEFAULT_MANUAL_CVM_THRESHOLD,
            brands: BrandTable::default(),
        }
    }
}

impl CvmPolicy {
    /// Create a policy with the default brand table
    pub fn new(manual_cvm_threshold: u64) -> Self {
        Self {
            manual_cvm_threshold,
            ..Self::default()
        }
    }

    /// Set the manual-CVM threshold
    pub const fn with_threshold(mut self, manual_cvm_threshold: u64) -> Self {
        self.manual_cvm_threshold = manual_cvm_threshold;
        self
    }

    /// Replace the brand table
    pub fn with_brands(mut self, brands: BrandTable) -> Self {
        self.brands = brands;
        self
    }

    /// Whether `amount` reaches the manual-CVM threshold
    pub const fn above_threshold(&self, amount: u64) -> bool {
        amount >= self.manual_cvm_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table() {
        let table = BrandTable::default();
        let mastercard = hex::decode("A0000000041010").unwrap();
        let maestro = hex::decode("A0000000043060").unwrap();
        let visa = hex::decode("A0000000031010").unwrap();

        assert_eq!(
            table.strategy_for(Some(&mastercard)),
            CvmStrategy::ListAuthoritative
        );
        assert_eq!(table.lookup(&maestro).unwrap().name, "Mastercard");
        assert_eq!(table.strategy_for(Some(&visa)), CvmStrategy::Generic);
        assert_eq!(table.strategy_for(None), CvmStrategy::Generic);
    }

    #[test]
    fn test_empty_table_is_generic() {
        let mastercard = hex::decode("A0000000041010").unwrap();
        assert_eq!(
            BrandTable::empty().strategy_for(Some(&mastercard)),
            CvmStrategy::Generic
        );
    }

    #[test]
    fn test_threshold() {
        let policy = CvmPolicy::new(60_000);
        assert!(!policy.above_threshold(59_999));
        assert!(policy.above_threshold(60_000));
    }
}
