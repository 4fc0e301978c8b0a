//! Shared helpers for the EMV CLI

pub mod display;
pub mod kernel;

use std::{error::Error, fs, path::Path};

use nexum_emv_orchestrator::OrchestratorConfig;
use nexum_emv_tlv::Bytes;

/// Parse a hex argument, ignoring whitespace
pub fn parse_hex(input: &str) -> Result<Bytes, Box<dyn Error>> {
    let cleaned: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    Ok(Bytes::from(hex::decode(cleaned)?))
}

/// Load an orchestrator configuration from a JSON file, or use the defaults
pub fn load_config(path: Option<&Path>) -> Result<OrchestratorConfig, Box<dyn Error>> {
    let Some(path) = path else {
        return Ok(OrchestratorConfig::default());
    };
    let raw = fs::read_to_string(path)?;
    let config = serde_json::from_str(&raw)?;
    tracing::debug!(path = %path.display(), "Loaded terminal configuration");
    Ok(config)
}
