//! Evaluate a CVM decision from raw card data

use std::{error::Error, path::Path};

use nexum_emv_cvm::{CvmContext, CvmList, CvmResults, assess};
use tracing::debug;

use crate::utils::{self, display};

/// Run the CVM engine over a CVM List and CVM Results
pub fn cvm_command(
    cvm_list: Option<&str>,
    cvm_results: Option<&str>,
    amount: u64,
    aid: Option<&str>,
    config: Option<&Path>,
) -> Result<(), Box<dyn Error>> {
    let config = utils::load_config(config)?;
    let list = cvm_list.map(CvmList::from_hex).transpose()?;
    let results = cvm_results.map(CvmResults::from_hex).transpose()?;
    let aid = aid.map(utils::parse_hex).transpose()?;

    let ctx = CvmContext {
        cvm_list: list.as_ref(),
        cvm_results: results.as_ref(),
        amount,
        aid: aid.as_deref(),
    };
    let assessment = assess(&ctx, &config.cvm, config.kernel_prompts_pin);
    let brand = aid
        .as_deref()
        .and_then(|aid| config.cvm.brands.lookup(aid))
        .map(|rule| rule.name.clone());
    debug!(?assessment, "CVM assessed");

    if let Some(list) = &list {
        println!("{}", display::section_title("CVM List"));
        for rule in &list.rules {
            println!("  {:?} / {:?}", rule.method, rule.condition);
        }
    }

    println!(
        "\n{}",
        display::key_value_box(
            "CVM decision",
            vec![
                ("Amount", amount.to_string()),
                ("Brand", display::or_dash(brand)),
                (
                    "Threshold",
                    config.cvm.manual_cvm_threshold.to_string()
                ),
                (
                    "Device verified",
                    results
                        .as_ref()
                        .is_some_and(|r| r.device_verified())
                        .to_string()
                ),
                ("Decision", assessment.decision.to_string()),
                (
                    "Terminal PIN prompt",
                    assessment.manual_pin_required.to_string()
                ),
            ],
        )
    );

    Ok(())
}
