//! Decode BER-TLV data

use std::error::Error;

use colored::Colorize;
use nexum_emv_tlv::{parse_record, tags};
use tracing::debug;

use crate::utils::{self, display};

/// Print every record in a hex TLV blob
pub fn decode_command(data: &str) -> Result<(), Box<dyn Error>> {
    let bytes = utils::parse_hex(data)?;

    println!("{}", display::section_title("TLV records"));
    let mut pos = 0;
    let mut count = 0;
    while pos < bytes.len() && bytes[pos] != 0x00 {
        match parse_record(&bytes[pos..]) {
            Ok((record, consumed)) => {
                println!(
                    "  {:<6} {:<40} {:>3}  {}",
                    record.tag().to_string().cyan().bold(),
                    tags::name(record.tag()),
                    record.len(),
                    record.value_hex()
                );
                pos += consumed;
                count += 1;
            }
            Err(e) => {
                println!(
                    "{}",
                    display::warning(&format!("Stopped at offset {pos}: {e}"))
                );
                break;
            }
        }
    }

    debug!(input_len = bytes.len(), records = count, "Decoded TLV data");
    if count == 0 {
        println!("{}", display::warning("No TLV records found"));
    } else if pos < bytes.len() {
        println!(
            "{}",
            display::info(&format!("{} bytes after the last record", bytes.len() - pos))
        );
    }

    Ok(())
}
