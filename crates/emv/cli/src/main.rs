//! Command-line tools for EMV terminal development
//!
//! Decodes BER-TLV blobs, evaluates CVM decisions from raw card data and runs
//! complete transactions against an in-process scripted kernel.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod utils;

use commands::*;

#[derive(Parser)]
#[command(version, about = "EMV terminal tools: TLV decoding, CVM decisions and transaction simulation")]
struct Cli {
    /// Debug level output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a hex BER-TLV blob
    Decode {
        /// TLV data as hex
        #[arg(required = true)]
        data: String,
    },

    /// Evaluate the CVM decision for a card
    Cvm {
        /// CVM List (8E) value as hex
        #[arg(long)]
        list: Option<String>,

        /// CVM Results (9F34) value as hex
        #[arg(long)]
        results: Option<String>,

        /// Amount in minor units
        #[arg(long, default_value_t = 0)]
        amount: u64,

        /// Selected AID as hex
        #[arg(long)]
        aid: Option<String>,

        /// Terminal configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Run a transaction against a simulated card and kernel
    Simulate {
        /// Amount in minor units
        #[arg(required = true)]
        amount: u64,

        /// Transaction kind
        #[arg(long, value_enum, default_value_t = KindArg::Purchase)]
        kind: KindArg,

        /// Tap the card instead of inserting it
        #[arg(long)]
        contactless: bool,

        /// Extra card data as hex TLV, overriding the default card
        #[arg(long)]
        tlv: Option<String>,

        /// AID to select (defaults to the card's 4F)
        #[arg(long)]
        aid: Option<String>,

        /// How the issuer answers
        #[arg(long, value_enum, default_value_t = IssuerAnswer::Approve)]
        issuer: IssuerAnswer,

        /// Bypass PIN entry when prompted
        #[arg(long)]
        bypass_pin: bool,

        /// Verify on the device first and ask for a second tap
        #[arg(long)]
        see_phone: bool,

        /// Terminal configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Seconds to wait for a kernel callback before cancelling
        #[arg(long, default_value_t = 5)]
        step_timeout: u64,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose);

    match &cli.command {
        Commands::Decode { data } => decode_command(data)?,
        Commands::Cvm {
            list,
            results,
            amount,
            aid,
            config,
        } => cvm_command(
            list.as_deref(),
            results.as_deref(),
            *amount,
            aid.as_deref(),
            config.as_deref(),
        )?,
        Commands::Simulate {
            amount,
            kind,
            contactless,
            tlv,
            aid,
            issuer,
            bypass_pin,
            see_phone,
            config,
            step_timeout,
        } => simulate_command(&SimulateOptions {
            amount: *amount,
            kind: *kind,
            contactless: *contactless,
            tlv: tlv.as_deref(),
            aid: aid.as_deref(),
            issuer: *issuer,
            bypass_pin: *bypass_pin,
            see_phone: *see_phone,
            config: config.as_deref(),
            step_timeout: *step_timeout,
        })?,
    }

    Ok(())
}

fn setup_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_ansi(true)
        .init();
}
