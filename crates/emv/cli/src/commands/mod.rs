//! Subcommand handlers

mod cvm;
mod decode;
mod simulate;

pub use cvm::*;
pub use decode::*;
pub use simulate::*;
