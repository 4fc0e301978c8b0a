//! BER-TLV codec for EMV data objects
//!
//! This crate decodes and encodes the Tag-Length-Value structures exchanged with an
//! EMV kernel. Decoding is stream oriented and permissive: a malformed or truncated
//! record ends the stream, and everything parsed before the fault is returned.
//!
//! ## Overview
//!
//! - [`Tag`]: 1 to 3 byte tag identifier, rendered as uppercase hex
//! - [`TlvRecord`]: a single primitive `(tag, value)` pair
//! - [`TlvList`] / [`TlvMap`]: ordered and keyed views over decoded records
//! - [`bcd`]: helpers for numeric, amount and date data objects
//! - [`tags`]: the EMV tags consumed by the orchestrator and their names
//!
//! ```
//! use nexum_emv_tlv::{Tag, TlvRecord, decode_hex, encode};
//!
//! let record = TlvRecord::new(Tag::new(0x9F02), vec![0x00, 0x00, 0x00, 0x00, 0x01, 0x00]);
//! let bytes = encode(&record).unwrap();
//! assert_eq!(hex::encode_upper(&bytes), "9F0206000000000100");
//!
//! let list = decode_hex("9F0206000000000100");
//! assert_eq!(list.len(), 1);
//! assert_eq!(list[0].value_hex(), "000000000100");
//! ```
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

pub mod bcd;
mod decode;
mod encode;
mod error;
mod record;
mod tag;
pub mod tags;

pub use bytes::Bytes;
pub use decode::{
    decode, decode_hex, decode_hex_to_map, decode_to_map, parse_length, parse_record, parse_tag,
};
pub use encode::{encode, encode_all, encode_length};
pub use error::TlvError;
pub use record::{TlvList, TlvMap, TlvRecord};
pub use tag::Tag;
