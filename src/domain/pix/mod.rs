//! PIX payment code rendering
//!
//! A static BR Code is a flat sequence of tag-length-value fields closed by a
//! CRC-16 checksum field (`63`).

pub mod crc;
mod payload;
pub mod tlv;

pub use payload::{format_amount, validate_amount, PixCodeEncoder};
