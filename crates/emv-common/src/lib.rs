//! EMV Common - Shared data structures and utilities for EMV processing

pub mod dol;
mod tag;
pub mod tlv;

pub use dol::{parse_dol, DolEntry};
pub use tag::{get_tag_name, tags, EmvTag};
pub use tlv::{decode, encode_tlv, find_tag, find_tag_recursive, Tlv, TlvError, TlvReader};
