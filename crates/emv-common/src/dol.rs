//! Data Object List (PDOL/CDOL) parsing
//!
//! A DOL is a list of tags each followed by a single length byte and no
//! value: the card asks the terminal for `length` bytes of the tagged item.

use crate::EmvTag;
use crate::tlv::{encode_tag, parse_tag, TlvError};

/// One requested item of a DOL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DolEntry {
    pub tag: EmvTag,
    pub length: u8,
}

/// Parse DOL bytes into an ordered list of entries
///
/// Fails if a tag is truncated or not followed by its length byte.
pub fn parse_dol(data: &[u8]) -> Result<Vec<DolEntry>, TlvError> {
    let mut entries = Vec::new();
    let mut pos = 0;

    while pos < data.len() {
        let (tag, consumed) = parse_tag(&data[pos..])?;
        pos += consumed;

        let length = *data.get(pos).ok_or(TlvError::TruncatedDol(tag))?;
        pos += 1;

        entries.push(DolEntry { tag, length });
    }

    Ok(entries)
}

/// Encode entries back into DOL bytes
pub fn encode_dol(entries: &[DolEntry]) -> Vec<u8> {
    let mut out = Vec::with_capacity(entries.len() * 3);
    for entry in entries {
        encode_tag(entry.tag, &mut out);
        out.push(entry.length);
    }
    out
}

/// Total number of data bytes a DOL requests
pub fn dol_data_len(entries: &[DolEntry]) -> usize {
    entries.iter().map(|e| e.length as usize).sum()
}
