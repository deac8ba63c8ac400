//! Application File Locator parsing

use std::ops::RangeInclusive;

use emv_common::{decode, find_tag, tags};
use tracing::debug;

/// `(sfi, record)` pairs probed when a card gives no usable AFL
pub const COMMON_RECORDS: [(u8, u8); 6] = [(1, 1), (2, 1), (3, 1), (4, 1), (1, 2), (2, 2)];

/// One AFL entry: a record range within a short file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AflEntry {
    pub sfi: u8,
    pub first_record: u8,
    pub last_record: u8,
    /// Records taking part in offline data authentication
    pub offline_records: u8,
}

impl AflEntry {
    /// Decode one 4-byte AFL group, rejecting out-of-range values
    pub fn from_group(group: &[u8]) -> Option<Self> {
        let &[sfi_byte, first_record, last_record, offline_records] = group else {
            return None;
        };
        let entry = Self {
            sfi: sfi_byte >> 3,
            first_record,
            last_record,
            offline_records,
        };
        entry.is_valid().then_some(entry)
    }

    fn is_valid(&self) -> bool {
        (1..=31).contains(&self.sfi)
            && self.first_record >= 1
            && self.last_record >= self.first_record
    }

    pub fn records(&self) -> RangeInclusive<u8> {
        self.first_record..=self.last_record
    }
}

/// Extract the AFL from a GET PROCESSING OPTIONS response
///
/// Format 2 (tag 77) carries the AFL in tag 94. Format 1 (tag 80) is the
/// 2-byte AIP directly followed by the AFL groups.
pub fn parse_afl(gpo_response: &[u8]) -> Vec<AflEntry> {
    let Some(Ok(template)) = decode(gpo_response).next() else {
        return Vec::new();
    };

    let afl = match template.tag {
        tags::RESPONSE_MESSAGE_TEMPLATE_FORMAT_2 => find_tag(template.value, tags::AFL),
        tags::RESPONSE_MESSAGE_TEMPLATE_FORMAT_1 => template.value.get(2..),
        _ => None,
    };

    afl.map(parse_afl_groups).unwrap_or_default()
}

/// Decode raw AFL bytes (tag 94 value) into entries
pub fn parse_afl_groups(afl: &[u8]) -> Vec<AflEntry> {
    afl.chunks_exact(4)
        .filter_map(|group| {
            let entry = AflEntry::from_group(group);
            if entry.is_none() {
                debug!(group = %hex::encode_upper(group), "skipping invalid AFL group");
            }
            entry
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_format1_afl() {
        let gpo = hex!("80 06 1980 0C010200");
        assert_eq!(
            parse_afl(&gpo),
            vec![AflEntry {
                sfi: 1,
                first_record: 1,
                last_record: 2,
                offline_records: 0
            }]
        );
    }

    #[test]
    fn test_format2_afl() {
        let gpo = hex!("77 12 82 02 1980 94 0C 08010100 10010301 18010200");
        let entries = parse_afl(&gpo);

        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].sfi, 1);
        assert_eq!(entries[1].sfi, 2);
        assert_eq!(entries[1].records(), 1..=3);
        assert_eq!(entries[1].offline_records, 1);
        assert_eq!(entries[2].sfi, 3);
    }

    #[test]
    fn test_invalid_groups_are_skipped() {
        // sfi 0, then end before start, then a valid entry
        let afl = hex!("00010100 08030100 10010100");
        let entries = parse_afl_groups(&afl);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].sfi, 2);
    }

    #[test]
    fn test_trailing_partial_group_ignored() {
        assert_eq!(parse_afl_groups(&hex!("08010100 0801")).len(), 1);
    }

    #[test]
    fn test_no_afl() {
        assert!(parse_afl(&hex!("77 04 82 02 1980")).is_empty());
        assert!(parse_afl(&hex!("6F 00")).is_empty());
        assert!(parse_afl(&[]).is_empty());
    }
}
