//! Cardholder data accumulated over one application read

use std::fmt;

use emv_common::{decode, tags, TlvError};
use tracing::debug;

/// Card data read from the EMV card
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardData {
    /// Primary account number as decimal digits
    pub pan: Option<String>,
    /// `20YY-MM` or `20YY-MM-DD`
    pub expiry: Option<String>,
    pub cardholder_name: Option<String>,
    /// Track 2 equivalent data as upper-case hex
    pub track2: Option<String>,
    pub aid: Option<Vec<u8>>,
    pub application_label: Option<String>,
}

/// Trust level of a TLV pass
///
/// GPO responses are read at [`Priority::Low`] and only fill gaps; records
/// are read at [`Priority::High`] and overwrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    Low,
    High,
}

/// A [`CardData`] field populated from TLV
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Pan,
    Expiry,
    CardholderName,
    Track2,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Field::Pan => "PAN",
            Field::Expiry => "expiry date",
            Field::CardholderName => "cardholder name",
            Field::Track2 => "Track 2",
        })
    }
}

/// What a TLV pass changed and which subtrees it had to abandon
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub updated: Vec<Field>,
    pub errors: Vec<TlvError>,
}

impl CardData {
    /// Extract known fields from `data`, recursing into templates 70, 77 and 80
    ///
    /// A malformed element stops decoding of its own level only; fields
    /// already taken from earlier siblings are kept.
    pub fn merge_tlv(&mut self, data: &[u8], priority: Priority) -> MergeReport {
        let mut report = MergeReport::default();
        self.merge_level(data, priority, &mut report);
        report
    }

    fn merge_level(&mut self, data: &[u8], priority: Priority, report: &mut MergeReport) {
        for item in decode(data) {
            let tlv = match item {
                Ok(tlv) => tlv,
                Err(err) => {
                    debug!(error = %err, "abandoning malformed TLV subtree");
                    report.errors.push(err);
                    return;
                }
            };

            match tlv.tag {
                tags::RECORD_TEMPLATE | tags::RESPONSE_MESSAGE_TEMPLATE_FORMAT_2 => {
                    self.merge_level(tlv.value, priority, report);
                }
                tags::RESPONSE_MESSAGE_TEMPLATE_FORMAT_1 => {
                    // AIP first, never a TLV
                    if let Some(rest) = tlv.value.get(2..) {
                        self.merge_level(rest, priority, report);
                    }
                }
                tags::APPLICATION_PAN => {
                    let pan = decode_pan(tlv.value);
                    if !pan.is_empty() && store(&mut self.pan, pan, priority) {
                        report.updated.push(Field::Pan);
                    }
                }
                tags::APPLICATION_EXPIRATION_DATE => {
                    if let Some(expiry) = decode_expiry(tlv.value) {
                        if store(&mut self.expiry, expiry, priority) {
                            report.updated.push(Field::Expiry);
                        }
                    }
                }
                tags::CARDHOLDER_NAME => {
                    let name = String::from_utf8_lossy(tlv.value).trim().to_string();
                    if !name.is_empty() && store(&mut self.cardholder_name, name, priority) {
                        report.updated.push(Field::CardholderName);
                    }
                }
                tags::TRACK_2_EQUIVALENT_DATA => {
                    if store(&mut self.track2, hex::encode_upper(tlv.value), priority) {
                        report.updated.push(Field::Track2);
                    }
                }
                tags::TRACK_2_DATA => {
                    // Only a stand-in when tag 57 was never seen
                    if self.track2.is_none() {
                        self.track2 = Some(hex::encode_upper(tlv.value));
                        report.updated.push(Field::Track2);
                    }
                }
                _ => {}
            }
        }
    }

    /// PAN with all but the first six and last four digits masked
    pub fn masked_pan(&self) -> Option<String> {
        let pan = self.pan.as_deref()?;
        if pan.len() <= 10 {
            return Some(pan.to_string());
        }
        let hidden = pan.len() - 10;
        Some(format!("{}{}{}", &pan[..6], "*".repeat(hidden), &pan[pan.len() - 4..]))
    }

    /// Whether any cardholder field was found
    pub fn is_empty(&self) -> bool {
        self.pan.is_none()
            && self.expiry.is_none()
            && self.cardholder_name.is_none()
            && self.track2.is_none()
    }
}

fn store(slot: &mut Option<String>, value: String, priority: Priority) -> bool {
    if priority == Priority::Low && slot.is_some() {
        return false;
    }
    if slot.as_deref() == Some(value.as_str()) {
        return false;
    }
    if slot.is_some() {
        debug!(new = %value, "high-priority source overrides earlier value");
    }
    *slot = Some(value);
    true
}

/// BCD PAN with trailing `F` padding removed
pub fn decode_pan(value: &[u8]) -> String {
    hex::encode_upper(value).trim_end_matches('F').to_string()
}

/// BCD `YYMMDD` (or `YYMM`) as `20YY-MM-DD` (or `20YY-MM`)
pub fn decode_expiry(value: &[u8]) -> Option<String> {
    let digits = hex::encode_upper(value);
    match digits.len() {
        n if n >= 6 => Some(format!("20{}-{}-{}", &digits[0..2], &digits[2..4], &digits[4..6])),
        n if n >= 4 => Some(format!("20{}-{}", &digits[0..2], &digits[2..4])),
        _ => None,
    }
}
