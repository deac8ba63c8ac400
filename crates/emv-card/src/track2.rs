//! Track 2 recovery
//!
//! Some cards never send tag 5A or 5F24 and only carry Track 2 equivalent
//! data. These heuristics recover PAN and expiry from the hex-decoded Track 2
//! string. UnionPay layouts are tried first; otherwise the first of the
//! `D` separator, `=` separator and fixed-width layouts that matches wins.

use tracing::{debug, warn};

use crate::card_data::CardData;

/// Minimum length for the UnionPay layout
const UNIONPAY_MIN_LEN: usize = 30;

/// PAN and expiry recovered from Track 2
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Track2Fields {
    pub pan: Option<String>,
    /// `20YY-MM`
    pub expiry: Option<String>,
}

/// Recover PAN and expiry from a Track 2 string
pub fn parse_track2(track2: &str) -> Track2Fields {
    if !track2.is_ascii() {
        return Track2Fields::default();
    }

    if let Some(fields) = parse_unionpay(track2) {
        debug!("Track 2 matched UnionPay layout");
        return fields;
    }

    for separator in ['D', '='] {
        if let Some(fields) = parse_separated(track2, separator) {
            debug!(%separator, "Track 2 matched separator layout");
            return fields;
        }
    }

    if let Some(fields) = parse_fixed(track2) {
        debug!("Track 2 matched fixed-width layout");
        return fields;
    }

    Track2Fields::default()
}

/// Fill PAN and expiry from Track 2 where they are still unset
///
/// Returns `false` when the PAN is still missing afterwards.
pub fn fill_missing_from_track2(card: &mut CardData) -> bool {
    if card.pan.is_some() && card.expiry.is_some() {
        return true;
    }

    let Some(track2) = card.track2.as_deref() else {
        return card.pan.is_some();
    };

    let fields = parse_track2(track2);
    if card.pan.is_none() {
        card.pan = fields.pan;
    }
    if card.expiry.is_none() {
        card.expiry = fields.expiry;
    }

    if card.pan.is_none() {
        warn!(track2_len = track2.len(), "no PAN recoverable from Track 2");
        return false;
    }
    true
}

fn parse_separated(track2: &str, separator: char) -> Option<Track2Fields> {
    let index = track2.find(separator)?;
    if index == 0 || track2.len() < index + 5 {
        return None;
    }

    let pan = track2[..index].trim_end_matches('F');
    Some(Track2Fields {
        pan: (!pan.is_empty()).then(|| pan.to_string()),
        expiry: format_expiry(&track2[index + 1..index + 5]),
    })
}

fn parse_fixed(track2: &str) -> Option<Track2Fields> {
    (16..=19).find_map(|len| {
        let pan = track2.get(..len)?;
        if !all_digits(pan) {
            return None;
        }
        Some(Track2Fields {
            pan: Some(pan.to_string()),
            expiry: track2.get(len..len + 4).and_then(format_expiry),
        })
    })
}

fn parse_unionpay(track2: &str) -> Option<Track2Fields> {
    if track2.len() < UNIONPAY_MIN_LEN || !(track2.starts_with("62") || track2.starts_with("60")) {
        return None;
    }

    let expiry = (16..=20).find_map(|offset| {
        let window = track2.get(offset..offset + 4)?;
        if !window.chars().all(|c| c.is_ascii_digit() || c == 'D' || c == '=') {
            return None;
        }
        let digits: String = window.chars().filter(|c| c.is_ascii_digit()).collect();
        format_expiry(&digits)
    });

    Some(Track2Fields {
        pan: Some(track2[..16].to_string()),
        expiry,
    })
}

fn format_expiry(yymm: &str) -> Option<String> {
    if yymm.len() == 4 && all_digits(yymm) {
        Some(format!("20{}-{}", &yymm[..2], &yymm[2..]))
    } else {
        None
    }
}

fn all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}
