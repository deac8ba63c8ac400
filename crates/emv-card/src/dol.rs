//! Terminal data and DOL-driven command construction
//!
//! [`DolBuilder`] is the terminal-data dictionary consulted when a card
//! sends a PDOL or CDOL. It is a plain value; clone it into each session.

use std::collections::BTreeMap;
use chrono::{Datelike, Local, NaiveDate};
use emv_common::dol::dol_data_len;
use emv_common::{parse_dol, tags, EmvTag};
use rand::RngCore;
use tracing::debug;

use crate::apdu::commands;
use crate::error::{Error, Result};
use crate::generate_ac::CryptogramType;

/// GPO with an empty command template, for cards without a PDOL
pub const EMPTY_GPO: [u8; 8] = [0x80, 0xA8, 0x00, 0x00, 0x02, 0x83, 0x00, 0x00];

/// Terminal Transaction Qualifiers sent when none are configured
pub const DEFAULT_TTQ: [u8; 4] = [0x37, 0x00, 0x00, 0x00];

/// Command that carries DOL data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    GetProcessingOptions,
    GenerateAc(CryptogramType),
}

/// Terminal-data dictionary keyed by tag
#[derive(Debug, Clone, Default)]
pub struct DolBuilder {
    values: BTreeMap<EmvTag, Vec<u8>>,
}

impl DolBuilder {
    /// Empty dictionary; every requested tag resolves to zeros except the
    /// TTQ, transaction date and unpredictable number
    pub fn new() -> Self {
        Self::default()
    }

    /// Terminal defaults for a one-unit purchase in China (0156)
    pub fn with_defaults(self) -> Self {
        self.set_amount(1)
            .set_amount_other(0)
            .set_terminal_country(156)
            .set_currency(156)
            .set_transaction_type(0x00)
            .set_terminal_type(0x22)
            .set(tags::TERMINAL_VERIFICATION_RESULTS, vec![0x00; 5])
            // no CVM performed
            .set(tags::CVM_RESULTS, vec![0x3F, 0x00, 0x00])
    }

    /// Store a raw value for `tag`
    pub fn set(mut self, tag: EmvTag, value: Vec<u8>) -> Self {
        self.values.insert(tag, value);
        self
    }

    /// Amount, Authorised (9F02) in minor units
    pub fn set_amount(self, amount: u64) -> Self {
        self.set(tags::AMOUNT_AUTHORISED, bcd(amount, 6))
    }

    /// Amount, Other (9F03) in minor units
    pub fn set_amount_other(self, amount: u64) -> Self {
        self.set(tags::AMOUNT_OTHER, bcd(amount, 6))
    }

    /// ISO 4217 numeric currency (5F2A)
    pub fn set_currency(self, code: u16) -> Self {
        self.set(tags::TRANSACTION_CURRENCY_CODE, bcd(code as u64, 2))
    }

    /// ISO 3166 numeric country (9F1A)
    pub fn set_terminal_country(self, code: u16) -> Self {
        self.set(tags::TERMINAL_COUNTRY_CODE, bcd(code as u64, 2))
    }

    pub fn set_transaction_type(self, transaction_type: u8) -> Self {
        self.set(tags::TRANSACTION_TYPE, vec![transaction_type])
    }

    pub fn set_terminal_type(self, terminal_type: u8) -> Self {
        self.set(tags::TERMINAL_TYPE, vec![terminal_type])
    }

    pub fn set_ttq(self, ttq: [u8; 4]) -> Self {
        self.set(tags::TERMINAL_TRANSACTION_QUALIFIERS, ttq.to_vec())
    }

    /// Fix the transaction date (9A) as BCD `YYMMDD` instead of today
    pub fn set_transaction_date(self, yymmdd: [u8; 3]) -> Self {
        self.set(tags::TRANSACTION_DATE, yymmdd.to_vec())
    }

    /// Fix the unpredictable number (9F37) instead of drawing a fresh one
    pub fn set_unpredictable_number(self, number: Vec<u8>) -> Self {
        self.set(tags::UNPREDICTABLE_NUMBER, number)
    }

    pub fn get(&self, tag: EmvTag) -> Option<&[u8]> {
        self.values.get(&tag).map(Vec::as_slice)
    }

    /// Resolve every entry of `dol` into one concatenated data block
    ///
    /// Values are cut to the requested length or zero-padded on the right;
    /// unknown tags become zeros.
    pub fn build(&self, dol: &[u8]) -> Result<Vec<u8>> {
        let entries = parse_dol(dol)?;
        let mut data = Vec::with_capacity(dol_data_len(&entries));

        for entry in &entries {
            let length = entry.length as usize;
            let value = self.resolve(entry.tag, length);
            let take = value.len().min(length);
            data.extend_from_slice(&value[..take]);
            data.resize(data.len() + (length - take), 0x00);
            debug!(tag = %entry.tag, length, value = %hex::encode_upper(&data[data.len() - length..]), "DOL entry");
        }

        Ok(data)
    }

    fn resolve(&self, tag: EmvTag, length: usize) -> Vec<u8> {
        if let Some(value) = self.values.get(&tag) {
            return value.clone();
        }
        match tag {
            tags::TERMINAL_TRANSACTION_QUALIFIERS => DEFAULT_TTQ.to_vec(),
            tags::TRANSACTION_DATE => date_bcd(Local::now().date_naive()).to_vec(),
            tags::UNPREDICTABLE_NUMBER => generate_random_bytes(length),
            _ => Vec::new(),
        }
    }

    /// Build the complete command APDU for `kind`
    ///
    /// A GPO without a PDOL is [`EMPTY_GPO`]. Fails without producing a
    /// command if the DOL is malformed or the data exceeds a short APDU.
    pub fn build_command(&self, dol: Option<&[u8]>, kind: CommandKind) -> Result<Vec<u8>> {
        match kind {
            CommandKind::GetProcessingOptions => {
                let Some(pdol) = dol else {
                    return Ok(EMPTY_GPO.to_vec());
                };
                let data = self.build(pdol)?;
                if data.len() > 253 {
                    return Err(Error::CommandTooLong(data.len() + 2));
                }
                let mut template = vec![tags::COMMAND_TEMPLATE.0 as u8, data.len() as u8];
                template.extend_from_slice(&data);
                Ok(commands::get_processing_options(template).build())
            }
            CommandKind::GenerateAc(cryptogram_type) => {
                let data = self.build(dol.unwrap_or_default())?;
                if data.len() > 255 {
                    return Err(Error::CommandTooLong(data.len()));
                }
                Ok(commands::generate_ac(cryptogram_type as u8, data).build())
            }
        }
    }
}

/// Fresh random bytes for unpredictable numbers and challenges
pub fn generate_random_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    rand::rng().fill_bytes(&mut bytes);
    bytes
}

/// Right-aligned packed BCD of `value` in `bytes` bytes
fn bcd(mut value: u64, bytes: usize) -> Vec<u8> {
    let mut out = vec![0u8; bytes];
    for byte in out.iter_mut().rev() {
        let low = (value % 10) as u8;
        let high = ((value / 10) % 10) as u8;
        *byte = (high << 4) | low;
        value /= 100;
    }
    out
}

/// `date` as BCD `YYMMDD`
fn date_bcd(date: NaiveDate) -> [u8; 3] {
    let yymmdd = date.year().rem_euclid(100) as u64 * 10_000 + date.month() as u64 * 100 + date.day() as u64;
    let packed = bcd(yymmdd, 3);
    [packed[0], packed[1], packed[2]]
}
