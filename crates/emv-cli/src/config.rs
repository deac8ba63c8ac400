//! Command-line configuration shared by the card commands

use std::str::FromStr;

use clap::{Args, ValueEnum};
use emv_card::{CryptogramType, DolBuilder};

/// Directory used to discover applications
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InterfaceArg {
    /// PSE (1PAY.SYS.DDF01)
    Contact,
    /// PPSE (2PAY.SYS.DDF01)
    Contactless,
    /// Judge from the ATR, falling back to the other directory
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CryptogramArg {
    /// Application Authentication Cryptogram (decline)
    Aac,
    /// Transaction Certificate (approve offline)
    Tc,
    /// Authorisation Request Cryptogram (go online)
    Arqc,
}

impl From<CryptogramArg> for CryptogramType {
    fn from(arg: CryptogramArg) -> Self {
        match arg {
            CryptogramArg::Aac => CryptogramType::Aac,
            CryptogramArg::Tc => CryptogramType::Tc,
            CryptogramArg::Arqc => CryptogramType::Arqc,
        }
    }
}

/// Application identifier given as hex
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aid(pub Vec<u8>);

impl FromStr for Aid {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|e| format!("invalid AID hex: {e}"))?;
        if !(5..=16).contains(&bytes.len()) {
            return Err(format!("AID must be 5 to 16 bytes, got {}", bytes.len()));
        }
        Ok(Self(bytes))
    }
}

/// Terminal data answered to PDOL and CDOL requests
#[derive(Debug, Clone, Args)]
pub struct TerminalArgs {
    /// Amount, Authorised (9F02) in minor units
    #[arg(long, default_value_t = 1)]
    pub amount: u64,

    /// Amount, Other (9F03) in minor units
    #[arg(long, default_value_t = 0)]
    pub amount_other: u64,

    /// Terminal country code (9F1A), ISO 3166 numeric
    #[arg(long, default_value_t = 156)]
    pub country: u16,

    /// Transaction currency code (5F2A), ISO 4217 numeric
    #[arg(long, default_value_t = 156)]
    pub currency: u16,

    /// Transaction type (9C) as hex
    #[arg(long, default_value = "00", value_parser = parse_hex_byte)]
    pub transaction_type: u8,

    /// Terminal type (9F35) as hex
    #[arg(long, default_value = "22", value_parser = parse_hex_byte)]
    pub terminal_type: u8,

    /// Terminal Transaction Qualifiers (9F66) as 8 hex digits
    #[arg(long, default_value = "37000000", value_parser = parse_ttq)]
    pub ttq: [u8; 4],
}

impl TerminalArgs {
    pub fn dol_builder(&self) -> DolBuilder {
        DolBuilder::new()
            .with_defaults()
            .set_amount(self.amount)
            .set_amount_other(self.amount_other)
            .set_terminal_country(self.country)
            .set_currency(self.currency)
            .set_transaction_type(self.transaction_type)
            .set_terminal_type(self.terminal_type)
            .set_ttq(self.ttq)
    }
}

/// Which application to read and how to find it
#[derive(Debug, Clone, Args)]
pub struct SessionArgs {
    #[arg(long, value_enum, default_value_t = InterfaceArg::Auto)]
    pub interface: InterfaceArg,

    /// Application to read: registry key ("1. VISA") or ordinal.
    /// Defaults to the highest-priority application.
    #[arg(short, long, conflicts_with = "aid")]
    pub app: Option<String>,

    /// Select this AID directly instead of discovering applications
    #[arg(long)]
    pub aid: Option<Aid>,

    #[command(flatten)]
    pub terminal: TerminalArgs,
}

fn parse_hex_byte(s: &str) -> Result<u8, String> {
    u8::from_str_radix(s.trim_start_matches("0x"), 16).map_err(|e| e.to_string())
}

fn parse_ttq(s: &str) -> Result<[u8; 4], String> {
    let bytes = hex::decode(s).map_err(|e| e.to_string())?;
    bytes
        .try_into()
        .map_err(|b: Vec<u8>| format!("TTQ must be 4 bytes, got {}", b.len()))
}
