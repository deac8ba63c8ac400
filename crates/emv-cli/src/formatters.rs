//! Field formatters for human-readable output

use clap::ValueEnum;
use emv_common::{tags, EmvTag};

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatMode {
    /// Raw hex output
    Raw,
    /// Human-readable formatted output
    Human,
}

impl FormatMode {
    pub fn description(&self) -> &'static str {
        match self {
            FormatMode::Raw => "Raw",
            FormatMode::Human => "Human-Readable",
        }
    }
}

/// Values longer than this are truncated in listings
pub const MAX_DISPLAY_BYTES: usize = 32;

/// Format a field value based on its tag type
pub fn format_value(tag: EmvTag, value: &[u8], mode: FormatMode) -> String {
    if mode == FormatMode::Raw {
        return hex::encode_upper(value);
    }

    match tag {
        tags::APPLICATION_LABEL | tags::APPLICATION_PREFERRED_NAME | tags::CARDHOLDER_NAME => {
            String::from_utf8(value.to_vec())
                .map(|s| s.trim().to_string())
                .unwrap_or_else(|_| hex::encode_upper(value))
        }

        tags::APPLICATION_PAN => emv_card::card_data::decode_pan(value),

        // YYMMDD
        tags::APPLICATION_EXPIRATION_DATE | tags::APPLICATION_EFFECTIVE_DATE => {
            if value.len() == 3 {
                format!(
                    "20{:02X}/{:02X}/{:02X} (YY/MM/DD)",
                    value[0], value[1], value[2]
                )
            } else {
                hex::encode_upper(value)
            }
        }

        tags::ISSUER_COUNTRY_CODE | tags::TERMINAL_COUNTRY_CODE => match numeric_code(value) {
            Some(code) => match get_country_name(code) {
                Some(country) => format!("{code:03} ({country})"),
                None => format!("{code:03}"),
            },
            None => hex::encode_upper(value),
        },

        tags::TRANSACTION_CURRENCY_CODE | tags::APPLICATION_CURRENCY_CODE => {
            match numeric_code(value) {
                Some(code) => get_currency_name(code)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("Currency Code {code:03}")),
                None => hex::encode_upper(value),
            }
        }

        tags::APPLICATION_PAN_SEQUENCE_NUMBER | tags::APPLICATION_PRIORITY_INDICATOR => {
            match value {
                [byte] => format!("{byte:02X}"),
                _ => hex::encode_upper(value),
            }
        }

        tags::APPLICATION_TRANSACTION_COUNTER => match value {
            [hi, lo] => u16::from_be_bytes([*hi, *lo]).to_string(),
            _ => hex::encode_upper(value),
        },

        tags::TRACK_2_EQUIVALENT_DATA | tags::TRACK_2_DATA => {
            hex::encode_upper(value).replace('D', " | ")
        }

        _ => truncated_hex(value),
    }
}

/// Hex of `value`, cut after [`MAX_DISPLAY_BYTES`]
pub fn truncated_hex(value: &[u8]) -> String {
    if value.len() > MAX_DISPLAY_BYTES {
        format!(
            "{}... ({} bytes)",
            hex::encode_upper(&value[..MAX_DISPLAY_BYTES]),
            value.len()
        )
    } else {
        hex::encode_upper(value)
    }
}

/// Two-byte BCD numeric code such as `0840`
fn numeric_code(value: &[u8]) -> Option<u16> {
    if value.len() != 2 {
        return None;
    }
    hex::encode(value).parse().ok()
}

/// ISO 3166-1 numeric country codes (subset)
fn get_country_name(code: u16) -> Option<&'static str> {
    match code {
        124 => Some("Canada"),
        840 => Some("United States"),
        826 => Some("United Kingdom"),
        276 => Some("Germany"),
        250 => Some("France"),
        344 => Some("Hong Kong"),
        156 => Some("China"),
        392 => Some("Japan"),
        410 => Some("South Korea"),
        702 => Some("Singapore"),
        _ => None,
    }
}

/// ISO 4217 numeric currency codes (subset)
fn get_currency_name(code: u16) -> Option<&'static str> {
    match code {
        124 => Some("CAD (Canadian Dollar)"),
        840 => Some("USD (US Dollar)"),
        978 => Some("EUR (Euro)"),
        826 => Some("GBP (Pound Sterling)"),
        344 => Some("HKD (Hong Kong Dollar)"),
        392 => Some("JPY (Japanese Yen)"),
        156 => Some("CNY (Chinese Yuan)"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_mode_is_plain_hex() {
        assert_eq!(
            format_value(tags::APPLICATION_LABEL, b"VISA", FormatMode::Raw),
            "56495341"
        );
    }

    #[test]
    fn test_human_values() {
        let human = FormatMode::Human;
        assert_eq!(format_value(tags::APPLICATION_LABEL, b"VISA ", human), "VISA");
        assert_eq!(
            format_value(tags::APPLICATION_PAN, &[0x54, 0x13, 0x33, 0x00, 0x41, 0x12, 0x34, 0x5F], human),
            "541333004112345"
        );
        assert_eq!(
            format_value(tags::TRANSACTION_CURRENCY_CODE, &[0x01, 0x56], human),
            "CNY (Chinese Yuan)"
        );
        assert_eq!(
            format_value(tags::ISSUER_COUNTRY_CODE, &[0x08, 0x40], human),
            "840 (United States)"
        );
        assert_eq!(
            format_value(tags::TRACK_2_EQUIVALENT_DATA, &[0x45, 0x32, 0xD2, 0x51], human),
            "4532 | 251"
        );
        assert_eq!(
            format_value(tags::APPLICATION_TRANSACTION_COUNTER, &[0x00, 0x2A], human),
            "42"
        );
    }

    #[test]
    fn test_long_values_truncated() {
        let value = [0xAB; 40];
        let formatted = format_value(EmvTag(0x90), &value, FormatMode::Human);
        assert!(formatted.ends_with("... (40 bytes)"));
        assert!(formatted.starts_with(&"AB".repeat(MAX_DISPLAY_BYTES)));
    }
}
