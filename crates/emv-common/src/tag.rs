//! EMV tag identifiers and the human-readable tag dictionary

use std::fmt;

/// EMV Tag identifier
///
/// Holds the numeric value of a one- or two-byte BER tag, e.g. `0x5A` or
/// `0x9F38`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EmvTag(pub u32);

impl EmvTag {
    /// First (class/type) byte of the tag
    pub const fn first_byte(self) -> u8 {
        if self.0 > 0xFF {
            (self.0 >> 8) as u8
        } else {
            self.0 as u8
        }
    }

    /// Whether the constructed bit (b6 of the first byte) is set
    pub const fn is_constructed(self) -> bool {
        self.first_byte() & 0x20 != 0
    }

    /// Number of bytes in the encoded tag
    pub const fn encoded_len(self) -> usize {
        if self.0 > 0xFF {
            2
        } else {
            1
        }
    }

    /// Encoded tag bytes
    pub fn to_bytes(self) -> Vec<u8> {
        if self.0 > 0xFF {
            vec![(self.0 >> 8) as u8, self.0 as u8]
        } else {
            vec![self.0 as u8]
        }
    }

    /// Human-readable name of the tag
    pub fn name(self) -> &'static str {
        get_tag_name(self)
    }
}

impl fmt::Display for EmvTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 > 0xFF {
            write!(f, "{:04X}", self.0)
        } else {
            write!(f, "{:02X}", self.0)
        }
    }
}

impl From<u32> for EmvTag {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

/// Common EMV tags used in payment card processing
pub mod tags {
    use super::EmvTag;

    // Application metadata
    pub const APPLICATION_IDENTIFIER: EmvTag = EmvTag(0x4F);
    pub const APPLICATION_LABEL: EmvTag = EmvTag(0x50);
    pub const APPLICATION_PAN: EmvTag = EmvTag(0x5A);
    pub const APPLICATION_EXPIRATION_DATE: EmvTag = EmvTag(0x5F24);
    pub const APPLICATION_EFFECTIVE_DATE: EmvTag = EmvTag(0x5F25);
    pub const APPLICATION_PAN_SEQUENCE_NUMBER: EmvTag = EmvTag(0x5F34);
    pub const APPLICATION_PRIORITY_INDICATOR: EmvTag = EmvTag(0x87);
    pub const APPLICATION_PREFERRED_NAME: EmvTag = EmvTag(0x9F12);
    pub const APPLICATION_USAGE_CONTROL: EmvTag = EmvTag(0x9F07);
    pub const APPLICATION_VERSION_NUMBER: EmvTag = EmvTag(0x9F08);
    pub const APPLICATION_CURRENCY_CODE: EmvTag = EmvTag(0x9F42);
    pub const DF_NAME: EmvTag = EmvTag(0x84);

    // Cardholder data
    pub const CARDHOLDER_NAME: EmvTag = EmvTag(0x5F20);
    pub const TRACK_1_DATA: EmvTag = EmvTag(0x56);
    pub const TRACK_2_EQUIVALENT_DATA: EmvTag = EmvTag(0x57);
    pub const TRACK_2_DATA: EmvTag = EmvTag(0x9F6B);

    // Issuer data
    pub const ISSUER_COUNTRY_CODE: EmvTag = EmvTag(0x5F28);
    pub const LANGUAGE_PREFERENCE: EmvTag = EmvTag(0x5F2D);

    // Terminal data requested through DOLs
    pub const AMOUNT_AUTHORISED: EmvTag = EmvTag(0x9F02);
    pub const AMOUNT_OTHER: EmvTag = EmvTag(0x9F03);
    pub const TERMINAL_COUNTRY_CODE: EmvTag = EmvTag(0x9F1A);
    pub const TERMINAL_VERIFICATION_RESULTS: EmvTag = EmvTag(0x95);
    pub const TRANSACTION_CURRENCY_CODE: EmvTag = EmvTag(0x5F2A);
    pub const TRANSACTION_DATE: EmvTag = EmvTag(0x9A);
    pub const TRANSACTION_TYPE: EmvTag = EmvTag(0x9C);
    pub const TERMINAL_TYPE: EmvTag = EmvTag(0x9F35);
    pub const CVM_RESULTS: EmvTag = EmvTag(0x9F34);
    pub const UNPREDICTABLE_NUMBER: EmvTag = EmvTag(0x9F37);
    pub const TERMINAL_TRANSACTION_QUALIFIERS: EmvTag = EmvTag(0x9F66);

    // Processing
    pub const PDOL: EmvTag = EmvTag(0x9F38);
    pub const CDOL1: EmvTag = EmvTag(0x8C);
    pub const CDOL2: EmvTag = EmvTag(0x8D);
    pub const COMMAND_TEMPLATE: EmvTag = EmvTag(0x83);
    pub const AFL: EmvTag = EmvTag(0x94);
    pub const AIP: EmvTag = EmvTag(0x82);

    // GENERATE AC response
    pub const CRYPTOGRAM_INFORMATION_DATA: EmvTag = EmvTag(0x9F27);
    pub const APPLICATION_TRANSACTION_COUNTER: EmvTag = EmvTag(0x9F36);
    pub const APPLICATION_CRYPTOGRAM: EmvTag = EmvTag(0x9F26);
    pub const ISSUER_APPLICATION_DATA: EmvTag = EmvTag(0x9F10);
    pub const SIGNED_DYNAMIC_APPLICATION_DATA: EmvTag = EmvTag(0x9F4B);

    // Templates
    pub const APPLICATION_TEMPLATE: EmvTag = EmvTag(0x61);
    pub const FCI_TEMPLATE: EmvTag = EmvTag(0x6F);
    pub const FCI_PROPRIETARY_TEMPLATE: EmvTag = EmvTag(0xA5);
    pub const FCI_ISSUER_DISCRETIONARY_DATA: EmvTag = EmvTag(0xBF0C);
    pub const RESPONSE_MESSAGE_TEMPLATE_FORMAT_1: EmvTag = EmvTag(0x80);
    pub const RESPONSE_MESSAGE_TEMPLATE_FORMAT_2: EmvTag = EmvTag(0x77);
    pub const RECORD_TEMPLATE: EmvTag = EmvTag(0x70);
}

/// Get a human-readable name for an EMV tag
pub fn get_tag_name(tag: EmvTag) -> &'static str {
    match tag.0 {
        0x4F => "Application Identifier (AID)",
        0x50 => "Application Label",
        0x56 => "Track 1 Data",
        0x57 => "Track 2 Equivalent Data",
        0x5A => "Application PAN",
        0x5F20 => "Cardholder Name",
        0x5F24 => "Application Expiration Date",
        0x5F25 => "Application Effective Date",
        0x5F28 => "Issuer Country Code",
        0x5F2A => "Transaction Currency Code",
        0x5F2D => "Language Preference",
        0x5F34 => "Application PAN Sequence Number",
        0x61 => "Application Template",
        0x6F => "FCI Template",
        0x70 => "Record Template",
        0x77 => "Response Message Template Format 2",
        0x80 => "Response Message Template Format 1",
        0x82 => "Application Interchange Profile",
        0x83 => "Command Template",
        0x84 => "Dedicated File (DF) Name",
        0x87 => "Application Priority Indicator",
        0x88 => "Short File Identifier (SFI)",
        0x8C => "CDOL1",
        0x8D => "CDOL2",
        0x8E => "CVM List",
        0x8F => "CA Public Key Index",
        0x90 => "Issuer Public Key Certificate",
        0x92 => "Issuer Public Key Remainder",
        0x93 => "Signed Static Application Data",
        0x94 => "Application File Locator",
        0x95 => "Terminal Verification Results",
        0x9A => "Transaction Date",
        0x9C => "Transaction Type",
        0xA5 => "FCI Proprietary Template",
        0xBF0C => "FCI Issuer Discretionary Data",
        0x9F02 => "Amount, Authorised",
        0x9F03 => "Amount, Other",
        0x9F07 => "Application Usage Control",
        0x9F08 => "Application Version Number (Card)",
        0x9F10 => "Issuer Application Data",
        0x9F11 => "Issuer Code Table Index",
        0x9F12 => "Application Preferred Name",
        0x9F1A => "Terminal Country Code",
        0x9F26 => "Application Cryptogram",
        0x9F27 => "Cryptogram Information Data",
        0x9F32 => "Issuer Public Key Exponent",
        0x9F34 => "CVM Results",
        0x9F35 => "Terminal Type",
        0x9F36 => "Application Transaction Counter (ATC)",
        0x9F37 => "Unpredictable Number",
        0x9F38 => "PDOL",
        0x9F42 => "Application Currency Code",
        0x9F44 => "Application Currency Exponent",
        0x9F46 => "ICC Public Key Certificate",
        0x9F47 => "ICC Public Key Exponent",
        0x9F48 => "ICC Public Key Remainder",
        0x9F4A => "Static Data Authentication Tag List",
        0x9F4B => "Signed Dynamic Application Data",
        0x9F66 => "Terminal Transaction Qualifiers",
        0x9F6B => "Track 2 Data",
        _ => "Unknown Tag",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_pads_to_tag_width() {
        assert_eq!(EmvTag(0x5A).to_string(), "5A");
        assert_eq!(EmvTag(0x9F38).to_string(), "9F38");
        assert_eq!(EmvTag(0x08).to_string(), "08");
    }

    #[test]
    fn test_constructed_bit() {
        assert!(tags::RECORD_TEMPLATE.is_constructed());
        assert!(tags::FCI_TEMPLATE.is_constructed());
        assert!(tags::FCI_ISSUER_DISCRETIONARY_DATA.is_constructed());
        assert!(!tags::APPLICATION_PAN.is_constructed());
        assert!(!tags::RESPONSE_MESSAGE_TEMPLATE_FORMAT_1.is_constructed());
    }

    #[test]
    fn test_tag_names() {
        assert_eq!(get_tag_name(tags::PDOL), "PDOL");
        assert_eq!(tags::APPLICATION_PAN.name(), "Application PAN");
        assert_eq!(get_tag_name(EmvTag(0xDF01)), "Unknown Tag");
    }
}
