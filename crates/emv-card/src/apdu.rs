//! APDU (Application Protocol Data Unit) command handling

use crate::channel::ChannelError;

/// APDU response containing data and status word
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApduResponse {
    /// Response data (without status word)
    pub data: Vec<u8>,
    /// Status word SW1
    pub sw1: u8,
    /// Status word SW2
    pub sw2: u8,
}

impl ApduResponse {
    /// Split raw response bytes into data and the trailing status word
    pub fn from_bytes(raw: &[u8]) -> Result<Self, ChannelError> {
        match raw {
            [data @ .., sw1, sw2] => Ok(Self {
                data: data.to_vec(),
                sw1: *sw1,
                sw2: *sw2,
            }),
            _ => Err(ChannelError::ShortResponse(raw.len())),
        }
    }

    /// Check if the response indicates success (9000)
    pub fn is_success(&self) -> bool {
        self.sw1 == 0x90 && self.sw2 == 0x00
    }

    /// Get the full status word as a 16-bit value
    pub fn status_word(&self) -> u16 {
        ((self.sw1 as u16) << 8) | (self.sw2 as u16)
    }

    /// Get status word as hex string (e.g., "9000")
    pub fn status_string(&self) -> String {
        format!("{:02X}{:02X}", self.sw1, self.sw2)
    }

    /// Data followed by SW1 SW2, as received on the wire
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut raw = Vec::with_capacity(self.data.len() + 2);
        raw.extend_from_slice(&self.data);
        raw.push(self.sw1);
        raw.push(self.sw2);
        raw
    }
}

/// ISO 7816-4 status words seen in EMV exchanges
pub mod status {
    pub const SUCCESS: u16 = 0x9000;
    pub const WRONG_LENGTH: u16 = 0x6700;
    pub const SECURITY_STATUS_NOT_SATISFIED: u16 = 0x6982;
    pub const CONDITIONS_NOT_SATISFIED: u16 = 0x6985;
    pub const FUNCTION_NOT_SUPPORTED: u16 = 0x6A81;
    pub const FILE_NOT_FOUND: u16 = 0x6A82;
    pub const RECORD_NOT_FOUND: u16 = 0x6A83;
    pub const INCORRECT_P1_P2: u16 = 0x6A86;
    pub const INS_NOT_SUPPORTED: u16 = 0x6D00;
    pub const CLA_NOT_SUPPORTED: u16 = 0x6E00;
    pub const NO_PRECISE_DIAGNOSIS: u16 = 0x6F00;

    /// Short description of a status word
    pub fn describe(sw: u16) -> &'static str {
        match sw {
            SUCCESS => "success",
            WRONG_LENGTH => "wrong length",
            SECURITY_STATUS_NOT_SATISFIED => "security status not satisfied",
            CONDITIONS_NOT_SATISFIED => "conditions of use not satisfied",
            FUNCTION_NOT_SUPPORTED => "function not supported",
            FILE_NOT_FOUND => "file or application not found",
            RECORD_NOT_FOUND => "record not found",
            INCORRECT_P1_P2 => "incorrect P1/P2",
            INS_NOT_SUPPORTED => "instruction not supported",
            CLA_NOT_SUPPORTED => "class not supported",
            NO_PRECISE_DIAGNOSIS => "no precise diagnosis",
            _ if sw >> 8 == 0x61 => "more data available",
            _ if sw >> 8 == 0x6C => "wrong Le",
            _ if sw >> 8 == 0x63 => "warning",
            _ => "unknown status",
        }
    }
}

/// APDU command builder
#[derive(Debug, Clone)]
pub struct ApduCommand {
    cla: u8,
    ins: u8,
    p1: u8,
    p2: u8,
    data: Vec<u8>,
    le: Option<u8>,
}

impl ApduCommand {
    /// Create a new APDU command
    pub fn new(cla: u8, ins: u8, p1: u8, p2: u8) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: Vec::new(),
            le: None,
        }
    }

    /// Set command data
    pub fn data(mut self, data: Vec<u8>) -> Self {
        self.data = data;
        self
    }

    /// Set expected response length
    pub fn le(mut self, le: u8) -> Self {
        self.le = Some(le);
        self
    }

    /// Build the APDU command bytes
    ///
    /// Short APDUs only: callers keep `data` within 255 bytes.
    pub fn build(&self) -> Vec<u8> {
        let mut apdu = vec![self.cla, self.ins, self.p1, self.p2];

        if !self.data.is_empty() {
            apdu.push(self.data.len() as u8);
            apdu.extend_from_slice(&self.data);
        }

        if let Some(le) = self.le {
            apdu.push(le);
        }

        apdu
    }
}

/// Rewrite the Le byte of an already encoded short command
///
/// Case 2 and case 4 commands get their trailing Le replaced, case 1 and
/// case 3 commands get one appended.
pub fn with_le(command: &[u8], le: u8) -> Vec<u8> {
    let mut out = command.to_vec();
    let has_le = match command.len() {
        0..=4 => false,
        5 => true,
        len => len == 6 + command[4] as usize,
    };
    if has_le {
        if let Some(last) = out.last_mut() {
            *last = le;
        }
    } else {
        out.push(le);
    }
    out
}

/// Common EMV APDU commands
pub mod commands {
    use super::ApduCommand;

    /// SELECT command (by name/AID)
    pub fn select(aid: &[u8]) -> ApduCommand {
        ApduCommand::new(0x00, 0xA4, 0x04, 0x00)
            .data(aid.to_vec())
            .le(0x00)
    }

    /// GET PROCESSING OPTIONS command carrying a command template (tag 83)
    pub fn get_processing_options(command_template: Vec<u8>) -> ApduCommand {
        ApduCommand::new(0x80, 0xA8, 0x00, 0x00)
            .data(command_template)
            .le(0x00)
    }

    /// READ RECORD command
    pub fn read_record(record_number: u8, sfi: u8) -> ApduCommand {
        let p2 = (sfi << 3) | 0x04;
        ApduCommand::new(0x00, 0xB2, record_number, p2).le(0x00)
    }

    /// GET RESPONSE for the `remaining` bytes announced by a 61XX status
    pub fn get_response(remaining: u8) -> ApduCommand {
        ApduCommand::new(0x00, 0xC0, 0x00, 0x00).le(remaining)
    }

    /// GENERATE AC command; `reference_control` selects AAC, TC or ARQC
    pub fn generate_ac(reference_control: u8, cdol_data: Vec<u8>) -> ApduCommand {
        ApduCommand::new(0x80, 0xAE, reference_control, 0x00)
            .data(cdol_data)
            .le(0x00)
    }
}
