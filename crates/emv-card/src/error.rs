//! Error types for the EMV engine

use emv_common::TlvError;

use crate::channel::ChannelError;

/// Errors returned by card operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The reader or card went away; fatal to the current operation
    #[error(transparent)]
    Channel(#[from] ChannelError),

    /// The card answered a command with a non-success status word
    #[error("{command} failed with status {status:04X}")]
    Status { command: &'static str, status: u16 },

    /// TLV or DOL bytes could not be decoded
    #[error("malformed card data: {0}")]
    Malformed(#[from] TlvError),

    #[error("unknown application: {0}")]
    UnknownApplication(String),

    #[error("{0} not found on card")]
    MissingData(&'static str),

    /// Command data does not fit a short APDU
    #[error("command data of {0} bytes exceeds 255")]
    CommandTooLong(usize),
}

/// Result alias for card operations
pub type Result<T, E = Error> = std::result::Result<T, E>;
