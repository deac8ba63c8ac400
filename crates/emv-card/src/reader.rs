//! PC/SC card reader management

use std::ffi::CString;

use pcsc::{Attribute, Card, Context, Disposition, Protocols, Scope, ShareMode, MAX_BUFFER_SIZE};
use tracing::debug;

use crate::apdu::ApduResponse;
use crate::channel::{CardChannel, CardTerminal, ChannelError};

impl From<pcsc::Error> for ChannelError {
    fn from(err: pcsc::Error) -> Self {
        match err {
            pcsc::Error::NoReadersAvailable => Self::NoReaders,
            other => Self::transport(other),
        }
    }
}

/// Card reader wrapper for managing PC/SC connections
pub struct CardReader {
    context: Context,
}

impl CardReader {
    /// Create a new CardReader by establishing a PC/SC context
    pub fn new() -> Result<Self, ChannelError> {
        let context = Context::establish(Scope::User)?;
        Ok(Self { context })
    }
}

impl CardTerminal for CardReader {
    type Channel = PcscChannel;

    /// List all available card readers
    fn list_readers(&self) -> Result<Vec<String>, ChannelError> {
        let mut readers_buf = [0; 2048];
        let readers = self.context.list_readers(&mut readers_buf)?;

        Ok(readers
            .map(|r| r.to_string_lossy().into_owned())
            .collect())
    }

    /// Connect to a reader by name, sharing the card with other processes
    fn connect(&self, reader: &str) -> Result<PcscChannel, ChannelError> {
        let name = CString::new(reader)
            .map_err(|_| ChannelError::InvalidReaderName(reader.to_string()))?;
        let card = self
            .context
            .connect(&name, ShareMode::Shared, Protocols::ANY)
            .map_err(|err| match err {
                pcsc::Error::UnknownReader | pcsc::Error::ReaderUnavailable => {
                    ChannelError::ReaderNotFound(reader.to_string())
                }
                other => other.into(),
            })?;

        debug!(reader, "connected");
        Ok(PcscChannel {
            card,
            reader: reader.to_string(),
        })
    }

    /// Power the card down and release the reader
    fn disconnect(&self, channel: PcscChannel) -> Result<(), ChannelError> {
        let reader = channel.reader;
        channel
            .card
            .disconnect(Disposition::UnpowerCard)
            .map_err(|(_, err)| ChannelError::from(err))?;
        debug!(reader = %reader, "disconnected");
        Ok(())
    }
}

/// An open PC/SC connection to one card
pub struct PcscChannel {
    card: Card,
    reader: String,
}

impl PcscChannel {
    pub fn reader(&self) -> &str {
        &self.reader
    }
}

impl CardChannel for PcscChannel {
    fn transmit(&mut self, command: &[u8]) -> Result<ApduResponse, ChannelError> {
        let mut response_buf = [0; MAX_BUFFER_SIZE];
        let response = self.card.transmit(command, &mut response_buf)?;
        ApduResponse::from_bytes(response)
    }

    fn atr(&self) -> Result<Vec<u8>, ChannelError> {
        Ok(self.card.get_attribute_owned(Attribute::AtrString)?)
    }
}
