//! Card channel abstraction
//!
//! The protocol engine only ever talks to a [`CardChannel`]: send command
//! bytes, get back data plus status word. Readers that can enumerate and
//! open channels implement [`CardTerminal`].

use crate::apdu::ApduResponse;

/// Transport-level failure: no reader, card removed, driver error
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("no card readers available")]
    NoReaders,

    #[error("reader not found: {0}")]
    ReaderNotFound(String),

    #[error("invalid reader name: {0:?}")]
    InvalidReaderName(String),

    #[error("response of {0} bytes carries no status word")]
    ShortResponse(usize),

    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl ChannelError {
    /// Wrap a backend-specific error
    pub fn transport<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Transport(Box::new(err))
    }
}

/// A half-duplex command/response channel to one card
pub trait CardChannel {
    /// Send one command APDU and return the response split into data and SW
    fn transmit(&mut self, command: &[u8]) -> Result<ApduResponse, ChannelError>;

    /// Answer-To-Reset of the connected card
    fn atr(&self) -> Result<Vec<u8>, ChannelError>;
}

impl<C: CardChannel + ?Sized> CardChannel for &mut C {
    fn transmit(&mut self, command: &[u8]) -> Result<ApduResponse, ChannelError> {
        (**self).transmit(command)
    }

    fn atr(&self) -> Result<Vec<u8>, ChannelError> {
        (**self).atr()
    }
}

impl<C: CardChannel + ?Sized> CardChannel for Box<C> {
    fn transmit(&mut self, command: &[u8]) -> Result<ApduResponse, ChannelError> {
        (**self).transmit(command)
    }

    fn atr(&self) -> Result<Vec<u8>, ChannelError> {
        (**self).atr()
    }
}

/// Something that can enumerate readers and open channels on them
pub trait CardTerminal {
    type Channel: CardChannel;

    fn list_readers(&self) -> Result<Vec<String>, ChannelError>;

    fn connect(&self, reader: &str) -> Result<Self::Channel, ChannelError>;

    fn disconnect(&self, channel: Self::Channel) -> Result<(), ChannelError>;

    /// Connect to the first available reader
    fn connect_first(&self) -> Result<(Self::Channel, String), ChannelError> {
        let reader = self
            .list_readers()?
            .into_iter()
            .next()
            .ok_or(ChannelError::NoReaders)?;
        let channel = self.connect(&reader)?;
        Ok((channel, reader))
    }
}

/// Physical interface a card was reached through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardMode {
    Contact,
    Contactless,
}

impl CardMode {
    /// Classify a card by the initial character of its ATR
    ///
    /// `3B` (direct) and `3F` (inverse) conventions come from contact cards;
    /// contactless readers synthesize ATRs starting with other bytes.
    pub fn from_atr(atr: &[u8]) -> Self {
        match atr.first() {
            Some(0x3B) | Some(0x3F) => Self::Contact,
            _ => Self::Contactless,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_card_mode_from_atr() {
        assert_eq!(
            CardMode::from_atr(&hex!("3B 6E 00 00 80 31 80 66")),
            CardMode::Contact
        );
        assert_eq!(CardMode::from_atr(&hex!("3F 65 25")), CardMode::Contact);
        assert_eq!(
            CardMode::from_atr(&hex!("3B8F8001804F0CA0")[1..]),
            CardMode::Contactless
        );
        assert_eq!(CardMode::from_atr(&[]), CardMode::Contactless);
    }
}
