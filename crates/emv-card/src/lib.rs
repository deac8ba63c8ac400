//! EMV Card - Smart card reading and EMV protocol implementation
//!
//! This crate talks to EMV payment cards through a [`CardChannel`] and
//! implements the read flow of an EMV terminal: PSE/PPSE application
//! discovery, SELECT, GET PROCESSING OPTIONS driven by the card's PDOL, AFL
//! record reading and Track 2 recovery. With the `pcsc` feature, PC/SC
//! readers provide the channel.

pub mod afl;
pub mod apdu;
pub mod card_data;
pub mod channel;
pub mod discovery;
pub mod dol;
pub mod error;
pub mod events;
pub mod generate_ac;
pub mod protocol;
#[cfg(feature = "pcsc")]
pub mod reader;
pub mod track2;
pub mod transport;

pub use apdu::ApduResponse;
pub use card_data::{CardData, Priority};
pub use channel::{CardChannel, CardMode, CardTerminal, ChannelError};
pub use discovery::{aids, ApplicationRegistry, EmvApplication};
pub use dol::{CommandKind, DolBuilder};
pub use error::{Error, Result};
pub use events::{EmvEvent, EventSink, TracingSink};
pub use generate_ac::{CryptogramType, GenerateAcRequest, GenerateAcResponse};
pub use protocol::{ApplicationRecords, EmvCard};
#[cfg(feature = "pcsc")]
pub use reader::{CardReader, PcscChannel};
