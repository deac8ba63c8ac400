//! Scripted card for session tests

use std::collections::{HashMap, VecDeque};
use std::io;

use emv_card::{ApduResponse, CardChannel, ChannelError};

/// Card that answers by exact command match
///
/// Each command has a queue of responses; the last one repeats. Commands
/// without a script get `fallback` (6A83 by default).
pub struct MockChannel {
    responses: HashMap<Vec<u8>, VecDeque<Vec<u8>>>,
    /// Commands that were sent
    pub commands: Vec<Vec<u8>>,
    pub atr: Vec<u8>,
    fallback: Vec<u8>,
    /// Whether the card is still present
    pub connected: bool,
}

#[allow(dead_code)]
impl MockChannel {
    pub fn new() -> Self {
        Self {
            responses: HashMap::new(),
            commands: Vec::new(),
            atr: vec![0x3B, 0x6E, 0x00, 0x00, 0x80, 0x31, 0x80, 0x66],
            fallback: vec![0x6A, 0x83],
            connected: true,
        }
    }

    /// ATR of a card presented over a contactless reader
    pub fn contactless(mut self) -> Self {
        self.atr = vec![0x8F, 0x80, 0x01, 0x80, 0x4F];
        self
    }

    /// Answer `command` with `response`, after any earlier scripted answers
    pub fn on(mut self, command: &[u8], response: &[u8]) -> Self {
        self.responses
            .entry(command.to_vec())
            .or_default()
            .push_back(response.to_vec());
        self
    }

    pub fn fallback(mut self, response: &[u8]) -> Self {
        self.fallback = response.to_vec();
        self
    }

    pub fn sent(&self, command: &[u8]) -> bool {
        self.commands.iter().any(|c| c == command)
    }
}

impl CardChannel for MockChannel {
    fn transmit(&mut self, command: &[u8]) -> Result<ApduResponse, ChannelError> {
        if !self.connected {
            return Err(ChannelError::transport(io::Error::new(
                io::ErrorKind::NotConnected,
                "card removed",
            )));
        }
        self.commands.push(command.to_vec());

        let response = match self.responses.get_mut(command) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_default(),
            Some(queue) => queue.front().cloned().unwrap_or_default(),
            None => self.fallback.clone(),
        };
        ApduResponse::from_bytes(&response)
    }

    fn atr(&self) -> Result<Vec<u8>, ChannelError> {
        Ok(self.atr.clone())
    }
}
