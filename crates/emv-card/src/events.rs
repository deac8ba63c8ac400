//! Session events
//!
//! Every exchange and notable discovery step is reported to an
//! [`EventSink`]. Front ends collect them into a `Vec`, forward them over an
//! mpsc channel to a UI thread, or let [`TracingSink`] log them.

use std::sync::mpsc::Sender;

use tracing::{info, trace, warn};

use crate::card_data::CardData;

/// Event emitted while talking to a card
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmvEvent {
    /// Informational progress (AID found, label found, ...)
    Message(String),
    /// Command APDU as upper-case hex
    ApduSent(String),
    /// Response APDU (data and SW) as upper-case hex
    ApduReceived(String),
    /// Recoverable failure of one step
    Error(String),
    /// Final result of an application read
    CardDataExtracted(CardData),
}

/// Observer for [`EmvEvent`]s
pub trait EventSink {
    fn emit(&mut self, event: EmvEvent);
}

impl EventSink for Vec<EmvEvent> {
    fn emit(&mut self, event: EmvEvent) {
        self.push(event);
    }
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn emit(&mut self, event: EmvEvent) {
        (**self).emit(event);
    }
}

impl EventSink for Sender<EmvEvent> {
    fn emit(&mut self, event: EmvEvent) {
        // A dropped receiver only means nobody is listening any more
        let _ = self.send(event);
    }
}

/// Sink that forwards events to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&mut self, event: EmvEvent) {
        match event {
            EmvEvent::Message(text) => info!("{text}"),
            EmvEvent::ApduSent(apdu) => trace!(apdu = %apdu, ">>"),
            EmvEvent::ApduReceived(apdu) => trace!(apdu = %apdu, "<<"),
            EmvEvent::Error(text) => warn!("{text}"),
            EmvEvent::CardDataExtracted(data) => {
                let pan = data.masked_pan().unwrap_or_else(|| "-".into());
                let expiry = data.expiry.unwrap_or_else(|| "-".into());
                info!(pan = %pan, expiry = %expiry, "card data extracted");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_sender_sink_forwards_events() {
        let (tx, rx) = mpsc::channel();
        let mut sink = tx;
        sink.emit(EmvEvent::Message("hello".into()));
        assert_eq!(rx.recv().unwrap(), EmvEvent::Message("hello".into()));

        drop(rx);
        sink.emit(EmvEvent::Message("nobody listening".into()));
    }

    fn report_failure(mut sink: impl EventSink) {
        sink.emit(EmvEvent::Error("oops".into()));
    }

    #[test]
    fn test_borrowed_vec_sink() {
        let mut events = Vec::new();
        report_failure(&mut events);
        report_failure(&mut events);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], EmvEvent::Error("oops".into()));
    }
}
