//! APDU exchange with ISO 7816-4 status word correction
//!
//! One call sends one command. Three status words trigger a single
//! corrective retry whose result is returned whatever it is:
//!
//! | SW    | Retry                                   |
//! |-------|-----------------------------------------|
//! | 61 XX | GET RESPONSE `00 C0 00 00 XX`           |
//! | 6C XX | same command with Le = XX               |
//! | 67 00 | same command with Le = FF               |

use tracing::debug;

use crate::apdu::{commands, with_le, ApduResponse};
use crate::channel::{CardChannel, ChannelError};
use crate::events::{EmvEvent, EventSink};

/// Send `command` and apply at most one status-word driven retry
pub fn exchange<C, S>(
    channel: &mut C,
    command: &[u8],
    sink: &mut S,
) -> Result<ApduResponse, ChannelError>
where
    C: CardChannel + ?Sized,
    S: EventSink + ?Sized,
{
    let response = send(channel, command, sink)?;

    let retry = match (response.sw1, response.sw2) {
        (0x61, remaining) => {
            debug!(remaining, "more data available, issuing GET RESPONSE");
            commands::get_response(remaining).build()
        }
        (0x6C, le) => {
            debug!(le, "wrong Le, resending with card-supplied length");
            with_le(command, le)
        }
        (0x67, 0x00) => {
            debug!("wrong length, resending with Le=FF");
            with_le(command, 0xFF)
        }
        _ => return Ok(response),
    };

    send(channel, &retry, sink)
}

fn send<C, S>(channel: &mut C, command: &[u8], sink: &mut S) -> Result<ApduResponse, ChannelError>
where
    C: CardChannel + ?Sized,
    S: EventSink + ?Sized,
{
    sink.emit(EmvEvent::ApduSent(hex::encode_upper(command)));
    let response = channel.transmit(command).inspect_err(|err| {
        debug!(error = %err, "transmit failed");
    })?;
    sink.emit(EmvEvent::ApduReceived(hex::encode_upper(response.to_bytes())));
    Ok(response)
}
