pub mod apps;
pub mod dump;
pub mod dump_all_tags;
pub mod generate_ac;
pub mod read;
pub mod readers;

use emv_card::{CardChannel, CardData, CardReader, CardTerminal, DolBuilder, EmvCard, PcscChannel, Result};
use emv_common::{find_tag_recursive, get_tag_name, tags, EmvTag};
use tracing::warn;

use crate::config::{InterfaceArg, SessionArgs};
use crate::formatters::{self, FormatMode};

/// Connect to `reader_name` (or the first reader), run `f` on a fresh
/// session, then power the card down
pub(crate) fn with_card<T>(
    reader_name: Option<&str>,
    terminal: DolBuilder,
    f: impl FnOnce(&mut EmvCard<'_, PcscChannel>) -> Result<T>,
) -> Result<T> {
    let reader = CardReader::new()?;
    let (mut channel, name) = match reader_name {
        Some(name) => (reader.connect(name)?, name.to_string()),
        None => reader.connect_first()?,
    };

    println!("Reader: {}", name);
    println!("Card connected successfully\n");

    let result = {
        let mut card = EmvCard::new(&mut channel).with_terminal_data(terminal);
        let result = f(&mut card);
        card.clear();
        result
    };

    if let Err(err) = reader.disconnect(channel) {
        warn!(error = %err, "failed to release card");
    }
    result
}

/// Fill the application registry through the directory `interface` names
pub(crate) fn discover<C: CardChannel + ?Sized>(
    card: &mut EmvCard<'_, C>,
    interface: InterfaceArg,
) -> Result<usize> {
    match interface {
        InterfaceArg::Contact => card.load_pse_applications(),
        InterfaceArg::Contactless => card.load_ppse_applications(),
        InterfaceArg::Auto => {
            let mode = card.card_mode()?;
            println!("Card mode: {:?}\n", mode);
            card.discover(mode)
        }
    }
}

/// Read the application chosen by `session`
pub(crate) fn read_selected<C: CardChannel + ?Sized>(
    card: &mut EmvCard<'_, C>,
    session: &SessionArgs,
) -> Result<CardData> {
    if let Some(aid) = &session.aid {
        return card.read_aid(&aid.0);
    }

    discover(card, session.interface)?;
    match &session.app {
        Some(key) => card.read_application(key),
        None => card.read_preferred(),
    }
}

/// Display EMV tags from TLV data
pub(crate) fn display_tags(data: &[u8], mode: FormatMode) {
    const DISPLAYED: [EmvTag; 20] = [
        tags::APPLICATION_IDENTIFIER,
        tags::DF_NAME,
        tags::APPLICATION_LABEL,
        tags::APPLICATION_PREFERRED_NAME,
        tags::APPLICATION_PRIORITY_INDICATOR,
        tags::PDOL,
        tags::APPLICATION_PAN,
        tags::CARDHOLDER_NAME,
        tags::APPLICATION_EXPIRATION_DATE,
        tags::APPLICATION_EFFECTIVE_DATE,
        tags::ISSUER_COUNTRY_CODE,
        tags::APPLICATION_PAN_SEQUENCE_NUMBER,
        tags::TRACK_2_EQUIVALENT_DATA,
        tags::TRACK_2_DATA,
        tags::AIP,
        tags::AFL,
        tags::CDOL1,
        tags::CDOL2,
        tags::APPLICATION_USAGE_CONTROL,
        tags::APPLICATION_CURRENCY_CODE,
    ];

    for tag in DISPLAYED {
        if let Some(value) = find_tag_recursive(data, tag) {
            let formatted_value = formatters::format_value(tag, value, mode);
            println!("  [{}] {}: {}", tag, get_tag_name(tag), formatted_value);
        }
    }
}

/// Print the fields extracted from one application
pub(crate) fn print_card_data(data: &CardData) {
    println!("=== Card Data ===\n");
    if let Some(aid) = &data.aid {
        println!("  AID: {}", hex::encode_upper(aid));
    }
    print_field("Label", data.application_label.as_deref());
    print_field("PAN", data.pan.as_deref());
    print_field("Expiry", data.expiry.as_deref());
    print_field("Cardholder", data.cardholder_name.as_deref());
    print_field("Track 2", data.track2.as_deref());
    println!();
}

fn print_field(name: &str, value: Option<&str>) {
    println!("  {}: {}", name, value.unwrap_or("-"));
}
