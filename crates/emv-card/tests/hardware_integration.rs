//! Hardware-dependent integration tests
//!
//! These tests require a physical EMV card in a card reader.
//! They are ignored by default and must be explicitly run with:
//!
//!     cargo test --package emv-card --test hardware_integration -- --ignored

use emv_card::apdu::commands;
use emv_card::{aids, CardChannel, CardReader, CardTerminal, EmvCard, EmvEvent};

/// Test that we can connect to a card reader
///
/// **Requires**: Card reader connected (card not required)
#[test]
#[ignore = "requires hardware: card reader"]
fn test_list_readers() {
    let reader = CardReader::new().expect("Failed to establish PC/SC context");
    let readers = reader.list_readers().expect("Failed to list readers");
    println!("Readers: {readers:?}");
    assert!(!readers.is_empty(), "No card reader connected");
}

/// Test that we can detect an inserted card
///
/// **Requires**: Card reader with card inserted
#[test]
#[ignore = "requires hardware: card inserted in reader"]
fn test_card_present() {
    let reader = CardReader::new().expect("Failed to establish PC/SC context");
    let (channel, reader_name) = reader.connect_first().expect("Failed to connect to card");

    let atr = channel.atr().expect("Failed to read ATR");
    println!("Connected to reader: {reader_name}, ATR {}", hex::encode_upper(&atr));
    assert!(!atr.is_empty());

    reader.disconnect(channel).expect("Failed to disconnect");
}

/// Test selecting a known EMV application
///
/// **Requires**: EMV card (credit/debit card) inserted
#[test]
#[ignore = "requires hardware: EMV card"]
fn test_select_emv_application() {
    let reader = CardReader::new().expect("Failed to establish PC/SC context");
    let (mut channel, _) = reader.connect_first().expect("Failed to connect to card");

    let known_aids = [
        ("Visa", aids::VISA),
        ("Mastercard", aids::MASTERCARD),
        ("UnionPay", aids::UNIONPAY_DEBIT),
    ];

    let selected = known_aids.iter().any(|(name, aid)| {
        let response = channel
            .transmit(&commands::select(aid).build())
            .expect("Transmit failed");
        if response.is_success() {
            println!("Selected {name} ({})", hex::encode_upper(aid));
        }
        response.is_success()
    });

    assert!(selected, "No EMV application could be selected");
}

/// Full read: discovery, GPO, AFL records, Track 2 recovery
///
/// **Requires**: EMV card inserted
#[test]
#[ignore = "requires hardware: EMV card"]
fn test_read_card_data() {
    let reader = CardReader::new().expect("Failed to establish PC/SC context");
    let (mut channel, _) = reader.connect_first().expect("Failed to connect to card");

    let mut events: Vec<EmvEvent> = Vec::new();
    let data = {
        let mut card = EmvCard::new(&mut channel).with_sink(&mut events);
        let mode = card.card_mode().expect("Failed to read ATR");
        let found = card.discover(mode).expect("Discovery failed");
        println!("{mode:?} card lists {found} applications");
        assert!(found > 0, "Card lists no payment applications");

        card.read_preferred().expect("Read failed")
    };

    for event in &events {
        if let EmvEvent::Message(text) | EmvEvent::Error(text) = event {
            println!("{text}");
        }
    }

    println!("PAN: {:?}", data.masked_pan());
    println!("Expiry: {:?}", data.expiry);
    assert!(data.pan.is_some(), "PAN not found");
    assert!(events
        .iter()
        .any(|e| matches!(e, EmvEvent::CardDataExtracted(_))));
}
