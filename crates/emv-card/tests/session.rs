//! Card session tests against a scripted card

mod common;

use common::MockChannel;
use emv_card::{
    aids, CardMode, CryptogramType, DolBuilder, EmvCard, EmvEvent, Error, GenerateAcRequest,
};
use emv_common::tags;
use hex_literal::hex;

const SELECT_PSE: [u8; 20] = hex!("00A404000E 315041592E5359532E4444463031 00");
const SELECT_PPSE: [u8; 20] = hex!("00A404000E 325041592E5359532E4444463031 00");
const SELECT_VISA: [u8; 13] = hex!("00A4040007 A0000000031010 00");

const PPSE_FCI: &[u8] = &hex!(
    "6F 2D"
    "84 0E 325041592E5359532E4444463031"
    "A5 1B BF0C 18"
    "61 16 4F 07 A0000000031010 50 08 5649534120435244 87 01 02"
    "9000"
);

const VISA_RECORD_1: &[u8] = &hex!("70 10 5A 08 4532123456789012 5F24 03 251231 9000");

/// Visa application with a PDOL, a format 2 GPO response and two records
fn visa_card() -> MockChannel {
    visa_card_with_record(VISA_RECORD_1)
}

fn visa_card_with_record(record_1: &[u8]) -> MockChannel {
    MockChannel::new()
        .on(
            &SELECT_VISA,
            &hex!("6F 17 84 07 A0000000031010 A5 0C 50 04 56495341 9F38 03 9F6604 9000"),
        )
        .on(
            &hex!("80A80000 06 8304 37000000 00"),
            &hex!(
                "77 1A"
                "82 02 1980"
                "94 04 08010200"
                "5A 08 4111111111111111"
                "5F24 03 991231"
                "9000"
            ),
        )
        .on(&hex!("00B2010C00"), record_1)
        .on(
            &hex!("00B2020C00"),
            &hex!("70 14 5F20 09 444F452F4A4F484E20 8C 06 9F0206 9F3704 9000"),
        )
}

#[test]
fn test_pse_lists_applications_until_record_not_found() {
    let mut channel = MockChannel::new()
        .on(&SELECT_PSE, &hex!("6F00 9000"))
        .on(
            &hex!("00B2010C00"),
            &hex!("70 1A 61 18 4F 07 A0000000031010 50 0A 56495341204445424954 87 01 01 9000"),
        )
        .on(
            &hex!("00B2020C00"),
            &hex!("70 14 61 12 4F 07 A0000000032010 50 04 56495341 87 01 02 9000"),
        );

    {
        let mut card = EmvCard::new(&mut channel);
        assert_eq!(card.load_pse_applications().unwrap(), 2);

        let apps = card.applications();
        assert_eq!(apps.keys().collect::<Vec<_>>(), vec!["1. VISA DEBIT", "2. VISA"]);
        assert_eq!(apps.preferred().unwrap().aid, aids::VISA);
        assert_eq!(apps.select("2").unwrap().priority, 2);
    }

    assert!(channel.sent(&hex!("00B2030C00")));
    assert!(!channel.sent(&hex!("00B2040C00")));
}

#[test]
fn test_pse_select_failure_yields_no_applications() {
    let mut channel = MockChannel::new().on(&SELECT_PSE, &hex!("6A82"));
    let mut events: Vec<EmvEvent> = Vec::new();

    {
        let mut card = EmvCard::new(&mut channel).with_sink(&mut events);
        assert_eq!(card.load_pse_applications().unwrap(), 0);
        assert!(card.applications().is_empty());
    }

    assert_eq!(channel.commands.len(), 1);
    assert!(events.iter().any(|e| matches!(e, EmvEvent::Error(_))));
}

#[test]
fn test_pse_record_retried_with_corrected_le() {
    let mut channel = MockChannel::new()
        .on(&SELECT_PSE, &hex!("6F00 9000"))
        .on(&hex!("00B2010C00"), &hex!("6C1A"))
        .on(
            &hex!("00B2010C1A"),
            &hex!("70 18 61 16 4F 07 A0000000031010 50 08 5649534120435244 87 01 02 9000"),
        );

    let mut card = EmvCard::new(&mut channel);
    assert_eq!(card.load_pse_applications().unwrap(), 1);
    assert_eq!(card.applications().keys().next(), Some("1. VISA CRD"));
}

#[test]
fn test_ppse_discovery() {
    let mut channel = MockChannel::new().contactless().on(&SELECT_PPSE, PPSE_FCI);

    let mut card = EmvCard::new(&mut channel);
    let mode = card.card_mode().unwrap();
    assert_eq!(mode, CardMode::Contactless);
    assert_eq!(card.discover(mode).unwrap(), 1);

    let app = card.applications().get("1. VISA CRD").unwrap();
    assert_eq!(app.aid, aids::VISA);
    assert_eq!(app.priority, 2);
}

#[test]
fn test_contact_discovery_falls_back_to_ppse() {
    let mut channel = MockChannel::new().on(&SELECT_PPSE, PPSE_FCI);

    {
        let mut card = EmvCard::new(&mut channel);
        assert_eq!(card.discover(CardMode::Contact).unwrap(), 1);
    }

    assert_eq!(channel.commands[0], SELECT_PSE);
    assert!(channel.sent(&SELECT_PPSE));
}

#[test]
fn test_read_follows_pdol_and_afl() {
    let mut channel = visa_card();
    let mut events: Vec<EmvEvent> = Vec::new();

    let data = {
        let mut card = EmvCard::new(&mut channel).with_sink(&mut events);
        let data = card.read_aid(aids::VISA).unwrap();

        let records = card.records();
        assert!(records.select_response.is_some());
        assert!(records.gpo_response.is_some());
        assert_eq!(records.records.len(), 2);
        assert_eq!(records.records[1].0, 1);
        assert_eq!(records.records[1].1, 2);
        data
    };

    // record values override the GPO response
    assert_eq!(data.pan.as_deref(), Some("4532123456789012"));
    assert_eq!(data.expiry.as_deref(), Some("2025-12-31"));
    assert_eq!(data.cardholder_name.as_deref(), Some("DOE/JOHN"));
    assert_eq!(data.application_label.as_deref(), Some("VISA"));
    assert_eq!(data.aid.as_deref(), Some(aids::VISA));

    assert!(!channel.sent(&hex!("00B2030C00")));
    assert!(events.contains(&EmvEvent::Message("PAN found".into())));
    assert_eq!(events.last(), Some(&EmvEvent::CardDataExtracted(data)));
}

#[test]
fn test_gpo_only_values_survive() {
    let mut channel = visa_card_with_record(&hex!("70 04 9F08 01 02 9000"));

    let mut card = EmvCard::new(&mut channel);
    let data = card.read_aid(aids::VISA).unwrap();
    assert_eq!(data.pan.as_deref(), Some("4111111111111111"));
    assert_eq!(data.expiry.as_deref(), Some("2099-12-31"));
}

#[test]
fn test_read_without_afl_probes_common_records() {
    let mut channel = MockChannel::new()
        .on(
            &hex!("00A4040008 A000000333010101 00"),
            &hex!("6F 0A 84 08 A000000333010101 9000"),
        )
        .on(&hex!("80A8000002830000"), &hex!("6985"))
        .on(
            &hex!("00B2011400"),
            &hex!("70 15 57 13 6231871800000762306D33122203870000000F 9000"),
        );
    let mut events: Vec<EmvEvent> = Vec::new();

    let data = {
        let mut card = EmvCard::new(&mut channel).with_sink(&mut events);
        let data = card.read_aid(aids::UNIONPAY_DEBIT).unwrap();
        assert!(card.records().gpo_response.is_none());
        assert_eq!(card.records().records.len(), 1);
        data
    };

    assert_eq!(data.pan.as_deref(), Some("6231871800000762"));
    assert_eq!(data.expiry.as_deref(), Some("2033-12"));
    assert_eq!(data.track2.as_deref(), Some("6231871800000762306D33122203870000000F"));

    for probe in [
        hex!("00B2010C00"),
        hex!("00B2011400"),
        hex!("00B2011C00"),
        hex!("00B2012400"),
        hex!("00B2020C00"),
        hex!("00B2021400"),
    ] {
        assert!(channel.sent(&probe), "missing probe {}", hex::encode_upper(probe));
    }
    assert!(events.iter().any(|e| matches!(e, EmvEvent::Error(_))));
}

#[test]
fn test_select_failure_aborts_read() {
    let mut channel = MockChannel::new().on(&SELECT_VISA, &hex!("6A82"));

    {
        let mut card = EmvCard::new(&mut channel);
        let err = card.read_aid(aids::VISA).unwrap_err();
        assert!(matches!(
            err,
            Error::Status {
                command: "SELECT",
                status: 0x6A82
            }
        ));
    }

    assert_eq!(channel.commands.len(), 1);
}

#[test]
fn test_unknown_application_key() {
    let mut channel = MockChannel::new();
    let mut card = EmvCard::new(&mut channel);
    assert!(matches!(
        card.read_application("1. VISA"),
        Err(Error::UnknownApplication(_))
    ));
}

#[test]
fn test_read_application_by_ordinal() {
    let mut channel = visa_card().contactless().on(&SELECT_PPSE, PPSE_FCI);

    let mut card = EmvCard::new(&mut channel);
    card.load_ppse_applications().unwrap();
    let data = card.read_application("1").unwrap();

    // label from the directory wins over the FCI
    assert_eq!(data.application_label.as_deref(), Some("VISA CRD"));
    assert_eq!(data.pan.as_deref(), Some("4532123456789012"));
}

#[test]
fn test_selected_application_records_pdol() {
    let mut channel = visa_card().contactless().on(&SELECT_PPSE, PPSE_FCI);

    let mut card = EmvCard::new(&mut channel);
    card.load_ppse_applications().unwrap();
    assert_eq!(card.applications().get("1. VISA CRD").unwrap().pdol, None);

    card.read_application("1. VISA CRD").unwrap();
    let app = card.applications().get("1. VISA CRD").unwrap();
    assert_eq!(app.pdol.as_deref(), Some(&hex!("9F66 04")[..]));
}

#[test]
fn test_preferred_application_records_pdol() {
    let mut channel = visa_card().contactless().on(&SELECT_PPSE, PPSE_FCI);

    let mut card = EmvCard::new(&mut channel);
    card.load_ppse_applications().unwrap();
    card.read_preferred().unwrap();
    let app = card.applications().preferred().unwrap();
    assert_eq!(app.pdol.as_deref(), Some(&hex!("9F66 04")[..]));
}

#[test]
fn test_card_removed_mid_session() {
    let mut channel = visa_card();
    channel.connected = false;

    let mut card = EmvCard::new(&mut channel);
    assert!(matches!(card.read_aid(aids::VISA), Err(Error::Channel(_))));
}

#[test]
fn test_generate_ac_with_cdol1() {
    let mut channel = visa_card().on(
        &hex!("80AE8000 0A 000000000001 11223344 00"),
        &hex!("80 12 80 0042 1122334455667788 06010A03A00000 9000"),
    );
    let terminal = DolBuilder::new()
        .with_defaults()
        .set_unpredictable_number(hex!("11223344").to_vec());

    let mut card = EmvCard::new(&mut channel).with_terminal_data(terminal);
    card.read_aid(aids::VISA).unwrap();

    let (tag, cdol) = card.find_cdol().unwrap();
    assert_eq!(tag, tags::CDOL1);
    let cdol_data = card.terminal_data().build(cdol).unwrap();

    let response = card
        .generate_ac(&GenerateAcRequest {
            cryptogram_type: CryptogramType::Arqc,
            cdol_data,
        })
        .unwrap();

    assert_eq!(response.cryptogram_type(), Some(CryptogramType::Arqc));
    assert_eq!(response.atc, Some(0x42));
    assert_eq!(response.cryptogram.as_deref(), Some(&hex!("1122334455667788")[..]));
}

#[test]
fn test_generate_ac_rejected() {
    let mut channel = visa_card().on(&hex!("80AE0000 00"), &hex!("6985"));

    let mut card = EmvCard::new(&mut channel);
    let err = card
        .generate_ac(&GenerateAcRequest {
            cryptogram_type: CryptogramType::Aac,
            cdol_data: Vec::new(),
        })
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Status {
            command: "GENERATE AC",
            status: 0x6985
        }
    ));
}
