use emv_card::Result;
use emv_common::{find_tag, tags};

use super::{display_tags, print_card_data, read_selected, with_card};
use crate::config::SessionArgs;
use crate::formatters::FormatMode;

pub fn cmd_read(reader: Option<&str>, session: &SessionArgs, format_mode: FormatMode) -> Result<()> {
    println!("EMV Card Reader - {} Mode\n", format_mode.description());

    with_card(reader, session.terminal.dol_builder(), |card| {
        let data = read_selected(card, session)?;
        let records = card.records();

        if let Some(select_response) = &records.select_response {
            println!("=== SELECT Response Details ===\n");
            if format_mode == FormatMode::Raw {
                println!("Raw SELECT response ({} bytes):", select_response.len());
                println!("{}\n", hex::encode_upper(select_response));
            } else {
                display_tags(select_response, format_mode);
                println!();
            }
        }

        if let Some(gpo) = &records.gpo_response {
            println!("=== GET PROCESSING OPTIONS Response ===\n");
            let search_data = find_tag(gpo, tags::RESPONSE_MESSAGE_TEMPLATE_FORMAT_2)
                .or_else(|| find_tag(gpo, tags::RESPONSE_MESSAGE_TEMPLATE_FORMAT_1))
                .unwrap_or(gpo.as_slice());

            if format_mode == FormatMode::Raw {
                println!("  Data ({} bytes): {}", search_data.len(), hex::encode_upper(search_data));
            } else {
                display_tags(gpo, format_mode);
            }
            println!();
        }

        println!("Records read: {}\n", records.records.len());
        for (sfi, record, raw) in &records.records {
            println!("Record {} (SFI {}):", record, sfi);
            if format_mode == FormatMode::Raw {
                println!("  Data ({} bytes): {}", raw.len(), hex::encode_upper(raw));
            } else {
                display_tags(raw, format_mode);
            }
            println!();
        }

        print_card_data(&data);
        Ok(())
    })
}
