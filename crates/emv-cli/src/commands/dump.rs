use emv_card::Result;

use super::dump_all_tags::dump_all_tags;
use super::{read_selected, with_card};
use crate::config::SessionArgs;

pub fn cmd_dump(reader: Option<&str>, session: &SessionArgs) -> Result<()> {
    println!("EMV Tag Dump - All TLV Tags\n");

    with_card(reader, session.terminal.dol_builder(), |card| {
        read_selected(card, session)?;
        let records = card.records();

        if let Some(select_response) = &records.select_response {
            println!("=== SELECT Response ===\n");
            dump_all_tags(select_response, 1);
            println!();
        }

        if let Some(gpo) = &records.gpo_response {
            println!("=== GET PROCESSING OPTIONS Response ===\n");
            dump_all_tags(gpo, 1);
            println!();
        }

        println!("=== DUMPING ALL TLV TAGS FROM ALL RECORDS ===\n");
        println!("Total records: {}\n", records.records.len());

        for (sfi, record, raw) in &records.records {
            println!("Record {} (SFI {}):", record, sfi);
            dump_all_tags(raw, 1);
            println!();
        }

        println!("=== Dump Complete ===");
        Ok(())
    })
}
