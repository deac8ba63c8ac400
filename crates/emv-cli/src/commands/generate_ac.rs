use std::io::{self, BufRead};

use emv_card::{CryptogramType, Error, GenerateAcRequest, Result};
use tracing::warn;

use super::{read_selected, with_card};
use crate::config::SessionArgs;

pub fn cmd_generate_ac(
    reader: Option<&str>,
    session: &SessionArgs,
    cryptogram_type: CryptogramType,
    confirmed: bool,
) -> Result<()> {
    println!("EMV GENERATE AC - Application Cryptogram Generation\n");

    if !confirmed && !confirm() {
        println!("Cancelled");
        return Ok(());
    }

    with_card(reader, session.terminal.dol_builder(), |card| {
        println!("=== Reading Card Data ===\n");
        read_selected(card, session)?;
        println!("Card data read successfully");

        let Some((tag, cdol)) = card.find_cdol() else {
            eprintln!("No CDOL found on card");
            return Err(Error::MissingData("CDOL1/CDOL2"));
        };
        println!("Found {} ({} bytes): {}", tag.name(), cdol.len(), hex::encode_upper(cdol));

        println!("\n=== Building Transaction Data ===\n");
        let cdol_data = card.terminal_data().build(cdol)?;
        println!("Transaction amount: {} minor units", session.terminal.amount);
        println!("CDOL data ({} bytes): {}", cdol_data.len(), hex::encode_upper(&cdol_data));

        println!("\n=== Sending GENERATE AC ===\n");
        println!("Cryptogram Type: {:?}", cryptogram_type);

        let response = card.generate_ac(&GenerateAcRequest {
            cryptogram_type,
            cdol_data,
        })?;

        println!("\n=== GENERATE AC Response ===\n");

        match &response.cryptogram {
            Some(cryptogram) => println!("✓ Cryptogram (9F26): {}", hex::encode_upper(cryptogram)),
            None => println!("✗ Cryptogram: Not found"),
        }

        match response.atc {
            Some(atc) => println!("✓ Application Transaction Counter (9F36): {}", atc),
            None => println!("✗ ATC: Not found"),
        }

        match response.cid {
            Some(cid) => {
                println!("✓ Cryptogram Information Data (9F27): {:02X}", cid);
                let kind = match response.cryptogram_type() {
                    Some(CryptogramType::Aac) => "AAC (declined)",
                    Some(CryptogramType::Tc) => "TC (approved offline)",
                    Some(CryptogramType::Arqc) => "ARQC (go online)",
                    None => "reserved",
                };
                println!("  Cryptogram Type: {}", kind);
            }
            None => println!("✗ CID: Not found"),
        }

        if let Some(iad) = &response.iad {
            println!("✓ Issuer Application Data (9F10): {} ({} bytes)", hex::encode_upper(iad), iad.len());
        }

        if let Some(sdad) = &response.sdad {
            println!("✓ Signed Dynamic Application Data (9F4B): {} bytes", sdad.len());
        }

        println!(
            "\nRaw response ({} bytes): {}",
            response.raw_data.len(),
            hex::encode_upper(&response.raw_data)
        );
        Ok(())
    })
}

/// Ask before touching the card's transaction counter
fn confirm() -> bool {
    println!("⚠️  WARNING ⚠️");
    println!("This command will INCREMENT the Application Transaction Counter (ATC) on your card!");
    println!("This is a permanent change that cannot be undone.");
    println!("Press Ctrl+C now to cancel, or press Enter to continue...\n");

    read_confirmation(io::stdin().lock())
}

/// A line was entered; end of input is not a confirmation
fn read_confirmation(mut input: impl BufRead) -> bool {
    let mut line = String::new();
    match input.read_line(&mut line) {
        Ok(read) => read > 0,
        Err(err) => {
            warn!(error = %err, "could not read confirmation");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enter_confirms() {
        assert!(read_confirmation(&b"\n"[..]));
        assert!(read_confirmation(&b"yes\n"[..]));
    }

    #[test]
    fn test_closed_stdin_cancels() {
        assert!(!read_confirmation(io::empty()));
    }
}
