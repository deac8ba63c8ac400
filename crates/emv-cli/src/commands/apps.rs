use emv_card::{DolBuilder, Result};

use super::{discover, with_card};
use crate::config::InterfaceArg;

pub fn cmd_apps(reader: Option<&str>, interface: InterfaceArg) -> Result<()> {
    println!("EMV Application Discovery\n");

    with_card(reader, DolBuilder::new().with_defaults(), |card| {
        let found = discover(card, interface)?;
        if found == 0 {
            println!("No applications found via PSE/PPSE");
            return Ok(());
        }

        let registry = card.applications();
        let preferred = registry.preferred();

        println!("Found {} application(s):\n", found);
        for (key, app) in registry.iter() {
            let is_preferred = preferred.is_some_and(|p| std::ptr::eq(p, app));
            println!("{}{}", key, if is_preferred { " (preferred)" } else { "" });
            println!("  AID: {}", hex::encode_upper(&app.aid));
            if let Some(name) = &app.preferred_name {
                println!("  Preferred Name: {}", name);
            }
            println!("  Priority: {} (lower = higher priority)", app.priority);
            println!();
        }
        Ok(())
    })
}
