use emv_card::{CardReader, CardTerminal, Result};

pub fn cmd_readers() -> Result<()> {
    let reader = CardReader::new()?;
    let readers = reader.list_readers()?;

    if readers.is_empty() {
        println!("No card readers found");
        return Ok(());
    }

    println!("Found {} reader(s):\n", readers.len());
    for (i, name) in readers.iter().enumerate() {
        println!("  {}. {}", i + 1, name);
    }
    Ok(())
}
