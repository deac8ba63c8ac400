//! Dump all TLV tags found on card, including unknown ones

use emv_common::{decode, get_tag_name};

use crate::formatters::truncated_hex;

/// Parse and display all TLV tags in data, descending into templates
pub fn dump_all_tags(data: &[u8], indent: usize) {
    let indent_str = " ".repeat(indent * 2);

    for item in decode(data) {
        let tlv = match item {
            Ok(tlv) => tlv,
            Err(err) => {
                println!("{}<malformed: {}>", indent_str, err);
                return;
            }
        };

        if tlv.tag.is_constructed() {
            println!("{}[{}] {}:", indent_str, tlv.tag, get_tag_name(tlv.tag));
            dump_all_tags(tlv.value, indent + 1);
        } else {
            println!(
                "{}[{}] {}: {}",
                indent_str,
                tlv.tag,
                get_tag_name(tlv.tag),
                truncated_hex(tlv.value)
            );
        }
    }
}
