//! BER-TLV decoding and encoding
//!
//! Tags are one or two bytes: a first byte whose low five bits are all set
//! is followed by exactly one more tag byte. Lengths use the short form
//! (`< 0x80`) or the long form `0x81..=0x83` followed by up to three
//! big-endian length bytes. Values longer than [`MAX_VALUE_LEN`] are
//! rejected.

use crate::EmvTag;

/// Largest value length accepted from a card
pub const MAX_VALUE_LEN: usize = 4096;

/// Errors raised while decoding TLV or DOL bytes
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TlvError {
    /// The buffer ended inside a tag or length field
    #[error("unexpected end of data at offset {offset}")]
    UnexpectedEnd { offset: usize },

    /// Long-form length with zero or more than three length bytes
    #[error("invalid length-of-length {0} (expected 1..=3)")]
    InvalidLengthOfLength(u8),

    /// The declared value runs past the end of the buffer
    #[error("length {length} exceeds remaining {remaining} bytes")]
    LengthOutOfRange { length: usize, remaining: usize },

    /// The declared value is larger than [`MAX_VALUE_LEN`]
    #[error("value length {0} exceeds maximum of 4096")]
    ValueTooLong(usize),

    /// A DOL entry whose tag is not followed by a length byte
    #[error("DOL entry for tag {0} has no length byte")]
    TruncatedDol(EmvTag),
}

/// A single decoded TLV element borrowing its value from the source buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tlv<'a> {
    pub tag: EmvTag,
    pub value: &'a [u8],
}

impl<'a> Tlv<'a> {
    /// Decode the value of this element as a nested TLV sequence
    pub fn children(&self) -> TlvReader<'a> {
        TlvReader::new(self.value)
    }
}

/// Parse a tag at the start of `data`
///
/// Returns the tag and the number of bytes consumed.
pub fn parse_tag(data: &[u8]) -> Result<(EmvTag, usize), TlvError> {
    let b0 = *data.first().ok_or(TlvError::UnexpectedEnd { offset: 0 })?;
    if b0 & 0x1F == 0x1F {
        let b1 = *data.get(1).ok_or(TlvError::UnexpectedEnd { offset: 1 })?;
        Ok((EmvTag(((b0 as u32) << 8) | b1 as u32), 2))
    } else {
        Ok((EmvTag(b0 as u32), 1))
    }
}

/// Parse a length field at the start of `data`
///
/// Returns the decoded length and the number of bytes consumed.
pub fn parse_length(data: &[u8]) -> Result<(usize, usize), TlvError> {
    let first = *data.first().ok_or(TlvError::UnexpectedEnd { offset: 0 })?;
    if first < 0x80 {
        return Ok((first as usize, 1));
    }

    let count = first & 0x7F;
    if count == 0 || count > 3 {
        return Err(TlvError::InvalidLengthOfLength(count));
    }

    let count = count as usize;
    let bytes = data
        .get(1..1 + count)
        .ok_or(TlvError::UnexpectedEnd { offset: data.len() })?;
    let length = bytes.iter().fold(0usize, |acc, &b| (acc << 8) | b as usize);
    Ok((length, 1 + count))
}

/// Iterator over the TLV elements of one buffer level
///
/// Yields `Err` once for the first malformed element and then stops, so
/// elements decoded before the error stay usable by the caller.
#[derive(Debug, Clone)]
pub struct TlvReader<'a> {
    data: &'a [u8],
    pos: usize,
    done: bool,
}

impl<'a> TlvReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            done: false,
        }
    }

    /// Byte offset of the next element
    pub fn position(&self) -> usize {
        self.pos
    }

    fn read_element(&mut self) -> Result<Tlv<'a>, TlvError> {
        let rest = &self.data[self.pos..];
        let offset = self.pos;

        let (tag, tag_len) = parse_tag(rest).map_err(|e| shift(e, offset))?;
        let (length, len_len) =
            parse_length(&rest[tag_len..]).map_err(|e| shift(e, offset + tag_len))?;

        if length > MAX_VALUE_LEN {
            return Err(TlvError::ValueTooLong(length));
        }

        let start = tag_len + len_len;
        let remaining = rest.len() - start;
        if length > remaining {
            return Err(TlvError::LengthOutOfRange { length, remaining });
        }

        self.pos += start + length;
        Ok(Tlv {
            tag,
            value: &rest[start..start + length],
        })
    }
}

fn shift(err: TlvError, base: usize) -> TlvError {
    match err {
        TlvError::UnexpectedEnd { offset } => TlvError::UnexpectedEnd {
            offset: base + offset,
        },
        other => other,
    }
}

impl<'a> Iterator for TlvReader<'a> {
    type Item = Result<Tlv<'a>, TlvError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.pos >= self.data.len() {
            return None;
        }
        let item = self.read_element();
        if item.is_err() {
            self.done = true;
        }
        Some(item)
    }
}

impl std::iter::FusedIterator for TlvReader<'_> {}

/// Decode one level of TLV elements from `data`
pub fn decode(data: &[u8]) -> TlvReader<'_> {
    TlvReader::new(data)
}

/// TLV parser for EMV data
///
/// Searches for a specific tag at the top level of EMV-encoded data and
/// returns its value.
///
/// # Arguments
/// * `data` - The EMV-encoded data to search
/// * `tag` - The tag to search for
///
/// # Returns
/// * `Some(&[u8])` - The value bytes if tag is found
/// * `None` - If tag is not found before the end of data or the first
///   malformed element
pub fn find_tag(data: &[u8], tag: EmvTag) -> Option<&[u8]> {
    decode(data)
        .map_while(Result::ok)
        .find(|tlv| tlv.tag == tag)
        .map(|tlv| tlv.value)
}

/// Depth-first search for `tag`, descending into constructed elements
pub fn find_tag_recursive(data: &[u8], tag: EmvTag) -> Option<&[u8]> {
    for tlv in decode(data).map_while(Result::ok) {
        if tlv.tag == tag {
            return Some(tlv.value);
        }
        if tlv.tag.is_constructed() {
            if let Some(value) = find_tag_recursive(tlv.value, tag) {
                return Some(value);
            }
        }
    }
    None
}

/// Append the encoded tag bytes to `out`
pub fn encode_tag(tag: EmvTag, out: &mut Vec<u8>) {
    out.extend_from_slice(&tag.to_bytes());
}

/// Append a BER length field to `out`, choosing the shortest form
pub fn encode_length(length: usize, out: &mut Vec<u8>) {
    match length {
        0..=0x7F => out.push(length as u8),
        0x80..=0xFF => out.extend_from_slice(&[0x81, length as u8]),
        0x100..=0xFFFF => out.extend_from_slice(&[0x82, (length >> 8) as u8, length as u8]),
        _ => out.extend_from_slice(&[
            0x83,
            (length >> 16) as u8,
            (length >> 8) as u8,
            length as u8,
        ]),
    }
}

/// Encode a complete TLV element
pub fn encode_tlv(tag: EmvTag, value: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.len() + 5);
    encode_tag(tag, &mut out);
    encode_length(value.len(), &mut out);
    out.extend_from_slice(value);
    out
}
