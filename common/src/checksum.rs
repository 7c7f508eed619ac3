//! Single-byte integrity checksum the heater unit validates before it acts on
//! a directive.
//!
//! The accumulator starts at [`CHECKSUM_SEED`] and every field contributes, in
//! directive order:
//! - integers and booleans: the four bytes of their 32-bit big-endian encoding,
//! - text: the code point of each character.
//!
//! `SetTemp` is always summed as its decimal text even though it travels as a
//! number on the wire. The unit firmware computes it that way and rejects any
//! directive that does not match.

/// Seed the unit firmware starts its accumulator from.
pub const CHECKSUM_SEED: u32 = 181;

/// Field summed as text regardless of its wire type.
pub const TEXT_COERCED_FIELD: &str = "SetTemp";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Integer(i64),
    Boolean(bool),
    Text(String),
}

impl FieldValue {
    fn as_text(&self) -> FieldValue {
        match self {
            Self::Integer(value) => Self::Text(value.to_string()),
            Self::Boolean(true) => Self::Text("True".to_string()),
            Self::Boolean(false) => Self::Text("False".to_string()),
            Self::Text(text) => Self::Text(text.clone()),
        }
    }

    fn sum_into(&self, acc: u32) -> u32 {
        match self {
            // Values outside 32 bits keep their low two's-complement word.
            Self::Integer(value) => sum_word(acc, *value as u32),
            Self::Boolean(value) => sum_word(acc, u32::from(*value)),
            Self::Text(text) => text
                .chars()
                .fold(acc, |acc, ch| acc.wrapping_add(ch as u32)),
        }
    }
}

fn sum_word(acc: u32, word: u32) -> u32 {
    word.to_be_bytes()
        .iter()
        .fold(acc, |acc, byte| acc.wrapping_add(u32::from(*byte)))
}

pub fn compute_checksum<'a, I>(fields: I) -> u8
where
    I: IntoIterator<Item = (&'a str, &'a FieldValue)>,
{
    let acc = fields.into_iter().fold(CHECKSUM_SEED, |acc, (name, value)| {
        if name == TEXT_COERCED_FIELD {
            value.as_text().sum_into(acc)
        } else {
            value.sum_into(acc)
        }
    });
    (acc % 256) as u8
}

/// Two uppercase hex digits, the form carried in `checkSum`.
pub fn format_checksum(checksum: u8) -> String {
    format!("{checksum:02X}")
}

/// Parses a received `checkSum` string. Accepts either hex case.
pub fn parse_checksum(text: &str) -> Option<u8> {
    let text = text.trim();
    if text.is_empty() || text.len() > 2 {
        return None;
    }
    u8::from_str_radix(text, 16).ok()
}
