//! Base64 VLQ decoding for the `mappings` field.

/// Errors produced while decoding a mappings string.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("invalid base64 character {0:?} in mappings")]
    InvalidCharacter(char),

    #[error("unterminated VLQ value in mappings")]
    Unterminated,

    #[error("VLQ value overflows")]
    Overflow,

    #[error("segment has {0} fields, expected 1, 4 or 5")]
    SegmentLength(usize),

    #[error("segment references out-of-range index {0}")]
    OutOfRange(i64),
}

const CONTINUATION_BIT: u8 = 0b10_0000;
const VALUE_MASK: u8 = 0b01_1111;

fn base64_value(byte: u8) -> Option<u8> {
    match byte {
        b'A'..=b'Z' => Some(byte - b'A'),
        b'a'..=b'z' => Some(byte - b'a' + 26),
        b'0'..=b'9' => Some(byte - b'0' + 52),
        b'+' => Some(62),
        b'/' => Some(63),
        _ => None,
    }
}

/// Decode every VLQ value of one comma-free segment.
pub fn decode_segment(segment: &str) -> Result<Vec<i64>, DecodeError> {
    let mut values = Vec::with_capacity(5);
    let mut accum: i64 = 0;
    let mut shift: u32 = 0;
    let mut pending = false;

    for byte in segment.bytes() {
        let digit = base64_value(byte).ok_or(DecodeError::InvalidCharacter(byte as char))?;
        if shift > 55 {
            return Err(DecodeError::Overflow);
        }
        accum += i64::from(digit & VALUE_MASK) << shift;
        pending = true;

        if digit & CONTINUATION_BIT != 0 {
            shift += 5;
            continue;
        }

        // lowest bit carries the sign
        let value = accum >> 1;
        values.push(if accum & 1 == 1 { -value } else { value });
        accum = 0;
        shift = 0;
        pending = false;
    }

    if pending {
        return Err(DecodeError::Unterminated);
    }
    Ok(values)
}
