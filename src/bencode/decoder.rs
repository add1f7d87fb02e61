use crate::error::{AnnounceError, Result};
use super::BencodeValue;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

/// Maximum container nesting accepted before the input is rejected
pub const MAX_DEPTH: usize = 512;

/// Decode the first bencoded value in `data`, returning it with the number of
/// bytes consumed. Anything after the value is left to the caller.
pub fn decode(data: &[u8]) -> Result<(BencodeValue, usize)> {
    let mut pos = 0;
    let value = decode_value(data, &mut pos, 0)?;
    Ok((value, pos))
}

fn malformed(msg: impl Into<String>) -> AnnounceError {
    AnnounceError::MalformedEncoding(msg.into())
}

fn decode_value(data: &[u8], pos: &mut usize, depth: usize) -> Result<BencodeValue> {
    let token = *data
        .get(*pos)
        .ok_or_else(|| malformed("Unexpected end of input"))?;

    match token {
        b'i' => decode_integer(data, pos),
        b'l' => decode_list(data, pos, depth + 1),
        b'd' => decode_dict(data, pos, depth + 1),
        b'0'..=b'9' => decode_bytes(data, pos).map(BencodeValue::Bytes),
        b'-' => Err(malformed(format!("Negative string length at offset {}", *pos))),
        c => Err(malformed(format!(
            "Invalid bencode token '{}' at offset {}",
            c.escape_ascii(),
            *pos
        ))),
    }
}

/// Scan from `*pos` up to `terminator`, returning the bytes in between and
/// leaving `*pos` just past the terminator
fn take_until<'a>(data: &'a [u8], pos: &mut usize, terminator: u8, what: &str) -> Result<&'a [u8]> {
    let rest = &data[*pos..];
    let len = rest
        .iter()
        .position(|&b| b == terminator)
        .ok_or_else(|| malformed(format!("Unterminated {}", what)))?;

    *pos += len + 1;
    Ok(&rest[..len])
}

fn decode_integer(data: &[u8], pos: &mut usize) -> Result<BencodeValue> {
    *pos += 1; // Skip 'i'

    let digits = take_until(data, pos, b'e', "integer")?;
    let unsigned = digits.strip_prefix(b"-").unwrap_or(digits);

    if unsigned.is_empty() || !unsigned.iter().all(u8::is_ascii_digit) {
        return Err(malformed(format!(
            "Invalid integer '{}'",
            digits.escape_ascii()
        )));
    }
    if unsigned.len() > 1 && unsigned[0] == b'0' {
        return Err(malformed("Integer has a leading zero"));
    }
    if unsigned == b"0" && unsigned.len() != digits.len() {
        return Err(malformed("Negative zero is not a valid integer"));
    }

    // Only ASCII digits and an optional sign remain, so this is valid UTF-8
    let num = std::str::from_utf8(digits)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| malformed("Integer out of range"))?;

    Ok(BencodeValue::Integer(num))
}

fn decode_bytes(data: &[u8], pos: &mut usize) -> Result<Vec<u8>> {
    let len_digits = take_until(data, pos, b':', "string length")?;

    if len_digits.is_empty() || !len_digits.iter().all(u8::is_ascii_digit) {
        return Err(malformed(format!(
            "Invalid string length '{}'",
            len_digits.escape_ascii()
        )));
    }

    let len = std::str::from_utf8(len_digits)
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .ok_or_else(|| malformed("String length out of range"))?;

    let end = pos
        .checked_add(len)
        .filter(|&end| end <= data.len())
        .ok_or_else(|| malformed("String length exceeds data"))?;

    let bytes = data[*pos..end].to_vec();
    *pos = end;

    Ok(bytes)
}

fn check_depth(depth: usize) -> Result<()> {
    if depth > MAX_DEPTH {
        return Err(malformed(format!(
            "Nesting deeper than {} levels",
            MAX_DEPTH
        )));
    }
    Ok(())
}

fn decode_list(data: &[u8], pos: &mut usize, depth: usize) -> Result<BencodeValue> {
    check_depth(depth)?;
    *pos += 1; // Skip 'l'

    let mut list = Vec::new();

    while *pos < data.len() && data[*pos] != b'e' {
        list.push(decode_value(data, pos, depth)?);
    }

    if *pos >= data.len() {
        return Err(malformed("Unterminated list"));
    }

    *pos += 1; // Skip 'e'

    Ok(BencodeValue::List(list))
}

fn decode_dict(data: &[u8], pos: &mut usize, depth: usize) -> Result<BencodeValue> {
    check_depth(depth)?;
    *pos += 1; // Skip 'd'

    let mut dict = BTreeMap::new();

    // Keys are accepted in any order; only duplicates are rejected
    while *pos < data.len() && data[*pos] != b'e' {
        if !data[*pos].is_ascii_digit() {
            return Err(malformed("Dictionary key must be a string"));
        }
        let key = decode_bytes(data, pos)?;
        let value = decode_value(data, pos, depth)?;

        match dict.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(value);
            }
            Entry::Occupied(slot) => {
                return Err(malformed(format!(
                    "Duplicate dictionary key '{}'",
                    slot.key().escape_ascii()
                )));
            }
        }
    }

    if *pos >= data.len() {
        return Err(malformed("Unterminated dictionary"));
    }

    *pos += 1; // Skip 'e'

    Ok(BencodeValue::Dict(dict))
}
