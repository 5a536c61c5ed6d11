//! Text codecs, JSON field access and big-endian length-prefixed binary
//! fields for key and signature documents

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde_json::{Map, Value};

use crate::error::FormatError;

pub fn encode_base64(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

pub fn decode_base64(field: &'static str, text: &str) -> Result<Vec<u8>, FormatError> {
    BASE64
        .decode(text.trim())
        .map_err(|e| FormatError::invalid(field, format!("is not valid base64: {e}")))
}

/// Borrow `value` as a JSON object.
pub(crate) fn as_object<'a>(
    value: &'a Value,
    what: &'static str,
) -> Result<&'a Map<String, Value>, FormatError> {
    value
        .as_object()
        .ok_or_else(|| FormatError::Json(format!("{what} must be a JSON object")))
}

pub(crate) fn optional_str<'a>(
    obj: &'a Map<String, Value>,
    field: &'static str,
) -> Result<Option<&'a str>, FormatError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(FormatError::invalid(field, "must be a string")),
    }
}

pub(crate) fn required_str<'a>(
    obj: &'a Map<String, Value>,
    field: &'static str,
) -> Result<&'a str, FormatError> {
    optional_str(obj, field)?.ok_or(FormatError::MissingField(field))
}

/// Mandatory base64 member; an empty string is rejected.
pub(crate) fn required_base64(
    obj: &Map<String, Value>,
    field: &'static str,
) -> Result<Vec<u8>, FormatError> {
    let bytes = decode_base64(field, required_str(obj, field)?)?;
    if bytes.is_empty() {
        return Err(FormatError::invalid(field, "must not be empty"));
    }
    Ok(bytes)
}

// ============================================================================
// Binary fields
// ============================================================================

fn take<'a>(
    input: &mut &'a [u8],
    len: usize,
    what: &'static str,
) -> Result<&'a [u8], FormatError> {
    if input.len() < len {
        return Err(FormatError::Truncated {
            what,
            needed: len,
            available: input.len(),
        });
    }
    let (head, rest) = input.split_at(len);
    *input = rest;
    Ok(head)
}

pub(crate) fn take_u16(input: &mut &[u8], what: &'static str) -> Result<u16, FormatError> {
    let bytes = take(input, 2, what)?;
    Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
}

pub(crate) fn take_u32(input: &mut &[u8], what: &'static str) -> Result<u32, FormatError> {
    let bytes = take(input, 4, what)?;
    Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// `u16 length | bytes`
pub(crate) fn take_u16_prefixed(
    input: &mut &[u8],
    what: &'static str,
) -> Result<Vec<u8>, FormatError> {
    let len = take_u16(input, what)? as usize;
    Ok(take(input, len, what)?.to_vec())
}

/// `u32 length | bytes`
pub(crate) fn take_u32_prefixed(
    input: &mut &[u8],
    what: &'static str,
) -> Result<Vec<u8>, FormatError> {
    let len = take_u32(input, what)? as usize;
    Ok(take(input, len, what)?.to_vec())
}

pub(crate) fn put_u16_prefixed(
    out: &mut Vec<u8>,
    field: &'static str,
    bytes: &[u8],
) -> Result<(), FormatError> {
    let len = u16::try_from(bytes.len()).map_err(|_| FormatError::TooLong {
        field,
        len: bytes.len(),
        max: u16::MAX as usize,
    })?;
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(bytes);
    Ok(())
}

pub(crate) fn put_u32_prefixed(
    out: &mut Vec<u8>,
    field: &'static str,
    bytes: &[u8],
) -> Result<(), FormatError> {
    let len = u32::try_from(bytes.len()).map_err(|_| FormatError::TooLong {
        field,
        len: bytes.len(),
        max: u32::MAX as usize,
    })?;
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(bytes);
    Ok(())
}
