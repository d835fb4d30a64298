//! Bytes, string, integer, float, bool, and null codecs (spec §4.2).

use num_bigint::{BigInt, Sign};

use crate::error::{Error, Result};
use crate::metadata::{read_metadata, write_metadata};
use crate::reader::ByteReader;
use crate::value::tag;

pub(crate) fn encode_bytes(buf: &mut Vec<u8>, value: &[u8]) {
    write_metadata(buf, tag::BYTES, value.len() as u64);
    buf.extend_from_slice(value);
}

pub(crate) fn decode_bytes(reader: &mut dyn ByteReader) -> Result<Vec<u8>> {
    let length = read_metadata(reader)? as usize;
    reader.ensure(length)?;
    reader.read_bytes(length)
}

pub(crate) fn encode_string(buf: &mut Vec<u8>, value: &str) {
    let encoded = value.as_bytes();
    write_metadata(buf, tag::STRING, encoded.len() as u64);
    buf.extend_from_slice(encoded);
}

pub(crate) fn decode_string(reader: &mut dyn ByteReader) -> Result<String> {
    let length = read_metadata(reader)? as usize;
    reader.ensure(length)?;
    let bytes = reader.read_bytes(length)?;
    String::from_utf8(bytes).map_err(|_| Error::decoding("string payload is not valid UTF-8"))
}

/// Number of little-endian two's-complement bytes needed for `v`.
///
/// Spec §4.2 gives `width = (bit_length(v) + 8) >> 3`. Taken literally at
/// `v == 0` (`bit_length(0) == 0` in the source language) this yields
/// `width == 1`, but spec §8 scenario 1 requires a zero-length payload for
/// `encode(0)`. See SPEC_FULL.md §12: `v == 0` is special-cased to width 0
/// (an empty payload already decodes to zero); every other value uses the
/// formula unchanged, over-allocation at exact power-of-256 boundaries
/// included.
pub(crate) fn integer_width(v: &BigInt) -> u8 {
    if v.sign() == Sign::NoSign {
        return 0;
    }
    let bits = v.bits();
    ((bits + 8) >> 3) as u8
}

/// Little-endian two's-complement bytes of `v`, sign-extended or
/// truncated to exactly `width` bytes.
fn to_signed_le(v: &BigInt, width: u8) -> Vec<u8> {
    if width == 0 {
        return Vec::new();
    }
    let width = width as usize;
    let minimal = v.to_signed_bytes_le();
    let mut out = vec![0u8; width];
    let copy_len = minimal.len().min(width);
    out[..copy_len].copy_from_slice(&minimal[..copy_len]);
    let sign_byte = if v.sign() == Sign::Minus { 0xFF } else { 0x00 };
    for b in out.iter_mut().skip(copy_len) {
        *b = sign_byte;
    }
    out
}

pub(crate) fn encode_integer(buf: &mut Vec<u8>, value: &BigInt) {
    let width = integer_width(value);
    write_metadata(buf, tag::INTEGER, width as u64);
    buf.extend_from_slice(&to_signed_le(value, width));
}

pub(crate) fn decode_integer(reader: &mut dyn ByteReader) -> Result<BigInt> {
    let length = read_metadata(reader)? as usize;
    if length == 0 {
        return Ok(BigInt::from(0));
    }
    reader.ensure(length)?;
    let bytes = reader.read_bytes(length)?;
    Ok(BigInt::from_signed_bytes_le(&bytes))
}

pub(crate) fn encode_float(buf: &mut Vec<u8>, value: f64) {
    buf.push(crate::value::group::FLOAT);
    buf.extend_from_slice(&value.to_le_bytes());
}

pub(crate) fn decode_float(reader: &mut dyn ByteReader) -> Result<f64> {
    reader.ensure(8)?;
    let bytes = reader.read_bytes(8)?;
    let mut arr = [0u8; 8];
    arr.copy_from_slice(&bytes);
    Ok(f64::from_le_bytes(arr))
}

pub(crate) fn encode_bool(buf: &mut Vec<u8>, value: bool) {
    buf.push(if value {
        crate::value::group::TRUE
    } else {
        crate::value::group::FALSE
    });
}

pub(crate) fn encode_null(buf: &mut Vec<u8>) {
    buf.push(crate::value::group::NULL);
}
