//! The recursive encode/decode dispatcher tying the scalar, container, and
//! extension codecs together (spec §4.4).

use crate::error::{Error, Result};
use crate::extension::{read_extension, skip_extension, CustomReadTypes, CustomWriteTypes};
use crate::metadata::{read_metadata, write_metadata};
use crate::reader::ByteReader;
use crate::scalar::{
    decode_bytes, decode_float, decode_integer, decode_string, encode_bool, encode_bytes,
    encode_float, encode_integer, encode_null, encode_string,
};
use crate::value::{group, tag, Value};

/// Encodes one item, recursing into sequence/mapping children. `writers`
/// is `None` when the caller has no extension values to encode; handing
/// one to the encoder is only required if the tree actually contains
/// `Value::Extension`.
pub(crate) fn encode_item(buf: &mut Vec<u8>, value: &Value, writers: Option<&CustomWriteTypes>) -> Result<()> {
    match value {
        Value::Null => encode_null(buf),
        Value::Bool(b) => encode_bool(buf, *b),
        Value::Int(i) => encode_integer(buf, i),
        Value::Float(f) => encode_float(buf, *f),
        Value::Bytes(b) => encode_bytes(buf, b),
        Value::String(s) => encode_string(buf, s),
        Value::Sequence(items) => {
            write_metadata(buf, tag::SEQUENCE, items.len() as u64);
            for item in items {
                encode_item(buf, item, writers)?;
            }
        }
        Value::Mapping(pairs) => {
            write_metadata(buf, tag::MAPPING, pairs.len() as u64);
            for (k, v) in pairs {
                encode_item(buf, k, writers)?;
                encode_item(buf, v, writers)?;
            }
        }
        Value::Extension(index, payload) => {
            let writers = writers.ok_or_else(|| {
                Error::encoding("value contains an extension type but no write table was supplied")
            })?;
            writers.encode(*index, payload.as_ref(), buf)?;
        }
    }
    Ok(())
}

/// Decodes one item, recursing into sequence/mapping children. `readers`
/// mirrors `writers` above: only required if an extension tag is actually
/// encountered.
pub(crate) fn decode_item(reader: &mut dyn ByteReader, readers: Option<&CustomReadTypes>) -> Result<Value> {
    let first = reader.peek_u8()?;
    match first & tag::MASK {
        tag::SEQUENCE => {
            let count = read_metadata(reader)? as usize;
            let mut items = Vec::with_capacity(count.min(1 << 16));
            for _ in 0..count {
                items.push(decode_item(reader, readers)?);
            }
            Ok(Value::Sequence(items))
        }
        tag::MAPPING => {
            let count = read_metadata(reader)? as usize;
            let mut pairs = Vec::with_capacity(count.min(1 << 16));
            for _ in 0..count {
                let key = decode_item(reader, readers)?;
                let value = decode_item(reader, readers)?;
                pairs.push((key, value));
            }
            Ok(Value::Mapping(pairs))
        }
        tag::BYTES => Ok(Value::Bytes(decode_bytes(reader)?)),
        tag::STRING => Ok(Value::String(decode_string(reader)?)),
        tag::INTEGER => Ok(Value::Int(decode_integer(reader)?)),
        tag::GROUP => decode_group(reader, first),
        tag::EXTENSION => {
            let readers = readers.ok_or_else(|| {
                Error::decoding("encountered an extension item but no read table was supplied")
            })?;
            let (index, payload) = read_extension(reader)?;
            let value = readers.decode(index, &payload)?;
            Ok(Value::Extension(index, value))
        }
        _ => Err(Error::decoding_at("encountered a reserved/unknown type tag", reader.offset())),
    }
}

fn decode_group(reader: &mut dyn ByteReader, first: u8) -> Result<Value> {
    match first {
        group::FALSE => {
            reader.advance(1);
            Ok(Value::Bool(false))
        }
        group::TRUE => {
            reader.advance(1);
            Ok(Value::Bool(true))
        }
        group::NULL => {
            reader.advance(1);
            Ok(Value::Null)
        }
        group::FLOAT => {
            reader.advance(1);
            Ok(Value::Float(decode_float(reader)?))
        }
        _ => Err(Error::decoding_at(format!("unknown group sub-tag: {first:#04x}"), reader.offset())),
    }
}

/// Structural walk of one item, used by the validator: recurses the same
/// shape as [`decode_item`] but never materializes scalars, and treats a
/// missing extension read-table entry as a structural pass (the validator
/// only checks framing, not that registered deserializers exist).
pub(crate) fn skip_item(reader: &mut dyn ByteReader) -> Result<()> {
    let first = reader.peek_u8()?;
    match first & tag::MASK {
        tag::SEQUENCE => {
            let count = read_metadata(reader)? as usize;
            for _ in 0..count {
                skip_item(reader)?;
            }
            Ok(())
        }
        tag::MAPPING => {
            let count = read_metadata(reader)? as usize;
            for _ in 0..count {
                skip_item(reader)?;
                skip_item(reader)?;
            }
            Ok(())
        }
        tag::BYTES | tag::STRING => {
            let length = read_metadata(reader)? as usize;
            reader.ensure(length)?;
            reader.advance(length);
            Ok(())
        }
        tag::INTEGER => {
            let length = read_metadata(reader)? as usize;
            reader.ensure(length)?;
            reader.advance(length);
            Ok(())
        }
        tag::GROUP => match first {
            group::FALSE | group::TRUE | group::NULL => {
                reader.advance(1);
                Ok(())
            }
            group::FLOAT => {
                reader.advance(1);
                reader.ensure(8)?;
                reader.advance(8);
                Ok(())
            }
            _ => Err(Error::decoding(format!("unknown group sub-tag: {first:#04x}"))),
        },
        tag::EXTENSION => skip_extension(reader),
        _ => Err(Error::decoding("encountered a reserved/unknown type tag")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::SliceReader;

    fn roundtrip(value: Value) -> Value {
        let mut buf = Vec::new();
        encode_item(&mut buf, &value, None).unwrap();
        let mut reader = SliceReader::new(&buf);
        decode_item(&mut reader, None).unwrap()
    }

    #[test]
    fn scalars_roundtrip() {
        assert_eq!(roundtrip(Value::Null), Value::Null);
        assert_eq!(roundtrip(Value::Bool(true)), Value::Bool(true));
        assert_eq!(roundtrip(Value::from(42i64)), Value::from(42i64));
        assert_eq!(roundtrip(Value::Float(1.5)), Value::Float(1.5));
        assert_eq!(roundtrip(Value::from("hello")), Value::from("hello"));
    }

    #[test]
    fn nested_sequence_and_mapping_roundtrip() {
        let value = Value::Sequence(vec![
            Value::from(1i64),
            Value::Mapping(vec![(Value::from("k"), Value::from(2i64))]),
            Value::Sequence(vec![]),
        ]);
        assert_eq!(roundtrip(value.clone()), value);
    }

    #[test]
    fn deep_nesting_roundtrips() {
        let mut value = Value::Sequence(vec![Value::from(0i64)]);
        for i in 1..12 {
            value = Value::Sequence(vec![Value::from(i as i64), value]);
        }
        assert_eq!(roundtrip(value.clone()), value);
    }

    #[test]
    fn duplicate_keys_preserved_in_order() {
        let value = Value::Mapping(vec![
            (Value::from("a"), Value::from(1i64)),
            (Value::from("a"), Value::from(2i64)),
        ]);
        let back = roundtrip(value.clone());
        assert_eq!(back, value);
    }

    #[test]
    fn sequence_cardinality_boundaries_roundtrip() {
        for len in [0usize, 1, 15, 16, 2047, 2048] {
            let value = Value::Sequence((0..len).map(|i| Value::from(i as i64)).collect());
            assert_eq!(roundtrip(value.clone()), value);
        }
    }

    #[test]
    fn mapping_cardinality_boundaries_roundtrip() {
        for len in [0usize, 1, 15, 16, 2047, 2048] {
            let value = Value::Mapping((0..len).map(|i| (Value::from(i as i64), Value::from(i as i64))).collect());
            assert_eq!(roundtrip(value.clone()), value);
        }
    }

    #[test]
    fn skip_matches_decode_consumption() {
        let value = Value::Sequence(vec![Value::from("x"), Value::Mapping(vec![(Value::from(1i64), Value::Bool(false))])]);
        let mut buf = Vec::new();
        encode_item(&mut buf, &value, None).unwrap();

        let mut decode_reader = SliceReader::new(&buf);
        decode_item(&mut decode_reader, None).unwrap();

        let mut skip_reader = SliceReader::new(&buf);
        skip_item(&mut skip_reader).unwrap();

        assert_eq!(decode_reader.pos(), skip_reader.pos());
    }

    #[test]
    fn extension_without_table_is_encoding_error() {
        #[derive(Debug, Clone, PartialEq)]
        struct Dummy;
        crate::impl_custom_value!(Dummy);
        let value = Value::Extension(0, Box::new(Dummy));
        let mut buf = Vec::new();
        let err = encode_item(&mut buf, &value, None).unwrap_err();
        assert!(matches!(err, Error::Encoding(_)));
    }
}
