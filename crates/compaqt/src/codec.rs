//! The public whole-buffer encode/decode surface (spec §4.5).

use std::path::Path;

use crate::engine::{decode_item, encode_item};
use crate::error::{Error, Result};
use crate::extension::{CustomReadTypes, CustomWriteTypes};
use crate::metadata::write_stream_top_header;
use crate::reader::SliceReader;
use crate::source::Source;
use crate::value::{tag, Value};

#[derive(Default)]
pub struct EncodeOptions<'a> {
    /// Prefix the output with the 9-byte stream-top header so the buffer
    /// is valid input to a [`crate::stream_decoder::StreamDecoder`]. Only
    /// takes effect if `value` is a top-level `Sequence` or `Mapping`.
    pub stream_compatible: bool,
    pub custom_types: Option<&'a CustomWriteTypes>,
}

pub fn encode(value: &Value, opts: EncodeOptions) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode_root(&mut buf, value, &opts)?;
    Ok(buf)
}

pub fn encode_to_file(value: &Value, path: &Path, opts: EncodeOptions) -> Result<()> {
    let mut buf = Vec::new();
    encode_root(&mut buf, value, &opts)?;
    std::fs::write(path, buf).map_err(|e| Error::usage_io("failed to write encoded output", e))
}

fn encode_root(buf: &mut Vec<u8>, value: &Value, opts: &EncodeOptions) -> Result<()> {
    if opts.stream_compatible {
        match value {
            Value::Sequence(items) => {
                write_stream_top_header(buf, tag::SEQUENCE, items.len() as u64);
                for item in items {
                    encode_item(buf, item, opts.custom_types)?;
                }
                return Ok(());
            }
            Value::Mapping(pairs) => {
                write_stream_top_header(buf, tag::MAPPING, pairs.len() as u64);
                for (k, v) in pairs {
                    encode_item(buf, k, opts.custom_types)?;
                    encode_item(buf, v, opts.custom_types)?;
                }
                return Ok(());
            }
            _ => {}
        }
    }
    encode_item(buf, value, opts.custom_types)
}

pub fn decode(source: Source, custom_types: Option<&CustomReadTypes>) -> Result<Value> {
    match source {
        Source::Bytes(bytes) => {
            let mut reader = SliceReader::new(bytes);
            decode_item(&mut reader, custom_types)
        }
        Source::File(path) => {
            let bytes = std::fs::read(path).map_err(|e| Error::usage_io("failed to read input file", e))?;
            let mut reader = SliceReader::new(&bytes);
            decode_item(&mut reader, custom_types)
        }
    }
}
