//! Structural walk of an encoded buffer or file without materializing
//! values (spec §4.8).

use crate::engine::skip_item;
use crate::error::{Error, Result};
use crate::reader::{FileWindowReader, SliceReader};
use crate::source::Source;
use crate::stream_decoder::DEFAULT_CHUNK_SIZE;

pub struct ValidateOptions {
    pub file_offset: u64,
    pub chunk_size: usize,
    /// Turn a `false` verdict into a raised [`crate::error::Error::Validation`].
    pub strict: bool,
}

impl Default for ValidateOptions {
    fn default() -> Self {
        Self {
            file_offset: 0,
            chunk_size: DEFAULT_CHUNK_SIZE,
            strict: false,
        }
    }
}

/// Buffer mode returns true iff the walk succeeds and consumes the entire
/// buffer exactly; file mode only checks that the first root item parses
/// cleanly from the given offset (trailing bytes are a streaming file's
/// business, not the validator's).
pub fn validate(source: Source, opts: ValidateOptions) -> Result<bool> {
    let valid = match source {
        Source::Bytes(bytes) => {
            let mut reader = SliceReader::new(bytes);
            matches!(skip_item(&mut reader), Ok(()) if reader.pos() == reader.len())
        }
        Source::File(path) => {
            if opts.chunk_size < 9 {
                return Err(Error::usage(format!(
                    "chunk size argument must be more than 8, got {}",
                    opts.chunk_size
                )));
            }
            let mut reader = FileWindowReader::open(path, opts.file_offset, opts.chunk_size)?;
            skip_item(&mut reader).is_ok()
        }
    };

    if opts.strict && !valid {
        return Err(Error::validation("the bytes object does not appear valid"));
    }

    Ok(valid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{encode, EncodeOptions};
    use crate::value::Value;

    #[test]
    fn valid_buffer_round_trips_true() {
        let value = Value::Sequence(vec![Value::from(1i64), Value::from("hi")]);
        let bytes = encode(&value, EncodeOptions::default()).unwrap();
        assert!(validate(Source::Bytes(&bytes), ValidateOptions::default()).unwrap());
    }

    #[test]
    fn truncated_buffer_is_invalid() {
        let value = Value::Sequence(vec![Value::from(1i64), Value::from("hi")]);
        let mut bytes = encode(&value, EncodeOptions::default()).unwrap();
        bytes.truncate(bytes.len() - 1);
        assert!(!validate(Source::Bytes(&bytes), ValidateOptions::default()).unwrap());
    }

    #[test]
    fn trailing_garbage_fails_buffer_mode() {
        let value = Value::from(1i64);
        let mut bytes = encode(&value, EncodeOptions::default()).unwrap();
        bytes.push(0xFF);
        assert!(!validate(Source::Bytes(&bytes), ValidateOptions::default()).unwrap());
    }

    #[test]
    fn strict_mode_raises_on_invalid() {
        let bytes = [0xFF_u8];
        let err = validate(Source::Bytes(&bytes), ValidateOptions { strict: true, ..Default::default() }).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn single_byte_flip_falsifies_or_errors() {
        // [0x20 seq tag/len=2][0x14 int tag/len=1][0x64 int payload]
        // [0x53 string tag/len=5]['h','e','l','l','o']
        let value = Value::Sequence(vec![Value::from(100i64), Value::from("hello")]);
        let good = encode(&value, EncodeOptions::default()).unwrap();
        assert!(validate(Source::Bytes(&good), ValidateOptions::default()).unwrap());

        // Only the framing bytes (sequence/int/string tag+length) are covered
        // by this property: the validator checks structure, not content, so
        // flipping a content byte (the int payload, the string characters)
        // is not guaranteed to falsify anything and is exercised separately
        // in `round_trip`/`validator_agrees_with_every_encoded_value`.
        for &i in &[0usize, 1, 3] {
            let mut corrupt = good.clone();
            corrupt[i] ^= 0xFF;
            // Either the validator reports false, or decoding it outright fails -
            // both are acceptable outcomes of a corrupted header/tag byte.
            assert!(matches!(validate(Source::Bytes(&corrupt), ValidateOptions::default()), Ok(false) | Err(_)));
        }
    }
}
