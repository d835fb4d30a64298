//! Chunked incremental reader for a file-backed top-level container (spec
//! §4.7).

use std::path::{Path, PathBuf};

use crate::engine::decode_item;
use crate::error::{Error, Result};
use crate::extension::CustomReadTypes;
use crate::metadata::read_metadata;
use crate::reader::{ByteReader, FileWindowReader, SliceReader};
use crate::stream_encoder::ContainerType;
use crate::value::{tag, Value};

const MIN_CHUNK_SIZE: usize = 9;
pub(crate) const DEFAULT_CHUNK_SIZE: usize = 256 * 1024;

#[derive(Debug)]
pub struct StreamDecoder<'a> {
    path: PathBuf,
    chunk_size: usize,
    container: ContainerType,
    file_offset: u64,
    items_remaining: u64,
    custom_types: Option<&'a CustomReadTypes>,
}

impl<'a> StreamDecoder<'a> {
    pub fn new(
        path: impl AsRef<Path>,
        chunk_size: usize,
        file_offset: u64,
        custom_types: Option<&'a CustomReadTypes>,
    ) -> Result<Self> {
        if chunk_size < MIN_CHUNK_SIZE {
            return Err(Error::usage(format!(
                "chunk size argument must be more than 8, got {chunk_size}"
            )));
        }

        use std::io::{Read, Seek, SeekFrom};

        let path = path.as_ref().to_path_buf();
        let mut file = std::fs::File::open(&path).map_err(|e| Error::usage_io("failed to open stream file", e))?;
        file.seek(SeekFrom::Start(file_offset))
            .map_err(|e| Error::usage_io("failed to seek stream file", e))?;

        let mut header = [0u8; 9];
        file.read_exact(&mut header).map_err(|_| {
            Error::usage("encoded data must start with a sequence or mapping object for stream objects")
        })?;

        let mut reader = SliceReader::new(&header);
        let first = reader.peek_u8_unchecked();
        let container = match first & tag::MASK {
            tag::SEQUENCE => ContainerType::Sequence,
            tag::MAPPING => ContainerType::Mapping,
            _ => {
                return Err(Error::usage(
                    "encoded data must start with a sequence or mapping object for stream objects",
                ))
            }
        };

        let count = read_metadata(&mut reader)?;
        let header_width = reader.pos() as u64;

        tracing::debug!(path = %path.display(), file_offset, count, "stream decoder constructed");

        Ok(Self {
            path,
            chunk_size,
            container,
            file_offset: file_offset + header_width,
            items_remaining: count,
            custom_types,
        })
    }

    pub fn items_remaining(&self) -> u64 {
        self.items_remaining
    }

    /// Reads up to `num_items` top-level items (clamped to what remains;
    /// `None` reads everything left), using `chunk_size` if given to
    /// override the decoder's configured window size for this call.
    pub fn read(&mut self, num_items: Option<u64>, chunk_size: Option<usize>) -> Result<Value> {
        if let Some(size) = chunk_size {
            if size < MIN_CHUNK_SIZE {
                return Err(Error::usage(format!("chunk size argument must be more than 8, got {size}")));
            }
            self.chunk_size = size;
        }

        let to_read = match num_items {
            None => self.items_remaining,
            Some(n) if n > self.items_remaining => self.items_remaining,
            Some(0) => return Err(Error::usage("num items argument must be at least 1, got 0")),
            Some(n) => n,
        };

        let mut reader = FileWindowReader::open(&self.path, self.file_offset, self.chunk_size)?;
        let value = match self.container {
            ContainerType::Sequence => {
                let mut items = Vec::with_capacity(to_read as usize);
                for _ in 0..to_read {
                    items.push(decode_item(&mut reader, self.custom_types)?);
                }
                Value::Sequence(items)
            }
            ContainerType::Mapping => {
                let mut pairs = Vec::with_capacity(to_read as usize);
                for _ in 0..to_read {
                    let key = decode_item(&mut reader, self.custom_types)?;
                    let val = decode_item(&mut reader, self.custom_types)?;
                    pairs.push((key, val));
                }
                Value::Mapping(pairs)
            }
        };

        self.file_offset = reader.absolute_pos();
        self.items_remaining -= to_read;
        tracing::trace!(read = to_read, remaining = self.items_remaining, "read items from stream");

        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream_encoder::{StreamEncoder, StreamMode};

    #[test]
    fn incremental_read_twice_matches_two_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stream.bin");

        let mut encoder = StreamEncoder::new(&path, ContainerType::Sequence, StreamMode::Fresh, 0, None).unwrap();
        let batch = Value::Sequence(vec![Value::from(1i64), Value::from(2i64)]);
        encoder.write(&batch).unwrap();
        encoder.write(&batch).unwrap();
        encoder.finalize();

        let mut decoder = StreamDecoder::new(&path, 16, 0, None).unwrap();
        let first = decoder.read(Some(2), None).unwrap();
        let second = decoder.read(Some(2), None).unwrap();
        assert_eq!(first, batch);
        assert_eq!(second, batch);
        assert_eq!(decoder.items_remaining(), 0);
    }

    #[test]
    fn small_chunk_size_forces_refill_across_item_boundary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stream.bin");

        let mut encoder = StreamEncoder::new(&path, ContainerType::Sequence, StreamMode::Fresh, 0, None).unwrap();
        let value = Value::Sequence(vec![Value::from(1000000i64), Value::from(-1000000i64), Value::from(0i64)]);
        encoder.write(&value).unwrap();
        encoder.finalize();

        let mut decoder = StreamDecoder::new(&path, MIN_CHUNK_SIZE, 0, None).unwrap();
        let all = decoder.read(None, None).unwrap();
        assert_eq!(all, value);
    }

    #[test]
    fn non_stream_file_is_usage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.bin");
        std::fs::write(&path, [0x01, 0x02]).unwrap();
        let err = StreamDecoder::new(&path, 16, 0, None).unwrap_err();
        assert!(matches!(err, Error::Usage(_)));
    }
}
