//! Append-only file-backed stream encoder (spec §4.6).

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::engine::encode_item;
use crate::error::{Error, Result};
use crate::extension::CustomWriteTypes;
use crate::value::{tag, Value};

/// Which top-level container type a stream is declared to carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerType {
    Sequence,
    Mapping,
}

impl ContainerType {
    fn tag(self) -> u8 {
        match self {
            ContainerType::Sequence => tag::SEQUENCE,
            ContainerType::Mapping => tag::MAPPING,
        }
    }
}

/// Construction mode for a [`StreamEncoder`].
pub enum StreamMode {
    /// Truncate/create the file and write a fresh empty header.
    Fresh,
    /// Open for append; the new stream starts at the current end of file.
    Preserve,
    /// Resume an existing stream previously written by this encoder.
    Resume,
}

#[derive(Debug)]
pub struct StreamEncoder<'a> {
    path: PathBuf,
    start_offset: u64,
    container: ContainerType,
    num_items: u64,
    custom_types: Option<&'a CustomWriteTypes>,
    finalized: bool,
}

impl<'a> StreamEncoder<'a> {
    pub fn new(
        path: impl AsRef<Path>,
        container: ContainerType,
        mode: StreamMode,
        file_offset: u64,
        custom_types: Option<&'a CustomWriteTypes>,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let (start_offset, container, num_items) = match mode {
            StreamMode::Resume => {
                let mut file = File::open(&path).map_err(|e| Error::usage_io("failed to open stream file to resume", e))?;
                file.seek(SeekFrom::Start(file_offset))
                    .map_err(|e| Error::usage_io("failed to seek stream file", e))?;
                let mut header = [0u8; 9];
                file.read_exact(&mut header)
                    .map_err(|e| Error::usage_io("failed to read stream header", e))?;

                if header[0] & 0b1111_1000 != 0b1111_1000 {
                    return Err(Error::usage("the existing file data does not match the encoding stream expectations"));
                }
                let declared = match header[0] & tag::MASK {
                    tag::SEQUENCE => ContainerType::Sequence,
                    tag::MAPPING => ContainerType::Mapping,
                    _ => {
                        return Err(Error::usage(
                            "the existing file data does not match the encoding stream expectations",
                        ))
                    }
                };
                let count = u64::from_le_bytes(header[1..9].try_into().unwrap());
                (file_offset, declared, count)
            }
            StreamMode::Fresh => {
                let mut file = File::create(&path).map_err(|e| Error::usage_io("failed to create stream file", e))?;
                file.seek(SeekFrom::Start(file_offset))
                    .map_err(|e| Error::usage_io("failed to seek stream file", e))?;
                write_header(&mut file, container, 0)?;
                (file_offset, container, 0)
            }
            StreamMode::Preserve => {
                let mut file = OpenOptions::new()
                    .append(true)
                    .create(true)
                    .open(&path)
                    .map_err(|e| Error::usage_io("failed to open stream file for append", e))?;
                // `stream_position()` is unreliable here: append-mode only
                // guarantees writes land at EOF, not that the reported
                // cursor reflects it on open. Ask for the real length.
                let start = file.metadata().map_err(|e| Error::usage_io("failed to read file metadata", e))?.len();
                write_header(&mut file, container, 0)?;
                (start, container, 0)
            }
        };

        tracing::debug!(path = %path.display(), start_offset, num_items, "stream encoder constructed");

        Ok(Self {
            path,
            start_offset,
            container,
            num_items,
            custom_types,
            finalized: false,
        })
    }

    /// Appends one top-level item (for a sequence stream) or one top-level
    /// mapping's pairs (for a mapping stream).
    pub fn write(&mut self, value: &Value) -> Result<()> {
        if self.finalized {
            return Err(Error::usage("received an invalid StreamEncoder object"));
        }

        let added = match (self.container, value) {
            (ContainerType::Sequence, Value::Sequence(items)) => {
                let mut file = OpenOptions::new()
                    .append(true)
                    .open(&self.path)
                    .map_err(|e| Error::usage_io("failed to open stream file for append", e))?;
                let mut buf = Vec::new();
                for item in items {
                    encode_item(&mut buf, item, self.custom_types)?;
                }
                file.write_all(&buf).map_err(|e| Error::decoding_io("failed to append stream payload", e))?;
                items.len() as u64
            }
            (ContainerType::Mapping, Value::Mapping(pairs)) => {
                let mut file = OpenOptions::new()
                    .append(true)
                    .open(&self.path)
                    .map_err(|e| Error::usage_io("failed to open stream file for append", e))?;
                let mut buf = Vec::new();
                for (k, v) in pairs {
                    encode_item(&mut buf, k, self.custom_types)?;
                    encode_item(&mut buf, v, self.custom_types)?;
                }
                file.write_all(&buf).map_err(|e| Error::decoding_io("failed to append stream payload", e))?;
                pairs.len() as u64
            }
            _ => {
                return Err(Error::usage(format!(
                    "streaming mode requires values to continue as the same type: started with {:?}, got a different type",
                    self.container
                )))
            }
        };

        self.num_items += added;
        tracing::trace!(added, total = self.num_items, "appended items to stream");
        self.rewrite_count()
    }

    fn rewrite_count(&mut self) -> Result<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .open(&self.path)
            .map_err(|e| Error::usage_io("failed to reopen stream file to backpatch count", e))?;
        file.seek(SeekFrom::Start(self.start_offset + 1))
            .map_err(|e| Error::usage_io("failed to seek to stream count field", e))?;
        file.write_all(&self.num_items.to_le_bytes())
            .map_err(|e| Error::usage_io("failed to backpatch stream count", e))?;
        Ok(())
    }

    /// Releases the encoder; further writes fail.
    pub fn finalize(&mut self) {
        self.finalized = true;
    }
}

fn write_header(file: &mut File, container: ContainerType, count: u64) -> Result<()> {
    let mut buf = Vec::with_capacity(9);
    crate::metadata::write_stream_top_header(&mut buf, container.tag(), count);
    file.write_all(&buf).map_err(|e| Error::usage_io("failed to write stream header", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream_decoder::StreamDecoder;

    #[test]
    fn fresh_then_resume_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stream.bin");

        let mut encoder = StreamEncoder::new(&path, ContainerType::Sequence, StreamMode::Fresh, 0, None).unwrap();
        encoder.write(&Value::Sequence(vec![Value::from(1i64), Value::from(2i64)])).unwrap();
        encoder.finalize();

        let mut resumed = StreamEncoder::new(&path, ContainerType::Sequence, StreamMode::Resume, 0, None).unwrap();
        resumed.write(&Value::Sequence(vec![Value::from(3i64)])).unwrap();
        resumed.finalize();

        let mut decoder = StreamDecoder::new(&path, 256, 0, None).unwrap();
        let all = decoder.read(None, None).unwrap();
        assert_eq!(
            all,
            Value::Sequence(vec![Value::from(1i64), Value::from(2i64), Value::from(3i64)])
        );
    }

    #[test]
    fn preserve_appends_after_existing_file_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stream.bin");
        // Pre-existing content the new stream must start after, not overwrite.
        std::fs::write(&path, [0xAA; 37]).unwrap();

        let mut encoder = StreamEncoder::new(&path, ContainerType::Sequence, StreamMode::Preserve, 0, None).unwrap();
        encoder.write(&Value::Sequence(vec![Value::from(1i64), Value::from(2i64)])).unwrap();
        encoder.finalize();

        assert_eq!(&std::fs::read(&path).unwrap()[..37], &[0xAA; 37][..]);

        let mut decoder = StreamDecoder::new(&path, 256, 37, None).unwrap();
        let all = decoder.read(None, None).unwrap();
        assert_eq!(all, Value::Sequence(vec![Value::from(1i64), Value::from(2i64)]));
    }

    #[test]
    fn resume_rejects_non_stream_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not_a_stream.bin");
        std::fs::write(&path, [0x01, 0x02, 0x03]).unwrap();

        let err = StreamEncoder::new(&path, ContainerType::Sequence, StreamMode::Resume, 0, None).unwrap_err();
        assert!(matches!(err, Error::Usage(_)));
    }

    #[test]
    fn mismatched_value_type_is_usage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stream.bin");
        let mut encoder = StreamEncoder::new(&path, ContainerType::Sequence, StreamMode::Fresh, 0, None).unwrap();
        let err = encoder
            .write(&Value::Mapping(vec![(Value::from(1i64), Value::from(2i64))]))
            .unwrap_err();
        assert!(matches!(err, Error::Usage(_)));
    }
}
