//! A small cursor abstraction shared by the whole-buffer decoder, the
//! streaming decoder's refillable window, and the validator.
//!
//! Grounded on the teacher pack's `isopack::Cursor`/`StreamBuffer`
//! (bounds-checked view with an explicit "not enough bytes yet" signal),
//! generalized here into a trait so the same recursive decode/validate
//! logic in [`crate::engine`] can run over either a fixed in-memory slice
//! or a growable, refillable file-backed window.

use crate::error::{Error, Result};

/// A forward-only, bounds-checked source of bytes.
///
/// `ensure` is the overread check from spec §4.4: every read step must
/// confirm the next `n` bytes are available before consuming them. A
/// slice-backed reader fails outright; a stream-backed reader may refill
/// first and only fail if the refill still comes up short.
pub(crate) trait ByteReader {
    /// Make sure at least `n` bytes are available starting at the current
    /// position, refilling an underlying source if this reader is
    /// file-backed. Returns a decoding error if that's not possible.
    fn ensure(&mut self, n: usize) -> Result<()>;

    /// Absolute offset for error messages; not required to be meaningful
    /// across refills beyond that purpose.
    fn offset(&self) -> u64;

    fn peek_u8(&mut self) -> Result<u8> {
        self.ensure(1)?;
        Ok(self.peek_u8_unchecked())
    }

    /// Only valid to call after a successful `ensure(1)`.
    fn peek_u8_unchecked(&self) -> u8;

    fn read_u8(&mut self) -> Result<u8> {
        let b = self.peek_u8()?;
        self.advance(1);
        Ok(b)
    }

    /// Copy out the next `n` bytes and advance past them. Callers must
    /// have already called `ensure(n)`.
    fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>>;

    /// Advance the cursor by `n` bytes without copying; used by the
    /// validator, which never materializes payloads.
    fn advance(&mut self, n: usize);
}

/// Bounds-checked view over a fixed in-memory slice (whole-buffer decode,
/// and the validator's buffer mode).
pub(crate) struct SliceReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> SliceReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }
}

impl<'a> ByteReader for SliceReader<'a> {
    fn ensure(&mut self, n: usize) -> Result<()> {
        if self.pos + n > self.buf.len() {
            return Err(Error::decoding_at(
                "likely received an invalid or corrupted bytes object",
                self.pos as u64,
            ));
        }
        Ok(())
    }

    fn offset(&self) -> u64 {
        self.pos as u64
    }

    fn peek_u8_unchecked(&self) -> u8 {
        self.buf[self.pos]
    }

    fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        self.ensure(n)?;
        let out = self.buf[self.pos..self.pos + n].to_vec();
        self.pos += n;
        Ok(out)
    }

    fn advance(&mut self, n: usize) {
        self.pos += n;
    }
}

/// A refillable window over an open file, used by the streaming decoder
/// and the validator's file mode.
///
/// Grounded on `isopack::cursor::StreamBuffer`'s compact-then-extend
/// pattern: on a short read, the already-consumed prefix is dropped and
/// the window is topped up from the file rather than discarded and
/// replaced wholesale, so an item whose encoding straddles a chunk
/// boundary is never corrupted by a refill.
pub(crate) struct FileWindowReader {
    file: std::fs::File,
    window: Vec<u8>,
    pos: usize,
    chunk_size: usize,
    base_offset: u64,
}

impl FileWindowReader {
    pub fn open(path: &std::path::Path, start: u64, chunk_size: usize) -> Result<Self> {
        use std::io::{Read, Seek, SeekFrom};

        let mut file = std::fs::File::open(path)
            .map_err(|e| Error::usage_io("failed to open stream file", e))?;
        file.seek(SeekFrom::Start(start))
            .map_err(|e| Error::usage_io("failed to seek stream file", e))?;

        let mut window = vec![0u8; chunk_size];
        let read = file
            .read(&mut window)
            .map_err(|e| Error::usage_io("failed to read stream file", e))?;
        window.truncate(read);

        Ok(Self {
            file,
            window,
            pos: 0,
            chunk_size,
            base_offset: start,
        })
    }

    /// Absolute file offset corresponding to the current window position;
    /// the value a caller should persist to resume reading later.
    pub fn absolute_pos(&self) -> u64 {
        self.base_offset + self.pos as u64
    }
}

impl ByteReader for FileWindowReader {
    fn ensure(&mut self, n: usize) -> Result<()> {
        use std::io::Read;

        if self.pos + n <= self.window.len() {
            return Ok(());
        }

        if self.pos > 0 {
            self.window.drain(..self.pos);
            self.base_offset += self.pos as u64;
            self.pos = 0;
        }

        while self.window.len() < n {
            let want = self.chunk_size.max(n - self.window.len());
            let mut extra = vec![0u8; want];
            let read = self
                .file
                .read(&mut extra)
                .map_err(|e| Error::decoding_io("failed to refill stream window", e))?;
            if read == 0 {
                return Err(Error::decoding_at(
                    "likely received an invalid or corrupted bytes object",
                    self.absolute_pos(),
                ));
            }
            extra.truncate(read);
            self.window.extend_from_slice(&extra);
            tracing::trace!(chunk_size = self.chunk_size, bytes_read = read, "refilled stream window");
        }

        Ok(())
    }

    fn offset(&self) -> u64 {
        self.absolute_pos()
    }

    fn peek_u8_unchecked(&self) -> u8 {
        self.window[self.pos]
    }

    fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        self.ensure(n)?;
        let out = self.window[self.pos..self.pos + n].to_vec();
        self.pos += n;
        Ok(out)
    }

    fn advance(&mut self, n: usize) {
        self.pos += n;
    }
}
