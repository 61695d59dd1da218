//! Binary frame codec for split output files.
//!
//! Every frame is laid out as follows, all integers little-endian:
//!
//! ```text
//! offset  size  field
//!      0     4  tag, ASCII "IMG1"
//!      4     4  label            u32
//!      8     4  height           u32
//!     12     4  width            u32
//!     16     4  channels         u32
//!     20     8  payload length L u64
//!     28     4  masked CRC-32C of bytes 0..28
//!     32     L  raw image bytes
//!   32+L     4  masked CRC-32C of the payload
//! ```
//!
//! A file is a plain concatenation of frames, read back in written order.

use crate::checksum::masked_crc32c;
use crate::error::{RecordError, RecordResult};
use crate::record::{pixel_count, Record, MAX_IMAGE_LEN};
use byteorder::{ByteOrder, LittleEndian};
use std::io::{ErrorKind, Read, Write};

pub const FRAME_TAG: [u8; 4] = *b"IMG1";
pub const HEADER_LEN: usize = 32;
pub const TRAILER_LEN: usize = 4;

const CHECKED_HEADER_LEN: usize = 28;

/// Total encoded size of a frame carrying `payload_len` bytes.
#[must_use]
pub fn frame_len(payload_len: usize) -> usize {
    HEADER_LEN + payload_len + TRAILER_LEN
}

/// Encode a record into a complete frame.
///
/// Fails with `InvalidRecord`, without producing any bytes, if the payload
/// does not match the record's declared dimensions.
pub fn encode_frame(record: &Record) -> RecordResult<Vec<u8>> {
    let declared = record.validate()?;

    let mut header = [0u8; HEADER_LEN];
    header[..4].copy_from_slice(&FRAME_TAG);
    LittleEndian::write_u32(&mut header[4..8], record.label);
    LittleEndian::write_u32(&mut header[8..12], record.height);
    LittleEndian::write_u32(&mut header[12..16], record.width);
    LittleEndian::write_u32(&mut header[16..20], record.channels);
    LittleEndian::write_u64(&mut header[20..28], declared);
    let header_crc = masked_crc32c(&header[..CHECKED_HEADER_LEN]);
    LittleEndian::write_u32(&mut header[CHECKED_HEADER_LEN..], header_crc);

    let mut buf = Vec::with_capacity(frame_len(record.image.len()));
    buf.extend_from_slice(&header);
    buf.extend_from_slice(&record.image);
    buf.extend_from_slice(&masked_crc32c(&record.image).to_le_bytes());
    Ok(buf)
}

/// Appends frames to an underlying writer.
#[derive(Debug)]
pub struct FrameWriter<W: Write> {
    inner: W,
    frames: u64,
    bytes: u64,
}

impl<W: Write> FrameWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, frames: 0, bytes: 0 }
    }

    /// Write one record. A record that fails validation leaves the stream untouched.
    pub fn write_record(&mut self, record: &Record) -> RecordResult<()> {
        let frame = encode_frame(record).map_err(|e| e.at_position("frame stream", self.frames))?;
        self.write_encoded(&frame)
    }

    pub(crate) fn write_encoded(&mut self, frame: &[u8]) -> RecordResult<()> {
        self.inner.write_all(frame)?;
        self.frames += 1;
        self.bytes += frame.len() as u64;
        Ok(())
    }

    #[must_use]
    pub fn frames_written(&self) -> u64 {
        self.frames
    }

    #[must_use]
    pub fn bytes_written(&self) -> u64 {
        self.bytes
    }

    pub fn flush(&mut self) -> RecordResult<()> {
        self.inner.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

/// Reads frames back in written order, validating tags, lengths and checksums.
#[derive(Debug)]
pub struct FrameReader<R: Read> {
    inner: R,
    offset: u64,
    done: bool,
}

impl<R: Read> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, offset: 0, done: false }
    }

    /// Byte offset of the next frame.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Read the next frame; `Ok(None)` on a clean end of stream.
    pub fn read_frame(&mut self) -> RecordResult<Option<Record>> {
        let start = self.offset;
        let mut header = [0u8; HEADER_LEN];
        let got = read_full(&mut self.inner, &mut header)?;
        if got == 0 {
            return Ok(None);
        }
        if got < HEADER_LEN {
            return Err(corrupt(start, format!("truncated header ({got} of {HEADER_LEN} bytes)")));
        }

        if header[..4] != FRAME_TAG {
            return Err(corrupt(start, format!("unknown tag {:02x?}", &header[..4])));
        }
        let expected_header_crc = LittleEndian::read_u32(&header[CHECKED_HEADER_LEN..]);
        if masked_crc32c(&header[..CHECKED_HEADER_LEN]) != expected_header_crc {
            return Err(corrupt(start, "header checksum mismatch"));
        }

        let label = LittleEndian::read_u32(&header[4..8]);
        let height = LittleEndian::read_u32(&header[8..12]);
        let width = LittleEndian::read_u32(&header[12..16]);
        let channels = LittleEndian::read_u32(&header[16..20]);
        let len = LittleEndian::read_u64(&header[20..28]);

        let Some(declared) = pixel_count(height, width, channels) else {
            return Err(corrupt(start, format!("dimensions {height}x{width}x{channels} overflow")));
        };
        if len != declared {
            return Err(corrupt(
                start,
                format!("payload length {len} does not match {height}x{width}x{channels}"),
            ));
        }
        if len > MAX_IMAGE_LEN {
            return Err(corrupt(start, format!("payload length {len} exceeds limit")));
        }

        let mut body = vec![0u8; len as usize + TRAILER_LEN];
        let got = read_full(&mut self.inner, &mut body)?;
        if got < body.len() {
            return Err(corrupt(start, format!("truncated payload ({got} of {} bytes)", body.len())));
        }
        let trailer = body.split_off(len as usize);
        if masked_crc32c(&body) != LittleEndian::read_u32(&trailer) {
            return Err(corrupt(start, "payload checksum mismatch"));
        }

        self.offset = start + frame_len(body.len()) as u64;
        Ok(Some(Record { label, height, width, channels, image: body }))
    }
}

impl<R: Read> Iterator for FrameReader<R> {
    type Item = RecordResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_frame() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

fn corrupt(offset: u64, reason: impl Into<String>) -> RecordError {
    RecordError::CorruptFrame { offset, reason: reason.into() }
}

/// Fill `buf` until it is full or the reader hits EOF; returns bytes read.
pub(crate) fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
