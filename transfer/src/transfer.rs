//! Blocking `read_full` / `write_full` over any [`Read`] / [`Write`].
//!
//! A single `read` or `write` on a byte stream may move fewer bytes than asked for, or be interrupted by a signal
//! before moving any.  These loops keep calling the primitive until the whole request is satisfied, the peer closes
//! its side (reads only), or a non-transient error occurs.

use {
    crate::{connection::Received, error::TransferError},
    std::io::{self, Read, Write},
    tracing::log,
};

/// Consecutive `Ok(0)` results from a writer with bytes still pending before `write_full` gives up with
/// [`io::ErrorKind::WriteZero`].
pub const MAX_ZERO_WRITES: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Every requested byte arrived.
    Complete,
    /// The peer half-closed before the request was satisfied.
    EndOfStream,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadReport {
    /// Bytes written into the front of the caller's buffer.
    pub len: usize,
    pub outcome: ReadOutcome,
}

impl ReadReport {
    pub fn is_complete(&self) -> bool {
        self.outcome == ReadOutcome::Complete
    }
}

/// Fills `buf` from `reader`.
///
/// `buf` is zeroed first, so on a short result everything past `len` is zero.  End-of-stream is reported through
/// [`ReadOutcome::EndOfStream`], not as an error.  On failure the returned error carries the number of bytes already
/// placed in `buf`.
pub fn read_full<R: Read + ?Sized>(
    reader: &mut R,
    buf: &mut [u8],
) -> Result<ReadReport, TransferError> {
    buf.fill(0);

    let mut offset = 0;
    while offset < buf.len() {
        match reader.read(&mut buf[offset..]) {
            Ok(0) => {
                log::debug!("end of stream after {offset} of {} bytes", buf.len());
                return Ok(ReadReport {
                    len: offset,
                    outcome: ReadOutcome::EndOfStream,
                });
            }
            Ok(count) => offset = advance(offset, count, buf.len())?,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(TransferError::new(offset, e)),
        }
    }

    Ok(ReadReport {
        len: offset,
        outcome: ReadOutcome::Complete,
    })
}

/// [`read_full`] into a fresh zeroed buffer of `size` bytes.  On failure the bytes that arrived travel in the error.
pub(crate) fn read_owned<R: Read + ?Sized>(
    reader: &mut R,
    size: usize,
) -> Result<Received, TransferError> {
    let mut buf = vec![0; size];
    match read_full(reader, &mut buf) {
        Ok(report) => Ok(Received::new(buf, report)),
        Err(e) => Err(e.with_partial(buf)),
    }
}

/// Hands all of `buf` to `writer`.
///
/// Success means every byte was accepted, possibly across many calls.  Any failure carries the exact number of
/// bytes accepted before it.
///
/// A writer that returns `Ok(0)` is called again, but after [`MAX_ZERO_WRITES`] such results in a row the loop
/// stops with [`io::ErrorKind::WriteZero`].  Use [`write_full_with_limit`] to pick another bound.
pub fn write_full<W: Write + ?Sized>(writer: &mut W, buf: &[u8]) -> Result<(), TransferError> {
    write_full_with_limit(writer, buf, MAX_ZERO_WRITES)
}

/// [`write_full`] with a caller-chosen number of consecutive zero-byte writes tolerated before giving up.  A limit
/// of 0 behaves like 1.
pub fn write_full_with_limit<W: Write + ?Sized>(
    writer: &mut W,
    buf: &[u8],
    max_zero_writes: usize,
) -> Result<(), TransferError> {
    let mut offset = 0;
    let mut zero_writes = 0;
    while offset < buf.len() {
        match writer.write(&buf[offset..]) {
            Ok(0) => {
                zero_writes += 1;
                if zero_writes >= max_zero_writes {
                    return Err(stalled(offset));
                }
            }
            Ok(count) => {
                zero_writes = 0;
                offset = advance(offset, count, buf.len())?;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(TransferError::new(offset, e)),
        }
    }

    Ok(())
}

pub(crate) fn stalled(offset: usize) -> TransferError {
    TransferError::new(
        offset,
        io::Error::new(io::ErrorKind::WriteZero, "writer repeatedly accepted zero bytes"),
    )
}

/// Adds a primitive's reported progress to `offset`, refusing counts larger than what was offered.
pub(crate) fn advance(offset: usize, count: usize, len: usize) -> Result<usize, TransferError> {
    match offset.checked_add(count) {
        Some(next) if next <= len => Ok(next),
        _ => Err(TransferError::new(
            offset,
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "primitive reported {count} bytes with only {} outstanding",
                    len - offset
                ),
            ),
        )),
    }
}
