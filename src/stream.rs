//! Read and write stream facades over the buffered adapter.
//!
//! [`GzReader`] and [`GzWriter`] compose a [`Streambuf`] behind the standard
//! [`io::Read`] / [`io::Write`] traits, so calling code that already works
//! with generic byte streams gets transparent gzip support. Each facade calls
//! the adapter's operations directly; the directional split keeps the
//! read-only and write-only APIs from leaking into each other.

use crate::error::Result;
use crate::handle::GzFile;
use crate::mode::Mode;
use crate::streambuf::Streambuf;
use std::io::{self, SeekFrom};
use std::path::Path;

/// A decompressing reader over a gzip file.
///
/// ```no_run
/// use gzstream::GzReader;
/// use std::io::Read;
///
/// let mut reader = GzReader::open("data.txt.gz".as_ref())?;
/// let mut text = String::new();
/// reader.read_to_string(&mut text)?;
/// # Ok::<(), std::io::Error>(())
/// ```
#[derive(Debug)]
pub struct GzReader {
    buf: Streambuf<GzFile>,
}

impl GzReader {
    /// Open `path` for decompressing reads.
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            buf: Streambuf::open_path(path, Mode::READ)?,
        })
    }

    /// True while the underlying adapter is open.
    pub fn is_open(&self) -> bool {
        self.buf.is_open()
    }

    /// Read one byte, or [`crate::GzStreamError::EndOfStream`] when the data
    /// runs out.
    pub fn read_byte(&mut self) -> Result<u8> {
        self.buf.read_byte()
    }

    /// Look at the next byte without consuming it.
    pub fn peek(&mut self) -> Result<u8> {
        self.buf.peek()
    }

    /// Step back one byte within the putback bound. Returns `false` once the
    /// bound is exhausted.
    pub fn unget(&mut self) -> bool {
        self.buf.unget()
    }

    /// Reposition the stream (uncompressed byte offsets).
    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        self.buf.seek(pos)
    }

    /// The underlying handle's position; see [`Streambuf::tell`] for the
    /// buffering caveat.
    pub fn position(&self) -> Result<u64> {
        self.buf.tell()
    }

    /// Close the stream. Idempotent.
    pub fn close(&mut self) -> Result<()> {
        self.buf.close()
    }
}

impl io::Read for GzReader {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        self.buf.read(out).map_err(io::Error::from)
    }
}

/// A compressing writer over a gzip file.
///
/// Data is buffered by the adapter and flushed to the codec as the buffer
/// fills; [`flush`](io::Write::flush) forces pending bytes out, and
/// [`close`](Self::close) (or drop) finishes the gzip stream.
#[derive(Debug)]
pub struct GzWriter {
    buf: Streambuf<GzFile>,
}

impl GzWriter {
    /// Create (or truncate) `path` for compressing writes.
    pub fn create(path: &Path) -> Result<Self> {
        Ok(Self {
            buf: Streambuf::open_path(path, Mode::WRITE)?,
        })
    }

    /// True while the underlying adapter is open.
    pub fn is_open(&self) -> bool {
        self.buf.is_open()
    }

    /// Buffer one byte for writing.
    pub fn write_byte(&mut self, byte: u8) -> Result<()> {
        self.buf.write_byte(byte)
    }

    /// Flush pending bytes to the codec without closing.
    pub fn sync(&mut self) -> Result<()> {
        self.buf.sync()
    }

    /// Reposition the stream; pending bytes are synced first. Only forward
    /// seeks are possible while writing.
    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        self.buf.seek(pos)
    }

    /// The underlying handle's position; see [`Streambuf::tell`] for the
    /// buffering caveat.
    pub fn position(&self) -> Result<u64> {
        self.buf.tell()
    }

    /// Flush pending data, finish the gzip stream, and close. Idempotent.
    pub fn close(&mut self) -> Result<()> {
        self.buf.close()
    }
}

impl io::Write for GzWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.write(data).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.buf.sync().map_err(io::Error::from)
    }
}
