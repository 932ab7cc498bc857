//! The buffered compressed-stream adapter.
//!
//! [`Streambuf`] owns a compressed file handle and a fixed-size byte buffer
//! used for both read-ahead and write-behind. Reads drain the buffer and
//! refill it from the handle when it runs dry; writes accumulate in the
//! buffer and flush to the handle when it fills. A small prefix of the buffer
//! is reserved as a putback area so that callers doing single-byte lookahead
//! can step the read cursor back a bounded number of bytes.
//!
//! The adapter is single-threaded and blocking: every operation is a direct
//! call into the handle and returns before the caller proceeds. One adapter
//! exclusively owns one handle; concurrent users each need their own
//! instance.
//!
//! # Buffer layout
//!
//! ```text
//! read mode:   [ putback (P) | fresh data from handle ............... ]
//!                ^get_begin    ^get_pos              ^get_end
//! write mode:  [ pending bytes ......................... | reserved ]
//!                ^put_base        ^put_pos                  (1 byte)
//! ```
//!
//! The last byte of the buffer is reserved as the overflow landing slot: when
//! a write finds the buffer full, the incoming byte lands there before the
//! whole buffer is flushed, so no data is lost.

use crate::error::{GzStreamError, Result};
use crate::handle::{CompressedHandle, GzFile};
use crate::mode::{Direction, Mode};
use log::{debug, trace};
use std::fmt;
use std::io::SeekFrom;
use std::path::Path;

/// Total buffer capacity in bytes.
pub const BUFFER_SIZE: usize = 512;

/// Size of the putback area reserved at the front of the buffer.
///
/// After any read, at most this many previously-consumed bytes remain
/// retrievable through [`Streambuf::unget`].
pub const PUTBACK_SIZE: usize = 4;

struct OpenState<H> {
    handle: H,
    direction: Direction,
}

/// Fixed-size putback-aware read/write buffer over a compressed file handle.
///
/// Constructed closed; [`open`](Self::open) attaches a handle, and
/// [`close`](Self::close) flushes pending writes and releases it. Read and
/// write are mutually exclusive per instance. Dropping an open adapter closes
/// it best-effort.
pub struct Streambuf<H: CompressedHandle = GzFile> {
    state: Option<OpenState<H>>,
    buffer: [u8; BUFFER_SIZE],
    /// Start of the putback bytes currently preserved.
    get_begin: usize,
    /// Next byte the caller will read.
    get_pos: usize,
    /// End of valid read data.
    get_end: usize,
    /// Start of pending write data (fixed at 0).
    put_base: usize,
    /// One past the last pending write byte.
    put_pos: usize,
}

impl<H: CompressedHandle> Streambuf<H> {
    /// Create a closed adapter.
    pub fn new() -> Self {
        Self {
            state: None,
            buffer: [0; BUFFER_SIZE],
            get_begin: PUTBACK_SIZE,
            get_pos: PUTBACK_SIZE,
            get_end: PUTBACK_SIZE,
            put_base: 0,
            put_pos: 0,
        }
    }

    /// Create an adapter and open it immediately.
    pub fn open_path(path: &Path, mode: Mode) -> Result<Self> {
        let mut buf = Self::new();
        buf.open(path, mode)?;
        Ok(buf)
    }

    #[cfg(test)]
    fn with_handle(handle: H, direction: Direction) -> Self {
        let mut buf = Self::new();
        buf.state = Some(OpenState { handle, direction });
        buf
    }

    /// True while a handle is attached.
    pub fn is_open(&self) -> bool {
        self.state.is_some()
    }

    /// Direction of the attached handle, if open.
    pub fn direction(&self) -> Option<Direction> {
        self.state.as_ref().map(|st| st.direction)
    }

    /// Open the compressed file at `path`.
    ///
    /// Fails with [`GzStreamError::AlreadyOpen`] if a handle is already
    /// attached, and with [`GzStreamError::InvalidMode`] for any mode other
    /// than pure read or pure write; mode validation happens before the
    /// underlying handle is touched. On handle-open failure the adapter stays
    /// closed.
    pub fn open(&mut self, path: &Path, mode: Mode) -> Result<()> {
        if self.is_open() {
            return Err(GzStreamError::AlreadyOpen);
        }
        let direction = mode.direction()?;
        let handle = H::open(path, direction)?;
        self.reset_cursors();
        self.state = Some(OpenState { handle, direction });
        debug!("stream opened for {} ({})", direction, direction.as_handle_mode());
        Ok(())
    }

    /// Flush pending writes, release the handle, and mark the adapter closed.
    ///
    /// A no-op on an already-closed adapter. The adapter is never left
    /// half-open: it is marked closed even when the flush or the handle's
    /// own close reports a failure, and that failure is returned.
    pub fn close(&mut self) -> Result<()> {
        if !self.is_open() {
            return Ok(());
        }
        let sync_result = self.sync();
        let close_result = match self.state.take() {
            Some(mut st) => st.handle.close(),
            None => Ok(()),
        };
        self.reset_cursors();
        debug!("stream closed");
        sync_result.and(close_result)
    }

    fn reset_cursors(&mut self) {
        self.get_begin = PUTBACK_SIZE;
        self.get_pos = PUTBACK_SIZE;
        self.get_end = PUTBACK_SIZE;
        self.put_base = 0;
        self.put_pos = 0;
    }

    fn require_read(&self) -> Result<()> {
        match &self.state {
            None => Err(GzStreamError::NotOpen),
            Some(st) if st.direction != Direction::Read => {
                Err(GzStreamError::WrongDirection { required: "read" })
            }
            Some(_) => Ok(()),
        }
    }

    fn require_write(&self) -> Result<()> {
        match &self.state {
            None => Err(GzStreamError::NotOpen),
            Some(st) if st.direction != Direction::Write => {
                Err(GzStreamError::WrongDirection { required: "write" })
            }
            Some(_) => Ok(()),
        }
    }

    /// Return the next byte without consuming it, refilling the buffer from
    /// the handle if it has run dry.
    ///
    /// The refill preserves up to [`PUTBACK_SIZE`] already-consumed bytes at
    /// the front of the buffer so [`unget`](Self::unget) keeps working across
    /// the boundary, then lands fresh data after them. End-of-file and read
    /// errors from the handle are reported uniformly as
    /// [`GzStreamError::EndOfStream`].
    pub fn peek(&mut self) -> Result<u8> {
        if self.get_pos < self.get_end {
            return Ok(self.buffer[self.get_pos]);
        }
        self.require_read()?;

        let n_putback = (self.get_pos - self.get_begin).min(PUTBACK_SIZE);
        self.buffer.copy_within(
            self.get_pos - n_putback..self.get_pos,
            PUTBACK_SIZE - n_putback,
        );

        let st = match self.state.as_mut() {
            Some(st) => st,
            None => return Err(GzStreamError::NotOpen),
        };
        let num = match st.handle.read(&mut self.buffer[PUTBACK_SIZE..]) {
            Ok(0) => return Err(GzStreamError::EndOfStream),
            Ok(n) => n,
            Err(e) => {
                trace!("refill failed, reporting end of stream: {e}");
                return Err(GzStreamError::EndOfStream);
            }
        };
        trace!("refilled {num} bytes, kept {n_putback} for putback");

        self.get_begin = PUTBACK_SIZE - n_putback;
        self.get_pos = PUTBACK_SIZE;
        self.get_end = PUTBACK_SIZE + num;
        Ok(self.buffer[self.get_pos])
    }

    /// Read and consume one byte.
    pub fn read_byte(&mut self) -> Result<u8> {
        let byte = self.peek()?;
        self.get_pos += 1;
        Ok(byte)
    }

    /// Read into `out`, refilling as needed. Returns the number of bytes
    /// read; `Ok(0)` means end of stream.
    pub fn read(&mut self, out: &mut [u8]) -> Result<usize> {
        self.require_read()?;
        let mut filled = 0;
        while filled < out.len() {
            if self.get_pos >= self.get_end {
                match self.peek() {
                    Ok(_) => {}
                    Err(e) if e.is_end_of_stream() => break,
                    Err(e) => return Err(e),
                }
            }
            let avail = self.get_end - self.get_pos;
            let n = avail.min(out.len() - filled);
            out[filled..filled + n].copy_from_slice(&self.buffer[self.get_pos..self.get_pos + n]);
            self.get_pos += n;
            filled += n;
        }
        Ok(filled)
    }

    /// Step the read cursor back one byte.
    ///
    /// Returns `false` when the putback area is exhausted; at most
    /// [`PUTBACK_SIZE`] bytes back are guaranteed after a refill.
    pub fn unget(&mut self) -> bool {
        if self.get_pos > self.get_begin {
            self.get_pos -= 1;
            true
        } else {
            false
        }
    }

    /// Push all pending write bytes to the handle.
    ///
    /// A handle-reported count short of the pending length is a
    /// [`GzStreamError::ShortWrite`]; the buffer is only reset on a fully
    /// successful flush, so a failed flush may lose the unconfirmed portion.
    /// Returns the number of bytes flushed.
    pub fn flush_buffer(&mut self) -> Result<usize> {
        self.require_write()?;
        let pending = self.put_pos - self.put_base;
        let st = match self.state.as_mut() {
            Some(st) => st,
            None => return Err(GzStreamError::NotOpen),
        };
        let written = st.handle.write(&self.buffer[self.put_base..self.put_pos])?;
        if written != pending {
            return Err(GzStreamError::short_write(pending, written));
        }
        self.put_pos = self.put_base;
        trace!("flushed {pending} bytes");
        Ok(pending)
    }

    /// Handle a write into a full buffer.
    ///
    /// If `byte` is present it lands in the reserved overflow slot before the
    /// whole buffer is flushed, so no data is lost. With `None` this just
    /// flushes.
    ///
    /// A failed flush leaves the overflow slot occupied; the next call drains
    /// the buffer before accepting another byte, so repeated failures keep
    /// returning errors instead of running past the buffer end.
    pub fn overflow(&mut self, byte: Option<u8>) -> Result<()> {
        self.require_write()?;
        if self.put_pos >= BUFFER_SIZE {
            self.flush_buffer()?;
        }
        if let Some(b) = byte {
            self.buffer[self.put_pos] = b;
            self.put_pos += 1;
        }
        self.flush_buffer()?;
        Ok(())
    }

    /// Buffer one byte for writing, flushing through the overflow slot when
    /// the buffer is full.
    pub fn write_byte(&mut self, byte: u8) -> Result<()> {
        self.require_write()?;
        if self.put_pos < BUFFER_SIZE - 1 {
            self.buffer[self.put_pos] = byte;
            self.put_pos += 1;
            Ok(())
        } else {
            self.overflow(Some(byte))
        }
    }

    /// Buffer `data` for writing, flushing as many times as the buffer fills.
    /// Returns `data.len()`.
    pub fn write(&mut self, data: &[u8]) -> Result<usize> {
        self.require_write()?;
        let mut rest = data;
        while !rest.is_empty() {
            // saturating: a failed overflow flush can leave put_pos at the
            // very end of the buffer, past the reserved slot
            let room = (BUFFER_SIZE - 1).saturating_sub(self.put_pos);
            if room == 0 {
                self.flush_buffer()?;
                continue;
            }
            let n = room.min(rest.len());
            self.buffer[self.put_pos..self.put_pos + n].copy_from_slice(&rest[..n]);
            self.put_pos += n;
            rest = &rest[n..];
        }
        Ok(data.len())
    }

    /// Explicitly flush pending write data.
    ///
    /// Takes the direct flush path rather than routing through
    /// [`overflow`](Self::overflow); the two must stay distinct because
    /// overflow semantics interact badly with generic end-of-line flushing
    /// idioms. A no-op when nothing is pending (including in read mode).
    pub fn sync(&mut self) -> Result<()> {
        if self.put_pos > self.put_base {
            self.flush_buffer()?;
        }
        Ok(())
    }

    /// Reposition the underlying handle.
    ///
    /// Pending write data is synced first so it cannot be silently dropped;
    /// buffered-but-unread data is discarded, since the handle reposition
    /// invalidates it.
    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        if !self.is_open() {
            return Err(GzStreamError::NotOpen);
        }
        self.sync()?;
        self.get_begin = PUTBACK_SIZE;
        self.get_pos = PUTBACK_SIZE;
        self.get_end = PUTBACK_SIZE;
        match self.state.as_mut() {
            Some(st) => st.handle.seek(pos),
            None => Err(GzStreamError::NotOpen),
        }
    }

    /// The handle's current uncompressed byte offset.
    ///
    /// Known limitation: this is the RAW handle position. It does not account
    /// for buffered-but-unread bytes in read mode or unflushed bytes in write
    /// mode, so it can run ahead of (or behind) the logical stream position
    /// as the caller perceives it. Call [`sync`](Self::sync) first for an
    /// exact position in write mode.
    pub fn tell(&self) -> Result<u64> {
        match &self.state {
            Some(st) => Ok(st.handle.tell()),
            None => Err(GzStreamError::NotOpen),
        }
    }
}

impl<H: CompressedHandle> Default for Streambuf<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: CompressedHandle> fmt::Debug for Streambuf<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Streambuf")
            .field("direction", &self.direction())
            .field("get_begin", &self.get_begin)
            .field("get_pos", &self.get_pos)
            .field("get_end", &self.get_end)
            .field("put_pos", &self.put_pos)
            .finish()
    }
}

impl<H: CompressedHandle> Drop for Streambuf<H> {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory handle that records everything written and serves a fixed
    /// byte sequence for reads.
    struct MockHandle {
        input: Vec<u8>,
        read_pos: usize,
        sink: Rc<RefCell<Vec<u8>>>,
        /// When set, the next write reports this many bytes accepted.
        short_write: Option<usize>,
        closed: bool,
    }

    static OPEN_CALLS: AtomicUsize = AtomicUsize::new(0);

    impl MockHandle {
        fn reading(input: Vec<u8>) -> Self {
            Self {
                input,
                read_pos: 0,
                sink: Rc::new(RefCell::new(Vec::new())),
                short_write: None,
                closed: false,
            }
        }

        fn writing(sink: Rc<RefCell<Vec<u8>>>) -> Self {
            Self {
                input: Vec::new(),
                read_pos: 0,
                sink,
                short_write: None,
                closed: false,
            }
        }
    }

    impl CompressedHandle for MockHandle {
        fn open(_path: &Path, _direction: Direction) -> Result<Self> {
            OPEN_CALLS.fetch_add(1, Ordering::SeqCst);
            Ok(Self::reading(Vec::new()))
        }

        fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
            let n = buf.len().min(self.input.len() - self.read_pos);
            buf[..n].copy_from_slice(&self.input[self.read_pos..self.read_pos + n]);
            self.read_pos += n;
            Ok(n)
        }

        fn write(&mut self, buf: &[u8]) -> Result<usize> {
            if let Some(n) = self.short_write.take() {
                self.sink.borrow_mut().extend_from_slice(&buf[..n]);
                return Ok(n);
            }
            self.sink.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
            match pos {
                SeekFrom::Start(n) => {
                    self.read_pos = n as usize;
                    Ok(n)
                }
                _ => Err(GzStreamError::unsupported_seek("mock")),
            }
        }

        fn tell(&self) -> u64 {
            self.read_pos as u64
        }

        fn close(&mut self) -> Result<()> {
            self.closed = true;
            Ok(())
        }
    }

    #[test]
    fn test_read_drains_and_refills() {
        let data: Vec<u8> = (0..=255u8).cycle().take(BUFFER_SIZE * 3).collect();
        let mut buf = Streambuf::with_handle(MockHandle::reading(data.clone()), Direction::Read);

        let mut out = vec![0u8; data.len()];
        assert_eq!(buf.read(&mut out).unwrap(), data.len());
        assert_eq!(out, data);

        // Next attempt reports uniform end-of-stream.
        assert!(buf.read_byte().unwrap_err().is_end_of_stream());
        assert_eq!(buf.read(&mut out).unwrap(), 0);
    }

    #[test]
    fn test_peek_does_not_consume() {
        let mut buf = Streambuf::with_handle(MockHandle::reading(b"xy".to_vec()), Direction::Read);
        assert_eq!(buf.peek().unwrap(), b'x');
        assert_eq!(buf.peek().unwrap(), b'x');
        assert_eq!(buf.read_byte().unwrap(), b'x');
        assert_eq!(buf.read_byte().unwrap(), b'y');
    }

    #[test]
    fn test_putback_bound_across_refill() {
        // Two buffer-fulls of data forces a refill; after it, exactly
        // PUTBACK_SIZE consumed bytes must remain retrievable.
        let data: Vec<u8> = (0..(BUFFER_SIZE * 2) as u32).map(|i| i as u8).collect();
        let mut buf = Streambuf::with_handle(MockHandle::reading(data.clone()), Direction::Read);

        // Consume one full refill worth plus one byte to trigger a second
        // refill carrying putback bytes.
        let first_fill = BUFFER_SIZE - PUTBACK_SIZE;
        let mut out = vec![0u8; first_fill];
        assert_eq!(buf.read(&mut out).unwrap(), first_fill);
        let next = buf.read_byte().unwrap();
        assert_eq!(next, data[first_fill]);

        // One byte consumed since the refill, plus PUTBACK_SIZE preserved.
        let mut steps = 0;
        while buf.unget() {
            steps += 1;
        }
        assert_eq!(steps, 1 + PUTBACK_SIZE);

        // Re-reading yields the same bytes.
        let expect = &data[first_fill - PUTBACK_SIZE..first_fill + 1];
        let mut replay = vec![0u8; expect.len()];
        assert_eq!(buf.read(&mut replay).unwrap(), expect.len());
        assert_eq!(replay, expect);
    }

    #[test]
    fn test_flush_exactness() {
        let sink = Rc::new(RefCell::new(Vec::new()));
        let mut buf =
            Streambuf::with_handle(MockHandle::writing(Rc::clone(&sink)), Direction::Write);

        buf.write(b"abc").unwrap();
        assert!(sink.borrow().is_empty());
        buf.sync().unwrap();
        assert_eq!(*sink.borrow(), b"abc");

        // Sync with nothing pending writes nothing more.
        buf.sync().unwrap();
        assert_eq!(*sink.borrow(), b"abc");
    }

    #[test]
    fn test_large_write_chunks_through_flushes() {
        let sink = Rc::new(RefCell::new(Vec::new()));
        let mut buf =
            Streambuf::with_handle(MockHandle::writing(Rc::clone(&sink)), Direction::Write);

        let data: Vec<u8> = (0..(BUFFER_SIZE * 4 + 7) as u32).map(|i| (i % 251) as u8).collect();
        buf.write(&data).unwrap();
        buf.sync().unwrap();
        assert_eq!(*sink.borrow(), data);
    }

    #[test]
    fn test_single_byte_writes_overflow_slot() {
        let sink = Rc::new(RefCell::new(Vec::new()));
        let mut buf =
            Streambuf::with_handle(MockHandle::writing(Rc::clone(&sink)), Direction::Write);

        for i in 0..BUFFER_SIZE + 10 {
            buf.write_byte((i % 256) as u8).unwrap();
        }
        buf.sync().unwrap();

        let expect: Vec<u8> = (0..BUFFER_SIZE + 10).map(|i| (i % 256) as u8).collect();
        assert_eq!(*sink.borrow(), expect);
    }

    #[test]
    fn test_write_after_failed_flush_stays_usable() {
        let sink = Rc::new(RefCell::new(Vec::new()));
        let mut handle = MockHandle::writing(Rc::clone(&sink));
        handle.short_write = Some(1);
        let mut buf = Streambuf::with_handle(handle, Direction::Write);

        // Filling the buffer routes the last byte through the overflow slot;
        // the injected short write makes that flush fail.
        for i in 0..BUFFER_SIZE {
            let res = buf.write_byte((i % 256) as u8);
            if i < BUFFER_SIZE - 1 {
                res.unwrap();
            } else {
                assert!(matches!(res.unwrap_err(), GzStreamError::ShortWrite { .. }));
            }
        }

        // The overflow slot is occupied and the buffer is brim-full, but
        // further writes must keep reporting errors or recover cleanly, never
        // index past the buffer.
        buf.write_byte(0xEE).unwrap();
        buf.write(b"tail").unwrap();
        buf.sync().unwrap();
        assert!(sink.borrow().ends_with(b"tail"));
    }

    #[test]
    fn test_short_write_is_an_error() {
        let sink = Rc::new(RefCell::new(Vec::new()));
        let mut handle = MockHandle::writing(Rc::clone(&sink));
        handle.short_write = Some(2);
        let mut buf = Streambuf::with_handle(handle, Direction::Write);

        buf.write(b"hello").unwrap();
        let err = buf.sync().unwrap_err();
        assert!(matches!(
            err,
            GzStreamError::ShortWrite {
                expected: 5,
                written: 2
            }
        ));
    }

    #[test]
    fn test_mode_rejection_before_handle_open() {
        OPEN_CALLS.store(0, Ordering::SeqCst);
        let mut buf: Streambuf<MockHandle> = Streambuf::new();
        let path = Path::new("unused");

        assert!(buf.open(path, Mode::READ | Mode::WRITE).is_err());
        assert!(buf.open(path, Mode::WRITE | Mode::APPEND).is_err());
        assert!(buf.open(path, Mode::READ | Mode::AT_END).is_err());
        assert_eq!(OPEN_CALLS.load(Ordering::SeqCst), 0);

        assert!(buf.open(path, Mode::READ).is_ok());
        assert_eq!(OPEN_CALLS.load(Ordering::SeqCst), 1);
        assert!(matches!(
            buf.open(path, Mode::READ).unwrap_err(),
            GzStreamError::AlreadyOpen
        ));
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut buf = Streambuf::with_handle(MockHandle::reading(Vec::new()), Direction::Read);
        assert!(buf.is_open());
        buf.close().unwrap();
        assert!(!buf.is_open());
        buf.close().unwrap();
        buf.close().unwrap();
    }

    #[test]
    fn test_direction_enforcement() {
        let mut buf = Streambuf::with_handle(MockHandle::reading(b"z".to_vec()), Direction::Read);
        assert!(matches!(
            buf.write_byte(0).unwrap_err(),
            GzStreamError::WrongDirection { required: "write" }
        ));

        let sink = Rc::new(RefCell::new(Vec::new()));
        let mut buf = Streambuf::with_handle(MockHandle::writing(sink), Direction::Write);
        let mut out = [0u8; 1];
        assert!(matches!(
            buf.read(&mut out).unwrap_err(),
            GzStreamError::WrongDirection { required: "read" }
        ));
    }

    #[test]
    fn test_closed_adapter_rejects_io() {
        let mut buf: Streambuf<MockHandle> = Streambuf::new();
        assert!(matches!(
            buf.read_byte().unwrap_err(),
            GzStreamError::NotOpen
        ));
        assert!(matches!(
            buf.write_byte(0).unwrap_err(),
            GzStreamError::NotOpen
        ));
        assert!(matches!(buf.tell().unwrap_err(), GzStreamError::NotOpen));
        assert!(matches!(
            buf.seek(SeekFrom::Start(0)).unwrap_err(),
            GzStreamError::NotOpen
        ));
    }

    #[test]
    fn test_seek_discards_unread_buffer() {
        let data: Vec<u8> = (0..=99u8).collect();
        let mut buf = Streambuf::with_handle(MockHandle::reading(data), Direction::Read);

        assert_eq!(buf.read_byte().unwrap(), 0);
        // The whole input is buffered now; a seek must invalidate it.
        assert_eq!(buf.seek(SeekFrom::Start(50)).unwrap(), 50);
        assert_eq!(buf.read_byte().unwrap(), 50);
    }
}
