//! The compressed file handle consumed by the adapter.
//!
//! [`CompressedHandle`] is the seam between the buffering core and the codec
//! library: six blocking primitives over byte ranges and positions, with all
//! positions expressed as UNCOMPRESSED byte offsets (the convention of
//! gzip-style file handles). [`GzFile`] is the production implementation on
//! top of flate2; tests substitute in-memory handles through the same trait.

use crate::error::{GzStreamError, Result};
use crate::mode::Direction;
use flate2::Compression;
use flate2::bufread::MultiGzDecoder;
use flate2::write::GzEncoder;
use log::debug;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Chunk size used when a seek is emulated by reading or zero-filling.
const SKIP_CHUNK: usize = 8 * 1024;

/// Blocking byte-I/O primitives over an open compressed file.
///
/// Every method is a direct blocking call; there is no internal buffering
/// beyond what the codec needs. A handle is exclusively owned by one adapter
/// instance and is never shared.
pub trait CompressedHandle: Sized {
    /// Open the resource at `path` for the given direction.
    fn open(path: &Path, direction: Direction) -> Result<Self>;

    /// Read up to `buf.len()` decompressed bytes. `Ok(0)` means end of
    /// stream.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Write `buf`, compressing it. Returns the number of bytes accepted;
    /// anything short of `buf.len()` is a write failure at the caller.
    fn write(&mut self, buf: &[u8]) -> Result<usize>;

    /// Reposition the stream. The offset is an uncompressed byte offset.
    fn seek(&mut self, pos: SeekFrom) -> Result<u64>;

    /// Current uncompressed byte offset.
    fn tell(&self) -> u64;

    /// Flush and close. Safe to call more than once; only the first call
    /// does work.
    fn close(&mut self) -> Result<()>;
}

enum Inner {
    Reader {
        decoder: MultiGzDecoder<BufReader<File>>,
        path: PathBuf,
    },
    Writer {
        encoder: GzEncoder<File>,
    },
    Closed,
}

/// A gzip-compressed file handle backed by flate2.
///
/// Read handles decompress through [`MultiGzDecoder`], so a file holding
/// several concatenated gzip members reads back as one continuous stream
/// (the behavior of classic gzip file handles); write handles compress
/// through [`GzEncoder`] and emit the gzip trailer on [`close`].
///
/// Seek support mirrors classic gzip handle semantics: positions are
/// uncompressed offsets, read-side seeks are emulated (forward by skipping,
/// backward by rewinding to the start and skipping), write-side seeks can
/// only move forward by emitting zero bytes, and seeking relative to the end
/// is never supported.
///
/// [`close`]: CompressedHandle::close
pub struct GzFile {
    inner: Inner,
    pos: u64,
}

impl GzFile {
    /// Open for writing with an explicit compression level (0-9).
    pub fn create_with_level(path: &Path, level: u32) -> Result<Self> {
        let file = File::create(path)
            .map_err(|e| GzStreamError::open_failure(path, e))?;
        debug!("opened {} for write (level {})", path.display(), level.min(9));
        Ok(Self {
            inner: Inner::Writer {
                encoder: GzEncoder::new(file, Compression::new(level.min(9))),
            },
            pos: 0,
        })
    }

    fn open_reader(path: &Path) -> Result<Inner> {
        let file = File::open(path)
            .map_err(|e| GzStreamError::open_failure(path, e))?;
        Ok(Inner::Reader {
            decoder: MultiGzDecoder::new(BufReader::new(file)),
            path: path.to_path_buf(),
        })
    }

    /// Skip `count` decompressed bytes by reading into a scratch buffer.
    fn skip_forward(&mut self, mut count: u64) -> Result<()> {
        let mut scratch = [0u8; SKIP_CHUNK];
        while count > 0 {
            let want = count.min(SKIP_CHUNK as u64) as usize;
            let n = self.read(&mut scratch[..want])?;
            if n == 0 {
                return Err(GzStreamError::EndOfStream);
            }
            count -= n as u64;
        }
        Ok(())
    }

    /// Pad `count` zero bytes into the compressed output.
    fn zero_fill(&mut self, mut count: u64) -> Result<()> {
        let zeros = [0u8; SKIP_CHUNK];
        while count > 0 {
            let want = count.min(SKIP_CHUNK as u64) as usize;
            let n = self.write(&zeros[..want])?;
            if n != want {
                return Err(GzStreamError::short_write(want, n));
            }
            count -= n as u64;
        }
        Ok(())
    }

    fn resolve_target(&self, pos: SeekFrom) -> Result<u64> {
        match pos {
            SeekFrom::Start(n) => Ok(n),
            SeekFrom::Current(delta) => {
                let target = self.pos as i64 + delta;
                if target < 0 {
                    Err(GzStreamError::unsupported_seek(
                        "seek before start of stream",
                    ))
                } else {
                    Ok(target as u64)
                }
            }
            SeekFrom::End(_) => Err(GzStreamError::unsupported_seek(
                "end-relative seek is not supported on compressed streams",
            )),
        }
    }
}

impl CompressedHandle for GzFile {
    fn open(path: &Path, direction: Direction) -> Result<Self> {
        match direction {
            Direction::Read => {
                let inner = Self::open_reader(path)?;
                debug!("opened {} for read", path.display());
                Ok(Self { inner, pos: 0 })
            }
            Direction::Write => Self::create_with_level(path, Compression::default().level()),
        }
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        match &mut self.inner {
            Inner::Reader { decoder, .. } => {
                let n = decoder.read(buf)?;
                self.pos += n as u64;
                Ok(n)
            }
            Inner::Writer { .. } => Err(GzStreamError::WrongDirection { required: "read" }),
            Inner::Closed => Err(GzStreamError::NotOpen),
        }
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        match &mut self.inner {
            Inner::Writer { encoder } => {
                encoder.write_all(buf)?;
                self.pos += buf.len() as u64;
                Ok(buf.len())
            }
            Inner::Reader { .. } => Err(GzStreamError::WrongDirection { required: "write" }),
            Inner::Closed => Err(GzStreamError::NotOpen),
        }
    }

    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        let target = self.resolve_target(pos)?;
        let reading = match &mut self.inner {
            Inner::Reader { decoder, path } => {
                if target < self.pos {
                    // Deflate streams cannot step backwards; rewind to the
                    // start and decompress forward again.
                    let file = File::open(path.as_path())
                        .map_err(|e| GzStreamError::open_failure(path.as_path(), e))?;
                    *decoder = MultiGzDecoder::new(BufReader::new(file));
                    self.pos = 0;
                }
                true
            }
            Inner::Writer { .. } => {
                if target < self.pos {
                    return Err(GzStreamError::unsupported_seek(
                        "backward seek is not supported while writing",
                    ));
                }
                false
            }
            Inner::Closed => return Err(GzStreamError::NotOpen),
        };
        let remaining = target - self.pos;
        if reading {
            self.skip_forward(remaining)?;
        } else {
            self.zero_fill(remaining)?;
        }
        Ok(self.pos)
    }

    fn tell(&self) -> u64 {
        self.pos
    }

    fn close(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.inner, Inner::Closed) {
            Inner::Writer { mut encoder } => {
                // Emits the gzip trailer; a failure here means a truncated
                // compressed stream on disk.
                encoder
                    .try_finish()
                    .map_err(|e| GzStreamError::close_failure(e.to_string()))?;
                debug!("closed write handle at offset {}", self.pos);
                Ok(())
            }
            Inner::Reader { .. } => {
                debug!("closed read handle at offset {}", self.pos);
                Ok(())
            }
            Inner::Closed => Ok(()),
        }
    }
}

impl fmt::Debug for GzFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.inner {
            Inner::Reader { .. } => "read",
            Inner::Writer { .. } => "write",
            Inner::Closed => "closed",
        };
        f.debug_struct("GzFile")
            .field("state", &state)
            .field("pos", &self.pos)
            .finish()
    }
}

impl Drop for GzFile {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
