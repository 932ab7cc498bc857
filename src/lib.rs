//! # gzstream
//!
//! Transparent, stream-like reading and writing of gzip-compressed files.
//!
//! Calling code that works with generic buffered byte streams can treat
//! compressed and uncompressed files identically: the core of the crate is a
//! fixed-size, putback-aware buffer adapter over a compression-library file
//! handle, and everything else is a thin layer on top of it.
//!
//! - [`streambuf`]: the buffered adapter (refill, flush, seek/tell, lifecycle)
//! - [`handle`]: the compressed file handle it consumes ([`flate2`] underneath)
//! - [`stream`]: [`GzReader`] / [`GzWriter`] facades implementing
//!   [`std::io::Read`] / [`std::io::Write`]
//! - [`dispatch`]: filename-based routing between gzip, plain-file, and
//!   stdio backends
//! - [`mode`]: open-mode flags and validation
//! - [`error`]: error types
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ Dispatch: SmartReader / SmartWriter                     │
//! │     routes by filename suffix and stdio sentinel        │
//! ├─────────────────────────────────────────────────────────┤
//! │ Facades: GzReader / GzWriter                            │
//! │     std::io::Read / Write over the adapter              │
//! ├─────────────────────────────────────────────────────────┤
//! │ Core: Streambuf                                         │
//! │     fixed buffer, putback area, refill/flush, seek/tell │
//! ├─────────────────────────────────────────────────────────┤
//! │ Handle: CompressedHandle / GzFile                       │
//! │     blocking byte primitives over flate2                │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use gzstream::{GzReader, GzWriter};
//! use std::io::{Read, Write};
//!
//! let path = std::path::Path::new("log.txt.gz");
//!
//! let mut writer = GzWriter::create(path)?;
//! writer.write_all(b"hello, compressed world\n")?;
//! writer.close()?;
//!
//! let mut reader = GzReader::open(path)?;
//! let mut text = String::new();
//! reader.read_to_string(&mut text)?;
//! assert_eq!(text, "hello, compressed world\n");
//! # Ok::<(), std::io::Error>(())
//! ```
//!
//! The model is single-threaded and blocking: every operation is a direct
//! call into the underlying handle. An adapter and its handle are exclusively
//! owned by one stream; concurrent users each open their own.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod dispatch;
pub mod error;
pub mod handle;
pub mod mode;
pub mod stream;
pub mod streambuf;

// Re-exports for convenience
pub use dispatch::{DispatchConfig, SmartReader, SmartWriter, copy, is_gzip_name};
pub use error::{GzStreamError, Result};
pub use handle::{CompressedHandle, GzFile};
pub use mode::{Direction, Mode};
pub use stream::{GzReader, GzWriter};
pub use streambuf::{BUFFER_SIZE, PUTBACK_SIZE, Streambuf};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::dispatch::{DispatchConfig, SmartReader, SmartWriter};
    pub use crate::error::{GzStreamError, Result};
    pub use crate::handle::{CompressedHandle, GzFile};
    pub use crate::mode::{Direction, Mode};
    pub use crate::stream::{GzReader, GzWriter};
    pub use crate::streambuf::Streambuf;
}
