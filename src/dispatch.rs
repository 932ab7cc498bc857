//! Filename-based backend dispatch.
//!
//! The "generic smart file" layer: a name ending in `.gz` (case-insensitive)
//! routes to the compressed adapter, a configured sentinel name (`"-"` by
//! default) routes to the process's standard input or output, and anything
//! else routes to a plain buffered file. The sentinel is carried in
//! [`DispatchConfig`] and passed explicitly; there is no global state.

use crate::error::{GzStreamError, Result};
use crate::stream::{GzReader, GzWriter};
use log::debug;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

/// The case-folded filename suffix that selects the gzip backend.
pub const GZIP_SUFFIX: &str = ".gz";

/// Configuration for backend selection.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// The distinguished name mapped to standard input/output.
    pub stdio_name: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            stdio_name: "-".to_string(),
        }
    }
}

/// True if `name` selects the gzip backend: a case-insensitive `.gz` suffix
/// on a name longer than the suffix itself.
pub fn is_gzip_name(name: &str) -> bool {
    name.len() > GZIP_SUFFIX.len() && name.to_ascii_lowercase().ends_with(GZIP_SUFFIX)
}

/// A reader whose backend was chosen by filename.
pub enum SmartReader {
    /// Decompressing gzip backend.
    Gzip(GzReader),
    /// Plain uncompressed file.
    Plain(BufReader<File>),
    /// Standard input.
    Stdin(io::Stdin),
}

impl SmartReader {
    /// Open `name` with the backend its filename selects.
    pub fn open(name: &str, config: &DispatchConfig) -> Result<Self> {
        if is_gzip_name(name) {
            debug!("dispatching {name} to gzip reader");
            Ok(Self::Gzip(GzReader::open(Path::new(name))?))
        } else if name == config.stdio_name {
            debug!("dispatching {name} to stdin");
            Ok(Self::Stdin(io::stdin()))
        } else {
            debug!("dispatching {name} to plain reader");
            let file = File::open(name)
                .map_err(|e| GzStreamError::open_failure(name, e))?;
            Ok(Self::Plain(BufReader::new(file)))
        }
    }

    /// Open `name` with the default configuration (`"-"` is stdin).
    pub fn open_default(name: &str) -> Result<Self> {
        Self::open(name, &DispatchConfig::default())
    }
}

impl Read for SmartReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Gzip(r) => r.read(buf),
            Self::Plain(r) => r.read(buf),
            Self::Stdin(r) => r.read(buf),
        }
    }
}

/// A writer whose backend was chosen by filename.
pub enum SmartWriter {
    /// Compressing gzip backend.
    Gzip(GzWriter),
    /// Plain uncompressed file.
    Plain(BufWriter<File>),
    /// Standard output.
    Stdout(io::Stdout),
}

impl SmartWriter {
    /// Create `name` with the backend its filename selects.
    pub fn create(name: &str, config: &DispatchConfig) -> Result<Self> {
        if is_gzip_name(name) {
            debug!("dispatching {name} to gzip writer");
            Ok(Self::Gzip(GzWriter::create(Path::new(name))?))
        } else if name == config.stdio_name {
            debug!("dispatching {name} to stdout");
            Ok(Self::Stdout(io::stdout()))
        } else {
            debug!("dispatching {name} to plain writer");
            let file = File::create(name)
                .map_err(|e| GzStreamError::open_failure(name, e))?;
            Ok(Self::Plain(BufWriter::new(file)))
        }
    }

    /// Create `name` with the default configuration (`"-"` is stdout).
    pub fn create_default(name: &str) -> Result<Self> {
        Self::create(name, &DispatchConfig::default())
    }

    /// Flush pending data and, for the gzip backend, finish the compressed
    /// stream.
    pub fn close(&mut self) -> Result<()> {
        match self {
            Self::Gzip(w) => w.close(),
            Self::Plain(w) => Ok(w.flush()?),
            Self::Stdout(w) => Ok(w.flush()?),
        }
    }
}

impl Write for SmartWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        match self {
            Self::Gzip(w) => w.write(data),
            Self::Plain(w) => w.write(data),
            Self::Stdout(w) => w.write(data),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Gzip(w) => w.flush(),
            Self::Plain(w) => w.flush(),
            Self::Stdout(w) => w.flush(),
        }
    }
}

/// Copy `from` to `to`, compressing or decompressing as the filenames
/// dictate. Returns the number of uncompressed bytes copied.
pub fn copy(from: &str, to: &str, config: &DispatchConfig) -> Result<u64> {
    let mut reader = SmartReader::open(from, config)?;
    let mut writer = SmartWriter::create(to, config)?;
    let copied = io::copy(&mut reader, &mut writer)?;
    writer.close()?;
    Ok(copied)
}
