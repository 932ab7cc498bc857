//! Open-mode flags and validation.
//!
//! Callers request a mode as a combination of [`Mode`] flags, mirroring the
//! open-mode conventions of general-purpose stream APIs. The adapter only
//! supports two of the combinations: pure read and pure write. Everything
//! else (append, at-end positioning, simultaneous read+write) is rejected
//! before the underlying compressed file is ever touched.

use crate::error::{GzStreamError, Result};
use std::fmt;
use std::ops::BitOr;

/// Requested open mode, as a combination of flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mode(u8);

impl Mode {
    /// Open for reading.
    pub const READ: Self = Self(0x01);
    /// Open for writing.
    pub const WRITE: Self = Self(0x02);
    /// Append to the end of the file (always rejected).
    pub const APPEND: Self = Self(0x04);
    /// Position at the end after opening (always rejected).
    pub const AT_END: Self = Self(0x08);

    /// Check whether all flags in `other` are set.
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Validate the flag combination and reduce it to a [`Direction`].
    ///
    /// Fails with [`GzStreamError::InvalidMode`] for append, at-end,
    /// read+write, or an empty request.
    pub fn direction(self) -> Result<Direction> {
        if self.contains(Self::APPEND) {
            return Err(GzStreamError::invalid_mode("append is not supported"));
        }
        if self.contains(Self::AT_END) {
            return Err(GzStreamError::invalid_mode(
                "at-end positioning is not supported",
            ));
        }
        match (self.contains(Self::READ), self.contains(Self::WRITE)) {
            (true, true) => Err(GzStreamError::invalid_mode(
                "simultaneous read and write is not supported",
            )),
            (true, false) => Ok(Direction::Read),
            (false, true) => Ok(Direction::Write),
            (false, false) => Err(GzStreamError::invalid_mode("no direction requested")),
        }
    }
}

impl BitOr for Mode {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Validated stream direction. Read and write are mutually exclusive for a
/// single adapter instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Decompressing reads.
    Read,
    /// Compressing writes.
    Write,
}

impl Direction {
    /// The handle-layer mode string: always binary, never text-translated.
    pub fn as_handle_mode(self) -> &'static str {
        match self {
            Self::Read => "rb",
            Self::Write => "wb",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => f.write_str("read"),
            Self::Write => f.write_str("write"),
        }
    }
}
