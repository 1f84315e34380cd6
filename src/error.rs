//! Library-wide error and result types.

use std::fmt;
use std::io;

/// Result alias used throughout starscodec.
pub type Result<T> = std::result::Result<T, Error>;

/// All errors the library can produce.
///
/// Error messages are kept intentionally terse; callers that need richer
/// context should wrap `Error` in their own type.
///
/// Decoders are lenient on locally-recoverable issues (unexpected reserved
/// bits, truncated optional sections): those are preserved as-is rather than
/// raised here. Only structural problems reach this type.
#[derive(Debug)]
pub enum Error {
    /// A declared block size exceeds the remaining bytes in the file, or a
    /// typed decoder reached the end of a block body mid-field.
    ShortBlock,
    /// The file header's magic value was not `J3J3`.
    BadMagic,
    /// A second file's header game id differs from the first file added to
    /// a store.
    GameIdMismatch,
    /// No header block was found at the start of the file.
    MissingHeader,
    /// An entity was asked to re-encode but has no anchor block attached.
    /// Surfaces only during regeneration and indicates a programmer error.
    NoRawBlockData,
    /// A footer failed its kind-specific validation (R-file checksum,
    /// M-file turn trailer, XY-file player count).
    InvalidFooter,
    /// Regeneration was requested for a (role, player) pair not present in
    /// the store.
    NoSourceForPlayer,
    /// A structural constraint was violated (message describes which one).
    Parse(&'static str),
    /// An underlying I/O operation failed.
    Io(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ShortBlock => write!(f, "block body shorter than declared size"),
            Error::BadMagic => write!(f, "bad magic value"),
            Error::GameIdMismatch => write!(f, "game id does not match store"),
            Error::MissingHeader => write!(f, "no header block at file start"),
            Error::NoRawBlockData => write!(f, "entity has no anchor block to re-encode from"),
            Error::InvalidFooter => write!(f, "footer failed validation"),
            Error::NoSourceForPlayer => write!(f, "no source file for requested player/role"),
            Error::Parse(s) => write!(f, "parse error: {s}"),
            Error::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        if let Error::Io(e) = self {
            Some(e)
        } else {
            None
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}
