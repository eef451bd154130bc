//! # Error Definitions

use archpack::Error as PackError;

/// Failures while turning frames into bytes or bytes into frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The TLV layer rejected the bytes or the write sequence.
    Pack(PackError),
    /// A required map entry was absent.
    MissingField(&'static str),
    /// An enum case, value tag, or top-level frame name is not known.
    UnknownVariant(String),
    /// The frame declares a version this build does not speak.
    UnsupportedVersion(u8),
    /// Bytes remained after the frame ended.
    TrailingBytes(usize),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Pack(e) => write!(f, "malformed frame: {}", e),
            Error::MissingField(name) => write!(f, "frame is missing field `{}`", name),
            Error::UnknownVariant(what) => write!(f, "unknown variant {}", what),
            Error::UnsupportedVersion(v) => write!(f, "unsupported wire version {}", v),
            Error::TrailingBytes(n) => write!(f, "{} trailing bytes after frame", n),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Pack(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PackError> for Error {
    fn from(e: PackError) -> Self { Self::Pack(e) }
}

pub type Result<T> = std::result::Result<T, Error>;
