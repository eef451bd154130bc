use crate::tag::Scope;

/// Encoding and decoding failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Byte is not a known `Tag`.
    InvalidTag(u8),
    /// A known tag appeared where a different one was required.
    UnexpectedTag { expected: &'static str, found: u8 },
    /// String payload is not valid UTF-8.
    InvalidUtf8,
    /// Input ended in the middle of an item.
    UnexpectedEnd,
    /// A blob or container body does not fit a `u32` length.
    TooLarge(usize),
    /// Closing a scope that is not the innermost one.
    ScopeMismatch { expected: Scope, actual: Scope },
    /// Closing a scope when only the root remains.
    ScopeUnderflow,
    /// Finishing the buffer while scopes are still open.
    ScopeStillOpen,
    /// An option, result, or variant holds more than its one item.
    TooManyItems(Scope),
    /// An option, result, or variant has no item.
    EmptyScope(Scope),
    /// Something other than a variant was written directly into a map.
    InvalidMapEntry,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidTag(b) => write!(f, "invalid tag byte {:#04x}", b),
            Error::UnexpectedTag { expected, found } => {
                write!(f, "expected {} but found tag {:#04x}", expected, found)
            }
            Error::InvalidUtf8 => write!(f, "string is not valid utf-8"),
            Error::UnexpectedEnd => write!(f, "input ended unexpectedly"),
            Error::TooLarge(n) => write!(f, "{} bytes do not fit a u32 length", n),
            Error::ScopeMismatch { expected, actual } => {
                write!(f, "scope mismatch: closing {:?} but {:?} is open", expected, actual)
            }
            Error::TooManyItems(s) => write!(f, "scope {:?} takes exactly one item", s),
            Error::EmptyScope(s) => write!(f, "scope {:?} closed without its item", s),
            _ => write!(f, "{:?}", self),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;
