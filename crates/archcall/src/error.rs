//! # Error Definitions
//!
//! Failures of one native call. None of these cross the channel as errors;
//! they are folded into `CallOutcome::Failed` by the engine.

use archwire::ErrorDescriptor;
use archwire::ErrorKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The resolver could not produce a library for the identifier.
    LibraryLoad { library: String, reason: String },
    /// The library does not export the requested symbol.
    ProcedureNotFound { library: String, procedure: String },
    /// The descriptor cannot be turned into a call (kind mismatch, close signal, bad string).
    Protocol(String),
    /// Marshaling or the call itself failed after the entry point was found.
    Invocation(String),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::LibraryLoad { .. } => ErrorKind::LibraryLoad,
            Error::ProcedureNotFound { .. } => ErrorKind::ProcedureNotFound,
            Error::Protocol(_) => ErrorKind::Protocol,
            Error::Invocation(_) => ErrorKind::NativeInvocation,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::LibraryLoad { library, reason } => {
                write!(f, "unable to load library `{}`: {}", library, reason)
            }
            Error::ProcedureNotFound { library, procedure } => {
                write!(f, "procedure `{}` not found in `{}`", procedure, library)
            }
            Error::Protocol(msg) => write!(f, "unusable call descriptor: {}", msg),
            Error::Invocation(msg) => write!(f, "native invocation failed: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<Error> for ErrorDescriptor {
    fn from(e: Error) -> Self {
        ErrorDescriptor { kind: e.kind(), message: e.to_string() }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
