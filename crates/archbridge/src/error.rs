//! # Error Definitions
//!
//! Everything a client of the bridge can observe going wrong. Failures inside
//! the helper arrive as `Remote`; everything else happened on this side of
//! the channel.

use archwire::ErrorKind;

use crate::transport;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The helper executable could not be started.
    Launch(String),
    /// The channel already has its one connection, or its endpoint exists.
    ChannelBusy(String),
    /// The channel could not be established in time.
    Connect(String),
    /// A message was malformed or violated the call contract.
    Protocol(String),
    /// The helper reported a failure for this call.
    Remote { kind: ErrorKind, message: String },
    /// The dispatcher was closed before this call.
    ClosedChannel,
    /// The channel broke, typically because the helper died.
    Transport(transport::Error),
    /// The interface has no method by that name.
    UnknownMethod(String),
    /// The interface method takes a different number of arguments.
    ArgumentCount { method: String, expected: usize, found: usize },
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Launch(msg) => write!(f, "Launch error: {}", msg),
            Self::ChannelBusy(msg) => write!(f, "Channel busy: {}", msg),
            Self::Connect(msg) => write!(f, "Connect error: {}", msg),
            Self::Protocol(msg) => write!(f, "Protocol error: {}", msg),
            Self::Remote { kind, message } => write!(f, "Remote failure ({:?}): {}", kind, message),
            Self::ClosedChannel => write!(f, "Channel is closed"),
            Self::Transport(e) => write!(f, "Transport error: {}", e),
            Self::UnknownMethod(name) => write!(f, "Unknown method `{}`", name),
            Self::ArgumentCount { method, expected, found } => {
                write!(f, "`{}` takes {} arguments but {} were given", method, expected, found)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport(e) => Some(e),
            _ => None,
        }
    }
}

impl From<transport::Error> for Error {
    fn from(e: transport::Error) -> Self {
        Self::Transport(e)
    }
}

impl From<archwire::Error> for Error {
    fn from(e: archwire::Error) -> Self {
        Self::Protocol(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
