//! # Transport Abstraction
//!
//! Moves whole messages between the two ends of a channel.
//!
//! ## Philosophy
//!
//! - **Message-Oriented**: one `send` is exactly one `recv` on the other side.
//!   The transport never splits or merges payloads.
//! - **Opaque**: payloads are bytes. Frames, descriptors and outcomes are
//!   interpreted above this layer.
//! - **Blocking**: both calls block the current thread until done.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The peer went away in the middle of a message or mid-call.
    ConnectionLost(String),
    /// A message exceeded the configured limit.
    PayloadTooLarge { size: usize, limit: usize },
    /// Any other I/O failure.
    Io(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionLost(msg) => write!(f, "Connection lost: {}", msg),
            Self::PayloadTooLarge { size, limit } => {
                write!(f, "Payload of {} bytes exceeds limit of {}", size, limit)
            }
            Self::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match e.kind() {
            ErrorKind::BrokenPipe | ErrorKind::ConnectionReset | ErrorKind::UnexpectedEof => {
                Self::ConnectionLost(e.to_string())
            }
            _ => Self::Io(e.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

pub trait Transport {
    /// Delivers one message.
    fn send(&mut self, payload: &[u8]) -> Result<()>;

    /// Blocks for the next message. `Ok(None)` means the peer closed cleanly
    /// between messages.
    fn recv(&mut self) -> Result<Option<Vec<u8>>>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&mut self, payload: &[u8]) -> Result<()> {
        (**self).send(payload)
    }

    fn recv(&mut self) -> Result<Option<Vec<u8>>> {
        (**self).recv()
    }
}
