//! # Channel
//!
//! The message-framed, bidirectional pipe between one client and one helper,
//! named by a `ChannelToken`.
//!
//! ## Layout on disk
//!
//! - `<dir>/<token>.sock`: the helper's listening socket. It exists only until
//!   the single connection is accepted.
//! - `<dir>/<token>.claim`: created exclusively by the client before it
//!   connects. A second client finds it and gets `ChannelBusy`.
//!
//! ## Invariants
//! - At most one connection per token, ever.
//! - Both files are removed when either side drops its end.

use std::fs;
use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::os::unix::net::UnixListener;
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use tracing::debug;
use tracing::info;

use crate::error::Error;
use crate::error::Result;
use crate::framing::read_message;
use crate::framing::write_message;
use crate::token::ChannelToken;
use crate::transport;
use crate::transport::Transport;

/// Which end of the channel is being opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Connects to an endpoint that exists or is about to.
    Client,
    /// Creates the endpoint and waits for the one connection.
    Server,
}

#[derive(Debug, Clone)]
pub struct ChannelOptions {
    /// Where the socket and claim files live.
    pub dir: PathBuf,
    pub connect_timeout: Duration,
    pub retry_interval: Duration,
    /// Upper bound for one message in either direction.
    pub max_message_size: usize,
}

impl Default for ChannelOptions {
    fn default() -> Self {
        Self {
            dir: std::env::temp_dir(),
            connect_timeout: Duration::from_secs(10),
            retry_interval: Duration::from_millis(10),
            max_message_size: 16 * 1024 * 1024,
        }
    }
}

impl ChannelOptions {
    pub fn socket_path(&self, token: &ChannelToken) -> PathBuf {
        self.dir.join(format!("{}.sock", token))
    }

    pub fn claim_path(&self, token: &ChannelToken) -> PathBuf {
        self.dir.join(format!("{}.claim", token))
    }
}

pub struct Channel {
    stream: UnixStream,
    role: Role,
    max_message_size: usize,
    /// Files removed when this end is dropped.
    owned_paths: Vec<PathBuf>,
}

impl Channel {
    pub fn open(token: &ChannelToken, role: Role, options: &ChannelOptions) -> Result<Channel> {
        match role {
            Role::Client => Self::connect(token, options),
            Role::Server => Self::listen(token, options),
        }
    }

    pub fn connect(token: &ChannelToken, options: &ChannelOptions) -> Result<Channel> {
        Self::connect_with(token, options, || Ok(()))
    }

    /// Client open. `still_waiting` runs between attempts; an error from it
    /// aborts the connect, which lets a caller stop early when the helper
    /// has already died.
    pub fn connect_with(
        token: &ChannelToken,
        options: &ChannelOptions,
        mut still_waiting: impl FnMut() -> Result<()>,
    ) -> Result<Channel> {
        let claim = options.claim_path(token);
        match OpenOptions::new().write(true).create_new(true).open(&claim) {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(Error::ChannelBusy(format!("{} already has a client", token)));
            }
            Err(e) => {
                return Err(Error::Connect(format!("cannot claim {}: {}", claim.display(), e)));
            }
        }

        let socket = options.socket_path(token);
        let deadline = Instant::now() + options.connect_timeout;
        let mut attempts = 0u32;

        let stream = loop {
            attempts += 1;
            let last_error = match UnixStream::connect(&socket) {
                Ok(stream) => break stream,
                Err(e) => e,
            };

            let give_up = still_waiting().err().or_else(|| {
                (Instant::now() >= deadline).then(|| {
                    Error::Connect(format!(
                        "no helper accepted on {} within {:?}: {}",
                        socket.display(),
                        options.connect_timeout,
                        last_error
                    ))
                })
            });
            if let Some(err) = give_up {
                let _ = fs::remove_file(&claim);
                return Err(err);
            }
            thread::sleep(options.retry_interval);
        };

        info!(%token, attempts, "channel connected");
        Ok(Channel {
            stream,
            role: Role::Client,
            max_message_size: options.max_message_size,
            owned_paths: vec![claim, socket],
        })
    }

    /// Server open. Blocks until the single client connects.
    pub fn listen(token: &ChannelToken, options: &ChannelOptions) -> Result<Channel> {
        let socket = options.socket_path(token);
        let listener = match UnixListener::bind(&socket) {
            Ok(listener) => listener,
            Err(e) if e.kind() == ErrorKind::AddrInUse => {
                return Err(Error::ChannelBusy(format!("{} is already being served", token)));
            }
            Err(e) => {
                return Err(Error::Connect(format!("cannot listen on {}: {}", socket.display(), e)));
            }
        };
        debug!(path = %socket.display(), "waiting for client");

        let accepted = listener.accept();
        drop(listener);
        let _ = fs::remove_file(&socket);

        let (stream, _) = accepted
            .map_err(|e| Error::Connect(format!("accept on {} failed: {}", socket.display(), e)))?;

        info!(%token, "channel accepted");
        Ok(Channel {
            stream,
            role: Role::Server,
            max_message_size: options.max_message_size,
            owned_paths: vec![socket, options.claim_path(token)],
        })
    }

    pub fn role(&self) -> Role {
        self.role
    }
}

impl Transport for Channel {
    fn send(&mut self, payload: &[u8]) -> transport::Result<()> {
        write_message(&mut self.stream, payload, self.max_message_size)
    }

    fn recv(&mut self) -> transport::Result<Option<Vec<u8>>> {
        read_message(&mut self.stream, self.max_message_size)
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        for path in &self.owned_paths {
            let _ = fs::remove_file(path);
        }
    }
}
