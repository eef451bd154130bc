//! # Request Loop
//!
//! The helper side of a channel. Receives descriptors, hands each to a
//! `CallHandler` and sends back exactly one outcome per call.
//!
//! ```text
//! WaitingForConnection --run--> Running --close / end of stream / error--> Closed
//! ```
//!
//! ## Invariants
//! - The close descriptor is never answered.
//! - A bad payload is answered with `Failed(Protocol)`; the loop only stops on
//!   close or when the transport itself is gone.

use archwire::CallDescriptor;
use archwire::CallOutcome;
use archwire::ErrorKind;
use archwire::Frame;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::transport;
use crate::transport::Transport;

/// Runs the native side of a call.
pub trait CallHandler {
    fn handle(&mut self, call: &CallDescriptor) -> CallOutcome;
}

impl<F> CallHandler for F
where
    F: FnMut(&CallDescriptor) -> CallOutcome,
{
    fn handle(&mut self, call: &CallDescriptor) -> CallOutcome {
        self(call)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    WaitingForConnection,
    Running,
    Closed,
}

/// Why `run` returned normally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// The client sent the close descriptor.
    CloseRequested,
    /// The client went away between calls.
    PeerDisconnected,
}

pub struct RequestLoop<H> {
    handler: H,
    state: LoopState,
    served: u64,
}

impl<H: CallHandler> RequestLoop<H> {
    pub fn new(handler: H) -> Self {
        Self { handler, state: LoopState::WaitingForConnection, served: 0 }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Calls answered so far, failed ones included.
    pub fn served(&self) -> u64 {
        self.served
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Serves `transport` until the session ends. A loop runs once; calling
    /// `run` again after it closed is an error.
    pub fn run(&mut self, transport: &mut dyn Transport) -> transport::Result<LoopExit> {
        if self.state != LoopState::WaitingForConnection {
            return Err(transport::Error::Io("request loop has already run".into()));
        }
        self.state = LoopState::Running;
        info!("request loop running");

        let exit = self.serve(transport);
        self.state = LoopState::Closed;

        match &exit {
            Ok(reason) => info!(?reason, served = self.served, "request loop closed"),
            Err(e) => warn!(served = self.served, "request loop aborted: {}", e),
        }
        exit
    }

    fn serve(&mut self, transport: &mut dyn Transport) -> transport::Result<LoopExit> {
        loop {
            let Some(request) = transport.recv()? else {
                return Ok(LoopExit::PeerDisconnected);
            };

            let outcome = match Frame::decode(&request) {
                Ok(Frame::Call(call)) if call.is_close() => {
                    debug!("close received");
                    return Ok(LoopExit::CloseRequested);
                }
                Ok(Frame::Call(call)) => {
                    debug!(library = %call.library, procedure = %call.procedure, "call received");
                    self.handler.handle(&call)
                }
                Ok(Frame::Outcome(_)) => {
                    CallOutcome::failed(ErrorKind::Protocol, "expected a Call frame, got an Outcome")
                }
                Err(e) => {
                    warn!("malformed request: {}", e);
                    CallOutcome::failed(ErrorKind::Protocol, format!("malformed request: {}", e))
                }
            };

            transport.send(&encode_reply(&outcome)?)?;
            self.served += 1;
        }
    }
}

/// Encodes `outcome`, degrading to a `Protocol` failure if the outcome
/// itself cannot be encoded.
fn encode_reply(outcome: &CallOutcome) -> transport::Result<Vec<u8>> {
    archwire::encode_outcome(outcome)
        .or_else(|e| {
            let fallback = CallOutcome::failed(ErrorKind::Protocol, format!("unencodable outcome: {}", e));
            archwire::encode_outcome(&fallback)
        })
        .map_err(|e| transport::Error::Io(format!("cannot encode reply: {}", e)))
}
