//! # Call Dispatcher
//!
//! The client side of a channel: ships one `CallDescriptor`, waits for the
//! matching `CallOutcome` and folds the results back into the caller's
//! descriptor.
//!
//! ## Invariants
//! - Strictly one call in flight; the next request is only sent after the
//!   previous outcome has been read.
//! - After `close` every `invoke` fails with `ClosedChannel` and nothing more is
//!   written to the transport.
//! - A failed call leaves the caller's parameters untouched.
//! - A transport failure closes the dispatcher, except an oversized message,
//!   which is a protocol error and leaves the stream on a message boundary.

use archwire::CallDescriptor;
use archwire::CallOutcome;
use archwire::Frame;
use archwire::Value;
use tracing::debug;
use tracing::warn;

use crate::error::Error;
use crate::error::Result;
use crate::transport;
use crate::transport::Transport;

pub struct CallDispatcher {
    /// `None` once closed.
    transport: Option<Box<dyn Transport>>,
}

impl CallDispatcher {
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self { transport: Some(Box::new(transport)) }
    }

    pub fn is_closed(&self) -> bool {
        self.transport.is_none()
    }

    /// Performs one remote call.
    ///
    /// On success the by-reference parameters of `call` hold the values the
    /// native procedure left behind, and the return value (if any) is
    /// returned.
    pub fn invoke(&mut self, call: &mut CallDescriptor) -> Result<Option<Value>> {
        if call.is_close() {
            return Err(Error::Protocol("close descriptors are sent by `close`, not `invoke`".into()));
        }
        let transport = self.transport.as_mut().ok_or(Error::ClosedChannel)?;

        // send, then wait
        let request = archwire::encode_call(call)?;
        let exchanged = transport.send(&request).and_then(|()| {
            debug!(library = %call.library, procedure = %call.procedure, "call sent");
            transport.recv()
        });
        let response = match exchanged {
            Ok(Some(response)) => response,
            Ok(None) => {
                let lost = transport::Error::ConnectionLost("helper closed the channel mid-call".into());
                return Err(self.transport_failed(lost));
            }
            Err(e) => return Err(self.transport_failed(e)),
        };

        // interpret
        let Frame::Outcome(outcome) = Frame::decode(&response)? else {
            return Err(Error::Protocol("received a Call frame while waiting for an Outcome".into()));
        };
        let (return_value, parameters) = match outcome {
            CallOutcome::Completed { return_value, parameters } => (return_value, parameters),
            CallOutcome::Failed(failure) => {
                return Err(Error::Remote { kind: failure.kind, message: failure.message });
            }
        };

        check_outcome(call, return_value.as_ref(), &parameters)?;
        for (param, value) in call.parameters.iter_mut().zip(parameters) {
            if param.ty.by_ref {
                param.value = value;
            }
        }
        Ok(return_value)
    }

    fn transport_failed(&mut self, err: transport::Error) -> Error {
        if let transport::Error::PayloadTooLarge { size, limit } = err {
            return Error::Protocol(format!("message of {} bytes exceeds the limit of {}", size, limit));
        }
        warn!("channel broken, closing dispatcher: {}", err);
        self.transport = None;
        Error::Transport(err)
    }

    /// Sends the close descriptor once and releases the transport. Later
    /// calls are no-ops.
    pub fn close(&mut self) {
        let Some(mut transport) = self.transport.take() else {
            return;
        };
        let sent = archwire::encode_call(&CallDescriptor::close())
            .map_err(Error::from)
            .and_then(|bytes| transport.send(&bytes).map_err(Error::from));
        match sent {
            Ok(()) => debug!("close sent"),
            Err(e) => warn!("could not deliver close: {}", e),
        }
    }
}

impl Drop for CallDispatcher {
    fn drop(&mut self) {
        self.close();
    }
}

/// Checks that an outcome actually answers `call` before anything is written
/// back.
fn check_outcome(call: &CallDescriptor, return_value: Option<&Value>, parameters: &[Value]) -> Result<()> {
    if parameters.len() != call.parameters.len() {
        return Err(Error::Protocol(format!(
            "outcome carries {} parameters but the call had {}",
            parameters.len(),
            call.parameters.len()
        )));
    }
    for (i, (param, value)) in call.parameters.iter().zip(parameters).enumerate() {
        if param.ty.kind != value.kind() {
            return Err(Error::Protocol(format!(
                "parameter {} came back as {:?}, expected {:?}",
                i,
                value.kind(),
                param.ty.kind
            )));
        }
    }
    match (call.return_type, return_value) {
        (None, Some(value)) => Err(Error::Protocol(format!(
            "void procedure returned a {:?}",
            value.kind()
        ))),
        (Some(ty), Some(value)) if ty.kind != value.kind() => Err(Error::Protocol(format!(
            "return value came back as {:?}, expected {:?}",
            value.kind(),
            ty.kind
        ))),
        _ => Ok(()),
    }
}
