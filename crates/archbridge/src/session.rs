//! # Session
//!
//! One client's exclusive bridge: a helper process, the channel to it and the
//! dispatcher on top.
//!
//! ## Invariants
//! - Acquired in the order token, process, channel; released in reverse.
//! - No helper outlives a failed `start`.
//! - After `close` the helper gets the stop grace period to exit by itself
//!   before it is terminated.

use std::thread;
use std::time::Duration;
use std::time::Instant;

use archwire::CallDescriptor;
use archwire::Value;
use tracing::info;

use crate::channel::Channel;
use crate::client::CallDispatcher;
use crate::config::BridgeConfig;
use crate::error::Error;
use crate::error::Result;
use crate::interface::LibraryInterface;
use crate::supervisor::HelperProcess;
use crate::supervisor::ProcessSupervisor;
use crate::supervisor::Supervisor;
use crate::token::ChannelToken;

const EXIT_POLL: Duration = Duration::from_millis(5);

pub struct Session {
    token: ChannelToken,
    dispatcher: CallDispatcher,
    helper: Box<dyn HelperProcess>,
    exit_wait: Duration,
}

impl Session {
    /// Launches the configured helper and connects to it.
    pub fn start(config: &BridgeConfig) -> Result<Session> {
        let mut supervisor = ProcessSupervisor::from_config(config);
        Self::with_supervisor(config, &mut supervisor)
    }

    pub fn with_supervisor(config: &BridgeConfig, supervisor: &mut dyn Supervisor) -> Result<Session> {
        let token = ChannelToken::generate();
        let mut helper = supervisor.start(&token)?;

        let connected = Channel::connect_with(&token, &config.channel, || match helper.exit_status() {
            Some(status) => Err(Error::Connect(format!("helper exited before connecting: {}", status))),
            None => Ok(()),
        });
        let channel = match connected {
            Ok(channel) => channel,
            Err(e) => {
                helper.stop();
                return Err(e);
            }
        };

        info!(%token, "session started");
        Ok(Session {
            token,
            dispatcher: CallDispatcher::new(channel),
            helper,
            exit_wait: config.stop_grace,
        })
    }

    pub fn token(&self) -> &ChannelToken {
        &self.token
    }

    pub fn is_closed(&self) -> bool {
        self.dispatcher.is_closed()
    }

    pub fn invoke(&mut self, call: &mut CallDescriptor) -> Result<Option<Value>> {
        self.dispatcher.invoke(call)
    }

    /// Calls a method of `interface`. By-reference results are written back
    /// into `args`.
    pub fn call(&mut self, interface: &LibraryInterface, method: &str, args: &mut [Value]) -> Result<Option<Value>> {
        let mut call = interface.descriptor(method, args)?;
        let returned = self.dispatcher.invoke(&mut call)?;
        for (arg, param) in args.iter_mut().zip(call.parameters) {
            if param.ty.by_ref {
                *arg = param.value;
            }
        }
        Ok(returned)
    }

    /// Signals the helper, drops the channel and stops the helper. Safe to
    /// call more than once.
    pub fn close(&mut self) {
        if !self.dispatcher.is_closed() {
            info!(token = %self.token, "session closing");
            self.dispatcher.close();
            self.await_helper_exit();
        }
        self.helper.stop();
    }

    fn await_helper_exit(&mut self) {
        let deadline = Instant::now() + self.exit_wait;
        while self.helper.exit_status().is_none() && Instant::now() < deadline {
            thread::sleep(EXIT_POLL);
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}
