//! # Helper Process Supervision
//!
//! Starts the helper executable for one session and makes sure it is gone
//! when the session ends.
//!
//! ## Invariants
//! - The helper receives exactly one argument: the channel token.
//! - `stop` is idempotent and always reaps the child, so no zombie outlives
//!   the `HelperProcess` handle.

use std::path::Path;
use std::path::PathBuf;
use std::process::Child;
use std::process::Command;
use std::process::Stdio;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::config::BridgeConfig;
use crate::error::Error;
use crate::error::Result;
use crate::token::ChannelToken;

/// Tells the helper where to create its channel endpoint.
pub const CHANNEL_DIR_ENV: &str = "ARCHBRIDGE_CHANNEL_DIR";

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Launches helpers. Sessions go through this trait so tests can run the
/// helper side in-process.
pub trait Supervisor {
    fn start(&mut self, token: &ChannelToken) -> Result<Box<dyn HelperProcess>>;
}

/// A running (or finished) helper.
pub trait HelperProcess {
    /// `Some(description)` once the helper has exited.
    fn exit_status(&mut self) -> Option<String>;

    /// Asks the helper to go away, forcing it after the grace period.
    fn stop(&mut self);
}

/// Spawns the configured helper executable as a child process.
pub struct ProcessSupervisor {
    program: PathBuf,
    channel_dir: PathBuf,
    grace: Duration,
}

impl ProcessSupervisor {
    pub fn new(program: impl Into<PathBuf>, channel_dir: impl Into<PathBuf>, grace: Duration) -> Self {
        Self { program: program.into(), channel_dir: channel_dir.into(), grace }
    }

    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::new(config.helper_executable(), config.channel.dir.clone(), config.stop_grace)
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl Supervisor for ProcessSupervisor {
    fn start(&mut self, token: &ChannelToken) -> Result<Box<dyn HelperProcess>> {
        let child = Command::new(&self.program)
            .arg(token.as_str())
            .env(CHANNEL_DIR_ENV, &self.channel_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| Error::Launch(format!("{}: {}", self.program.display(), e)))?;

        info!(pid = child.id(), program = %self.program.display(), "helper started");
        Ok(Box::new(ChildProcess { child, grace: self.grace, reaped: None }))
    }
}

pub struct ChildProcess {
    child: Child,
    grace: Duration,
    /// Exit description once the child has been waited on.
    reaped: Option<String>,
}

impl ChildProcess {
    fn poll(&mut self) -> Option<String> {
        if self.reaped.is_none() {
            match self.child.try_wait() {
                Ok(Some(status)) => self.reaped = Some(status.to_string()),
                Ok(None) => {}
                Err(e) => warn!(pid = self.child.id(), "cannot poll helper: {}", e),
            }
        }
        self.reaped.clone()
    }

    #[cfg(unix)]
    fn terminate(&mut self) {
        let pid = self.child.id() as libc::pid_t;
        // SAFETY: `pid` is our own child and has not been reaped (`poll` saw it
        // running), so the id cannot have been reused by another process.
        unsafe {
            let _ = libc::kill(pid, libc::SIGTERM);
        }
    }

    #[cfg(not(unix))]
    fn terminate(&mut self) {
        let _ = self.child.kill();
    }
}

impl HelperProcess for ChildProcess {
    fn exit_status(&mut self) -> Option<String> {
        self.poll()
    }

    fn stop(&mut self) {
        if let Some(status) = self.poll() {
            debug!(pid = self.child.id(), %status, "helper already exited");
            return;
        }

        self.terminate();
        let deadline = Instant::now() + self.grace;
        while Instant::now() < deadline {
            if self.poll().is_some() {
                debug!(pid = self.child.id(), "helper stopped");
                return;
            }
            thread::sleep(POLL_INTERVAL);
        }

        warn!(pid = self.child.id(), grace = ?self.grace, "helper ignored termination, killing");
        let _ = self.child.kill();
        self.reaped = Some(match self.child.wait() {
            Ok(status) => status.to_string(),
            Err(e) => format!("lost: {}", e),
        });
    }
}

impl Drop for ChildProcess {
    fn drop(&mut self) {
        self.stop();
    }
}
