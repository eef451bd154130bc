//! # Configuration
//!
//! Everything a `Session` needs to know before it starts: which helper to
//! launch and how patient to be with it.

use std::env::consts::EXE_SUFFIX;
use std::path::PathBuf;
use std::time::Duration;

use crate::channel::ChannelOptions;

/// Overrides the helper executable when none is configured explicitly.
pub const HOST_ENV: &str = "ARCHBRIDGE_HOST";

/// Architecture the helper process must run as. It must match the library
/// that will be loaded into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Architecture {
    X86,
    Amd64,
    /// Whatever this process is built for.
    #[default]
    Native,
}

impl Architecture {
    /// File stem of the helper built for this architecture.
    pub fn helper_name(self) -> &'static str {
        match self {
            Architecture::X86 => "archbridge-host32",
            Architecture::Amd64 => "archbridge-host64",
            Architecture::Native => "archbridge-host",
        }
    }
}

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub architecture: Architecture,
    /// Explicit helper path; bypasses every lookup.
    pub helper: Option<PathBuf>,
    pub channel: ChannelOptions,
    /// How long a helper gets to exit after being asked to before it is killed.
    pub stop_grace: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            architecture: Architecture::Native,
            helper: None,
            channel: ChannelOptions::default(),
            stop_grace: Duration::from_secs(2),
        }
    }
}

impl BridgeConfig {
    pub fn builder() -> BridgeConfigBuilder {
        BridgeConfigBuilder { config: BridgeConfig::default() }
    }

    /// The executable to launch: the configured path, else `ARCHBRIDGE_HOST`,
    /// else the helper next to the current executable, else the bare name for
    /// the system search path.
    pub fn helper_executable(&self) -> PathBuf {
        if let Some(path) = &self.helper {
            return path.clone();
        }
        if let Some(path) = std::env::var_os(HOST_ENV).filter(|v| !v.is_empty()) {
            return PathBuf::from(path);
        }

        let file = format!("{}{}", self.architecture.helper_name(), EXE_SUFFIX);
        let sibling = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join(&file)))
            .filter(|path| path.is_file());
        sibling.unwrap_or_else(|| PathBuf::from(file))
    }
}

pub struct BridgeConfigBuilder {
    config: BridgeConfig,
}

impl BridgeConfigBuilder {
    pub fn architecture(mut self, architecture: Architecture) -> Self {
        self.config.architecture = architecture;
        self
    }

    pub fn helper_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.helper = Some(path.into());
        self
    }

    pub fn channel_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.channel.dir = dir.into();
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.channel.connect_timeout = timeout;
        self
    }

    pub fn retry_interval(mut self, interval: Duration) -> Self {
        self.config.channel.retry_interval = interval;
        self
    }

    pub fn max_message_size(mut self, bytes: usize) -> Self {
        self.config.channel.max_message_size = bytes;
        self
    }

    pub fn stop_grace(mut self, grace: Duration) -> Self {
        self.config.stop_grace = grace;
        self
    }

    pub fn build(self) -> BridgeConfig {
        self.config
    }
}
