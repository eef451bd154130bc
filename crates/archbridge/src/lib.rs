//! # Archbridge
//!
//! Calls into native libraries of another architecture by running them in a
//! helper process and talking to it over a private channel.
//!
//! ## Architecture
//!
//! ```text
//!  client process                         helper process (archbridge-host)
//!  Session                                 RequestLoop
//!    CallDispatcher --CallDescriptor-->      CallHandler (archcall::Engine)
//!                   <--CallOutcome-----
//!    Channel  ======== <token>.sock ========  Channel
//!    ProcessSupervisor ---- spawns ---->
//! ```
//!
//! The client side lives in `session`, `client`, `supervisor` and `interface`;
//! the helper side is `server`. `channel` and `transport` are shared.

pub mod channel;
pub mod client;
pub mod config;
pub mod error;
pub mod interface;
pub mod server;
pub mod session;
pub mod supervisor;
pub mod token;
pub mod transport;

mod framing;

pub use channel::Channel;
pub use channel::ChannelOptions;
pub use channel::Role;
pub use client::CallDispatcher;
pub use config::Architecture;
pub use config::BridgeConfig;
pub use error::Error;
pub use error::Result;
pub use interface::LibraryInterface;
pub use interface::ProcedureSpec;
pub use server::CallHandler;
pub use server::LoopExit;
pub use server::LoopState;
pub use server::RequestLoop;
pub use session::Session;
pub use supervisor::HelperProcess;
pub use supervisor::ProcessSupervisor;
pub use supervisor::Supervisor;
pub use token::ChannelToken;
pub use transport::Transport;
