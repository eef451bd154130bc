//! # Archcall
//!
//! Dynamic native calls driven by data: a `CallDescriptor` names a library,
//! a procedure, argument types and values, and the `Engine` turns it into a real
//! foreign call through libffi.
//!
//! ## Philosophy
//! The engine trusts the descriptor's declared signature, because nothing else
//! describes the native function. It does check everything it can see: value
//! kinds against declared kinds, string contents, pointer widths. Whatever goes
//! wrong short of a native fault is reported as data, never as a panic.

mod abi;
mod engine;
mod error;
mod marshal;
mod resolver;

pub use engine::Engine;
pub use error::Error;
pub use error::Result;
pub use resolver::LibraryResolver;
pub use resolver::NativeLibrary;
pub use resolver::SearchPathResolver;
