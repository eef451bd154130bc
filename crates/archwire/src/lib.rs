//! # Archwire
//!
//! The call/result data model of archbridge and its versioned binary encoding.
//!
//! ## Architecture
//!
//! `model` holds plain data: what to call (`CallDescriptor`) and what came
//! back (`CallOutcome`). `frame` wraps each in a versioned envelope on top of
//! `archpack`; `codec` owns the per-value and per-type translation. Nothing in
//! this crate performs I/O.

mod codec;
mod error;
mod frame;
mod model;

pub use error::Error;
pub use error::Result;
pub use frame::encode_call;
pub use frame::encode_outcome;
pub use frame::Frame;
pub use frame::WIRE_VERSION;
pub use model::CallDescriptor;
pub use model::CallOutcome;
pub use model::CallingConvention;
pub use model::ErrorDescriptor;
pub use model::ErrorKind;
pub use model::Kind;
pub use model::Parameter;
pub use model::SessionControl;
pub use model::TextEncoding;
pub use model::TypeDesc;
pub use model::Value;

#[cfg(test)]
mod tests;
