//! # Archpack
//!
//! The tag-length-value layer underneath the archbridge wire protocol.
//!
//! ## Layout
//!
//! - **Scalars**: `[Tag: 1b][Data: N]`
//! - **Strings**: `[Tag: 1b][Len: 4b][UTF-8: Len]`
//! - **Containers**: `[Tag: 1b][Len: 4b][Body: Len]`
//!
//! All integers are little-endian. Every scalar carries its own tag, so a reader
//! always knows the exact width and signedness of what it is looking at; nothing
//! is inferred from context.
//!
//! ## Invariants
//!
//! - The `Encoder` keeps an explicit scope stack and back-patches container
//!   lengths. Strict scopes (option, result, variant) hold exactly one item.
//! - The `Decoder` is a bounds-checked view over a borrowed slice. Every read
//!   returns `Result`; malformed input never panics.

mod decoder;
mod encoder;
mod error;
mod tag;

pub use decoder::Decoder;
pub use decoder::ListIter;
pub use decoder::MapIter;
pub use encoder::Encoder;
pub use error::Error;
pub use error::Result;
pub use tag::Scope;
pub use tag::Tag;

#[cfg(test)]
mod tests;
