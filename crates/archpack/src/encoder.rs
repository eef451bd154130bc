//! # Encoder
//!
//! Writes items into a growable buffer while tracking open containers.
//!
//! ## Structural rules
//!
//! 1. A `Map` scope only accepts variants (key/value entries).
//! 2. `Option`, `Result`, and `Variant` scopes hold exactly one item; writing a
//!    second one or closing them empty is an error.
//! 3. Bytes can only be taken once every scope is closed again.

use crate::error::Error;
use crate::error::Result;
use crate::tag::Scope;
use crate::tag::Tag;

struct Frame {
    /// Offset of the first body byte, right after the length placeholder.
    body: usize,
    scope: Scope,
    items: usize,
}

pub struct Encoder {
    buf: Vec<u8>,
    /// Never empty; the bottom frame is `Scope::Root`.
    stack: Vec<Frame>,
}

macro_rules! fixed_writers {
    ($($(#[$doc:meta])* $name:ident: $ty:ty => $tag:expr;)*) => {
        $(
            $(#[$doc])*
            pub fn $name(&mut self, v: $ty) -> Result<()> {
                self.write_tag($tag)?;
                self.buf.extend_from_slice(&v.to_le_bytes());
                self.item_written();
                Ok(())
            }
        )*
    };
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Encoder {
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(256),
            stack: vec![Frame { body: 0, scope: Scope::Root, items: 0 }],
        }
    }

    /// Consumes the encoder and returns the finished bytes.
    ///
    /// # Errors
    /// `Error::ScopeStillOpen` if any container was left open.
    pub fn into_bytes(self) -> Result<Vec<u8>> {
        if self.stack.len() > 1 {
            return Err(Error::ScopeStillOpen);
        }
        Ok(self.buf)
    }

    fn frame(&mut self) -> &mut Frame {
        let last = self.stack.len() - 1;
        &mut self.stack[last]
    }

    fn check_write(&mut self, tag: Tag) -> Result<()> {
        let frame = self.frame();
        match frame.scope {
            Scope::Root | Scope::List => Ok(()),
            Scope::Map if tag == Tag::Variant => Ok(()),
            Scope::Map => Err(Error::InvalidMapEntry),
            scope if frame.items >= 1 => Err(Error::TooManyItems(scope)),
            _ => Ok(()),
        }
    }

    fn item_written(&mut self) {
        self.frame().items += 1;
    }

    fn write_tag(&mut self, tag: Tag) -> Result<()> {
        self.check_write(tag)?;
        self.buf.push(tag as u8);
        Ok(())
    }

    fn write_len(&mut self, len: usize) -> Result<()> {
        let len = u32::try_from(len).map_err(|_| Error::TooLarge(len))?;
        self.buf.extend_from_slice(&len.to_le_bytes());
        Ok(())
    }

    fn open(&mut self, tag: Tag, scope: Scope) -> Result<()> {
        self.write_tag(tag)?;
        self.buf.extend_from_slice(&[0; 4]);
        let body = self.buf.len();
        self.stack.push(Frame { body, scope, items: 0 });
        Ok(())
    }

    fn close(&mut self, expected: Scope) -> Result<()> {
        if self.stack.len() <= 1 {
            return Err(Error::ScopeUnderflow);
        }

        let frame = self.frame();
        if frame.scope != expected {
            return Err(Error::ScopeMismatch { expected, actual: frame.scope });
        }
        if frame.scope.is_strict() && frame.items == 0 {
            return Err(Error::EmptyScope(frame.scope));
        }

        let body = frame.body;
        let len = self.buf.len() - body;
        let len = u32::try_from(len).map_err(|_| Error::TooLarge(len))?;
        self.buf[body - 4..body].copy_from_slice(&len.to_le_bytes());
        self.stack.pop();

        self.item_written();
        Ok(())
    }

    pub fn bool(&mut self, v: bool) -> Result<()> {
        self.write_tag(if v { Tag::True } else { Tag::False })?;
        self.item_written();
        Ok(())
    }

    fixed_writers! {
        u8: u8 => Tag::U8;
        u16: u16 => Tag::U16;
        u32: u32 => Tag::U32;
        u64: u64 => Tag::U64;
        i8: i8 => Tag::I8;
        i16: i16 => Tag::I16;
        i32: i32 => Tag::I32;
        i64: i64 => Tag::I64;
        f32: f32 => Tag::F32;
        f64: f64 => Tag::F64;
        /// Encodes an address. Always 8 bytes so 32- and 64-bit peers agree.
        addr: u64 => Tag::Addr;
    }

    pub fn unit(&mut self) -> Result<()> {
        self.write_tag(Tag::Unit)?;
        self.item_written();
        Ok(())
    }

    /// Encodes `Option::None`.
    pub fn none(&mut self) -> Result<()> {
        self.write_tag(Tag::None)?;
        self.item_written();
        Ok(())
    }

    pub fn str(&mut self, v: &str) -> Result<()> {
        self.write_tag(Tag::Str)?;
        self.write_len(v.len())?;
        self.buf.extend_from_slice(v.as_bytes());
        self.item_written();
        Ok(())
    }

    pub fn list_begin(&mut self) -> Result<()> { self.open(Tag::List, Scope::List) }
    pub fn list_end(&mut self) -> Result<()> { self.close(Scope::List) }

    /// Begins a map. Only `variant_begin` may be called directly inside it.
    pub fn map_begin(&mut self) -> Result<()> { self.open(Tag::Map, Scope::Map) }
    pub fn map_end(&mut self) -> Result<()> { self.close(Scope::Map) }

    pub fn some_begin(&mut self) -> Result<()> { self.open(Tag::Some, Scope::Option) }
    pub fn some_end(&mut self) -> Result<()> { self.close(Scope::Option) }

    pub fn ok_begin(&mut self) -> Result<()> { self.open(Tag::Ok, Scope::Result) }
    pub fn ok_end(&mut self) -> Result<()> { self.close(Scope::Result) }

    pub fn err_begin(&mut self) -> Result<()> { self.open(Tag::Err, Scope::Result) }
    pub fn err_end(&mut self) -> Result<()> { self.close(Scope::Result) }

    /// Begins a named variant. The name is written immediately; exactly one
    /// payload item must follow before `variant_end`.
    pub fn variant_begin(&mut self, name: &str) -> Result<()> {
        self.open(Tag::Variant, Scope::Variant)?;
        self.str(name)?;
        // the name is metadata, not the payload
        self.frame().items = 0;
        Ok(())
    }
    pub fn variant_end(&mut self) -> Result<()> { self.close(Scope::Variant) }

    /// Writes a variant whose payload is unit. Used for plain enum cases.
    pub fn unit_variant(&mut self, name: &str) -> Result<()> {
        self.variant_begin(name)?;
        self.unit()?;
        self.variant_end()
    }
}
