//! # Decoder
//!
//! A zero-copy cursor over a byte slice. Reads advance the cursor; container
//! reads hand back a new `Decoder` restricted to the container body.

use crate::error::Error;
use crate::error::Result;
use crate::tag::Scope;
use crate::tag::Tag;

#[derive(Debug, Clone)]
pub struct Decoder<'a> {
    buf: &'a [u8],
}

macro_rules! fixed_readers {
    ($($name:ident: $ty:ty => $tag:expr;)*) => {
        $(
            pub fn $name(&mut self) -> Result<$ty> {
                self.expect($tag)?;
                let raw = self.take_array()?;
                Ok(<$ty>::from_le_bytes(raw))
            }
        )*
    };
}

impl<'a> Decoder<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Returns the next tag without consuming it.
    pub fn peek_tag(&self) -> Result<Tag> {
        let &b = self.buf.first().ok_or(Error::UnexpectedEnd)?;
        Tag::from_u8(b).ok_or(Error::InvalidTag(b))
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.buf.len() {
            return Err(Error::UnexpectedEnd);
        }
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        Ok(head)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let bytes = self.take(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    fn take_len(&mut self) -> Result<usize> {
        Ok(u32::from_le_bytes(self.take_array()?) as usize)
    }

    fn expect(&mut self, expected: Tag) -> Result<()> {
        let tag = self.peek_tag()?;
        if tag != expected {
            return Err(Error::UnexpectedTag { expected: tag_name(expected), found: tag as u8 });
        }
        self.take(1)?;
        Ok(())
    }

    fn enter(&mut self, expected: Tag) -> Result<Decoder<'a>> {
        self.expect(expected)?;
        let len = self.take_len()?;
        Ok(Decoder::new(self.take(len)?))
    }

    /// Enters a scope whose body must hold exactly one item.
    fn enter_single(&mut self, expected: Tag, scope: Scope) -> Result<Decoder<'a>> {
        let body = self.enter(expected)?;
        body.check_single(scope)?;
        Ok(body)
    }

    fn check_single(&self, scope: Scope) -> Result<()> {
        if self.is_empty() {
            return Err(Error::EmptyScope(scope));
        }
        let mut rest = self.clone();
        rest.skip()?;
        if !rest.is_empty() {
            return Err(Error::TooManyItems(scope));
        }
        Ok(())
    }

    /// Skips the next item including any nested children.
    pub fn skip(&mut self) -> Result<()> {
        let tag = self.peek_tag()?;
        self.take(1)?;
        let width = match tag.fixed_width() {
            Some(width) => width,
            None => self.take_len()?,
        };
        self.take(width)?;
        Ok(())
    }

    pub fn bool(&mut self) -> Result<bool> {
        match self.peek_tag()? {
            Tag::True => { self.take(1)?; Ok(true) }
            Tag::False => { self.take(1)?; Ok(false) }
            other => Err(Error::UnexpectedTag { expected: "bool", found: other as u8 }),
        }
    }

    fixed_readers! {
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
        addr: u64 => Tag::Addr;
    }

    pub fn unit(&mut self) -> Result<()> {
        self.expect(Tag::Unit)
    }

    pub fn str(&mut self) -> Result<&'a str> {
        self.expect(Tag::Str)?;
        let len = self.take_len()?;
        std::str::from_utf8(self.take(len)?).map_err(|_| Error::InvalidUtf8)
    }

    pub fn list(&mut self) -> Result<ListIter<'a>> {
        Ok(ListIter { dec: self.enter(Tag::List)? })
    }

    pub fn map(&mut self) -> Result<MapIter<'a>> {
        Ok(MapIter { dec: self.enter(Tag::Map)? })
    }

    /// Returns a decoder over the payload for `Some`, or `None`.
    pub fn option(&mut self) -> Result<Option<Decoder<'a>>> {
        match self.peek_tag()? {
            Tag::None => { self.take(1)?; Ok(None) }
            Tag::Some => Ok(Some(self.enter_single(Tag::Some, Scope::Option)?)),
            other => Err(Error::UnexpectedTag { expected: "option", found: other as u8 }),
        }
    }

    /// Returns the payload decoder on the matching side of a result.
    pub fn result(&mut self) -> Result<std::result::Result<Decoder<'a>, Decoder<'a>>> {
        match self.peek_tag()? {
            Tag::Ok => Ok(Ok(self.enter_single(Tag::Ok, Scope::Result)?)),
            Tag::Err => Ok(Err(self.enter_single(Tag::Err, Scope::Result)?)),
            other => Err(Error::UnexpectedTag { expected: "result", found: other as u8 }),
        }
    }

    /// Returns `(name, payload)`. The payload holds exactly one item.
    pub fn variant(&mut self) -> Result<(&'a str, Decoder<'a>)> {
        let mut body = self.enter(Tag::Variant)?;
        let name = body.str()?;
        body.check_single(Scope::Variant)?;
        Ok((name, body))
    }

    /// Reads a variant whose payload must be unit and returns its name.
    pub fn unit_variant(&mut self) -> Result<&'a str> {
        let (name, mut body) = self.variant()?;
        body.unit()?;
        Ok(name)
    }
}

fn tag_name(tag: Tag) -> &'static str {
    match tag {
        Tag::True | Tag::False => "bool",
        Tag::U8 => "u8",
        Tag::U16 => "u16",
        Tag::U32 => "u32",
        Tag::U64 => "u64",
        Tag::I8 => "i8",
        Tag::I16 => "i16",
        Tag::I32 => "i32",
        Tag::I64 => "i64",
        Tag::F32 => "f32",
        Tag::F64 => "f64",
        Tag::Addr => "addr",
        Tag::Unit => "unit",
        Tag::None | Tag::Some => "option",
        Tag::Str => "string",
        Tag::List => "list",
        Tag::Map => "map",
        Tag::Ok | Tag::Err => "result",
        Tag::Variant => "variant",
    }
}

/// Items of a list, one sub-decoder per item.
#[derive(Debug)]
pub struct ListIter<'a> {
    dec: Decoder<'a>,
}

impl<'a> ListIter<'a> {
    /// Returns the next item, `Ok(None)` at the end, or an error if the
    /// remaining bytes do not form a whole item.
    pub fn next_item(&mut self) -> Result<Option<Decoder<'a>>> {
        if self.dec.is_empty() {
            return Ok(None);
        }
        let mut lookahead = self.dec.clone();
        lookahead.skip()?;
        let len = self.dec.remaining() - lookahead.remaining();
        Ok(Some(Decoder::new(self.dec.take(len)?)))
    }
}

/// Key/value entries of a map.
#[derive(Debug)]
pub struct MapIter<'a> {
    dec: Decoder<'a>,
}

impl<'a> MapIter<'a> {
    pub fn next_entry(&mut self) -> Result<Option<(&'a str, Decoder<'a>)>> {
        if self.dec.is_empty() {
            return Ok(None);
        }
        self.dec.variant().map(Some)
    }
}
