//! # Codec
//!
//! Translation between the call model and `archpack` items.
//!
//! ## Invariants
//! - **Self-describing values**: every `Value` is written with the archpack tag
//!   of its kind, so a reader never needs the request to decode a reply.
//! - **Enums by name**: model enums travel as unit variants named by `as_tag`.

use crate::error::Error;
use crate::error::Result;
use crate::model::CallingConvention;
use crate::model::ErrorKind;
use crate::model::Kind;
use crate::model::SessionControl;
use crate::model::TextEncoding;
use crate::model::TypeDesc;
use crate::model::Value;

use archpack::Decoder;
use archpack::Encoder;
use archpack::Tag;

pub fn encode_value(enc: &mut Encoder, val: &Value) -> Result<()> {
    match val {
        Value::Bool(v) => enc.bool(*v)?,
        Value::I8(v) => enc.i8(*v)?,
        Value::U8(v) => enc.u8(*v)?,
        Value::I16(v) => enc.i16(*v)?,
        Value::U16(v) => enc.u16(*v)?,
        Value::I32(v) => enc.i32(*v)?,
        Value::U32(v) => enc.u32(*v)?,
        Value::I64(v) => enc.i64(*v)?,
        Value::U64(v) => enc.u64(*v)?,
        Value::F32(v) => enc.f32(*v)?,
        Value::F64(v) => enc.f64(*v)?,
        Value::Pointer(v) => enc.addr(*v)?,
        Value::Str(v) => enc.str(v)?,
    }
    Ok(())
}

/// Reads one value, choosing the case from the wire tag.
pub fn decode_value(dec: &mut Decoder) -> Result<Value> {
    let val = match dec.peek_tag()? {
        Tag::True | Tag::False => Value::Bool(dec.bool()?),
        Tag::I8 => Value::I8(dec.i8()?),
        Tag::U8 => Value::U8(dec.u8()?),
        Tag::I16 => Value::I16(dec.i16()?),
        Tag::U16 => Value::U16(dec.u16()?),
        Tag::I32 => Value::I32(dec.i32()?),
        Tag::U32 => Value::U32(dec.u32()?),
        Tag::I64 => Value::I64(dec.i64()?),
        Tag::U64 => Value::U64(dec.u64()?),
        Tag::F32 => Value::F32(dec.f32()?),
        Tag::F64 => Value::F64(dec.f64()?),
        Tag::Addr => Value::Pointer(dec.addr()?),
        Tag::Str => Value::Str(dec.str()?.to_owned()),
        other => return Err(Error::UnknownVariant(format!("value tag {:?}", other))),
    };
    Ok(val)
}

/// `TypeDesc` is a map: `kind`, `by_ref`, `encoding` (option).
pub fn encode_type(enc: &mut Encoder, ty: &TypeDesc) -> Result<()> {
    enc.map_begin()?;

    enc.variant_begin("kind")?;
    enc.unit_variant(ty.kind.as_tag())?;
    enc.variant_end()?;

    enc.variant_begin("by_ref")?;
    enc.bool(ty.by_ref)?;
    enc.variant_end()?;

    enc.variant_begin("encoding")?;
    match ty.encoding {
        Some(encoding) => {
            enc.some_begin()?;
            enc.unit_variant(encoding.as_tag())?;
            enc.some_end()?;
        }
        None => enc.none()?,
    }
    enc.variant_end()?;

    enc.map_end()?;
    Ok(())
}

pub fn decode_type(dec: &mut Decoder) -> Result<TypeDesc> {
    let mut map = dec.map()?;
    let mut kind = None;
    let mut by_ref = None;
    let mut encoding = None;

    while let Some((key, mut val)) = map.next_entry()? {
        match key {
            "kind" => kind = Some(Kind::from_tag(val.unit_variant()?)?),
            "by_ref" => by_ref = Some(val.bool()?),
            "encoding" => {
                encoding = Some(match val.option()? {
                    Some(mut inner) => Some(TextEncoding::from_tag(inner.unit_variant()?)?),
                    None => None,
                })
            }
            _ => val.skip()?,
        }
    }

    Ok(TypeDesc {
        kind: kind.ok_or(Error::MissingField("kind"))?,
        by_ref: by_ref.ok_or(Error::MissingField("by_ref"))?,
        encoding: encoding.ok_or(Error::MissingField("encoding"))?,
    })
}

// Map entry helpers

pub(crate) fn write_u8(enc: &mut Encoder, key: &str, val: u8) -> Result<()> {
    enc.variant_begin(key)?;
    enc.u8(val)?;
    enc.variant_end()?;
    Ok(())
}

pub(crate) fn write_str(enc: &mut Encoder, key: &str, val: &str) -> Result<()> {
    enc.variant_begin(key)?;
    enc.str(val)?;
    enc.variant_end()?;
    Ok(())
}

pub(crate) fn write_tag(enc: &mut Encoder, key: &str, tag: &str) -> Result<()> {
    enc.variant_begin(key)?;
    enc.unit_variant(tag)?;
    enc.variant_end()?;
    Ok(())
}

pub(crate) fn read_convention(dec: &mut Decoder) -> Result<CallingConvention> {
    CallingConvention::from_tag(dec.unit_variant()?)
}

pub(crate) fn read_encoding(dec: &mut Decoder) -> Result<TextEncoding> {
    TextEncoding::from_tag(dec.unit_variant()?)
}

pub(crate) fn read_session(dec: &mut Decoder) -> Result<SessionControl> {
    SessionControl::from_tag(dec.unit_variant()?)
}

pub(crate) fn read_error_kind(dec: &mut Decoder) -> Result<ErrorKind> {
    ErrorKind::from_tag(dec.unit_variant()?)
}
