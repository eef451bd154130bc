//! # Protocol Frames
//!
//! The envelope around the two messages of the protocol.
//!
//! ```text
//! Call    := Variant("Call", Map{ version, library, procedure, parameters,
//!                                 return_type, convention, encoding, session })
//! Outcome := Variant("Outcome", Ok(Map{ version, return_value, parameters })
//!                             | Err(Map{ version, kind, message }))
//! ```
//!
//! ## Invariants
//! - **Panic Safety**: every decoding path returns `Result`.
//! - **Forward Compatibility**: unknown map keys are skipped.
//! - **Exactness**: one frame per buffer; leftover bytes are rejected.

use crate::codec::decode_type;
use crate::codec::decode_value;
use crate::codec::encode_type;
use crate::codec::encode_value;
use crate::codec::read_convention;
use crate::codec::read_encoding;
use crate::codec::read_error_kind;
use crate::codec::read_session;
use crate::codec::write_str;
use crate::codec::write_tag;
use crate::codec::write_u8;
use crate::error::Error;
use crate::error::Result;
use crate::model::CallDescriptor;
use crate::model::CallOutcome;
use crate::model::ErrorDescriptor;
use crate::model::Parameter;

use archpack::Decoder;
use archpack::Encoder;

/// Version written into, and required of, every frame.
pub const WIRE_VERSION: u8 = 1;

/// A decoded message.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Call(CallDescriptor),
    Outcome(CallOutcome),
}

impl Frame {
    /// Decodes exactly one frame from `bytes`.
    ///
    /// # Errors
    /// Any structural problem, unknown frame name, wrong version, missing field,
    /// or trailing data. Never panics.
    pub fn decode(bytes: &[u8]) -> Result<Frame> {
        let mut dec = Decoder::new(bytes);
        let (name, body) = dec.variant()?;
        let frame = match name {
            "Call" => Frame::Call(decode_call(body)?),
            "Outcome" => Frame::Outcome(decode_outcome(body)?),
            other => return Err(Error::UnknownVariant(format!("Top-level frame: {}", other))),
        };
        if !dec.is_empty() {
            return Err(Error::TrailingBytes(dec.remaining()));
        }
        Ok(frame)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        match self {
            Frame::Call(call) => encode_call(call),
            Frame::Outcome(outcome) => encode_outcome(outcome),
        }
    }
}

pub fn encode_call(call: &CallDescriptor) -> Result<Vec<u8>> {
    let mut enc = Encoder::new();
    enc.variant_begin("Call")?;
    enc.map_begin()?;

    write_u8(&mut enc, "version", WIRE_VERSION)?;
    write_str(&mut enc, "library", &call.library)?;
    write_str(&mut enc, "procedure", &call.procedure)?;

    enc.variant_begin("parameters")?;
    enc.list_begin()?;
    for param in &call.parameters {
        enc.map_begin()?;
        enc.variant_begin("value")?;
        encode_value(&mut enc, &param.value)?;
        enc.variant_end()?;
        enc.variant_begin("type")?;
        encode_type(&mut enc, &param.ty)?;
        enc.variant_end()?;
        enc.map_end()?;
    }
    enc.list_end()?;
    enc.variant_end()?;

    enc.variant_begin("return_type")?;
    match &call.return_type {
        Some(ty) => {
            enc.some_begin()?;
            encode_type(&mut enc, ty)?;
            enc.some_end()?;
        }
        None => enc.none()?,
    }
    enc.variant_end()?;

    write_tag(&mut enc, "convention", call.convention.as_tag())?;
    write_tag(&mut enc, "encoding", call.encoding.as_tag())?;
    write_tag(&mut enc, "session", call.session.as_tag())?;

    enc.map_end()?;
    enc.variant_end()?;
    Ok(enc.into_bytes()?)
}

pub fn encode_outcome(outcome: &CallOutcome) -> Result<Vec<u8>> {
    let mut enc = Encoder::new();
    enc.variant_begin("Outcome")?;

    match outcome {
        CallOutcome::Completed { return_value, parameters } => {
            enc.ok_begin()?;
            enc.map_begin()?;

            write_u8(&mut enc, "version", WIRE_VERSION)?;

            enc.variant_begin("return_value")?;
            match return_value {
                Some(val) => {
                    enc.some_begin()?;
                    encode_value(&mut enc, val)?;
                    enc.some_end()?;
                }
                None => enc.none()?,
            }
            enc.variant_end()?;

            enc.variant_begin("parameters")?;
            enc.list_begin()?;
            for val in parameters {
                encode_value(&mut enc, val)?;
            }
            enc.list_end()?;
            enc.variant_end()?;

            enc.map_end()?;
            enc.ok_end()?;
        }
        CallOutcome::Failed(error) => {
            enc.err_begin()?;
            enc.map_begin()?;

            write_u8(&mut enc, "version", WIRE_VERSION)?;
            write_tag(&mut enc, "kind", error.kind.as_tag())?;
            write_str(&mut enc, "message", &error.message)?;

            enc.map_end()?;
            enc.err_end()?;
        }
    }

    enc.variant_end()?;
    Ok(enc.into_bytes()?)
}

fn check_version(version: Option<u8>) -> Result<()> {
    match version {
        Some(WIRE_VERSION) => Ok(()),
        Some(other) => Err(Error::UnsupportedVersion(other)),
        None => Err(Error::MissingField("version")),
    }
}

fn decode_call(mut body: Decoder) -> Result<CallDescriptor> {
    let mut map = body.map()?;
    let mut version = None;
    let mut library = None;
    let mut procedure = None;
    let mut parameters = None;
    let mut return_type = None;
    let mut convention = None;
    let mut encoding = None;
    let mut session = None;

    while let Some((key, mut val)) = map.next_entry()? {
        match key {
            "version" => version = Some(val.u8()?),
            "library" => library = Some(val.str()?.to_owned()),
            "procedure" => procedure = Some(val.str()?.to_owned()),
            "parameters" => parameters = Some(decode_parameters(&mut val)?),
            "return_type" => {
                return_type = Some(match val.option()? {
                    Some(mut inner) => Some(decode_type(&mut inner)?),
                    None => None,
                })
            }
            "convention" => convention = Some(read_convention(&mut val)?),
            "encoding" => encoding = Some(read_encoding(&mut val)?),
            "session" => session = Some(read_session(&mut val)?),
            _ => val.skip()?,
        }
    }

    check_version(version)?;
    Ok(CallDescriptor {
        library: library.ok_or(Error::MissingField("library"))?,
        procedure: procedure.ok_or(Error::MissingField("procedure"))?,
        parameters: parameters.ok_or(Error::MissingField("parameters"))?,
        return_type: return_type.ok_or(Error::MissingField("return_type"))?,
        convention: convention.ok_or(Error::MissingField("convention"))?,
        encoding: encoding.ok_or(Error::MissingField("encoding"))?,
        session: session.ok_or(Error::MissingField("session"))?,
    })
}

fn decode_parameters(dec: &mut Decoder) -> Result<Vec<Parameter>> {
    let mut items = dec.list()?;
    let mut parameters = Vec::new();

    while let Some(mut item) = items.next_item()? {
        let mut map = item.map()?;
        let mut value = None;
        let mut ty = None;
        while let Some((key, mut val)) = map.next_entry()? {
            match key {
                "value" => value = Some(decode_value(&mut val)?),
                "type" => ty = Some(decode_type(&mut val)?),
                _ => val.skip()?,
            }
        }
        parameters.push(Parameter {
            value: value.ok_or(Error::MissingField("value"))?,
            ty: ty.ok_or(Error::MissingField("type"))?,
        });
    }

    Ok(parameters)
}

fn decode_outcome(mut body: Decoder) -> Result<CallOutcome> {
    match body.result()? {
        Ok(mut ok_body) => decode_completed(&mut ok_body),
        Err(mut err_body) => decode_failed(&mut err_body),
    }
}

fn decode_completed(dec: &mut Decoder) -> Result<CallOutcome> {
    let mut map = dec.map()?;
    let mut version = None;
    let mut return_value = None;
    let mut parameters = None;

    while let Some((key, mut val)) = map.next_entry()? {
        match key {
            "version" => version = Some(val.u8()?),
            "return_value" => {
                return_value = Some(match val.option()? {
                    Some(mut inner) => Some(decode_value(&mut inner)?),
                    None => None,
                })
            }
            "parameters" => {
                let mut items = val.list()?;
                let mut values = Vec::new();
                while let Some(mut item) = items.next_item()? {
                    values.push(decode_value(&mut item)?);
                }
                parameters = Some(values);
            }
            _ => val.skip()?,
        }
    }

    check_version(version)?;
    Ok(CallOutcome::Completed {
        return_value: return_value.ok_or(Error::MissingField("return_value"))?,
        parameters: parameters.ok_or(Error::MissingField("parameters"))?,
    })
}

fn decode_failed(dec: &mut Decoder) -> Result<CallOutcome> {
    let mut map = dec.map()?;
    let mut version = None;
    let mut kind = None;
    let mut message = None;

    while let Some((key, mut val)) = map.next_entry()? {
        match key {
            "version" => version = Some(val.u8()?),
            "kind" => kind = Some(read_error_kind(&mut val)?),
            "message" => message = Some(val.str()?.to_owned()),
            _ => val.skip()?,
        }
    }

    check_version(version)?;
    Ok(CallOutcome::Failed(ErrorDescriptor {
        kind: kind.ok_or(Error::MissingField("kind"))?,
        message: message.ok_or(Error::MissingField("message"))?,
    }))
}
