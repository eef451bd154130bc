use crate::*;
use archpack::Encoder;
use archpack::Error as PackError;
use archpack::Scope;
use archpack::Tag;

fn roundtrip(frame: Frame) -> anyhow::Result<()> {
    let bytes = frame.to_bytes()?;
    let decoded = Frame::decode(&bytes)?;
    assert_eq!(decoded, frame);
    Ok(())
}

fn sample_call() -> CallDescriptor {
    CallDescriptor::new("TestDll", "Mixed")
        .arg(true)
        .arg(-8i8)
        .arg(200u8)
        .arg(-16i16)
        .arg(60000u16)
        .arg_ref(1337i32)
        .arg(7777u32)
        .arg(i64::MIN)
        .arg(u64::MAX)
        .arg(0.5f32)
        .arg(-2.25f64)
        .param(Parameter::new(Value::Pointer(0x1000), TypeDesc::by_value(Kind::Pointer)))
        .param(Parameter::new(
            Value::Str("Hello World".into()),
            TypeDesc::by_reference(Kind::Str).with_encoding(TextEncoding::Unicode),
        ))
        .returns(TypeDesc::by_value(Kind::I32))
        .with_convention(CallingConvention::StdCall)
        .with_encoding(TextEncoding::Ansi)
}

// ============================================================================
//  ROUNDTRIP
// ============================================================================

#[test]
fn test_call_roundtrip_every_kind() -> anyhow::Result<()> {
    roundtrip(Frame::Call(sample_call()))
}

#[test]
fn test_call_roundtrip_void_no_params() -> anyhow::Result<()> {
    let call = CallDescriptor::new("lib", "noop");
    assert!(call.return_type.is_none());
    roundtrip(Frame::Call(call))
}

#[test]
fn test_close_descriptor_roundtrip() -> anyhow::Result<()> {
    let bytes = encode_call(&CallDescriptor::close())?;
    match Frame::decode(&bytes)? {
        Frame::Call(call) => {
            assert!(call.is_close());
            assert_eq!(call, CallDescriptor::close());
        }
        other => panic!("expected call, got {:?}", other),
    }
    Ok(())
}

#[test]
fn test_parameter_order_preserved() -> anyhow::Result<()> {
    let call = CallDescriptor::new("lib", "pair").arg_ref(1337i32).arg_ref(7777i32);
    let bytes = encode_call(&call)?;
    let Frame::Call(decoded) = Frame::decode(&bytes)? else {
        panic!("expected call frame");
    };
    assert_eq!(decoded.parameters[0].value, Value::I32(1337));
    assert_eq!(decoded.parameters[1].value, Value::I32(7777));
    Ok(())
}

#[test]
fn test_outcome_roundtrip() -> anyhow::Result<()> {
    roundtrip(Frame::Outcome(CallOutcome::Completed {
        return_value: Some(Value::Str("Hello World".into())),
        parameters: vec![Value::I32(1338), Value::Pointer(u64::MAX), Value::Bool(false)],
    }))?;
    roundtrip(Frame::Outcome(CallOutcome::Completed {
        return_value: None,
        parameters: vec![],
    }))?;
    roundtrip(Frame::Outcome(CallOutcome::failed(
        ErrorKind::ProcedureNotFound,
        "no symbol `Nope`",
    )))
}

#[test]
fn test_absent_and_present_return_differ_on_wire() -> anyhow::Result<()> {
    let none = encode_outcome(&CallOutcome::Completed { return_value: None, parameters: vec![] })?;
    let some = encode_outcome(&CallOutcome::Completed {
        return_value: Some(Value::Str(String::new())),
        parameters: vec![],
    })?;
    assert_ne!(none, some);
    Ok(())
}

// ============================================================================
//  MODEL
// ============================================================================

#[test]
fn test_auto_encoding_resolves_per_platform() {
    let expected = if cfg!(windows) { TextEncoding::Unicode } else { TextEncoding::Ansi };
    assert_eq!(TextEncoding::Auto.resolve(), expected);
    assert_eq!(TextEncoding::Unicode.resolve(), TextEncoding::Unicode);

    let ty = TypeDesc::by_value(Kind::Str).with_encoding(TextEncoding::Unicode);
    assert_eq!(ty.effective_encoding(TextEncoding::Ansi), TextEncoding::Unicode);
    assert_eq!(TypeDesc::by_value(Kind::Str).effective_encoding(TextEncoding::Ansi), TextEncoding::Ansi);
}

#[test]
fn test_value_kinds() {
    assert_eq!(Value::from(1u8).kind(), Kind::U8);
    assert_eq!(Value::from("x").kind(), Kind::Str);
    assert_eq!(Value::Pointer(0).kind(), Kind::Pointer);
    assert_eq!(Parameter::by_reference(3i64).ty, TypeDesc::by_reference(Kind::I64));
}

// ============================================================================
//  REJECTION
// ============================================================================

/// Builds an outcome frame by hand so tests can vary the header.
fn handmade_outcome(version: u8, extra_key: Option<&str>) -> Vec<u8> {
    let mut enc = Encoder::new();
    enc.variant_begin("Outcome").unwrap();
    enc.ok_begin().unwrap();
    enc.map_begin().unwrap();
    enc.variant_begin("version").unwrap();
    enc.u8(version).unwrap();
    enc.variant_end().unwrap();
    if let Some(key) = extra_key {
        enc.variant_begin(key).unwrap();
        enc.list_begin().unwrap();
        enc.str("from the future").unwrap();
        enc.list_end().unwrap();
        enc.variant_end().unwrap();
    }
    enc.variant_begin("return_value").unwrap();
    enc.none().unwrap();
    enc.variant_end().unwrap();
    enc.variant_begin("parameters").unwrap();
    enc.list_begin().unwrap();
    enc.list_end().unwrap();
    enc.variant_end().unwrap();
    enc.map_end().unwrap();
    enc.ok_end().unwrap();
    enc.variant_end().unwrap();
    enc.into_bytes().unwrap()
}

#[test]
fn test_unknown_keys_are_skipped() -> anyhow::Result<()> {
    let bytes = handmade_outcome(WIRE_VERSION, Some("telemetry"));
    let frame = Frame::decode(&bytes)?;
    assert_eq!(
        frame,
        Frame::Outcome(CallOutcome::Completed { return_value: None, parameters: vec![] })
    );
    Ok(())
}

#[test]
fn test_other_versions_rejected() {
    let bytes = handmade_outcome(2, None);
    assert_eq!(Frame::decode(&bytes), Err(Error::UnsupportedVersion(2)));
}

#[test]
fn test_trailing_bytes_rejected() {
    let mut bytes = encode_call(&sample_call()).unwrap();
    bytes.push(0x0E);
    assert_eq!(Frame::decode(&bytes), Err(Error::TrailingBytes(1)));
}

/// `[tag][len: u32 LE][body]`, written without the encoder's checks.
fn raw_container(tag: Tag, body: &[u8]) -> Vec<u8> {
    let mut out = vec![tag as u8];
    out.extend_from_slice(&(body.len() as u32).to_le_bytes());
    out.extend_from_slice(body);
    out
}

/// A failed outcome whose `version` entry carries `version_items` as payload.
fn failed_outcome_with_version(version_items: &[u8]) -> Vec<u8> {
    let mut enc = Encoder::new();
    enc.variant_begin("kind").unwrap();
    enc.unit_variant(ErrorKind::Protocol.as_tag()).unwrap();
    enc.variant_end().unwrap();
    enc.variant_begin("message").unwrap();
    enc.str("bad").unwrap();
    enc.variant_end().unwrap();
    let other_entries = enc.into_bytes().unwrap();

    let version = raw_container(Tag::Variant, &[raw_container(Tag::Str, b"version").as_slice(), version_items].concat());
    let map = raw_container(Tag::Map, &[version, other_entries].concat());
    let body = raw_container(Tag::Err, &map);
    raw_container(Tag::Variant, &[raw_container(Tag::Str, b"Outcome"), body].concat())
}

#[test]
fn test_entry_with_extra_item_rejected() {
    let one = [Tag::U8 as u8, WIRE_VERSION];
    assert_eq!(
        Frame::decode(&failed_outcome_with_version(&one)),
        Ok(Frame::Outcome(CallOutcome::Failed(ErrorDescriptor {
            kind: ErrorKind::Protocol,
            message: "bad".into(),
        })))
    );

    let two = [Tag::U8 as u8, WIRE_VERSION, Tag::U8 as u8, 7];
    assert_eq!(
        Frame::decode(&failed_outcome_with_version(&two)),
        Err(Error::Pack(PackError::TooManyItems(Scope::Variant)))
    );

    assert_eq!(
        Frame::decode(&failed_outcome_with_version(&[])),
        Err(Error::Pack(PackError::EmptyScope(Scope::Variant)))
    );
}

#[test]
fn test_unknown_frame_name() {
    let mut enc = Encoder::new();
    enc.variant_begin("Hello").unwrap();
    enc.unit().unwrap();
    enc.variant_end().unwrap();
    let bytes = enc.into_bytes().unwrap();
    assert!(matches!(Frame::decode(&bytes), Err(Error::UnknownVariant(_))));
}

#[test]
fn test_missing_field() {
    let mut enc = Encoder::new();
    enc.variant_begin("Outcome").unwrap();
    enc.err_begin().unwrap();
    enc.map_begin().unwrap();
    enc.variant_begin("version").unwrap();
    enc.u8(WIRE_VERSION).unwrap();
    enc.variant_end().unwrap();
    enc.variant_begin("message").unwrap();
    enc.str("kindless").unwrap();
    enc.variant_end().unwrap();
    enc.map_end().unwrap();
    enc.err_end().unwrap();
    enc.variant_end().unwrap();
    let bytes = enc.into_bytes().unwrap();
    assert_eq!(Frame::decode(&bytes), Err(Error::MissingField("kind")));
}

#[test]
fn test_every_truncation_fails_cleanly() {
    let bytes = encode_call(&sample_call()).unwrap();
    for cut in 0..bytes.len() {
        assert!(Frame::decode(&bytes[..cut]).is_err(), "prefix of {} bytes decoded", cut);
    }
}

#[test]
fn test_garbage_never_panics() {
    let mut seed = 0x2545_f491_4f6c_dd1du64;
    for len in 0..256 {
        let bytes: Vec<u8> = (0..len)
            .map(|_| {
                seed ^= seed << 13;
                seed ^= seed >> 7;
                seed ^= seed << 17;
                (seed >> 24) as u8
            })
            .collect();
        let _ = Frame::decode(&bytes);
    }
}
