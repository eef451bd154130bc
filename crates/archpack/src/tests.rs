use crate::*;

// ============================================================================
//  SCALARS
// ============================================================================

#[test]
fn test_integers_keep_their_width_and_sign() -> Result<()> {
    let mut enc = Encoder::new();
    enc.u8(u8::MAX)?;
    enc.i8(i8::MIN)?;
    enc.u16(u16::MAX)?;
    enc.i16(i16::MIN)?;
    enc.u32(u32::MAX)?;
    enc.i32(-1337)?;
    enc.u64(u64::MAX)?;
    enc.i64(i64::MIN)?;

    let bytes = enc.into_bytes()?;
    let mut dec = Decoder::new(&bytes);

    assert_eq!(dec.u8()?, u8::MAX);
    assert_eq!(dec.i8()?, i8::MIN);
    assert_eq!(dec.u16()?, u16::MAX);
    assert_eq!(dec.i16()?, i16::MIN);
    assert_eq!(dec.u32()?, u32::MAX);
    assert_eq!(dec.i32()?, -1337);
    assert_eq!(dec.u64()?, u64::MAX);
    assert_eq!(dec.i64()?, i64::MIN);
    assert!(dec.is_empty());
    Ok(())
}

#[test]
fn test_floats_bool_and_addr() -> Result<()> {
    let mut enc = Encoder::new();
    enc.f32(1.5)?;
    enc.f64(std::f64::consts::E)?;
    enc.bool(true)?;
    enc.bool(false)?;
    enc.addr(0xdead_beef)?;

    let bytes = enc.into_bytes()?;
    let mut dec = Decoder::new(&bytes);

    assert_eq!(dec.f32()?, 1.5);
    assert_eq!(dec.f64()?, std::f64::consts::E);
    assert!(dec.bool()?);
    assert!(!dec.bool()?);
    assert_eq!(dec.addr()?, 0xdead_beef);
    Ok(())
}

#[test]
fn test_addr_is_always_eight_bytes() -> Result<()> {
    let mut enc = Encoder::new();
    enc.addr(1)?;
    let bytes = enc.into_bytes()?;
    assert_eq!(bytes.len(), 9);
    assert_eq!(bytes[0], Tag::Addr as u8);
    Ok(())
}

#[test]
fn test_wrong_tag_is_reported_not_reinterpreted() -> Result<()> {
    let mut enc = Encoder::new();
    enc.u32(7)?;
    let bytes = enc.into_bytes()?;

    let mut dec = Decoder::new(&bytes);
    match dec.i32() {
        Err(Error::UnexpectedTag { expected: "i32", found }) => assert_eq!(found, Tag::U32 as u8),
        other => panic!("expected tag mismatch, got {:?}", other),
    }
    Ok(())
}

#[test]
fn test_string_roundtrip() -> Result<()> {
    let mut enc = Encoder::new();
    enc.str("Hello World")?;
    enc.str("")?;
    let bytes = enc.into_bytes()?;

    let mut dec = Decoder::new(&bytes);
    assert_eq!(dec.str()?, "Hello World");
    assert_eq!(dec.str()?, "");
    Ok(())
}

// ============================================================================
//  CONTAINERS
// ============================================================================

#[test]
fn test_map_of_variants() -> Result<()> {
    let mut enc = Encoder::new();
    enc.map_begin()?;
    enc.variant_begin("a")?;
    enc.u8(1)?;
    enc.variant_end()?;
    enc.variant_begin("b")?;
    enc.list_begin()?;
    enc.i32(1)?;
    enc.i32(2)?;
    enc.list_end()?;
    enc.variant_end()?;
    enc.map_end()?;
    let bytes = enc.into_bytes()?;

    let mut dec = Decoder::new(&bytes);
    let mut map = dec.map()?;

    let (key, mut val) = map.next_entry()?.expect("first entry");
    assert_eq!(key, "a");
    assert_eq!(val.u8()?, 1);

    let (key, mut val) = map.next_entry()?.expect("second entry");
    assert_eq!(key, "b");
    let mut items = val.list()?;
    assert_eq!(items.next_item()?.expect("item").i32()?, 1);
    assert_eq!(items.next_item()?.expect("item").i32()?, 2);
    assert!(items.next_item()?.is_none());

    assert!(map.next_entry()?.is_none());
    Ok(())
}

#[test]
fn test_option_and_result() -> Result<()> {
    let mut enc = Encoder::new();
    enc.none()?;
    enc.some_begin()?;
    enc.str("x")?;
    enc.some_end()?;
    enc.err_begin()?;
    enc.unit_variant("Boom")?;
    enc.err_end()?;
    let bytes = enc.into_bytes()?;

    let mut dec = Decoder::new(&bytes);
    assert!(dec.option()?.is_none());
    assert_eq!(dec.option()?.expect("some").str()?, "x");
    match dec.result()? {
        Err(mut body) => assert_eq!(body.unit_variant()?, "Boom"),
        Ok(_) => panic!("expected err side"),
    }
    Ok(())
}

#[test]
fn test_skip_nested_container() -> Result<()> {
    let mut enc = Encoder::new();
    enc.list_begin()?;
    enc.map_begin()?;
    enc.variant_begin("deep")?;
    enc.str("ignored")?;
    enc.variant_end()?;
    enc.map_end()?;
    enc.list_end()?;
    enc.u16(9)?;
    let bytes = enc.into_bytes()?;

    let mut dec = Decoder::new(&bytes);
    dec.skip()?;
    assert_eq!(dec.u16()?, 9);
    Ok(())
}

// ============================================================================
//  STRUCTURAL VIOLATIONS
// ============================================================================

#[test]
fn test_map_rejects_bare_items() {
    let mut enc = Encoder::new();
    enc.map_begin().unwrap();
    assert_eq!(enc.u8(1), Err(Error::InvalidMapEntry));
}

#[test]
fn test_strict_scopes_take_exactly_one_item() {
    let mut enc = Encoder::new();
    enc.some_begin().unwrap();
    enc.u8(1).unwrap();
    assert_eq!(enc.u8(2), Err(Error::TooManyItems(Scope::Option)));

    let mut enc = Encoder::new();
    enc.variant_begin("empty").unwrap();
    assert_eq!(enc.variant_end(), Err(Error::EmptyScope(Scope::Variant)));
}

#[test]
fn test_unclosed_scope_cannot_finish() {
    let mut enc = Encoder::new();
    enc.list_begin().unwrap();
    assert_eq!(enc.into_bytes().unwrap_err(), Error::ScopeStillOpen);
}

#[test]
fn test_mismatched_close() {
    let mut enc = Encoder::new();
    enc.list_begin().unwrap();
    assert_eq!(
        enc.map_end(),
        Err(Error::ScopeMismatch { expected: Scope::Map, actual: Scope::List })
    );
    assert_eq!(Encoder::new().list_end(), Err(Error::ScopeUnderflow));
}

// ============================================================================
//  MALFORMED INPUT
// ============================================================================

#[test]
fn test_truncated_input() {
    let mut enc = Encoder::new();
    enc.str("truncate me").unwrap();
    let bytes = enc.into_bytes().unwrap();

    for cut in 0..bytes.len() {
        let mut dec = Decoder::new(&bytes[..cut]);
        assert!(dec.str().is_err(), "cut at {} should fail", cut);
    }
}

#[test]
fn test_unknown_tag_byte() {
    let bytes = [0xEE];
    let dec = Decoder::new(&bytes);
    assert_eq!(dec.peek_tag(), Err(Error::InvalidTag(0xEE)));
}

#[test]
fn test_container_length_beyond_input() {
    // List claiming 100 body bytes with only 2 present.
    let bytes = [Tag::List as u8, 100, 0, 0, 0, Tag::Unit as u8, Tag::Unit as u8];
    let mut dec = Decoder::new(&bytes);
    assert_eq!(dec.list().unwrap_err(), Error::UnexpectedEnd);
}

#[test]
fn test_list_with_garbage_tail_errors() {
    // Body holds a u16 tag followed by only one of its two bytes.
    let bytes = [Tag::List as u8, 2, 0, 0, 0, Tag::U16 as u8, 0xFF];
    let mut dec = Decoder::new(&bytes);
    let mut items = dec.list().unwrap();
    assert!(items.next_item().is_err());
}

#[test]
fn test_single_item_scopes_reject_extra_items() {
    let two_units = [Tag::Unit as u8, Tag::Unit as u8];
    let mut some = vec![Tag::Some as u8, 2, 0, 0, 0];
    some.extend_from_slice(&two_units);
    assert_eq!(Decoder::new(&some).option().unwrap_err(), Error::TooManyItems(Scope::Option));

    let mut ok = vec![Tag::Ok as u8, 2, 0, 0, 0];
    ok.extend_from_slice(&two_units);
    assert_eq!(Decoder::new(&ok).result().unwrap_err(), Error::TooManyItems(Scope::Result));

    // Variant "v" followed by two unit payloads.
    let variant = [Tag::Variant as u8, 8, 0, 0, 0, Tag::Str as u8, 1, 0, 0, 0, b'v', Tag::Unit as u8, Tag::Unit as u8];
    assert_eq!(Decoder::new(&variant).unit_variant().unwrap_err(), Error::TooManyItems(Scope::Variant));

    // Variant "v" with no payload at all.
    let bare = [Tag::Variant as u8, 6, 0, 0, 0, Tag::Str as u8, 1, 0, 0, 0, b'v'];
    assert_eq!(Decoder::new(&bare).variant().unwrap_err(), Error::EmptyScope(Scope::Variant));
}

#[test]
fn test_invalid_utf8() {
    let bytes = [Tag::Str as u8, 2, 0, 0, 0, 0xC3, 0x28];
    let mut dec = Decoder::new(&bytes);
    assert_eq!(dec.str(), Err(Error::InvalidUtf8));
}
