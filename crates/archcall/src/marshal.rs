//! # Marshaling
//!
//! Lays call arguments out in memory the way libffi expects them and reads
//! results back.
//!
//! ## Layout
//!
//! - `cells[i]` holds argument `i` by value, written through a pointer of its
//!   native type. Cells are `u64`, so every supported scalar fits and is aligned.
//! - `indirect[i]` holds the address of `cells[i]` when argument `i` is passed
//!   by reference. The callee receives that address and may write through it.
//! - `slots[i]` is what libffi reads: the address of either `cells[i]` or
//!   `indirect[i]`.
//! - Strings live in `texts` as NUL-terminated buffers owned by the frame; the
//!   cell holds the buffer address. A by-reference string is therefore a
//!   `char**` and the callee may swap the pointer.
//!
//! ## Invariants
//! - `cells` and `indirect` are sized once and never grow, so addresses taken
//!   into them stay valid for the life of the frame.

use std::ffi::CStr;

use archwire::Kind;
use archwire::Parameter;
use archwire::TextEncoding;
use archwire::TypeDesc;
use archwire::Value;
use libc::c_void;
use libc::wchar_t;
use libffi::middle::Type;
use libffi::raw;

use crate::error::Error;
use crate::error::Result;

/// Writes `v` at the start of an 8-byte cell.
fn put<T: Copy>(cell: *mut u64, v: T) {
    debug_assert!(std::mem::size_of::<T>() <= 8);
    // SAFETY: `cell` points at a live, 8-byte aligned u64 and T is at most 8 bytes.
    unsafe { cell.cast::<T>().write(v) }
}

/// Reads a `T` from the start of an 8-byte cell.
fn get<T: Copy>(cell: *const u64) -> T {
    debug_assert!(std::mem::size_of::<T>() <= 8);
    // SAFETY: as in `put`.
    unsafe { cell.cast::<T>().read() }
}

/// libffi type of a parameter slot or of the return value.
pub(crate) fn ffi_type(ty: &TypeDesc) -> Type {
    if ty.by_ref {
        return Type::pointer();
    }
    match ty.kind {
        Kind::Bool => Type::i32(),
        Kind::I8 => Type::i8(),
        Kind::U8 => Type::u8(),
        Kind::I16 => Type::i16(),
        Kind::U16 => Type::u16(),
        Kind::I32 => Type::i32(),
        Kind::U32 => Type::u32(),
        Kind::I64 => Type::i64(),
        Kind::U64 => Type::u64(),
        Kind::F32 => Type::f32(),
        Kind::F64 => Type::f64(),
        Kind::Pointer | Kind::Str => Type::pointer(),
    }
}

/// An owned NUL-terminated string in one of the native layouts.
enum Text {
    Narrow(Vec<u8>),
    Wide(Vec<wchar_t>),
}

impl Text {
    fn encode(s: &str, encoding: TextEncoding) -> Result<Text> {
        if s.contains('\0') {
            return Err(Error::Protocol("string contains an interior NUL".into()));
        }
        let text = match encoding.resolve() {
            TextEncoding::Unicode => Text::Wide(to_wide(s)),
            _ => {
                let mut bytes = Vec::with_capacity(s.len() + 1);
                bytes.extend_from_slice(s.as_bytes());
                bytes.push(0);
                Text::Narrow(bytes)
            }
        };
        Ok(text)
    }

    fn addr(&self) -> usize {
        match self {
            Text::Narrow(bytes) => bytes.as_ptr() as usize,
            Text::Wide(units) => units.as_ptr() as usize,
        }
    }
}

#[cfg(windows)]
fn to_wide(s: &str) -> Vec<wchar_t> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

#[cfg(not(windows))]
fn to_wide(s: &str) -> Vec<wchar_t> {
    s.chars().map(|c| c as wchar_t).chain(std::iter::once(0)).collect()
}

/// Reads a NUL-terminated string at `addr`. `None` for a null pointer.
///
/// # Safety
/// A non-null `addr` must point at a NUL-terminated string of the given layout.
unsafe fn read_text(addr: usize, encoding: TextEncoding) -> Option<String> {
    if addr == 0 {
        return None;
    }
    let text = match encoding.resolve() {
        TextEncoding::Unicode => {
            let ptr = addr as *const wchar_t;
            let mut len = 0;
            while *ptr.add(len) != 0 {
                len += 1;
            }
            from_wide(std::slice::from_raw_parts(ptr, len))
        }
        _ => CStr::from_ptr(addr as *const libc::c_char).to_string_lossy().into_owned(),
    };
    Some(text)
}

#[cfg(windows)]
fn from_wide(units: &[wchar_t]) -> String {
    String::from_utf16_lossy(units)
}

#[cfg(not(windows))]
fn from_wide(units: &[wchar_t]) -> String {
    units
        .iter()
        .map(|&u| char::from_u32(u as u32).unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}

fn narrow_pointer(addr: u64) -> Result<usize> {
    usize::try_from(addr)
        .map_err(|_| Error::Protocol(format!("pointer {:#x} does not fit this process", addr)))
}

/// Argument memory for one call.
pub(crate) struct ArgFrame {
    cells: Vec<u64>,
    indirect: Vec<u64>,
    texts: Vec<Text>,
    slots: Vec<*mut c_void>,
}

impl ArgFrame {
    /// Lays out `params`. Strings without an explicit encoding use `encoding`.
    pub(crate) fn build(params: &[Parameter], encoding: TextEncoding) -> Result<ArgFrame> {
        let n = params.len();
        let mut frame = ArgFrame {
            cells: vec![0; n],
            indirect: vec![0; n],
            texts: Vec::new(),
            slots: Vec::with_capacity(n),
        };

        let cells = frame.cells.as_mut_ptr();
        let indirect = frame.indirect.as_mut_ptr();

        for (i, param) in params.iter().enumerate() {
            if param.value.kind() != param.ty.kind {
                return Err(Error::Protocol(format!(
                    "parameter {} is declared {:?} but carries {:?}",
                    i,
                    param.ty.kind,
                    param.value.kind()
                )));
            }

            // SAFETY: i < n and neither vector is resized after this point.
            let cell = unsafe { cells.add(i) };
            match &param.value {
                Value::Bool(v) => put::<i32>(cell, *v as i32),
                Value::I8(v) => put(cell, *v),
                Value::U8(v) => put(cell, *v),
                Value::I16(v) => put(cell, *v),
                Value::U16(v) => put(cell, *v),
                Value::I32(v) => put(cell, *v),
                Value::U32(v) => put(cell, *v),
                Value::I64(v) => put(cell, *v),
                Value::U64(v) => put(cell, *v),
                Value::F32(v) => put(cell, *v),
                Value::F64(v) => put(cell, *v),
                Value::Pointer(v) => put::<usize>(cell, narrow_pointer(*v)?),
                Value::Str(s) => {
                    let text = Text::encode(s, param.ty.effective_encoding(encoding))?;
                    put::<usize>(cell, text.addr());
                    frame.texts.push(text);
                }
            }

            let slot = if param.ty.by_ref {
                // SAFETY: as above.
                let pointer_cell = unsafe { indirect.add(i) };
                put::<usize>(pointer_cell, cell as usize);
                pointer_cell
            } else {
                cell
            };
            frame.slots.push(slot.cast());
        }

        Ok(frame)
    }

    /// Performs the call and returns the raw return buffer.
    ///
    /// # Safety
    /// `entry` must be a function whose real signature matches `cif`.
    pub(crate) unsafe fn call(&mut self, cif: &libffi::middle::Cif, entry: *const c_void) -> [u64; 2] {
        let code = libffi::middle::CodePtr::from_ptr(entry);
        let mut ret = [0u64; 2];
        raw::ffi_call(
            cif.as_raw_ptr(),
            Some(*code.as_fun()),
            ret.as_mut_ptr().cast(),
            self.slots.as_mut_ptr(),
        );
        ret
    }

    /// Post-call values of every parameter, in order. By-value parameters
    /// come back unchanged.
    pub(crate) fn read_back(&self, params: &[Parameter], encoding: TextEncoding) -> Vec<Value> {
        params
            .iter()
            .enumerate()
            .map(|(i, param)| {
                if !param.ty.by_ref {
                    return param.value.clone();
                }
                let cell: *const u64 = &self.cells[i];
                match param.ty.kind {
                    // SAFETY: the callee either kept our buffer or installed its own string.
                    Kind::Str => Value::Str(
                        unsafe { read_text(get::<usize>(cell), param.ty.effective_encoding(encoding)) }
                            .unwrap_or_default(),
                    ),
                    kind => read_scalar(cell, kind),
                }
            })
            .collect()
    }
}

fn read_scalar(cell: *const u64, kind: Kind) -> Value {
    match kind {
        Kind::Bool => Value::Bool(get::<i32>(cell) != 0),
        Kind::I8 => Value::I8(get(cell)),
        Kind::U8 => Value::U8(get(cell)),
        Kind::I16 => Value::I16(get(cell)),
        Kind::U16 => Value::U16(get(cell)),
        Kind::I32 => Value::I32(get(cell)),
        Kind::U32 => Value::U32(get(cell)),
        Kind::I64 => Value::I64(get(cell)),
        Kind::U64 => Value::U64(get(cell)),
        Kind::F32 => Value::F32(get(cell)),
        Kind::F64 => Value::F64(get(cell)),
        Kind::Pointer => Value::Pointer(get::<usize>(cell) as u64),
        Kind::Str => Value::Str(String::new()),
    }
}

/// Decodes the return buffer filled by `ArgFrame::call`.
///
/// Integer results narrower than a register are widened by libffi to
/// `ffi_arg`, so they are read at that width and truncated.
pub(crate) fn read_return(ret: &[u64; 2], ty: Option<&TypeDesc>, encoding: TextEncoding) -> Option<Value> {
    let ty = ty?;
    let cell: *const u64 = &ret[0];
    let widened = || get::<raw::ffi_arg>(cell);

    let value = match ty.kind {
        Kind::Bool => Value::Bool(widened() as i32 != 0),
        Kind::I8 => Value::I8(widened() as i8),
        Kind::U8 => Value::U8(widened() as u8),
        Kind::I16 => Value::I16(widened() as i16),
        Kind::U16 => Value::U16(widened() as u16),
        Kind::I32 => Value::I32(widened() as i32),
        Kind::U32 => Value::U32(widened() as u32),
        Kind::I64 => Value::I64(get(cell)),
        Kind::U64 => Value::U64(get(cell)),
        Kind::F32 => Value::F32(get(cell)),
        Kind::F64 => Value::F64(get(cell)),
        Kind::Pointer => Value::Pointer(get::<usize>(cell) as u64),
        Kind::Str => {
            // SAFETY: the callee declared a string return; null is reported as absent.
            let text = unsafe { read_text(get::<usize>(cell), ty.effective_encoding(encoding)) };
            Value::Str(text?)
        }
    };
    Some(value)
}
