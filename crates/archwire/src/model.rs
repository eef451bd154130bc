//! # Call Model
//!
//! The two messages that cross the channel: a `CallDescriptor` going to the
//! helper and a `CallOutcome` coming back.
//!
//! ## Invariants
//! - A `Value` always knows its own `Kind`; nothing about a value is inferred
//!   from the position it appears in.
//! - A descriptor with `SessionControl::Close` is a signal, not a call. Its other
//!   fields are empty and never looked at.

use crate::error::Error;
use crate::error::Result;

/// Primitive kind of a parameter or return value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// Marshaled as a 4-byte integer, non-zero is true.
    Bool,
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
    /// Opaque address, carried as 64 bits and narrowed to the helper's pointer width.
    Pointer,
    /// NUL-terminated string; element width follows the effective `TextEncoding`.
    Str,
}

impl Kind {
    pub fn as_tag(self) -> &'static str {
        match self {
            Kind::Bool => "Bool",
            Kind::I8 => "I8",
            Kind::U8 => "U8",
            Kind::I16 => "I16",
            Kind::U16 => "U16",
            Kind::I32 => "I32",
            Kind::U32 => "U32",
            Kind::I64 => "I64",
            Kind::U64 => "U64",
            Kind::F32 => "F32",
            Kind::F64 => "F64",
            Kind::Pointer => "Pointer",
            Kind::Str => "Str",
        }
    }

    pub fn from_tag(tag: &str) -> Result<Self> {
        let kind = match tag {
            "Bool" => Kind::Bool,
            "I8" => Kind::I8,
            "U8" => Kind::U8,
            "I16" => Kind::I16,
            "U16" => Kind::U16,
            "I32" => Kind::I32,
            "U32" => Kind::U32,
            "I64" => Kind::I64,
            "U64" => Kind::U64,
            "F32" => Kind::F32,
            "F64" => Kind::F64,
            "Pointer" => Kind::Pointer,
            "Str" => Kind::Str,
            other => return Err(Error::UnknownVariant(format!("Kind: {}", other))),
        };
        Ok(kind)
    }
}

/// How strings are laid out in native memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextEncoding {
    /// Narrow, NUL-terminated bytes.
    Ansi,
    /// NUL-terminated `wchar_t`: UTF-16 on Windows, UTF-32 elsewhere.
    Unicode,
    /// `Unicode` on Windows, `Ansi` everywhere else.
    #[default]
    Auto,
}

impl TextEncoding {
    /// Collapses `Auto` to the concrete encoding of the running platform.
    pub fn resolve(self) -> TextEncoding {
        match self {
            TextEncoding::Auto if cfg!(windows) => TextEncoding::Unicode,
            TextEncoding::Auto => TextEncoding::Ansi,
            concrete => concrete,
        }
    }

    pub fn as_tag(self) -> &'static str {
        match self {
            TextEncoding::Ansi => "Ansi",
            TextEncoding::Unicode => "Unicode",
            TextEncoding::Auto => "Auto",
        }
    }

    pub fn from_tag(tag: &str) -> Result<Self> {
        match tag {
            "Ansi" => Ok(TextEncoding::Ansi),
            "Unicode" => Ok(TextEncoding::Unicode),
            "Auto" => Ok(TextEncoding::Auto),
            other => Err(Error::UnknownVariant(format!("TextEncoding: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CallingConvention {
    #[default]
    Default,
    Cdecl,
    StdCall,
    WinApi,
    ThisCall,
    FastCall,
}

impl CallingConvention {
    pub fn as_tag(self) -> &'static str {
        match self {
            CallingConvention::Default => "Default",
            CallingConvention::Cdecl => "Cdecl",
            CallingConvention::StdCall => "StdCall",
            CallingConvention::WinApi => "WinApi",
            CallingConvention::ThisCall => "ThisCall",
            CallingConvention::FastCall => "FastCall",
        }
    }

    pub fn from_tag(tag: &str) -> Result<Self> {
        let conv = match tag {
            "Default" => CallingConvention::Default,
            "Cdecl" => CallingConvention::Cdecl,
            "StdCall" => CallingConvention::StdCall,
            "WinApi" => CallingConvention::WinApi,
            "ThisCall" => CallingConvention::ThisCall,
            "FastCall" => CallingConvention::FastCall,
            other => return Err(Error::UnknownVariant(format!("CallingConvention: {}", other))),
        };
        Ok(conv)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionControl {
    #[default]
    Continue,
    /// Ends the helper's request loop. Never answered.
    Close,
}

impl SessionControl {
    pub fn as_tag(self) -> &'static str {
        match self {
            SessionControl::Continue => "Continue",
            SessionControl::Close => "Close",
        }
    }

    pub fn from_tag(tag: &str) -> Result<Self> {
        match tag {
            "Continue" => Ok(SessionControl::Continue),
            "Close" => Ok(SessionControl::Close),
            other => Err(Error::UnknownVariant(format!("SessionControl: {}", other))),
        }
    }
}

/// Structural type of one parameter or of the return value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeDesc {
    pub kind: Kind,
    pub by_ref: bool,
    /// Overrides the descriptor-wide encoding. Only meaningful for `Kind::Str`.
    pub encoding: Option<TextEncoding>,
}

impl TypeDesc {
    pub const fn by_value(kind: Kind) -> Self {
        Self { kind, by_ref: false, encoding: None }
    }

    pub const fn by_reference(kind: Kind) -> Self {
        Self { kind, by_ref: true, encoding: None }
    }

    pub const fn with_encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = Some(encoding);
        self
    }

    /// The encoding a string of this type is marshaled with, given the
    /// descriptor-wide default.
    pub fn effective_encoding(&self, default: TextEncoding) -> TextEncoding {
        self.encoding.unwrap_or(default).resolve()
    }
}

/// A runtime value, one case per `Kind`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
    Pointer(u64),
    Str(String),
}

impl Value {
    pub fn kind(&self) -> Kind {
        match self {
            Value::Bool(_) => Kind::Bool,
            Value::I8(_) => Kind::I8,
            Value::U8(_) => Kind::U8,
            Value::I16(_) => Kind::I16,
            Value::U16(_) => Kind::U16,
            Value::I32(_) => Kind::I32,
            Value::U32(_) => Kind::U32,
            Value::I64(_) => Kind::I64,
            Value::U64(_) => Kind::U64,
            Value::F32(_) => Kind::F32,
            Value::F64(_) => Kind::F64,
            Value::Pointer(_) => Kind::Pointer,
            Value::Str(_) => Kind::Str,
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident;)*) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self { Value::$variant(v) }
            }
        )*
    };
}

value_from! {
    bool => Bool;
    i8 => I8;
    u8 => U8;
    i16 => I16;
    u16 => U16;
    i32 => I32;
    u32 => U32;
    i64 => I64;
    u64 => U64;
    f32 => F32;
    f64 => F64;
    String => Str;
}

impl From<&str> for Value {
    fn from(v: &str) -> Self { Value::Str(v.to_owned()) }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub value: Value,
    pub ty: TypeDesc,
}

impl Parameter {
    pub fn new(value: Value, ty: TypeDesc) -> Self {
        Self { value, ty }
    }

    /// Passes `value` by value, typed by its own kind.
    pub fn by_value(value: impl Into<Value>) -> Self {
        let value = value.into();
        let ty = TypeDesc::by_value(value.kind());
        Self { value, ty }
    }

    /// Passes `value` through a pointer; the callee may overwrite it.
    pub fn by_reference(value: impl Into<Value>) -> Self {
        let value = value.into();
        let ty = TypeDesc::by_reference(value.kind());
        Self { value, ty }
    }
}

/// One native call request.
#[derive(Debug, Clone, PartialEq)]
pub struct CallDescriptor {
    pub library: String,
    pub procedure: String,
    pub parameters: Vec<Parameter>,
    /// `None` is a void return.
    pub return_type: Option<TypeDesc>,
    pub convention: CallingConvention,
    pub encoding: TextEncoding,
    pub session: SessionControl,
}

impl CallDescriptor {
    pub fn new(library: impl Into<String>, procedure: impl Into<String>) -> Self {
        Self {
            library: library.into(),
            procedure: procedure.into(),
            parameters: Vec::new(),
            return_type: None,
            convention: CallingConvention::Default,
            encoding: TextEncoding::Auto,
            session: SessionControl::Continue,
        }
    }

    /// The terminal descriptor that ends a session.
    pub fn close() -> Self {
        Self { session: SessionControl::Close, ..Self::new("", "") }
    }

    pub fn is_close(&self) -> bool {
        self.session == SessionControl::Close
    }

    pub fn param(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn arg(self, value: impl Into<Value>) -> Self {
        self.param(Parameter::by_value(value))
    }

    pub fn arg_ref(self, value: impl Into<Value>) -> Self {
        self.param(Parameter::by_reference(value))
    }

    pub fn returns(mut self, ty: TypeDesc) -> Self {
        self.return_type = Some(ty);
        self
    }

    pub fn with_convention(mut self, convention: CallingConvention) -> Self {
        self.convention = convention;
        self
    }

    pub fn with_encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = encoding;
        self
    }
}

/// Which stage of the helper's work failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    LibraryLoad,
    ProcedureNotFound,
    NativeInvocation,
    /// The request itself was unusable.
    Protocol,
}

impl ErrorKind {
    pub fn as_tag(self) -> &'static str {
        match self {
            ErrorKind::LibraryLoad => "LibraryLoad",
            ErrorKind::ProcedureNotFound => "ProcedureNotFound",
            ErrorKind::NativeInvocation => "NativeInvocation",
            ErrorKind::Protocol => "Protocol",
        }
    }

    pub fn from_tag(tag: &str) -> Result<Self> {
        let kind = match tag {
            "LibraryLoad" => ErrorKind::LibraryLoad,
            "ProcedureNotFound" => ErrorKind::ProcedureNotFound,
            "NativeInvocation" => ErrorKind::NativeInvocation,
            "Protocol" => ErrorKind::Protocol,
            other => return Err(Error::UnknownVariant(format!("ErrorKind: {}", other))),
        };
        Ok(kind)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDescriptor {
    pub kind: ErrorKind,
    pub message: String,
}

impl std::fmt::Display for ErrorDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

/// The helper's answer to one `CallDescriptor`.
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome {
    /// `parameters` has one entry per request parameter, in request order.
    Completed {
        return_value: Option<Value>,
        parameters: Vec<Value>,
    },
    Failed(ErrorDescriptor),
}

impl CallOutcome {
    pub fn failed(kind: ErrorKind, message: impl Into<String>) -> Self {
        CallOutcome::Failed(ErrorDescriptor { kind, message: message.into() })
    }
}
