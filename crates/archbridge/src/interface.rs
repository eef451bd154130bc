//! # Library Interfaces
//!
//! A statically declared view of one native library: each method name maps to
//! the exact native signature it is called with. Building a descriptor from an
//! interface is where argument counts and kinds are checked, before anything
//! crosses the channel.
//!
//! ```ignore
//! let user32 = LibraryInterface::new("user32")
//!     .procedure("MessageBeep", ProcedureSpec::new().arg(Kind::U32).returns(Kind::Bool));
//! session.call(&user32, "MessageBeep", &mut [Value::U32(0)])?;
//! ```

use std::collections::HashMap;

use archwire::CallDescriptor;
use archwire::CallingConvention;
use archwire::Kind;
use archwire::Parameter;
use archwire::TextEncoding;
use archwire::TypeDesc;
use archwire::Value;

use crate::error::Error;
use crate::error::Result;

/// Native signature of one method. Unset convention and encoding fall back to
/// the library defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcedureSpec {
    pub params: Vec<TypeDesc>,
    pub returns: Option<TypeDesc>,
    pub convention: Option<CallingConvention>,
    pub encoding: Option<TextEncoding>,
    /// Exported symbol, when it differs from the method name.
    pub entry_point: Option<String>,
}

impl ProcedureSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(mut self, ty: TypeDesc) -> Self {
        self.params.push(ty);
        self
    }

    pub fn arg(self, kind: Kind) -> Self {
        self.param(TypeDesc::by_value(kind))
    }

    pub fn arg_ref(self, kind: Kind) -> Self {
        self.param(TypeDesc::by_reference(kind))
    }

    pub fn returns(mut self, kind: Kind) -> Self {
        self.returns = Some(TypeDesc::by_value(kind));
        self
    }

    pub fn returns_type(mut self, ty: TypeDesc) -> Self {
        self.returns = Some(ty);
        self
    }

    pub fn convention(mut self, convention: CallingConvention) -> Self {
        self.convention = Some(convention);
        self
    }

    pub fn encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = Some(encoding);
        self
    }

    pub fn entry_point(mut self, symbol: impl Into<String>) -> Self {
        self.entry_point = Some(symbol.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LibraryInterface {
    library: String,
    convention: CallingConvention,
    encoding: TextEncoding,
    methods: HashMap<String, ProcedureSpec>,
}

impl LibraryInterface {
    /// Methods default to `StdCall` and `Auto` text.
    pub fn new(library: impl Into<String>) -> Self {
        Self {
            library: library.into(),
            convention: CallingConvention::StdCall,
            encoding: TextEncoding::Auto,
            methods: HashMap::new(),
        }
    }

    pub fn with_convention(mut self, convention: CallingConvention) -> Self {
        self.convention = convention;
        self
    }

    pub fn with_encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Registers `name`, replacing an earlier registration of the same name.
    pub fn procedure(mut self, name: impl Into<String>, spec: ProcedureSpec) -> Self {
        self.methods.insert(name.into(), spec);
        self
    }

    pub fn library(&self) -> &str {
        &self.library
    }

    pub fn spec(&self, name: &str) -> Option<&ProcedureSpec> {
        self.methods.get(name)
    }

    /// Builds the descriptor for calling `name` with `args`.
    ///
    /// # Errors
    /// `UnknownMethod` for an unregistered name, `ArgumentCount` when `args`
    /// has the wrong length, and `Protocol` when an argument's kind differs
    /// from the declared one.
    pub fn descriptor(&self, name: &str, args: &[Value]) -> Result<CallDescriptor> {
        let spec = self.methods.get(name).ok_or_else(|| Error::UnknownMethod(name.to_owned()))?;
        if args.len() != spec.params.len() {
            return Err(Error::ArgumentCount {
                method: name.to_owned(),
                expected: spec.params.len(),
                found: args.len(),
            });
        }

        let procedure = spec.entry_point.as_deref().unwrap_or(name);
        let mut call = CallDescriptor::new(&self.library, procedure)
            .with_convention(spec.convention.unwrap_or(self.convention))
            .with_encoding(spec.encoding.unwrap_or(self.encoding));
        call.return_type = spec.returns;

        for (i, (value, ty)) in args.iter().zip(&spec.params).enumerate() {
            if value.kind() != ty.kind {
                return Err(Error::Protocol(format!(
                    "argument {} of `{}` is {:?}, declared {:?}",
                    i,
                    name,
                    value.kind(),
                    ty.kind
                )));
            }
            call.parameters.push(Parameter::new(value.clone(), *ty));
        }
        Ok(call)
    }
}
