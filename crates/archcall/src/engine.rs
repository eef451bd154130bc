//! # Native Call Engine
//!
//! Executes `CallDescriptor`s against native libraries loaded into this process.
//!
//! ## Caches
//! - **Libraries**: one loaded image per identifier, kept until the engine drops.
//! - **Bindings**: `(library, procedure, signature, convention)` to entry point
//!   and prepared call interface.
//! - **Interfaces**: `(signature, convention)` to prepared interface, shared by
//!   every procedure of the same shape.
//!
//! ## Failure model
//! Every failure becomes `CallOutcome::Failed`. Rust panics raised while
//! preparing or performing a call are caught and reported as
//! `NativeInvocation`. A fault inside native code takes the process down.

use std::collections::HashMap;
use std::panic;
use std::panic::AssertUnwindSafe;
use std::rc::Rc;

use archwire::CallDescriptor;
use archwire::CallOutcome;
use archwire::CallingConvention;
use archwire::ErrorKind;
use archwire::TypeDesc;
use libc::c_void;
use libffi::middle::Builder;
use libffi::middle::Cif;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::abi::abi_for;
use crate::error::Error;
use crate::error::Result;
use crate::marshal::ffi_type;
use crate::marshal::read_return;
use crate::marshal::ArgFrame;
use crate::resolver::LibraryResolver;
use crate::resolver::NativeLibrary;
use crate::resolver::SearchPathResolver;

/// Parameter and return types of a call, the shape a `Cif` is built for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Signature {
    params: Vec<TypeDesc>,
    ret: Option<TypeDesc>,
}

impl Signature {
    fn of(call: &CallDescriptor) -> Self {
        Self {
            params: call.parameters.iter().map(|p| p.ty).collect(),
            ret: call.return_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct BindingKey {
    library: String,
    procedure: String,
    signature: Signature,
    convention: CallingConvention,
}

/// A resolved entry point together with the interface used to call it.
struct NativeBinding {
    entry: *const c_void,
    cif: Rc<Cif>,
}

pub struct Engine {
    resolver: Box<dyn LibraryResolver>,
    libraries: HashMap<String, Box<dyn NativeLibrary>>,
    bindings: HashMap<BindingKey, NativeBinding>,
    interfaces: HashMap<(Signature, CallingConvention), Rc<Cif>>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(SearchPathResolver::new())
    }
}

impl Engine {
    pub fn new(resolver: impl LibraryResolver + 'static) -> Self {
        Self {
            resolver: Box::new(resolver),
            libraries: HashMap::new(),
            bindings: HashMap::new(),
            interfaces: HashMap::new(),
        }
    }

    /// Number of distinct bindings prepared so far.
    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }

    /// Number of distinct call interfaces prepared so far.
    pub fn interface_count(&self) -> usize {
        self.interfaces.len()
    }

    /// Performs one call. Never panics and never returns an error directly;
    /// failures are part of the outcome.
    pub fn invoke(&mut self, call: &CallDescriptor) -> CallOutcome {
        debug!(library = %call.library, procedure = %call.procedure, params = call.parameters.len(), "invoke");

        match panic::catch_unwind(AssertUnwindSafe(|| self.try_invoke(call))) {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                debug!(error = %e, "call failed");
                CallOutcome::Failed(e.into())
            }
            Err(payload) => {
                let reason = panic_message(payload.as_ref());
                warn!(procedure = %call.procedure, %reason, "panic during native call");
                CallOutcome::failed(ErrorKind::NativeInvocation, reason)
            }
        }
    }

    fn try_invoke(&mut self, call: &CallDescriptor) -> Result<CallOutcome> {
        if call.is_close() {
            return Err(Error::Protocol("a close signal is not a call".into()));
        }
        if call.return_type.is_some_and(|ty| ty.by_ref) {
            return Err(Error::Protocol("return values cannot be by-reference".into()));
        }

        let (entry, cif) = self.bind(call)?;
        let mut frame = ArgFrame::build(&call.parameters, call.encoding)?;

        // SAFETY: the interface was built from the descriptor's own types. A
        // descriptor that lies about the native signature is outside what can be
        // checked here.
        let ret = unsafe { frame.call(&cif, entry) };

        Ok(CallOutcome::Completed {
            return_value: read_return(&ret, call.return_type.as_ref(), call.encoding),
            parameters: frame.read_back(&call.parameters, call.encoding),
        })
    }

    fn bind(&mut self, call: &CallDescriptor) -> Result<(*const c_void, Rc<Cif>)> {
        let signature = Signature::of(call);
        let key = BindingKey {
            library: call.library.clone(),
            procedure: call.procedure.clone(),
            signature,
            convention: call.convention,
        };

        if let Some(binding) = self.bindings.get(&key) {
            return Ok((binding.entry, Rc::clone(&binding.cif)));
        }

        let entry = self
            .library(&call.library)?
            .symbol(&call.procedure)
            .ok_or_else(|| Error::ProcedureNotFound {
                library: call.library.clone(),
                procedure: call.procedure.clone(),
            })?;
        let cif = self.interface(&key.signature, key.convention);

        debug!(library = %key.library, procedure = %key.procedure, "bound");
        self.bindings.insert(key, NativeBinding { entry, cif: Rc::clone(&cif) });
        Ok((entry, cif))
    }

    fn library(&mut self, identifier: &str) -> Result<&dyn NativeLibrary> {
        if !self.libraries.contains_key(identifier) {
            let library = self.resolver.resolve(identifier).map_err(|reason| Error::LibraryLoad {
                library: identifier.to_owned(),
                reason,
            })?;
            info!(library = identifier, "library loaded");
            self.libraries.insert(identifier.to_owned(), library);
        }
        Ok(self.libraries[identifier].as_ref())
    }

    fn interface(&mut self, signature: &Signature, convention: CallingConvention) -> Rc<Cif> {
        let cif = self
            .interfaces
            .entry((signature.clone(), convention))
            .or_insert_with(|| {
                let ret = signature.ret.as_ref().map(ffi_type).unwrap_or_else(libffi::middle::Type::void);
                Rc::new(
                    Builder::new()
                        .args(signature.params.iter().map(ffi_type))
                        .res(ret)
                        .abi(abi_for(convention))
                        .into_cif(),
                )
            });
        Rc::clone(cif)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with a non-string payload".to_owned()
    }
}
