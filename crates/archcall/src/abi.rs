//! Calling convention to libffi ABI mapping.
//!
//! Only 32-bit x86 distinguishes conventions. Every other target has a single
//! C convention and the platform itself ignores the annotation.

use archwire::CallingConvention;
use libffi::middle::FfiAbi;

#[cfg(target_arch = "x86")]
pub(crate) fn abi_for(convention: CallingConvention) -> FfiAbi {
    use libffi::raw;

    match convention {
        CallingConvention::Default => raw::ffi_abi_FFI_DEFAULT_ABI,
        CallingConvention::StdCall => raw::ffi_abi_FFI_STDCALL,
        CallingConvention::WinApi if cfg!(windows) => raw::ffi_abi_FFI_STDCALL,
        CallingConvention::WinApi => raw::ffi_abi_FFI_DEFAULT_ABI,
        CallingConvention::Cdecl if cfg!(windows) => raw::ffi_abi_FFI_MS_CDECL,
        CallingConvention::Cdecl => raw::ffi_abi_FFI_SYSV,
        CallingConvention::ThisCall => raw::ffi_abi_FFI_THISCALL,
        CallingConvention::FastCall => raw::ffi_abi_FFI_FASTCALL,
    }
}

#[cfg(not(target_arch = "x86"))]
pub(crate) fn abi_for(_convention: CallingConvention) -> FfiAbi {
    libffi::middle::ffi_abi_FFI_DEFAULT_ABI
}
