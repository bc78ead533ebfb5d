//! # Host Original Lookup
//!
//! The shim never calls a host method directly: it asks a [`SymbolResolver`]
//! for the address of the host's own definition, identified by the
//! library that exports it and its mangled name.
//!
//! [`DlResolver`] is the production resolver. It takes a handle to the
//! already loaded host library by name and looks the symbol up through that
//! library's own handle. A handle
//! lookup searches the library itself before anything else, so it finds the
//! host's definition rather than the replacement this crate exports under
//! the same name (which only wins in the global lookup scope).
//!
//! Tests inject their own resolver returning addresses of plain
//! `extern "C-unwind"` functions standing in for the host.

#![allow(unsafe_code)] // dlopen/dlsym/dlerror are FFI

use log::debug;
use std::collections::HashMap;
use std::ffi::{c_void, CStr, CString};
use std::ptr::NonNull;
use std::sync::Mutex;

use crate::errors::ResolveError;

/// Address of a host original
///
/// Only meaningful inside the process that resolved it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OriginalAddr(NonNull<c_void>);

impl OriginalAddr {
    /// Wrap a non-null code address
    #[must_use]
    pub fn new(ptr: NonNull<c_void>) -> Self {
        Self(ptr)
    }

    /// Wrap a raw address, rejecting null
    #[must_use]
    pub fn from_ptr(ptr: *mut c_void) -> Option<Self> {
        NonNull::new(ptr).map(Self)
    }

    #[must_use]
    pub fn as_ptr(self) -> *mut c_void {
        self.0.as_ptr()
    }
}

// A code address is immutable process-wide data; sharing it across threads
// is as safe as sharing the function pointer it will become.
unsafe impl Send for OriginalAddr {}
unsafe impl Sync for OriginalAddr {}

/// Looks up host originals by (library, exported name)
pub trait SymbolResolver: Send + Sync {
    /// Resolve `symbol` inside `library` (base name without platform suffix)
    ///
    /// # Errors
    /// Returns an error if the library cannot be opened or does not define
    /// the symbol.
    fn resolve(&self, library: &str, symbol: &str) -> Result<OriginalAddr, ResolveError>;
}

/// Dynamic-loader backed resolver
///
/// Library handles and resolved addresses are cached, so each distinct
/// (library, symbol) pair costs one `dlsym` per process.
#[derive(Default)]
pub struct DlResolver {
    handles: Mutex<HashMap<String, usize>>,
    symbols: Mutex<HashMap<(String, String), OriginalAddr>>,
}

impl DlResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open (or reuse) the handle for a library file name
    fn handle(&self, file: &str) -> Result<*mut c_void, ResolveError> {
        let mut handles = self.handles.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(&handle) = handles.get(file) {
            return Ok(handle as *mut c_void);
        }

        let name = CString::new(file).map_err(|_| ResolveError::InvalidName(file.to_string()))?;
        // Only libraries the host already loaded; never pull in another variant.
        let handle = unsafe { libc::dlopen(name.as_ptr(), libc::RTLD_NOW | libc::RTLD_NOLOAD) };
        if handle.is_null() {
            return Err(ResolveError::LibraryNotFound {
                library: file.to_string(),
                reason: last_dl_error(),
            });
        }

        debug!("Opened {file} at {handle:p}");
        handles.insert(file.to_string(), handle as usize);
        Ok(handle)
    }
}

impl SymbolResolver for DlResolver {
    fn resolve(&self, library: &str, symbol: &str) -> Result<OriginalAddr, ResolveError> {
        let key = (library.to_string(), symbol.to_string());
        if let Some(addr) =
            self.symbols.lock().unwrap_or_else(std::sync::PoisonError::into_inner).get(&key)
        {
            return Ok(*addr);
        }

        let file = format!("{library}{}", std::env::consts::DLL_SUFFIX);
        let handle = self.handle(&file)?;
        let c_symbol =
            CString::new(symbol).map_err(|_| ResolveError::InvalidName(symbol.to_string()))?;

        // Clear stale state so the error text (if any) belongs to this lookup.
        unsafe { libc::dlerror() };
        let ptr = unsafe { libc::dlsym(handle, c_symbol.as_ptr()) };
        let addr = OriginalAddr::from_ptr(ptr).ok_or_else(|| ResolveError::SymbolNotFound {
            library: file.clone(),
            symbol: symbol.to_string(),
            reason: last_dl_error(),
        })?;

        debug!("Resolved {symbol} in {file} to {:p}", addr.as_ptr());
        self.symbols.lock().unwrap_or_else(std::sync::PoisonError::into_inner).insert(key, addr);
        Ok(addr)
    }
}

/// Text of the most recent dynamic loader error
fn last_dl_error() -> String {
    let msg = unsafe { libc::dlerror() };
    if msg.is_null() {
        "unknown dynamic loader error".to_string()
    } else {
        unsafe { CStr::from_ptr(msg) }.to_string_lossy().into_owned()
    }
}
