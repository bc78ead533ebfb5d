//! `DlResolver` against a real shared object.
//!
//! The fixture is this crate's own cdylib copied under a host library name.
//! It exports every registered host symbol, which is exactly the situation
//! in a preloaded host: the same mangled name is defined more than once in
//! the process, and the resolver must return the definition inside the
//! named library.

#![cfg(all(feature = "preload", target_os = "linux"))]
#![allow(unsafe_code)]

use mcstep_intercept::{DlResolver, ResolveError, SymbolResolver};
use std::ffi::{CStr, CString};
use std::path::{Path, PathBuf};

const STEPPING: &str = "_ZN5AliMC8SteppingEv";

/// The cdylib cargo built next to this test binary
fn built_cdylib() -> PathBuf {
    let file = format!(
        "{}mcstep_intercept{}",
        std::env::consts::DLL_PREFIX,
        std::env::consts::DLL_SUFFIX
    );
    let exe = std::env::current_exe().expect("Failed to locate test binary");
    let deps = exe.parent().expect("test binary has a directory");
    [deps, deps.parent().unwrap_or(deps)]
        .iter()
        .map(|dir| dir.join(&file))
        .find(|path| path.is_file())
        .unwrap_or_else(|| panic!("{file} not found next to {}", exe.display()))
}

/// Load `path` privately, the way a host links its own libraries
fn load(path: &Path) {
    let name = CString::new(path.to_str().unwrap()).unwrap();
    let handle = unsafe { libc::dlopen(name.as_ptr(), libc::RTLD_NOW | libc::RTLD_LOCAL) };
    assert!(!handle.is_null(), "dlopen {} failed", path.display());
}

/// File the dynamic loader attributes an address to
fn owning_file(addr: *const std::ffi::c_void) -> String {
    let mut info: libc::Dl_info = unsafe { std::mem::zeroed() };
    assert_ne!(unsafe { libc::dladdr(addr, &mut info) }, 0, "address not in any object");
    unsafe { CStr::from_ptr(info.dli_fname) }.to_string_lossy().into_owned()
}

#[test]
fn test_resolves_definition_inside_named_library() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = dir.path().join("libSTEER.so");
    std::fs::copy(built_cdylib(), &fixture).unwrap();
    let library = fixture.with_extension("");
    let library = library.to_str().unwrap();

    let resolver = DlResolver::new();

    // Not loaded yet: the resolver must not load it on its own.
    let err = resolver.resolve(library, STEPPING).unwrap_err();
    assert!(matches!(err, ResolveError::LibraryNotFound { .. }), "{err}");

    load(&fixture);

    // The earlier failure is not remembered once the host has the library.
    let first = resolver.resolve(library, STEPPING).expect("symbol in fixture");
    let second = resolver.resolve(library, STEPPING).unwrap();
    assert_eq!(first, second);

    assert_eq!(owning_file(first.as_ptr()), fixture.to_str().unwrap());
    let linked = mcstep_intercept::registry::entry_points::ali_mc_stepping as usize;
    assert_ne!(first.as_ptr() as usize, linked, "resolved this binary's own export");

    let err = resolver.resolve(library, "_ZN9NoSuchApp8SteppingEv").unwrap_err();
    assert!(matches!(err, ResolveError::SymbolNotFound { .. }), "{err}");
}
