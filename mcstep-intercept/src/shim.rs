//! # Interception Shim
//!
//! Implements the four hook contracts on top of an injectable
//! [`SymbolResolver`] and [`Recorder`]:
//!
//! ```text
//! Stepping          : resolve ─▶ recorder.on_step()        ─▶ original(this)
//! FinishEvent       : resolve ─▶ recorder.on_event_flush() ─▶ original(this)
//! ConstructGeometry : resolve ─▶ original(this)            ─▶ recorder.on_logger_init()
//! Field             : resolve ─▶ original(this, x, b)      ─▶ recorder.on_field_sample(x, b)
//! ```
//!
//! Resolution always comes first so that a site which cannot be forwarded
//! never reports an observation for a call that did not happen. A resolution
//! failure is returned as [`ShimError`]; the exported entry points treat it
//! as fatal and abort the host.
//!
//! ## Resolution Cache
//!
//! One [`OnceLock`] slot per [`SiteId`]. Concurrent first callers block on
//! the slot and all observe the single resolution result, success or
//! failure. Nothing is ever resolved twice.
//!
//! ## Recorder Isolation
//!
//! Notifications run under `catch_unwind`: a panicking recorder is reported
//! through `log` and the host call is still forwarded with its original
//! arguments.
//!
//! The forwarded call itself is not guarded. Originals are `C-unwind`
//! functions, so an exception thrown by the host's own method unwinds
//! through the hook back to the host's caller unchanged.

#![allow(unsafe_code)] // calls through resolved host function pointers

use log::{debug, error};
use std::ffi::c_void;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;

use crate::errors::{ResolveError, ShimError};
use crate::recorder::Recorder;
use crate::registry::{descriptor, CallSiteDescriptor, Role, SiteId, CALL_SITES};
use crate::resolver::{OriginalAddr, SymbolResolver};

/// `void Class::Method()`
pub type MethodFn = unsafe extern "C-unwind" fn(this: *mut c_void);

/// `void Class::Field(const double* point, double* bField)`
pub type FieldFn =
    unsafe extern "C-unwind" fn(this: *mut c_void, point: *const f64, b_field: *mut f64);

/// The cached host original for one call site
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedOriginal {
    pub site: SiteId,
    pub addr: OriginalAddr,
}

impl ResolvedOriginal {
    /// View as a member function without parameters
    ///
    /// # Safety
    /// The address must be a function with the [`MethodFn`] signature.
    unsafe fn as_method(self) -> MethodFn {
        std::mem::transmute::<*mut c_void, MethodFn>(self.addr.as_ptr())
    }

    /// View as a field evaluation function
    ///
    /// # Safety
    /// The address must be a function with the [`FieldFn`] signature.
    unsafe fn as_field(self) -> FieldFn {
        std::mem::transmute::<*mut c_void, FieldFn>(self.addr.as_ptr())
    }
}

/// Hook dispatcher for every registered call site
pub struct Shim<R, C> {
    resolver: R,
    recorder: C,
    originals: Vec<OnceLock<Result<ResolvedOriginal, ResolveError>>>,
    resolutions: AtomicUsize,
}

impl<R: SymbolResolver, C: Recorder> Shim<R, C> {
    #[must_use]
    pub fn new(resolver: R, recorder: C) -> Self {
        Self {
            resolver,
            recorder,
            originals: CALL_SITES.iter().map(|_| OnceLock::new()).collect(),
            resolutions: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn recorder(&self) -> &C {
        &self.recorder
    }

    #[must_use]
    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    /// Number of resolver lookups performed so far (at most one per site)
    #[must_use]
    pub fn resolved_count(&self) -> usize {
        self.resolutions.load(Ordering::Acquire)
    }

    /// The host original for `site`, resolved on first use
    ///
    /// # Errors
    /// Returns [`ShimError::Unresolved`] if the resolver failed for this site
    /// (now or on the first attempt).
    pub fn original(&self, site: SiteId) -> Result<ResolvedOriginal, ShimError> {
        let desc = descriptor(site);
        let slot = self.originals[site.index()].get_or_init(|| {
            self.resolutions.fetch_add(1, Ordering::AcqRel);
            let resolved = self
                .resolver
                .resolve(desc.library, desc.symbol)
                .map(|addr| ResolvedOriginal { site, addr });
            match &resolved {
                Ok(original) => debug!(
                    "Resolved {}::{} to {:p}",
                    desc.host,
                    desc.role,
                    original.addr.as_ptr()
                ),
                Err(e) => error!("Failed to resolve {}::{}: {e}", desc.host, desc.role),
            }
            resolved
        });

        slot.clone().map_err(|source| ShimError::Unresolved {
            site,
            host: desc.host,
            role: desc.role,
            source,
        })
    }

    /// Resolve every registered site now
    ///
    /// Returns the sites that failed. Unused host variants are expected to
    /// fail here; only a failure for a site the host actually calls is fatal.
    pub fn resolve_all(&self) -> Vec<ShimError> {
        SiteId::ALL.iter().filter_map(|&site| self.original(site).err()).collect()
    }

    fn original_for(&self, site: SiteId, expected: Role) -> Result<ResolvedOriginal, ShimError> {
        let desc: &CallSiteDescriptor = descriptor(site);
        if desc.role != expected {
            return Err(ShimError::RoleMismatch { site, expected, actual: desc.role });
        }
        self.original(site)
    }

    /// Stepping hook: count the step, then forward
    ///
    /// # Errors
    /// Returns an error if the original cannot be resolved; nothing was
    /// forwarded and the host cannot continue correctly.
    ///
    /// # Safety
    /// `this` must be the receiver the host passed, and the resolved address
    /// must be a [`MethodFn`].
    pub unsafe fn stepping(&self, site: SiteId, this: *mut c_void) -> Result<(), ShimError> {
        let original = self.original_for(site, Role::Stepping)?;
        self.notify(site, || self.recorder.on_step());
        original.as_method()(this);
        Ok(())
    }

    /// End-of-event hook: flush the recorder, then forward
    ///
    /// # Errors
    /// Returns an error if the original cannot be resolved.
    ///
    /// # Safety
    /// See [`Shim::stepping`].
    pub unsafe fn finish_event(&self, site: SiteId, this: *mut c_void) -> Result<(), ShimError> {
        let original = self.original_for(site, Role::FinishEvent)?;
        self.notify(site, || self.recorder.on_event_flush());
        original.as_method()(this);
        Ok(())
    }

    /// Geometry hook: forward, then initialize the recorder
    ///
    /// # Errors
    /// Returns an error if the original cannot be resolved.
    ///
    /// # Safety
    /// See [`Shim::stepping`].
    pub unsafe fn construct_geometry(
        &self,
        site: SiteId,
        this: *mut c_void,
    ) -> Result<(), ShimError> {
        let original = self.original_for(site, Role::ConstructGeometry)?;
        original.as_method()(this);
        self.notify(site, || self.recorder.on_logger_init());
        Ok(())
    }

    /// Field hook: forward, then report the point and computed vector
    ///
    /// The output buffer is read after the original wrote it and is never
    /// written by the shim. Null pointers are forwarded as-is and not sampled.
    ///
    /// # Errors
    /// Returns an error if the original cannot be resolved.
    ///
    /// # Safety
    /// `this`, `point` and `b_field` must be what the host passed; when
    /// non-null, `point` and `b_field` must each reference three `f64`.
    pub unsafe fn field(
        &self,
        site: SiteId,
        this: *mut c_void,
        point: *const f64,
        b_field: *mut f64,
    ) -> Result<(), ShimError> {
        let original = self.original_for(site, Role::Field)?;
        original.as_field()(this, point, b_field);

        if !point.is_null() && !b_field.is_null() {
            let x = std::ptr::read(point.cast::<[f64; 3]>());
            let b = std::ptr::read(b_field.cast_const().cast::<[f64; 3]>());
            self.notify(site, || self.recorder.on_field_sample(x, b));
        }
        Ok(())
    }

    fn notify(&self, site: SiteId, f: impl FnOnce()) {
        if catch_unwind(AssertUnwindSafe(f)).is_err() {
            let desc = descriptor(site);
            error!("Recorder panicked in {}::{} hook; record dropped", desc.host, desc.role);
        }
    }
}
