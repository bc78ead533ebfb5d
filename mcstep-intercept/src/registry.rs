//! # Call-Site Registration Table
//!
//! Every host method the shim replaces is declared exactly once, in the
//! [`call_sites!`] invocation at the bottom of this file. From that single
//! row the macro derives:
//!
//! - a [`SiteId`] variant (index into the per-site resolution cache),
//! - a [`CallSiteDescriptor`] in [`CALL_SITES`],
//! - an exported entry point whose symbol name is the host method's mangled
//!   name, so the dynamic linker binds the host's calls to it when this
//!   library is preloaded.
//!
//! ## Binary Contract
//!
//! The host classes are unrelated C++ classes; each method is a non-virtual
//! member function under the Itanium ABI, i.e. a plain C-ABI function whose
//! first integer argument is the receiver:
//!
//! ```text
//! void App::Stepping()                         -> fn(this)
//! void Field::Field(const double*, double*)    -> fn(this, point, b_field)
//! ```
//!
//! Hooks and originals use the `C-unwind` ABI: a C++ exception leaving the
//! host's method has to pass through the hook exactly as it would have
//! passed through a direct call.
//!
//! The mangled suffix encodes the parameter list (`Ev` for no parameters,
//! `EPKdPd` for `(const double*, double*)`), which the table tests check
//! against each row's role.
//!
//! Adding a host variant means adding rows here with the symbol names of
//! that variant's build. Nothing else changes.

use std::fmt;

/// Which lifecycle method a call site is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Stepping,
    FinishEvent,
    ConstructGeometry,
    Field,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Stepping => "Stepping",
            Role::FinishEvent => "FinishEvent",
            Role::ConstructGeometry => "ConstructGeometry",
            Role::Field => "Field",
        };
        f.write_str(name)
    }
}

/// Which host interface the owning class implements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostKind {
    /// `TVirtualMCApplication` implementation
    Application,
    /// `TVirtualMCMultiApplication` implementation (multi-engine stepping)
    MultiApplication,
    /// `TVirtualMagField` implementation
    MagneticField,
}

/// Static declaration of one interceptable host method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallSiteDescriptor {
    pub id: SiteId,
    /// Owning host class
    pub host: &'static str,
    pub kind: HostKind,
    pub role: Role,
    /// Library base name without platform suffix (e.g. `libBase`)
    pub library: &'static str,
    /// Mangled name of the host method
    pub symbol: &'static str,
}

impl CallSiteDescriptor {
    /// Library file name for the current platform (`libBase.so`, `libBase.dylib`)
    #[must_use]
    pub fn library_file(&self) -> String {
        format!("{}{}", self.library, std::env::consts::DLL_SUFFIX)
    }
}

/// Look up the descriptor for a site
#[must_use]
pub fn descriptor(site: SiteId) -> &'static CallSiteDescriptor {
    &CALL_SITES[site.index()]
}

/// Find the call site whose original has the given mangled name
#[must_use]
pub fn find_by_symbol(symbol: &str) -> Option<&'static CallSiteDescriptor> {
    CALL_SITES.iter().find(|site| site.symbol == symbol)
}

/// All call sites owned by one host class, in table order
pub fn sites_for_host(host: &str) -> impl Iterator<Item = &'static CallSiteDescriptor> + '_ {
    CALL_SITES.iter().filter(move |site| site.host == host)
}

/// Distinct host class names, in table order
#[must_use]
pub fn hosts() -> Vec<&'static str> {
    let mut hosts: Vec<&'static str> = Vec::new();
    for site in CALL_SITES {
        if !hosts.contains(&site.host) {
            hosts.push(site.host);
        }
    }
    hosts
}

macro_rules! call_sites {
    (@entry Stepping, $id:ident, $symbol:literal, $entry:ident) => {
        /// Replacement for the host's stepping method.
        ///
        /// # Safety
        /// Only the host may call this, with a valid receiver.
        #[export_name = $symbol]
        pub unsafe extern "C-unwind" fn $entry(this: *mut c_void) {
            crate::preload::stepping(SiteId::$id, this);
        }
    };
    (@entry FinishEvent, $id:ident, $symbol:literal, $entry:ident) => {
        /// Replacement for the host's end-of-event method.
        ///
        /// # Safety
        /// Only the host may call this, with a valid receiver.
        #[export_name = $symbol]
        pub unsafe extern "C-unwind" fn $entry(this: *mut c_void) {
            crate::preload::finish_event(SiteId::$id, this);
        }
    };
    (@entry ConstructGeometry, $id:ident, $symbol:literal, $entry:ident) => {
        /// Replacement for the host's geometry construction method.
        ///
        /// # Safety
        /// Only the host may call this, with a valid receiver.
        #[export_name = $symbol]
        pub unsafe extern "C-unwind" fn $entry(this: *mut c_void) {
            crate::preload::construct_geometry(SiteId::$id, this);
        }
    };
    (@entry Field, $id:ident, $symbol:literal, $entry:ident) => {
        /// Replacement for the host's field evaluation method.
        ///
        /// # Safety
        /// Only the host may call this, with a valid receiver, a readable
        /// 3-vector `point` and a writable 3-vector `b_field`.
        #[export_name = $symbol]
        pub unsafe extern "C-unwind" fn $entry(
            this: *mut c_void,
            point: *const f64,
            b_field: *mut f64,
        ) {
            crate::preload::field(SiteId::$id, this, point, b_field);
        }
    };
    (
        $(
            $id:ident => $host:literal, $kind:ident, $role:ident, $library:literal, $symbol:literal, $entry:ident;
        )*
    ) => {
        /// One variant per registered call site, in table order
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum SiteId {
            $( $id, )*
        }

        impl SiteId {
            /// Every site, in table order
            pub const ALL: &'static [SiteId] = &[ $( SiteId::$id, )* ];

            /// Position in [`CALL_SITES`]
            #[must_use]
            pub const fn index(self) -> usize {
                self as usize
            }
        }

        /// The registration table
        pub static CALL_SITES: &[CallSiteDescriptor] = &[
            $(
                CallSiteDescriptor {
                    id: SiteId::$id,
                    host: $host,
                    kind: HostKind::$kind,
                    role: Role::$role,
                    library: $library,
                    symbol: $symbol,
                },
            )*
        ];

        /// Exported replacements, bound by the dynamic linker under LD_PRELOAD
        #[cfg(all(feature = "preload", not(test)))]
        #[allow(unsafe_code)]
        pub mod entry_points {
            use super::SiteId;
            use std::ffi::c_void;

            $( call_sites!(@entry $role, $id, $symbol, $entry); )*
        }
    };
}

call_sites! {
    FairStepping => "FairMCApplication", Application, Stepping,
        "libBase", "_ZN17FairMCApplication8SteppingEv", fair_mc_application_stepping;
    FairFinishEvent => "FairMCApplication", Application, FinishEvent,
        "libBase", "_ZN17FairMCApplication11FinishEventEv", fair_mc_application_finish_event;
    FairConstructGeometry => "FairMCApplication", Application, ConstructGeometry,
        "libBase", "_ZN17FairMCApplication17ConstructGeometryEv", fair_mc_application_construct_geometry;

    AliMcStepping => "AliMC", Application, Stepping,
        "libSTEER", "_ZN5AliMC8SteppingEv", ali_mc_stepping;
    AliMcFinishEvent => "AliMC", Application, FinishEvent,
        "libSTEER", "_ZN5AliMC11FinishEventEv", ali_mc_finish_event;
    AliMcConstructGeometry => "AliMC", Application, ConstructGeometry,
        "libSTEER", "_ZN5AliMC17ConstructGeometryEv", ali_mc_construct_geometry;

    CeSingleStepping => "CEMCSingleApplication", Application, Stepping,
        "libvmc_CE", "_ZN21CEMCSingleApplication8SteppingEv", ce_single_stepping;
    CeSingleFinishEvent => "CEMCSingleApplication", Application, FinishEvent,
        "libvmc_CE", "_ZN21CEMCSingleApplication11FinishEventEv", ce_single_finish_event;
    CeSingleConstructGeometry => "CEMCSingleApplication", Application, ConstructGeometry,
        "libvmc_CE", "_ZN21CEMCSingleApplication17ConstructGeometryEv", ce_single_construct_geometry;

    CeMultiStepping => "CEMCMultiApplication", MultiApplication, Stepping,
        "libvmc_CE", "_ZN20CEMCMultiApplication13SteppingMultiEv", ce_multi_stepping;
    CeMultiFinishEvent => "CEMCMultiApplication", MultiApplication, FinishEvent,
        "libvmc_CE", "_ZN20CEMCMultiApplication16FinishEventMultiEv", ce_multi_finish_event;
    CeMultiConstructGeometry => "CEMCMultiApplication", MultiApplication, ConstructGeometry,
        "libvmc_CE", "_ZN20CEMCMultiApplication21ConstructGeometryMultiEv", ce_multi_construct_geometry;

    O2MagneticFieldField => "o2::field::MagneticField", MagneticField, Field,
        "libField", "_ZN2o25field13MagneticField5FieldEPKdPd", o2_magnetic_field_field;
    AliMagFField => "AliMagF", MagneticField, Field,
        "libSTEERBase", "_ZN7AliMagF5FieldEPKdPd", ali_mag_f_field;
}
