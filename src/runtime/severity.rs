//! Native severity codes and the exception kinds they map to.
//!
//! ```text
//!   code     band      subsystem                kind
//!   ───────  ────────  ───────────────────────  ──────────────────────────
//!   300+n    warning   n ∈ named offsets        Magick{Subsystem}Warning
//!   400+n    error     n ∈ named offsets        Magick{Subsystem}Error
//!   < 400    warning   anything else            MagickWarning (generic)
//!   ≥ 400    error     anything else            MagickError (generic)
//! ```
//!
//! The same table drives the Rust runtime and the emitted C# switch.

use std::fmt;

/// Lowest code of the warning band.
pub const WARNING_BASE: i32 = 300;
/// Lowest code of the error band. Codes at or above are errors.
pub const ERROR_BASE: i32 = 400;

/// Native subsystem named by a severity code's offset within its band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Subsystem {
    ResourceLimit,
    Type,
    Option,
    Delegate,
    MissingDelegate,
    CorruptImage,
    FileOpen,
    Blob,
    Stream,
    Cache,
    Coder,
    Module,
    Draw,
    Image,
    Registry,
    Configure,
    Policy,
}

impl Subsystem {
    pub const ALL: [Subsystem; 17] = [
        Subsystem::ResourceLimit,
        Subsystem::Type,
        Subsystem::Option,
        Subsystem::Delegate,
        Subsystem::MissingDelegate,
        Subsystem::CorruptImage,
        Subsystem::FileOpen,
        Subsystem::Blob,
        Subsystem::Stream,
        Subsystem::Cache,
        Subsystem::Coder,
        Subsystem::Module,
        Subsystem::Draw,
        Subsystem::Image,
        Subsystem::Registry,
        Subsystem::Configure,
        Subsystem::Policy,
    ];

    /// Offset from the band base.
    pub fn offset(self) -> i32 {
        match self {
            Subsystem::ResourceLimit => 0,
            Subsystem::Type => 5,
            Subsystem::Option => 10,
            Subsystem::Delegate => 15,
            Subsystem::MissingDelegate => 20,
            Subsystem::CorruptImage => 25,
            Subsystem::FileOpen => 30,
            Subsystem::Blob => 35,
            Subsystem::Stream => 40,
            Subsystem::Cache => 45,
            Subsystem::Coder => 50,
            Subsystem::Module => 55,
            Subsystem::Draw => 60,
            Subsystem::Image => 65,
            Subsystem::Registry => 90,
            Subsystem::Configure => 95,
            Subsystem::Policy => 99,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Subsystem::ResourceLimit => "ResourceLimit",
            Subsystem::Type => "Type",
            Subsystem::Option => "Option",
            Subsystem::Delegate => "Delegate",
            Subsystem::MissingDelegate => "MissingDelegate",
            Subsystem::CorruptImage => "CorruptImage",
            Subsystem::FileOpen => "FileOpen",
            Subsystem::Blob => "Blob",
            Subsystem::Stream => "Stream",
            Subsystem::Cache => "Cache",
            Subsystem::Coder => "Coder",
            Subsystem::Module => "Module",
            Subsystem::Draw => "Draw",
            Subsystem::Image => "Image",
            Subsystem::Registry => "Registry",
            Subsystem::Configure => "Configure",
            Subsystem::Policy => "Policy",
        }
    }

    fn from_offset(offset: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.offset() == offset)
    }
}

/// Warning or error band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Band {
    Warning,
    Error,
}

impl Band {
    pub fn name(self) -> &'static str {
        match self {
            Band::Warning => "Warning",
            Band::Error => "Error",
        }
    }

    fn base(self) -> i32 {
        match self {
            Band::Warning => WARNING_BASE,
            Band::Error => ERROR_BASE,
        }
    }
}

/// Exception kind selected by a severity code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExceptionKind {
    pub band: Band,
    /// `None` for the generic fallback of the band.
    pub subsystem: Option<Subsystem>,
}

impl ExceptionKind {
    pub const WARNING: ExceptionKind = ExceptionKind {
        band: Band::Warning,
        subsystem: None,
    };
    pub const ERROR: ExceptionKind = ExceptionKind {
        band: Band::Error,
        subsystem: None,
    };

    /// Map a native severity code. Total: every code yields a kind.
    pub fn from_severity(code: i32) -> Self {
        let band = if code < ERROR_BASE {
            Band::Warning
        } else {
            Band::Error
        };
        let subsystem = match code {
            300..=399 => Subsystem::from_offset(code - WARNING_BASE),
            400..=499 => Subsystem::from_offset(code - ERROR_BASE),
            _ => None,
        };
        Self { band, subsystem }
    }

    pub fn is_error(self) -> bool {
        self.band == Band::Error
    }

    pub fn is_warning(self) -> bool {
        self.band == Band::Warning
    }

    /// Exact severity code for named kinds.
    pub fn code(self) -> Option<i32> {
        self.subsystem.map(|s| self.band.base() + s.offset())
    }

    /// Severity enum member name, e.g. `CorruptImageWarning`.
    pub fn severity_name(self) -> Option<String> {
        self.subsystem
            .map(|s| format!("{}{}", s.name(), self.band.name()))
    }

    /// Managed exception class, e.g. `MagickCorruptImageWarningException`.
    pub fn exception_name(self) -> String {
        match self.subsystem {
            Some(s) => format!("Magick{}{}Exception", s.name(), self.band.name()),
            None => format!("Magick{}Exception", self.band.name()),
        }
    }

    /// Every named kind in code order, warnings first.
    pub fn named() -> impl Iterator<Item = ExceptionKind> {
        [Band::Warning, Band::Error].into_iter().flat_map(|band| {
            Subsystem::ALL.into_iter().map(move |s| ExceptionKind {
                band,
                subsystem: Some(s),
            })
        })
    }
}

impl fmt::Display for ExceptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.exception_name())
    }
}
