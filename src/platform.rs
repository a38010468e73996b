//! Architecture × quantum-depth build matrix.
//!
//! The emitted code covers every configured architecture and pixel depth, but
//! a given build compiles exactly one architecture block and one quantum
//! alias. Which block is live is decided by preprocessor symbols:
//!
//! ```text
//! build target      symbols              x64 block   x86 block   runtime switch
//! ────────────────  ───────────────────  ──────────  ──────────  ──────────────
//! x64               PLATFORM_x64         compiled    -           -
//! x86               PLATFORM_x86         -           compiled    -
//! AnyCPU            PLATFORM_AnyCPU      compiled    compiled    Is64Bit
//! ```
//!
//! With a single configured architecture nothing is guarded: its block is
//! live for every build. Blocks are always emitted 64-bit first.

use crate::config::MatrixConfig;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Preprocessor symbol defined by AnyCPU builds.
pub const ANY_CPU_SYMBOL: &str = "PLATFORM_AnyCPU";

/// Runtime bitness test used to choose a block in AnyCPU builds.
pub const RUNTIME_64BIT_CHECK: &str = "OperatingSystem.Is64Bit";

/// Native architecture with its own import block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Architecture {
    X64,
    X86,
}

impl Architecture {
    /// Emission order: 64-bit first.
    pub const ORDER: [Architecture; 2] = [Architecture::X64, Architecture::X86];

    /// Name of the nested import class (`NativeMethods.X64`).
    pub fn class_name(self) -> &'static str {
        match self {
            Architecture::X64 => "X64",
            Architecture::X86 => "X86",
        }
    }

    /// Preprocessor symbol of a build targeting only this architecture.
    pub fn platform_symbol(self) -> &'static str {
        match self {
            Architecture::X64 => "PLATFORM_x64",
            Architecture::X86 => "PLATFORM_x86",
        }
    }

    pub fn is_64bit(self) -> bool {
        matches!(self, Architecture::X64)
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Architecture::X64 => write!(f, "x64"),
            Architecture::X86 => write!(f, "x86"),
        }
    }
}

/// Pixel component width the native library was compiled with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum QuantumDepth {
    Q8,
    Q16,
    #[serde(rename = "Q16HDRI")]
    Q16Hdri,
}

impl QuantumDepth {
    /// Preprocessor symbol selecting this depth.
    pub fn symbol(self) -> &'static str {
        match self {
            QuantumDepth::Q8 => "Q8",
            QuantumDepth::Q16 => "Q16",
            QuantumDepth::Q16Hdri => "Q16HDRI",
        }
    }

    /// Concrete managed type standing in for `QuantumType`.
    pub fn quantum_type(self) -> &'static str {
        match self {
            QuantumDepth::Q8 => "System.Byte",
            QuantumDepth::Q16 => "System.UInt16",
            QuantumDepth::Q16Hdri => "System.Single",
        }
    }
}

impl fmt::Display for QuantumDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Target a consumer build is compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildPlatform {
    X64,
    X86,
    AnyCpu,
}

impl BuildPlatform {
    pub const ALL: [BuildPlatform; 3] = [BuildPlatform::X64, BuildPlatform::X86, BuildPlatform::AnyCpu];

    /// Symbol the build defines.
    pub fn symbol(self) -> &'static str {
        match self {
            BuildPlatform::X64 => Architecture::X64.platform_symbol(),
            BuildPlatform::X86 => Architecture::X86.platform_symbol(),
            BuildPlatform::AnyCpu => ANY_CPU_SYMBOL,
        }
    }
}

/// A disjunction of preprocessor symbols: `PLATFORM_x64 || PLATFORM_AnyCPU`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Guard {
    symbols: Vec<&'static str>,
}

impl Guard {
    /// The `#if` expression.
    pub fn expression(&self) -> String {
        self.symbols.join(" || ")
    }

    /// Whether the guarded code compiles for a build defining `symbol`.
    pub fn is_active(&self, symbol: &str) -> bool {
        self.symbols.contains(&symbol)
    }
}

/// Configured architectures in emission order.
pub fn ordered_architectures(matrix: &MatrixConfig) -> Vec<Architecture> {
    Architecture::ORDER
        .into_iter()
        .filter(|arch| matrix.architectures.contains(arch))
        .collect()
}

/// Whether call sites need the runtime bitness switch.
pub fn needs_runtime_switch(matrix: &MatrixConfig) -> bool {
    matrix.any_cpu && ordered_architectures(matrix).len() > 1
}

/// Guard around an architecture's import block and call sites.
///
/// `None` when only one architecture is configured.
pub fn block_guard(matrix: &MatrixConfig, arch: Architecture) -> Option<Guard> {
    if ordered_architectures(matrix).len() < 2 {
        return None;
    }
    let mut symbols = vec![arch.platform_symbol()];
    if matrix.any_cpu {
        symbols.push(ANY_CPU_SYMBOL);
    }
    Some(Guard { symbols })
}

/// The architecture block that executes for a build and process bitness.
///
/// Returns `None` when the build target is not covered by the matrix.
pub fn active_architecture(
    matrix: &MatrixConfig,
    build: BuildPlatform,
    process_is_64bit: bool,
) -> Option<Architecture> {
    let compiled: Vec<Architecture> = ordered_architectures(matrix)
        .into_iter()
        .filter(|arch| block_guard(matrix, *arch).is_none_or(|g| g.is_active(build.symbol())))
        .collect();

    match compiled.as_slice() {
        [single] => Some(*single),
        [first, second] if build == BuildPlatform::AnyCpu && matrix.any_cpu => {
            // The `if (Is64Bit)` branch holds the 64-bit block.
            if process_is_64bit == first.is_64bit() {
                Some(*first)
            } else {
                Some(*second)
            }
        }
        _ => None,
    }
}

/// Lines selecting one call among the architecture blocks.
///
/// `call` renders the statement for one architecture. In AnyCPU mode each
/// statement is indented one level beneath the runtime `if`/`else`.
pub fn dispatch_lines<F>(matrix: &MatrixConfig, indent: &str, call: F) -> Vec<String>
where
    F: Fn(Architecture) -> String,
{
    let archs = ordered_architectures(matrix);
    let switch = needs_runtime_switch(matrix);
    let mut lines = Vec::new();

    for (i, arch) in archs.iter().enumerate() {
        if switch {
            lines.push(format!("#if {ANY_CPU_SYMBOL}"));
            lines.push(if i == 0 {
                format!("if ({RUNTIME_64BIT_CHECK})")
            } else {
                "else".to_string()
            });
            lines.push("#endif".to_string());
        }
        let guard = block_guard(matrix, *arch);
        if let Some(guard) = &guard {
            lines.push(format!("#if {}", guard.expression()));
        }
        let statement = call(*arch);
        if switch {
            lines.push(format!("{indent}{statement}"));
        } else {
            lines.push(statement);
        }
        if guard.is_some() {
            lines.push("#endif".to_string());
        }
    }
    lines
}

/// The `using QuantumType = ...;` alias chain over the configured depths.
pub fn quantum_alias_lines(matrix: &MatrixConfig) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, depth) in matrix.quantum_depths.iter().enumerate() {
        let directive = if i == 0 { "#if" } else { "#elif" };
        lines.push(format!("{directive} {}", depth.symbol()));
        lines.push(format!(
            "using {} = {};",
            crate::types::QUANTUM_TYPE,
            depth.quantum_type()
        ));
    }
    lines.push("#else".to_string());
    lines.push("#error Not implemented!".to_string());
    lines.push("#endif".to_string());
    lines
}

/// Replace whole-word occurrences of `QuantumType` with the concrete type.
pub fn substitute_quantum(text: &str, depth: QuantumDepth) -> String {
    let needle = crate::types::QUANTUM_TYPE;
    let replacement = depth.quantum_type();
    let is_ident = |c: char| c.is_ascii_alphanumeric() || c == '_';

    let mut out = String::with_capacity(text.len());
    let mut copied = 0;
    for (pos, _) in text.match_indices(needle) {
        let end = pos + needle.len();
        let before = text[..pos].chars().next_back();
        let after = text[end..].chars().next();
        if before.is_some_and(is_ident) || after.is_some_and(is_ident) {
            continue;
        }
        out.push_str(&text[copied..pos]);
        out.push_str(replacement);
        copied = end;
    }
    out.push_str(&text[copied..]);
    out
}

/// `Stem.cs` becomes `Stem.Q16.cs`; names without `.cs` get the suffix appended.
pub fn depth_file_name(file_name: &str, depth: QuantumDepth) -> String {
    match file_name.strip_suffix(".cs") {
        Some(stem) => format!("{stem}.{}.cs", depth.symbol()),
        None => format!("{file_name}.{}", depth.symbol()),
    }
}

/// One architecture's rendering of a logical native declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcreteDeclaration {
    pub arch: Architecture,
    pub depth: Option<QuantumDepth>,
    pub lines: Vec<String>,
}

/// Expand a logical extern declaration into one concrete declaration per
/// architecture (64-bit first), importing from that architecture's library.
///
/// `depth` substitutes `QuantumType` when producing expanded files; `None`
/// keeps the alias.
pub fn expand_declaration(
    matrix: &MatrixConfig,
    library: &crate::config::LibraryConfig,
    depth: Option<QuantumDepth>,
    attributes: &[String],
    signature: &str,
) -> Vec<ConcreteDeclaration> {
    ordered_architectures(matrix)
        .into_iter()
        .map(|arch| {
            let mut lines = vec![format!(
                "[DllImport({}, CallingConvention = CallingConvention.Cdecl)]",
                library.name_for(arch)
            )];
            lines.extend(attributes.iter().cloned());
            lines.push(signature.to_string());
            if let Some(depth) = depth {
                lines = lines
                    .into_iter()
                    .map(|line| substitute_quantum(&line, depth))
                    .collect();
            }
            ConcreteDeclaration { arch, depth, lines }
        })
        .collect()
}
