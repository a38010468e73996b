//! Generator configuration module.
//!
//! Handles loading, validating, and merging `interop.toml`. Stock defaults are
//! overridden by the file at the descriptor root, key by key.
//!
//! ## Config File Location
//!
//! ```text
//! descriptors/
//! ├── interop.toml             # Generator config (overrides stock defaults)
//! ├── MagickImage.toml         # One class descriptor per file
//! └── Settings/
//!     └── MagickSettings.toml
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! namespace = "ImageMagick"        # Namespace of every emitted class
//! license_header = []              # Lines written as `//` comments at file top
//! emit_exception_helper = true     # Emit MagickExceptionHelper.g.cs
//! newer_runtime_symbol = "NETSTANDARD2_1"
//!
//! [matrix]
//! architectures = ["x64", "x86"]   # Emitted 64-bit first regardless of order here
//! any_cpu = true                   # Also support PLATFORM_AnyCPU builds
//! quantum_depths = ["Q8", "Q16", "Q16HDRI"]
//! quantum_mode = "alias"           # "alias" (one file) or "expand" (file per depth)
//!
//! [library]
//! x64_name = "NativeLibrary.X64Name"
//! x86_name = "NativeLibrary.X86Name"
//! initializer = "NativeLibrary.DoInitialize();"
//!
//! [types]
//! enums = ["ColorSpace", "NoiseType"]
//! enum_native = "UIntPtr"
//!
//! [types.custom.PointInfo]
//! native = "IntPtr"
//! newer_runtime = false
//!
//! [format]
//! indent = "  "
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::naming;
use crate::platform::{Architecture, QuantumDepth};
use crate::types;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Name of the config file looked up in the descriptor root.
pub const CONFIG_FILENAME: &str = "interop.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Generator configuration loaded from `interop.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Namespace wrapping every emitted class unless a descriptor overrides it.
    pub namespace: String,
    /// Lines written as `//` comments at the top of each emitted file.
    pub license_header: Vec<String>,
    /// Whether to emit the severity → exception switch as C#.
    pub emit_exception_helper: bool,
    /// Preprocessor symbol guarding members that use newer-runtime types.
    pub newer_runtime_symbol: String,
    /// Build matrix the emitted code must cover.
    pub matrix: MatrixConfig,
    /// Native library names and initialization.
    pub library: LibraryConfig,
    /// Types registered in addition to the built-in table.
    pub types: TypesConfig,
    /// Output formatting.
    pub format: FormatConfig,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            namespace: "ImageMagick".to_string(),
            license_header: Vec::new(),
            emit_exception_helper: true,
            newer_runtime_symbol: "NETSTANDARD2_1".to_string(),
            matrix: MatrixConfig::default(),
            library: LibraryConfig::default(),
            types: TypesConfig::default(),
            format: FormatConfig::default(),
        }
    }
}

impl GeneratorConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.namespace.trim().is_empty() {
            return Err(ConfigError::Validation("namespace must not be empty".into()));
        }
        if self.matrix.architectures.is_empty() {
            return Err(ConfigError::Validation(
                "matrix.architectures must not be empty".into(),
            ));
        }
        if self.matrix.quantum_depths.is_empty() {
            return Err(ConfigError::Validation(
                "matrix.quantum_depths must not be empty".into(),
            ));
        }
        if has_duplicates(&self.matrix.architectures) {
            return Err(ConfigError::Validation(
                "matrix.architectures contains duplicates".into(),
            ));
        }
        if has_duplicates(&self.matrix.quantum_depths) {
            return Err(ConfigError::Validation(
                "matrix.quantum_depths contains duplicates".into(),
            ));
        }
        if self.format.indent.is_empty() || !self.format.indent.chars().all(|c| c == ' ' || c == '\t')
        {
            return Err(ConfigError::Validation(
                "format.indent must be non-empty whitespace".into(),
            ));
        }
        self.types.validate()
    }
}

impl TypesConfig {
    /// Every registered name maps to exactly one native representation.
    fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Validation(msg));
        let registered = self.enums.iter().chain(self.custom.keys());
        for name in registered {
            if types::builtin(name).is_some() {
                return invalid(format!("types: '{name}' shadows a built-in type"));
            }
            if !naming::is_valid_identifier(name) {
                return invalid(format!("types: '{name}' is not a valid type name"));
            }
        }
        if has_duplicates(&self.enums) {
            return invalid("types.enums contains duplicates".into());
        }
        if let Some(name) = self.enums.iter().find(|name| self.custom.contains_key(*name)) {
            return invalid(format!("types: '{name}' is both an enum and a custom type"));
        }
        if !naming::is_type_name(&self.enum_native) {
            return invalid(format!(
                "types.enum_native '{}' is not a type name",
                self.enum_native
            ));
        }
        if let Some((name, custom)) = self
            .custom
            .iter()
            .find(|(_, custom)| !naming::is_type_name(&custom.native))
        {
            return invalid(format!(
                "types.custom.{name}.native '{}' is not a type name",
                custom.native
            ));
        }
        Ok(())
    }
}

fn has_duplicates<T: PartialEq>(items: &[T]) -> bool {
    items
        .iter()
        .enumerate()
        .any(|(i, item)| items[i + 1..].contains(item))
}

/// How quantum-depth variants are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuantumMode {
    /// One file per class with a guarded `using QuantumType = ...;` alias.
    Alias,
    /// One file per class and depth with `QuantumType` substituted textually.
    Expand,
}

/// Build matrix settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MatrixConfig {
    /// Native architectures to emit import blocks for.
    pub architectures: Vec<Architecture>,
    /// Whether `PLATFORM_AnyCPU` builds are supported (runtime bitness switch).
    pub any_cpu: bool,
    /// Pixel component widths the native library is built with.
    pub quantum_depths: Vec<QuantumDepth>,
    /// Alias or expand quantum variants.
    pub quantum_mode: QuantumMode,
}

impl Default for MatrixConfig {
    fn default() -> Self {
        Self {
            architectures: vec![Architecture::X64, Architecture::X86],
            any_cpu: true,
            quantum_depths: vec![QuantumDepth::Q8, QuantumDepth::Q16, QuantumDepth::Q16Hdri],
            quantum_mode: QuantumMode::Alias,
        }
    }
}

/// Native library naming.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LibraryConfig {
    /// Expression naming the 64-bit native library in `[DllImport]`.
    pub x64_name: String,
    /// Expression naming the 32-bit native library in `[DllImport]`.
    pub x86_name: String,
    /// Statement run by each architecture class's static constructor.
    /// Empty disables the static constructor.
    pub initializer: String,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            x64_name: "NativeLibrary.X64Name".to_string(),
            x86_name: "NativeLibrary.X86Name".to_string(),
            initializer: "NativeLibrary.DoInitialize();".to_string(),
        }
    }
}

impl LibraryConfig {
    /// Library name expression for an architecture.
    pub fn name_for(&self, arch: Architecture) -> &str {
        match arch {
            Architecture::X64 => &self.x64_name,
            Architecture::X86 => &self.x86_name,
        }
    }
}

/// Types registered on top of the built-in table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TypesConfig {
    /// Enum type names; marshaled as `enum_native` with explicit casts.
    pub enums: Vec<String>,
    /// Native representation of every registered enum.
    pub enum_native: String,
    /// Additional managed → native mappings.
    pub custom: BTreeMap<String, CustomType>,
}

impl Default for TypesConfig {
    fn default() -> Self {
        Self {
            enums: Vec::new(),
            enum_native: "UIntPtr".to_string(),
            custom: BTreeMap::new(),
        }
    }
}

/// A configured managed → native type mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CustomType {
    /// Native marshaled type name.
    pub native: String,
    /// Members using this type are only compiled on newer runtimes.
    #[serde(default)]
    pub newer_runtime: bool,
}

/// Output formatting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FormatConfig {
    /// One indentation level.
    pub indent: String,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            indent: "  ".to_string(),
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(GeneratorConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `interop.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join(CONFIG_FILENAME);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<GeneratorConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: GeneratorConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `interop.toml` in the given directory, merged over the
/// stock defaults and validated.
pub fn load_config(root: &Path) -> Result<GeneratorConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(root)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `interop.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# magick-interop configuration
# ============================
# All settings are optional. Values shown below are the defaults.
# Place this file next to the class descriptors as `interop.toml`.
# Unknown keys will cause an error.

# Namespace wrapping every emitted class (descriptors may override it).
namespace = "ImageMagick"

# Lines written as // comments at the top of each emitted file.
license_header = []

# Emit MagickExceptionHelper.g.cs mapping severity codes to exception types.
emit_exception_helper = true

# Preprocessor symbol guarding members whose types need a newer runtime.
newer_runtime_symbol = "NETSTANDARD2_1"

# ---------------------------------------------------------------------------
# Build matrix
# ---------------------------------------------------------------------------
[matrix]
# Native architectures. Blocks are always emitted 64-bit first.
architectures = ["x64", "x86"]

# Support PLATFORM_AnyCPU builds, which pick the block at runtime.
any_cpu = true

# Pixel component widths the native library is compiled with.
quantum_depths = ["Q8", "Q16", "Q16HDRI"]

# "alias": one file per class with a guarded `using QuantumType = ...;`
# "expand": one file per class and depth with QuantumType substituted.
quantum_mode = "alias"

# ---------------------------------------------------------------------------
# Native library
# ---------------------------------------------------------------------------
[library]
x64_name = "NativeLibrary.X64Name"
x86_name = "NativeLibrary.X86Name"

# Statement run once per architecture class. Empty disables it.
initializer = "NativeLibrary.DoInitialize();"

# ---------------------------------------------------------------------------
# Type registry (in addition to the built-in table)
# ---------------------------------------------------------------------------
[types]
# Enums are marshaled as `enum_native` with explicit casts.
enums = []
enum_native = "UIntPtr"

# Extra managed -> native mappings, e.g.
# [types.custom.PointInfo]
# native = "IntPtr"
# newer_runtime = false

# ---------------------------------------------------------------------------
# Formatting
# ---------------------------------------------------------------------------
[format]
indent = "  "
"##
}
