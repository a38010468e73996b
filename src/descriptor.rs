//! Authored class descriptors.
//!
//! One native class per file, written as TOML or JSON. This is the raw,
//! unvalidated surface; [`crate::model`] turns it into the validated tree the
//! emitters consume.
//!
//! ```toml
//! name = "MagickImage"
//! instance = true
//!
//! [constructor]
//! throws = true
//! arguments = [{ name = "settings", type = "MagickSettings" }]
//!
//! [[properties]]
//! name = "IsEnabled"
//! type = "bool"
//! throws = true
//!
//! [[methods]]
//! name = "AddNoise"
//! return = "MagickImage"
//! throws = true
//! arguments = [
//!     { name = "noiseType", type = "NoiseType" },
//!     { name = "attenuate", type = "double" },
//! ]
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DescriptorError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported descriptor extension: {0}")]
    UnsupportedExtension(String),
}

/// Visibility of the emitted managed class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Access {
    #[default]
    Public,
    Internal,
}

impl Access {
    pub fn keyword(self) -> &'static str {
        match self {
            Access::Public => "public",
            Access::Internal => "internal",
        }
    }
}

/// How a dynamic class crosses the boundary. Dynamic classes are rebuilt from
/// native data on demand instead of holding a handle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DynamicMode {
    #[default]
    None,
    ManagedToNative,
    NativeToManaged,
    Both,
}

impl DynamicMode {
    pub fn managed_to_native(self) -> bool {
        matches!(self, DynamicMode::ManagedToNative | DynamicMode::Both)
    }

    pub fn native_to_managed(self) -> bool {
        matches!(self, DynamicMode::NativeToManaged | DynamicMode::Both)
    }
}

fn default_void() -> String {
    "void".to_string()
}

/// One class, as authored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClassSpec {
    pub name: String,
    /// Overrides the configured namespace.
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub access: Access,
    /// Output file name; defaults to `{name}.cs`.
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default, rename = "static")]
    pub is_static: bool,
    /// Wraps a native object it does not own.
    #[serde(default, rename = "const")]
    pub is_const: bool,
    /// Owns a native instance handle.
    #[serde(default)]
    pub instance: bool,
    #[serde(default)]
    pub dynamic: DynamicMode,
    #[serde(default)]
    pub no_constructor: bool,
    /// Emit a constructor adopting an existing native handle.
    #[serde(default)]
    pub native_constructor: bool,
    /// Managed signatures refer to the `I{name}` interface.
    #[serde(default)]
    pub interface: bool,
    /// Managed signatures refer to `I{name}<QuantumType>`.
    #[serde(default)]
    pub quantum_type: bool,
    #[serde(default)]
    pub constructor: Option<ConstructorSpec>,
    #[serde(default)]
    pub properties: Vec<PropertySpec>,
    #[serde(default)]
    pub methods: Vec<MethodSpec>,
    #[serde(default)]
    pub delegates: Vec<DelegateSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConstructorSpec {
    #[serde(default)]
    pub throws: bool,
    #[serde(default)]
    pub arguments: Vec<ArgumentSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PropertySpec {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub throws: bool,
    #[serde(default)]
    pub read_only: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MethodSpec {
    pub name: String,
    #[serde(default = "default_void", rename = "return")]
    pub return_type: String,
    #[serde(default)]
    pub throws: bool,
    #[serde(default, rename = "static")]
    pub is_static: bool,
    /// The native call returns a new handle that replaces `Instance`.
    #[serde(default)]
    pub sets_instance: bool,
    #[serde(default)]
    pub cleanup: Option<CleanupSpec>,
    #[serde(default)]
    pub arguments: Vec<ArgumentSpec>,
}

/// Releases a partially-created result when the call reports an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CleanupSpec {
    pub name: String,
    /// Extra arguments passed after the result.
    #[serde(default)]
    pub arguments: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArgumentSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub out: bool,
    /// Passed to the native call but absent from the public overload.
    #[serde(default)]
    pub hidden: bool,
}

/// A native callback signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DelegateSpec {
    pub name: String,
    #[serde(default = "default_void", rename = "return")]
    pub return_type: String,
    #[serde(default)]
    pub arguments: Vec<ArgumentSpec>,
}

impl ClassSpec {
    pub fn from_toml_str(content: &str) -> Result<Self, DescriptorError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_json_str(content: &str) -> Result<Self, DescriptorError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Load a descriptor, choosing the format by extension.
    pub fn load(path: &Path) -> Result<Self, DescriptorError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        let content = fs::read_to_string(path)?;
        match ext.as_str() {
            "toml" => Self::from_toml_str(&content),
            "json" => Self::from_json_str(&content),
            _ => Err(DescriptorError::UnsupportedExtension(ext)),
        }
    }
}

/// Whether a file extension names a descriptor format.
pub fn is_descriptor_extension(ext: &str) -> bool {
    matches!(ext.to_ascii_lowercase().as_str(), "toml" | "json")
}
