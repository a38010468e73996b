//! Centralized naming rules for emitted interop code.
//!
//! Every native entry point follows the same `Class_Member` convention used by
//! the native wrapper library, with `_Get`/`_Set` suffixes for properties and
//! `_Create`/`_Dispose` for lifecycle functions:
//!
//! - `MagickImage` + `AddNoise` → `MagickImage_AddNoise`
//! - `MagickImage` + property `Depth` → `MagickImage_Depth_Get` / `MagickImage_Depth_Set`
//! - `MagickImage` lifecycle → `MagickImage_Create` / `MagickImage_Dispose`
//!
//! Authored type names are parsed here too, so `QuantumType[]` and `QuantumType`
//! resolve through one code path.

/// Reserved words that cannot be used as argument or member names in the
/// emitted C# without an `@` escape.
const CSHARP_KEYWORDS: &[&str] = &[
    "abstract", "as", "base", "bool", "break", "byte", "case", "catch", "char", "checked",
    "class", "const", "continue", "decimal", "default", "delegate", "do", "double", "else",
    "enum", "event", "explicit", "extern", "false", "finally", "fixed", "float", "for",
    "foreach", "goto", "if", "implicit", "in", "int", "interface", "internal", "is", "lock",
    "long", "namespace", "new", "null", "object", "operator", "out", "override", "params",
    "private", "protected", "public", "readonly", "ref", "return", "sbyte", "sealed", "short",
    "sizeof", "stackalloc", "static", "string", "struct", "switch", "this", "throw", "true",
    "try", "typeof", "uint", "ulong", "unchecked", "unsafe", "ushort", "using", "virtual",
    "void", "volatile", "while",
];

/// File name of the emitted severity dispatch helper.
pub const EXCEPTION_HELPER_FILE: &str = "MagickExceptionHelper.g.cs";

/// Names the emitter itself introduces inside generated method bodies.
const RESERVED_LOCALS: &[&str] = &["exception", "result", "magickException", "Instance"];

/// Result of parsing an authored type name like `QuantumType[]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTypeName {
    /// Element type with any array suffix removed.
    pub base: String,
    /// Whether the authored name carried a `[]` suffix.
    pub is_array: bool,
}

/// Parse an authored type name.
///
/// - `"int"` → base="int", is_array=false
/// - `"QuantumType[]"` → base="QuantumType", is_array=true
/// - `" double [] "` → base="double", is_array=true
pub fn parse_type_name(name: &str) -> ParsedTypeName {
    let trimmed = name.trim();
    match trimmed.strip_suffix("[]") {
        Some(base) => ParsedTypeName {
            base: base.trim().to_string(),
            is_array: true,
        },
        None => ParsedTypeName {
            base: trimmed.to_string(),
            is_array: false,
        },
    }
}

/// Whether `name` is a usable C# identifier: ASCII letter or underscore first,
/// then letters, digits, or underscores, and not a keyword.
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first.is_ascii_alphabetic() || first == '_') {
        return false;
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return false;
    }
    !CSHARP_KEYWORDS.contains(&name)
}

/// Whether `name` can name a native type: one or more dot-separated parts,
/// each shaped like an identifier. Keywords are allowed (`int`, `uint`).
///
/// - `"UIntPtr"`, `"int"`, `"System.UInt16"` → valid
/// - `"int*"`, `"a..b"`, `""` → invalid
pub fn is_type_name(name: &str) -> bool {
    name.split('.').all(|part| {
        let mut chars = part.chars();
        chars
            .next()
            .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    })
}

/// Why an authored output file name is unusable, or `None` when it is a plain
/// `.cs` file name that stays inside the output directory.
pub fn output_file_problem(file: &str) -> Option<&'static str> {
    if file.contains(['/', '\\']) {
        return Some("must be a plain file name without directories");
    }
    if file.split('.').any(str::is_empty) {
        return Some("must not contain empty or '..' segments");
    }
    match file.strip_suffix(".cs") {
        Some(stem) if !stem.is_empty() => None,
        _ => Some("must end in .cs"),
    }
}

/// Whether an argument name would collide with a local the emitter declares.
pub fn is_reserved_local(name: &str) -> bool {
    RESERVED_LOCALS.contains(&name)
}

/// Native entry point for a method: `Class_Method`.
pub fn entry_point(class: &str, member: &str) -> String {
    format!("{class}_{member}")
}

/// Native getter entry point for a property: `Class_Property_Get`.
pub fn property_getter(class: &str, property: &str) -> String {
    format!("{class}_{property}_Get")
}

/// Native setter entry point for a property: `Class_Property_Set`.
pub fn property_setter(class: &str, property: &str) -> String {
    format!("{class}_{property}_Set")
}

/// Native constructor entry point: `Class_Create`.
pub fn create_entry(class: &str) -> String {
    format!("{class}_Create")
}

/// Native destructor entry point: `Class_Dispose`.
pub fn dispose_entry(class: &str) -> String {
    format!("{class}_Dispose")
}

/// Name of the private handle-owning wrapper class: `NativeClass`.
pub fn native_class(class: &str) -> String {
    format!("Native{class}")
}

/// Name of the managed-side interface for classes flagged `interface`: `IClass`.
pub fn interface_name(class: &str) -> String {
    format!("I{class}")
}

/// Local variable holding a converted argument: `valueNative`.
pub fn native_local(argument: &str) -> String {
    format!("{argument}Native")
}

/// Local receiving an out argument before conversion: `widthOut`.
pub fn out_local(argument: &str) -> String {
    format!("{argument}Out")
}

/// Extra native parameter carrying an array's element count: `pixelsLength`.
pub fn length_param(argument: &str) -> String {
    format!("{argument}Length")
}
