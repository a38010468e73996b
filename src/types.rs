//! Type descriptors and the fixed managed → native lookup table.
//!
//! Every authored type name resolves to exactly one [`TypeDescriptor`]. The
//! built-in table covers primitives, strings, handles, and the pixel component
//! type; enums, declared classes, and custom mappings are registered through
//! the [`GenerationContext`](crate::model::GenerationContext). A name that
//! resolves nowhere is a generation-time error, never an identity fallback.

use crate::descriptor::DynamicMode;
use crate::naming;

/// Alias used for the pixel component type in emitted code.
pub const QUANTUM_TYPE: &str = "QuantumType";

/// Traits of a declared class referenced as a type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceTraits {
    pub class: String,
    pub dynamic: DynamicMode,
    pub interface: bool,
    pub quantum: bool,
}

/// How a type crosses the native boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    Void,
    Bool,
    /// Numeric value passed as-is, possibly with casts (`size_t` → `UIntPtr`).
    Primitive,
    /// Raw `IntPtr` handed through untouched.
    Handle,
    /// UTF-8 string passed as a pointer. `native_owned` strings are
    /// relinquished after conversion.
    String { native_owned: bool },
    Enum,
    Quantum,
    /// Array of a primitive or quantum element, passed as pointer + length.
    Array { element: Box<TypeDescriptor> },
    /// A declared class owning a native instance, passed as its handle.
    Instance(InstanceTraits),
    /// Mapping registered in configuration.
    Custom,
}

/// Resolved type: managed name, native marshaled name, and flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    /// Name as written in the descriptor.
    pub authored: String,
    pub managed: String,
    pub native: String,
    pub kind: TypeKind,
    /// Cast applied when converting a native value to managed, e.g. `(int)`.
    pub managed_cast: Option<String>,
    /// Cast applied when converting a managed value to native, e.g. `(UIntPtr)`.
    pub native_cast: Option<String>,
    pub only_supported_in_newer_runtime: bool,
}

impl TypeDescriptor {
    fn simple(authored: &str, managed: &str, native: &str, kind: TypeKind) -> Self {
        Self {
            authored: authored.to_string(),
            managed: managed.to_string(),
            native: native.to_string(),
            kind,
            managed_cast: None,
            native_cast: None,
            only_supported_in_newer_runtime: false,
        }
    }

    fn cast(mut self, managed_cast: &str, native_cast: &str) -> Self {
        self.managed_cast = Some(managed_cast.to_string());
        self.native_cast = Some(native_cast.to_string());
        self
    }

    pub fn is_void(&self) -> bool {
        matches!(self.kind, TypeKind::Void)
    }

    pub fn is_bool(&self) -> bool {
        matches!(self.kind, TypeKind::Bool)
    }

    pub fn is_string(&self) -> bool {
        matches!(self.kind, TypeKind::String { .. })
    }

    pub fn is_native_string(&self) -> bool {
        matches!(self.kind, TypeKind::String { native_owned: true })
    }

    pub fn is_enum(&self) -> bool {
        matches!(self.kind, TypeKind::Enum)
    }

    pub fn is_array(&self) -> bool {
        matches!(self.kind, TypeKind::Array { .. })
    }

    pub fn has_instance(&self) -> bool {
        matches!(self.kind, TypeKind::Instance(_))
    }

    pub fn is_quantum_type(&self) -> bool {
        matches!(self.kind, TypeKind::Quantum)
    }

    /// Instance traits when the type is a declared class.
    pub fn instance(&self) -> Option<&InstanceTraits> {
        match &self.kind {
            TypeKind::Instance(traits) => Some(traits),
            _ => None,
        }
    }

    /// Dynamic classes are converted through `CreateInstance` instead of
    /// exposing their handle.
    pub fn is_dynamic(&self) -> bool {
        self.instance()
            .is_some_and(|traits| traits.dynamic != DynamicMode::None)
    }

    /// Whether the emitted file needs the `QuantumType` alias for this type.
    pub fn uses_quantum(&self) -> bool {
        match &self.kind {
            TypeKind::Quantum => true,
            TypeKind::Array { element } => element.uses_quantum(),
            TypeKind::Instance(traits) => traits.quantum,
            _ => false,
        }
    }

    /// Arguments of these types are converted inside a `using` block.
    pub fn needs_create(&self) -> bool {
        self.is_string() || self.is_dynamic() || self.is_array()
    }

    /// Type as written in a public managed signature.
    pub fn managed_parameter(&self) -> String {
        match &self.kind {
            TypeKind::Instance(traits) if traits.quantum => {
                format!("{}<{QUANTUM_TYPE}>", naming::interface_name(&traits.class))
            }
            TypeKind::Instance(traits) if traits.interface => naming::interface_name(&traits.class),
            _ => self.managed.clone(),
        }
    }
}

/// Resolve a name from the built-in table. Arrays are handled by the caller.
pub fn builtin(name: &str) -> Option<TypeDescriptor> {
    let t = match name {
        "void" => TypeDescriptor::simple(name, "void", "void", TypeKind::Void),
        "bool" => TypeDescriptor::simple(name, "bool", "bool", TypeKind::Bool),
        "byte" | "short" | "ushort" | "int" | "uint" | "long" | "ulong" | "float" | "double" => {
            TypeDescriptor::simple(name, name, name, TypeKind::Primitive)
        }
        "size_t" => TypeDescriptor::simple(name, "int", "UIntPtr", TypeKind::Primitive)
            .cast("(int)", "(UIntPtr)"),
        "ssize_t" => TypeDescriptor::simple(name, "int", "IntPtr", TypeKind::Primitive)
            .cast("(int)", "(IntPtr)"),
        "MagickSizeType" => TypeDescriptor::simple(name, "ulong", "ulong", TypeKind::Primitive),
        "IntPtr" => TypeDescriptor::simple(name, "IntPtr", "IntPtr", TypeKind::Handle),
        "string" => TypeDescriptor::simple(
            name,
            "string",
            "IntPtr",
            TypeKind::String {
                native_owned: false,
            },
        ),
        "NativeString" => TypeDescriptor::simple(
            name,
            "string",
            "IntPtr",
            TypeKind::String { native_owned: true },
        ),
        QUANTUM_TYPE => TypeDescriptor::simple(name, QUANTUM_TYPE, QUANTUM_TYPE, TypeKind::Quantum),
        _ => return None,
    };
    Some(t)
}

/// Whether an element type may appear in an array argument.
pub fn is_array_element(element: &TypeDescriptor) -> bool {
    match element.kind {
        TypeKind::Quantum => true,
        TypeKind::Primitive => element.managed == element.native,
        _ => false,
    }
}

/// Build an array descriptor around a resolved element.
pub fn array_of(authored: &str, element: TypeDescriptor) -> TypeDescriptor {
    TypeDescriptor {
        authored: authored.to_string(),
        managed: format!("{}[]", element.managed),
        native: "IntPtr".to_string(),
        only_supported_in_newer_runtime: element.only_supported_in_newer_runtime,
        kind: TypeKind::Array {
            element: Box::new(element),
        },
        managed_cast: None,
        native_cast: None,
    }
}

/// Descriptor for a registered enum marshaled as `native`.
pub fn enum_type(name: &str, native: &str) -> TypeDescriptor {
    TypeDescriptor::simple(name, name, native, TypeKind::Enum)
        .cast(&format!("({name})"), &format!("({native})"))
}

/// Descriptor for a declared class referenced as a type.
pub fn instance_type(traits: InstanceTraits) -> TypeDescriptor {
    let name = traits.class.clone();
    TypeDescriptor::simple(&name, &name, "IntPtr", TypeKind::Instance(traits))
}

/// Descriptor for a configured custom mapping.
pub fn custom_type(name: &str, native: &str, newer_runtime: bool) -> TypeDescriptor {
    let mut t = TypeDescriptor::simple(name, name, native, TypeKind::Custom);
    t.only_supported_in_newer_runtime = newer_runtime;
    t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_keeps_bool_with_flag() {
        let t = builtin("bool").unwrap();
        assert!(t.is_bool());
        assert_eq!(t.managed, "bool");
        assert_eq!(t.native, "bool");
    }

    #[test]
    fn primitives_map_to_themselves() {
        for name in ["byte", "int", "uint", "long", "ulong", "float", "double"] {
            let t = builtin(name).unwrap();
            assert_eq!(t.managed, name);
            assert_eq!(t.native, name);
            assert_eq!(t.managed_cast, None);
        }
    }

    #[test]
    fn size_t_is_cast_through_uintptr() {
        let t = builtin("size_t").unwrap();
        assert_eq!(t.managed, "int");
        assert_eq!(t.native, "UIntPtr");
        assert_eq!(t.managed_cast.as_deref(), Some("(int)"));
        assert_eq!(t.native_cast.as_deref(), Some("(UIntPtr)"));
    }

    #[test]
    fn strings_are_pointers() {
        let s = builtin("string").unwrap();
        assert!(s.is_string());
        assert!(!s.is_native_string());
        assert_eq!(s.native, "IntPtr");
        assert!(s.needs_create());

        let n = builtin("NativeString").unwrap();
        assert!(n.is_native_string());
        assert_eq!(n.managed, "string");
    }

    #[test]
    fn unknown_name_is_not_builtin() {
        assert!(builtin("PointInfo").is_none());
        assert!(builtin("Int32").is_none());
    }

    #[test]
    fn quantum_array_is_pointer() {
        let element = builtin(QUANTUM_TYPE).unwrap();
        assert!(is_array_element(&element));
        let t = array_of("QuantumType[]", element);
        assert!(t.is_array());
        assert_eq!(t.native, "IntPtr");
        assert_eq!(t.managed, "QuantumType[]");
        assert!(t.uses_quantum());
        assert!(t.needs_create());
    }

    #[test]
    fn cast_primitives_are_not_array_elements() {
        assert!(!is_array_element(&builtin("size_t").unwrap()));
        assert!(!is_array_element(&builtin("string").unwrap()));
        assert!(is_array_element(&builtin("double").unwrap()));
    }

    #[test]
    fn enum_casts_both_ways() {
        let t = enum_type("NoiseType", "UIntPtr");
        assert!(t.is_enum());
        assert_eq!(t.managed_cast.as_deref(), Some("(NoiseType)"));
        assert_eq!(t.native_cast.as_deref(), Some("(UIntPtr)"));
    }

    #[test]
    fn instance_parameters() {
        let plain = instance_type(InstanceTraits {
            class: "MagickSettings".into(),
            dynamic: DynamicMode::None,
            interface: false,
            quantum: false,
        });
        assert!(plain.has_instance());
        assert!(!plain.is_dynamic());
        assert!(!plain.needs_create());
        assert_eq!(plain.managed_parameter(), "MagickSettings");

        let quantum = instance_type(InstanceTraits {
            class: "MagickColor".into(),
            dynamic: DynamicMode::Both,
            interface: true,
            quantum: true,
        });
        assert!(quantum.is_dynamic());
        assert!(quantum.needs_create());
        assert!(quantum.uses_quantum());
        assert_eq!(quantum.managed_parameter(), "IMagickColor<QuantumType>");
    }

    #[test]
    fn custom_type_carries_runtime_flag() {
        let t = custom_type("ReadOnlySpan", "IntPtr", true);
        assert!(t.only_supported_in_newer_runtime);
        assert_eq!(t.native, "IntPtr");
    }
}
