//! Validated descriptor tree.
//!
//! Authored [`ClassSpec`]s are checked and resolved here, once, before any
//! emission. After [`Model::build`] succeeds every type reference has exactly
//! one native representation, every identifier is usable in C#, and every
//! flag combination is one the emitters know how to render.
//!
//! The class registry lives in a [`GenerationContext`] passed explicitly to
//! every emitter; nothing is looked up through global state.

use crate::config::{GeneratorConfig, MatrixConfig, QuantumMode};
use crate::descriptor::{Access, ArgumentSpec, ClassSpec, DynamicMode, MethodSpec, PropertySpec};
use crate::naming;
use crate::platform::{self, QuantumDepth};
use crate::types::{self, InstanceTraits, TypeDescriptor};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ModelError {
    #[error("duplicate class: {0}")]
    DuplicateClass(String),
    #[error("class name {0} collides with a registered type")]
    TypeNameCollision(String),
    #[error("{class}: invalid identifier '{name}'")]
    InvalidIdentifier { class: String, name: String },
    #[error("{class}.{member}: no native mapping for type '{type_name}'")]
    UnmappedType {
        class: String,
        member: String,
        type_name: String,
    },
    #[error("{class}.{member}: type '{type_name}' {reason}")]
    InvalidType {
        class: String,
        member: String,
        type_name: String,
        reason: &'static str,
    },
    #[error("{class}: duplicate member '{name}'")]
    DuplicateMember { class: String, name: String },
    #[error("{class}.{member}: duplicate argument '{argument}'")]
    DuplicateArgument {
        class: String,
        member: String,
        argument: String,
    },
    #[error("{class}.{member}: argument '{argument}' collides with a generated local")]
    ReservedArgument {
        class: String,
        member: String,
        argument: String,
    },
    #[error("{class}.{member}: out argument '{argument}' cannot be an array")]
    OutArray {
        class: String,
        member: String,
        argument: String,
    },
    #[error("{class}.{member}: hidden argument '{argument}' cannot be out")]
    HiddenOut {
        class: String,
        member: String,
        argument: String,
    },
    #[error("{class}.{method}: sets_instance requires a non-static member of a class with an instance")]
    SetsInstanceWithoutInstance { class: String, method: String },
    #[error("{class}.{method}: cleanup argument '{argument}' is not an argument of the method")]
    UnknownCleanupArgument {
        class: String,
        method: String,
        argument: String,
    },
    #[error("{class}.{method}: cleanup requires a throwing method")]
    CleanupWithoutThrows { class: String, method: String },
    #[error("{0}: a static class cannot own an instance")]
    StaticWithInstance(String),
    #[error("{0}: a static class cannot have a constructor")]
    ConstructorOnStaticClass(String),
    #[error("{class}: a {kind} class cannot have a constructor")]
    ConstructorNotAllowed { class: String, kind: &'static str },
    #[error("{0}: a dynamic class must have an instance")]
    DynamicWithoutInstance(String),
    #[error("{class}: file '{file}' {reason}")]
    InvalidFileName {
        class: String,
        file: String,
        reason: &'static str,
    },
    #[error("output file {file} is produced by both {first} and {second}")]
    OutputCollision {
        file: String,
        first: String,
        second: String,
    },
}

/// Why a type name failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeError {
    Unmapped,
    ArrayElement,
}

/// Explicit registry of known classes plus the configuration, passed to
/// every emitter in place of static lookup tables.
#[derive(Debug, Clone)]
pub struct GenerationContext {
    config: GeneratorConfig,
    classes: BTreeMap<String, InstanceTraits>,
}

impl GenerationContext {
    /// Register every non-static class so descriptors can reference each other.
    pub fn new(config: GeneratorConfig, specs: &[ClassSpec]) -> Result<Self, ModelError> {
        let mut classes = BTreeMap::new();
        let mut seen = BTreeSet::new();
        for spec in specs {
            if !seen.insert(spec.name.as_str()) {
                return Err(ModelError::DuplicateClass(spec.name.clone()));
            }
            if types::builtin(&spec.name).is_some()
                || config.types.enums.contains(&spec.name)
                || config.types.custom.contains_key(&spec.name)
            {
                return Err(ModelError::TypeNameCollision(spec.name.clone()));
            }
            if spec.is_static {
                continue;
            }
            classes.insert(
                spec.name.clone(),
                InstanceTraits {
                    class: spec.name.clone(),
                    dynamic: spec.dynamic,
                    interface: spec.interface,
                    quantum: spec.quantum_type,
                },
            );
        }
        Ok(Self { config, classes })
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Traits of a registered class.
    pub fn class(&self, name: &str) -> Option<&InstanceTraits> {
        self.classes.get(name)
    }

    /// Resolve an authored type name, including `T[]` arrays.
    pub fn resolve_type(&self, name: &str) -> Result<TypeDescriptor, TypeError> {
        let parsed = naming::parse_type_name(name);
        let element = self.resolve_named(&parsed.base).ok_or(TypeError::Unmapped)?;
        if !parsed.is_array {
            return Ok(element);
        }
        if !types::is_array_element(&element) {
            return Err(TypeError::ArrayElement);
        }
        Ok(types::array_of(name.trim(), element))
    }

    fn resolve_named(&self, name: &str) -> Option<TypeDescriptor> {
        if let Some(t) = types::builtin(name) {
            return Some(t);
        }
        let registry = &self.config.types;
        if registry.enums.iter().any(|e| e == name) {
            return Some(types::enum_type(name, &registry.enum_native));
        }
        if let Some(custom) = registry.custom.get(name) {
            return Some(types::custom_type(name, &custom.native, custom.newer_runtime));
        }
        self.classes
            .get(name)
            .map(|traits| types::instance_type(traits.clone()))
    }
}

/// Base class of the emitted `Native{Class}` wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapperKind {
    /// `private static class`; no instance, no exception state.
    Static,
    /// `: NativeHelper`; instance-less but raises warnings.
    Helper,
    /// `: ConstNativeInstance`; borrows a handle it never releases.
    ConstInstance,
    /// `: NativeInstance`; owns and releases its handle.
    Instance,
}

impl WrapperKind {
    pub fn base_class(self) -> Option<&'static str> {
        match self {
            WrapperKind::Static => None,
            WrapperKind::Helper => Some("NativeHelper"),
            WrapperKind::ConstInstance => Some("ConstNativeInstance"),
            WrapperKind::Instance => Some("NativeInstance"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentDescriptor {
    pub name: String,
    pub ty: TypeDescriptor,
    pub is_out: bool,
    pub is_hidden: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstructorDescriptor {
    pub arguments: Vec<ArgumentDescriptor>,
    pub throws: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDescriptor {
    pub name: String,
    pub ty: TypeDescriptor,
    pub throws: bool,
    pub is_read_only: bool,
    pub is_static: bool,
    /// Passes the wrapper's `Instance` as the first native argument.
    pub uses_instance: bool,
}

impl PropertyDescriptor {
    pub fn newer_runtime(&self) -> bool {
        self.ty.only_supported_in_newer_runtime
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CleanupDescriptor {
    pub name: String,
    pub arguments: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodDescriptor {
    pub name: String,
    pub return_type: TypeDescriptor,
    pub arguments: Vec<ArgumentDescriptor>,
    pub throws: bool,
    pub is_static: bool,
    pub uses_instance: bool,
    pub sets_instance: bool,
    pub cleanup: Option<CleanupDescriptor>,
}

impl MethodDescriptor {
    /// Native return type; methods replacing the instance receive a handle.
    pub fn native_return(&self) -> &str {
        if self.sets_instance {
            "IntPtr"
        } else {
            &self.return_type.native
        }
    }

    pub fn newer_runtime(&self) -> bool {
        self.return_type.only_supported_in_newer_runtime
            || self
                .arguments
                .iter()
                .any(|a| a.ty.only_supported_in_newer_runtime)
    }

    /// Arguments that appear in the public managed overload.
    pub fn visible_arguments(&self) -> impl Iterator<Item = &ArgumentDescriptor> {
        self.arguments.iter().filter(|a| !a.is_hidden)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DelegateDescriptor {
    pub name: String,
    pub return_type: TypeDescriptor,
    pub arguments: Vec<ArgumentDescriptor>,
}

/// One validated class.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDescriptor {
    pub name: String,
    pub namespace: String,
    pub access: Access,
    pub file_name: String,
    pub is_static: bool,
    pub is_const: bool,
    pub has_instance: bool,
    pub dynamic: DynamicMode,
    pub has_no_constructor: bool,
    pub has_native_constructor: bool,
    pub has_interface: bool,
    pub is_quantum_type: bool,
    pub constructor: Option<ConstructorDescriptor>,
    pub properties: Vec<PropertyDescriptor>,
    pub methods: Vec<MethodDescriptor>,
    pub delegates: Vec<DelegateDescriptor>,
}

impl ClassDescriptor {
    pub fn is_dynamic(&self) -> bool {
        self.dynamic != DynamicMode::None
    }

    /// Owns a native handle it must create and release.
    pub fn owns_instance(&self) -> bool {
        self.has_instance && !self.is_const && !self.is_static
    }

    pub fn wrapper_kind(&self) -> WrapperKind {
        if self.is_static {
            WrapperKind::Static
        } else if self.is_const {
            WrapperKind::ConstInstance
        } else if self.has_instance {
            WrapperKind::Instance
        } else if self.properties.is_empty()
            && self.methods.iter().all(|m| m.is_static && !m.throws)
        {
            WrapperKind::Static
        } else {
            WrapperKind::Helper
        }
    }

    /// Whether the emitted file refers to `QuantumType`.
    pub fn uses_quantum(&self) -> bool {
        let args_use = |args: &[ArgumentDescriptor]| args.iter().any(|a| a.ty.uses_quantum());
        self.is_quantum_type
            || self
                .constructor
                .as_ref()
                .is_some_and(|c| args_use(&c.arguments))
            || self.properties.iter().any(|p| p.ty.uses_quantum())
            || self
                .methods
                .iter()
                .any(|m| m.return_type.uses_quantum() || args_use(&m.arguments))
            || self
                .delegates
                .iter()
                .any(|d| d.return_type.uses_quantum() || args_use(&d.arguments))
    }

    /// One entry per emitted file: every configured depth in expand mode when
    /// the class uses `QuantumType`, otherwise a single depth-less file.
    pub fn variants(&self, matrix: &MatrixConfig) -> Vec<Option<QuantumDepth>> {
        if matrix.quantum_mode == QuantumMode::Expand && self.uses_quantum() {
            matrix.quantum_depths.iter().copied().map(Some).collect()
        } else {
            vec![None]
        }
    }

    pub fn variant_file_name(&self, depth: Option<QuantumDepth>) -> String {
        match depth {
            Some(depth) => platform::depth_file_name(&self.file_name, depth),
            None => self.file_name.clone(),
        }
    }
}

/// Every class, validated against one context.
#[derive(Debug, Clone)]
pub struct Model {
    pub context: GenerationContext,
    pub classes: Vec<ClassDescriptor>,
}

impl Model {
    pub fn build(config: GeneratorConfig, specs: &[ClassSpec]) -> Result<Self, ModelError> {
        let context = GenerationContext::new(config, specs)?;
        let classes = specs
            .iter()
            .map(|spec| build_class(&context, spec))
            .collect::<Result<Vec<_>, _>>()?;
        check_outputs(&context, &classes)?;
        Ok(Self { context, classes })
    }

    pub fn class(&self, name: &str) -> Option<&ClassDescriptor> {
        self.classes.iter().find(|c| c.name == name)
    }
}

// =============================================================================
// Validation
// =============================================================================

/// Every emitted file name must be unique, compared case-insensitively so the
/// result is the same on case-folding file systems.
fn check_outputs(context: &GenerationContext, classes: &[ClassDescriptor]) -> Result<(), ModelError> {
    let config = context.config();
    let mut owners: BTreeMap<String, String> = BTreeMap::new();
    let helper = config
        .emit_exception_helper
        .then(|| (naming::EXCEPTION_HELPER_FILE.to_string(), "exception helper".to_string()));
    let class_files = classes.iter().flat_map(|class| {
        class
            .variants(&config.matrix)
            .into_iter()
            .map(move |depth| (class.variant_file_name(depth), class.name.clone()))
    });

    for (file, owner) in class_files.chain(helper) {
        if let Some(first) = owners.insert(file.to_ascii_lowercase(), owner.clone()) {
            return Err(ModelError::OutputCollision {
                file,
                first,
                second: owner,
            });
        }
    }
    Ok(())
}

struct ClassBuilder<'a> {
    context: &'a GenerationContext,
    class: &'a str,
}

impl ClassBuilder<'_> {
    fn identifier(&self, name: &str) -> Result<(), ModelError> {
        if naming::is_valid_identifier(name) {
            Ok(())
        } else {
            Err(ModelError::InvalidIdentifier {
                class: self.class.to_string(),
                name: name.to_string(),
            })
        }
    }

    fn resolve(&self, member: &str, type_name: &str) -> Result<TypeDescriptor, ModelError> {
        self.context
            .resolve_type(type_name)
            .map_err(|err| match err {
                TypeError::Unmapped => ModelError::UnmappedType {
                    class: self.class.to_string(),
                    member: member.to_string(),
                    type_name: type_name.to_string(),
                },
                TypeError::ArrayElement => self.invalid_type(
                    member,
                    type_name,
                    "is not a supported array element",
                ),
            })
    }

    fn invalid_type(&self, member: &str, type_name: &str, reason: &'static str) -> ModelError {
        ModelError::InvalidType {
            class: self.class.to_string(),
            member: member.to_string(),
            type_name: type_name.to_string(),
            reason,
        }
    }

    /// Resolve a value type: not void, and not an array outside arguments.
    fn value_type(
        &self,
        member: &str,
        type_name: &str,
        allow_void: bool,
    ) -> Result<TypeDescriptor, ModelError> {
        let ty = self.resolve(member, type_name)?;
        if ty.is_void() && !allow_void {
            return Err(self.invalid_type(member, type_name, "cannot be void here"));
        }
        if ty.is_array() {
            return Err(self.invalid_type(member, type_name, "arrays are only supported as arguments"));
        }
        Ok(ty)
    }

    fn arguments(
        &self,
        member: &str,
        specs: &[ArgumentSpec],
    ) -> Result<Vec<ArgumentDescriptor>, ModelError> {
        let mut seen = BTreeSet::new();
        let mut arguments = Vec::with_capacity(specs.len());
        for spec in specs {
            self.identifier(&spec.name)?;
            if naming::is_reserved_local(&spec.name) {
                return Err(ModelError::ReservedArgument {
                    class: self.class.to_string(),
                    member: member.to_string(),
                    argument: spec.name.clone(),
                });
            }
            if !seen.insert(spec.name.as_str()) {
                return Err(ModelError::DuplicateArgument {
                    class: self.class.to_string(),
                    member: member.to_string(),
                    argument: spec.name.clone(),
                });
            }
            let ty = self.resolve(member, &spec.type_name)?;
            if ty.is_void() {
                return Err(self.invalid_type(member, &spec.type_name, "cannot be void here"));
            }
            if spec.out && ty.is_array() {
                return Err(ModelError::OutArray {
                    class: self.class.to_string(),
                    member: member.to_string(),
                    argument: spec.name.clone(),
                });
            }
            if spec.out && spec.hidden {
                return Err(ModelError::HiddenOut {
                    class: self.class.to_string(),
                    member: member.to_string(),
                    argument: spec.name.clone(),
                });
            }
            arguments.push(ArgumentDescriptor {
                name: spec.name.clone(),
                ty,
                is_out: spec.out,
                is_hidden: spec.hidden,
            });
        }
        Ok(arguments)
    }

    fn property(
        &self,
        spec: &PropertySpec,
        is_static: bool,
        has_instance: bool,
    ) -> Result<PropertyDescriptor, ModelError> {
        self.identifier(&spec.name)?;
        let ty = self.value_type(&spec.name, &spec.type_name, false)?;
        Ok(PropertyDescriptor {
            name: spec.name.clone(),
            ty,
            throws: spec.throws,
            is_read_only: spec.read_only,
            is_static,
            uses_instance: !is_static && has_instance,
        })
    }

    fn method(
        &self,
        spec: &MethodSpec,
        class_is_static: bool,
        has_instance: bool,
    ) -> Result<MethodDescriptor, ModelError> {
        self.identifier(&spec.name)?;
        let return_type = self.value_type(&spec.name, &spec.return_type, true)?;
        let is_static = class_is_static || spec.is_static;

        if spec.sets_instance {
            if is_static || !has_instance {
                return Err(ModelError::SetsInstanceWithoutInstance {
                    class: self.class.to_string(),
                    method: spec.name.clone(),
                });
            }
            if !return_type.is_void() {
                return Err(self.invalid_type(
                    &spec.name,
                    &spec.return_type,
                    "must be void on a method that sets the instance",
                ));
            }
        }
        if spec.cleanup.is_some() && !spec.throws {
            return Err(ModelError::CleanupWithoutThrows {
                class: self.class.to_string(),
                method: spec.name.clone(),
            });
        }
        let arguments = self.arguments(&spec.name, &spec.arguments)?;
        let cleanup = match &spec.cleanup {
            Some(c) => {
                for part in c.name.split('.') {
                    self.identifier(part)?;
                }
                if !spec.sets_instance && return_type.native != "IntPtr" {
                    return Err(self.invalid_type(
                        &spec.name,
                        &spec.return_type,
                        "cannot be released by a cleanup hint",
                    ));
                }
                for argument in &c.arguments {
                    self.identifier(argument)?;
                    if !arguments.iter().any(|a| &a.name == argument) {
                        return Err(ModelError::UnknownCleanupArgument {
                            class: self.class.to_string(),
                            method: spec.name.clone(),
                            argument: argument.clone(),
                        });
                    }
                }
                Some(CleanupDescriptor {
                    name: c.name.clone(),
                    arguments: c.arguments.clone(),
                })
            }
            None => None,
        };

        Ok(MethodDescriptor {
            name: spec.name.clone(),
            return_type,
            arguments,
            throws: spec.throws,
            is_static,
            uses_instance: !is_static && has_instance,
            sets_instance: spec.sets_instance,
            cleanup,
        })
    }
}

fn build_class(context: &GenerationContext, spec: &ClassSpec) -> Result<ClassDescriptor, ModelError> {
    let b = ClassBuilder {
        context,
        class: &spec.name,
    };
    b.identifier(&spec.name)?;

    let namespace = spec
        .namespace
        .clone()
        .unwrap_or_else(|| context.config().namespace.clone());
    for part in namespace.split('.') {
        b.identifier(part)?;
    }

    let has_instance = spec.instance || spec.is_const;
    if spec.is_static && has_instance {
        return Err(ModelError::StaticWithInstance(spec.name.clone()));
    }
    if spec.is_static && spec.constructor.is_some() {
        return Err(ModelError::ConstructorOnStaticClass(spec.name.clone()));
    }
    if spec.constructor.is_some() {
        let kind = if spec.is_const {
            Some("const")
        } else if spec.no_constructor {
            Some("no_constructor")
        } else if !has_instance {
            Some("helper")
        } else {
            None
        };
        if let Some(kind) = kind {
            return Err(ModelError::ConstructorNotAllowed {
                class: spec.name.clone(),
                kind,
            });
        }
    }
    if spec.dynamic != DynamicMode::None && !has_instance {
        return Err(ModelError::DynamicWithoutInstance(spec.name.clone()));
    }

    let file_name = match &spec.file {
        Some(file) => {
            if let Some(reason) = naming::output_file_problem(file) {
                return Err(ModelError::InvalidFileName {
                    class: spec.name.clone(),
                    file: file.clone(),
                    reason,
                });
            }
            file.clone()
        }
        None => format!("{}.cs", spec.name),
    };

    let mut members = BTreeSet::new();
    let mut claim = |name: &str| -> Result<(), ModelError> {
        if members.insert(name.to_string()) {
            Ok(())
        } else {
            Err(ModelError::DuplicateMember {
                class: spec.name.clone(),
                name: name.to_string(),
            })
        }
    };

    let mut properties = Vec::with_capacity(spec.properties.len());
    for p in &spec.properties {
        claim(&p.name)?;
        properties.push(b.property(p, spec.is_static, has_instance)?);
    }
    let mut methods = Vec::with_capacity(spec.methods.len());
    for m in &spec.methods {
        claim(&m.name)?;
        methods.push(b.method(m, spec.is_static, has_instance)?);
    }

    let mut delegate_names = BTreeSet::new();
    let mut delegates = Vec::with_capacity(spec.delegates.len());
    for d in &spec.delegates {
        b.identifier(&d.name)?;
        if !delegate_names.insert(d.name.as_str()) {
            return Err(ModelError::DuplicateMember {
                class: spec.name.clone(),
                name: d.name.clone(),
            });
        }
        delegates.push(DelegateDescriptor {
            name: d.name.clone(),
            return_type: b.value_type(&d.name, &d.return_type, true)?,
            arguments: b.arguments(&d.name, &d.arguments)?,
        });
    }

    // Owning classes always get a constructor unless told otherwise.
    let constructor = if spec.is_static || spec.is_const || !has_instance || spec.no_constructor {
        None
    } else {
        let authored = spec.constructor.clone().unwrap_or_default();
        Some(ConstructorDescriptor {
            arguments: b.arguments("ctor", &authored.arguments)?,
            throws: authored.throws,
        })
    };

    Ok(ClassDescriptor {
        name: spec.name.clone(),
        namespace,
        access: spec.access,
        file_name,
        is_static: spec.is_static,
        is_const: spec.is_const,
        has_instance,
        dynamic: spec.dynamic,
        has_no_constructor: spec.no_constructor,
        has_native_constructor: spec.native_constructor,
        has_interface: spec.interface,
        is_quantum_type: spec.quantum_type,
        constructor,
        properties,
        methods,
        delegates,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CustomType;

    fn spec(toml: &str) -> ClassSpec {
        ClassSpec::from_toml_str(toml).unwrap()
    }

    fn config_with_enums() -> GeneratorConfig {
        let mut config = GeneratorConfig::default();
        config.types.enums = vec!["NoiseType".to_string()];
        config
    }

    fn build_one(toml: &str) -> Result<ClassDescriptor, ModelError> {
        let model = Model::build(config_with_enums(), &[spec(toml)])?;
        Ok(model.classes.into_iter().next().unwrap())
    }

    #[test]
    fn instance_class_gets_default_constructor() {
        let class = build_one("name = \"DrawingWand\"\ninstance = true\n").unwrap();
        assert!(class.owns_instance());
        assert_eq!(class.wrapper_kind(), WrapperKind::Instance);
        let ctor = class.constructor.unwrap();
        assert!(ctor.arguments.is_empty());
        assert!(!ctor.throws);
        assert_eq!(class.file_name, "DrawingWand.cs");
        assert_eq!(class.namespace, "ImageMagick");
    }

    #[test]
    fn static_class_members_are_static() {
        let class = build_one(
            r#"
name = "ResourceLimits"
static = true

[[properties]]
name = "Width"
type = "ulong"

[[methods]]
name = "LimitMemory"
arguments = [{ name = "percentage", type = "double" }]
"#,
        )
        .unwrap();
        assert_eq!(class.wrapper_kind(), WrapperKind::Static);
        assert!(class.properties[0].is_static);
        assert!(class.methods[0].is_static);
        assert!(!class.methods[0].uses_instance);
        assert!(class.constructor.is_none());
    }

    #[test]
    fn helper_class_without_instance() {
        let class = build_one(
            r#"
name = "MagickFormatInfo"

[[methods]]
name = "GetInfo"
return = "IntPtr"
throws = true
"#,
        )
        .unwrap();
        assert_eq!(class.wrapper_kind(), WrapperKind::Helper);
        assert!(!class.owns_instance());
        assert!(!class.methods[0].is_static);
        assert!(!class.methods[0].uses_instance);
    }

    #[test]
    fn unmapped_type_is_error() {
        let err = build_one(
            r#"
name = "MagickImage"
instance = true

[[properties]]
name = "Page"
type = "MagickGeometry"
"#,
        )
        .unwrap_err();
        assert_eq!(
            err,
            ModelError::UnmappedType {
                class: "MagickImage".into(),
                member: "Page".into(),
                type_name: "MagickGeometry".into(),
            }
        );
    }

    #[test]
    fn classes_reference_each_other() {
        let settings = spec("name = \"MagickSettings\"\ninstance = true\n");
        let image = spec(
            r#"
name = "MagickImage"
instance = true

[constructor]
throws = true
arguments = [{ name = "settings", type = "MagickSettings" }]
"#,
        );
        let model = Model::build(GeneratorConfig::default(), &[settings, image]).unwrap();
        let ctor = model.class("MagickImage").unwrap().constructor.as_ref().unwrap();
        assert!(ctor.throws);
        assert!(ctor.arguments[0].ty.has_instance());
        assert_eq!(ctor.arguments[0].ty.native, "IntPtr");
    }

    #[test]
    fn static_classes_are_not_types() {
        let limits = spec("name = \"ResourceLimits\"\nstatic = true\n");
        let user = spec(
            r#"
name = "User"
[[methods]]
name = "Use"
static = true
arguments = [{ name = "limits", type = "ResourceLimits" }]
"#,
        );
        let err = Model::build(GeneratorConfig::default(), &[limits, user]).unwrap_err();
        assert!(matches!(err, ModelError::UnmappedType { .. }));
    }

    #[test]
    fn enum_and_custom_types_resolve() {
        let mut config = config_with_enums();
        config.types.custom.insert(
            "PointInfo".into(),
            CustomType {
                native: "PointInfo".into(),
                newer_runtime: true,
            },
        );
        let model = Model::build(
            config,
            &[spec(
                r#"
name = "MagickImage"
instance = true

[[methods]]
name = "AddNoise"
arguments = [{ name = "noiseType", type = "NoiseType" }, { name = "origin", type = "PointInfo" }]
"#,
            )],
        )
        .unwrap();
        let method = &model.classes[0].methods[0];
        assert!(method.arguments[0].ty.is_enum());
        assert_eq!(method.arguments[0].ty.native, "UIntPtr");
        assert!(method.newer_runtime());
    }

    // =========================================================================
    // Rejections
    // =========================================================================

    #[test]
    fn duplicate_class_rejected() {
        let a = spec("name = \"A\"\n");
        let err = Model::build(GeneratorConfig::default(), &[a.clone(), a]).unwrap_err();
        assert_eq!(err, ModelError::DuplicateClass("A".into()));
    }

    #[test]
    fn class_named_like_enum_rejected() {
        let err = Model::build(config_with_enums(), &[spec("name = \"NoiseType\"\n")]).unwrap_err();
        assert_eq!(err, ModelError::TypeNameCollision("NoiseType".into()));
    }

    #[test]
    fn duplicate_member_rejected() {
        let err = build_one(
            r#"
name = "A"
instance = true
[[properties]]
name = "Depth"
type = "int"
[[methods]]
name = "Depth"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::DuplicateMember { .. }));
    }

    #[test]
    fn invalid_identifier_rejected() {
        let err = build_one(
            r#"
name = "A"
[[methods]]
name = "do-it"
static = true
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::InvalidIdentifier { .. }));
    }

    #[test]
    fn reserved_argument_rejected() {
        let err = build_one(
            r#"
name = "A"
instance = true
[[methods]]
name = "Run"
arguments = [{ name = "exception", type = "int" }]
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::ReservedArgument { .. }));
    }

    #[test]
    fn out_array_rejected() {
        let err = build_one(
            r#"
name = "A"
instance = true
[[methods]]
name = "Read"
arguments = [{ name = "values", type = "double[]", out = true }]
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::OutArray { .. }));
    }

    #[test]
    fn string_array_rejected() {
        let err = build_one(
            r#"
name = "A"
instance = true
[[methods]]
name = "Read"
arguments = [{ name = "names", type = "string[]" }]
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::InvalidType { .. }));
    }

    #[test]
    fn sets_instance_requires_instance() {
        let err = build_one(
            r#"
name = "A"
[[methods]]
name = "Read"
sets_instance = true
throws = true
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::SetsInstanceWithoutInstance { .. }));
    }

    #[test]
    fn constructor_on_static_class_rejected() {
        let err = build_one("name = \"A\"\nstatic = true\n[constructor]\nthrows = true\n").unwrap_err();
        assert_eq!(err, ModelError::ConstructorOnStaticClass("A".into()));
    }

    #[test]
    fn cleanup_requires_throws() {
        let err = build_one(
            r#"
name = "A"
instance = true
[[methods]]
name = "Clone"
return = "IntPtr"
cleanup = { name = "DisposeList" }
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::CleanupWithoutThrows { .. }));
    }

    #[test]
    fn qualified_cleanup_name_accepted() {
        let class = build_one(
            r#"
name = "A"
instance = true
[[methods]]
name = "ToByteArray"
return = "IntPtr"
throws = true
cleanup = { name = "MagickMemory.Relinquish" }
"#,
        )
        .unwrap();
        assert_eq!(class.methods[0].cleanup.as_ref().unwrap().name, "MagickMemory.Relinquish");

        let err = build_one(
            "name = \"A\"\ninstance = true\n[[methods]]\nname = \"X\"\nreturn = \"IntPtr\"\nthrows = true\ncleanup = { name = \"Free.\" }\n",
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::InvalidIdentifier { .. }));
    }

    #[test]
    fn dynamic_requires_instance() {
        let err = build_one("name = \"MagickColor\"\ndynamic = \"both\"\n").unwrap_err();
        assert_eq!(err, ModelError::DynamicWithoutInstance("MagickColor".into()));
    }

    #[test]
    fn constructor_on_const_class_rejected() {
        let err = build_one("name = \"A\"\nconst = true\n[constructor]\nthrows = true\n").unwrap_err();
        assert_eq!(
            err,
            ModelError::ConstructorNotAllowed {
                class: "A".into(),
                kind: "const"
            }
        );
    }

    #[test]
    fn constructor_with_no_constructor_rejected() {
        let err = build_one("name = \"A\"\ninstance = true\nno_constructor = true\n[constructor]\n").unwrap_err();
        assert_eq!(
            err,
            ModelError::ConstructorNotAllowed {
                class: "A".into(),
                kind: "no_constructor"
            }
        );
    }

    #[test]
    fn constructor_on_helper_class_rejected() {
        let err = build_one("name = \"A\"\n[constructor]\nthrows = true\n").unwrap_err();
        assert_eq!(
            err,
            ModelError::ConstructorNotAllowed {
                class: "A".into(),
                kind: "helper"
            }
        );
    }

    #[test]
    fn cleanup_arguments_must_name_method_arguments() {
        let cleanup = |arguments: &str| {
            build_one(&format!(
                "name = \"A\"\ninstance = true\n[[methods]]\nname = \"Clone\"\nreturn = \"IntPtr\"\nthrows = true\n\
                 arguments = [{{ name = \"count\", type = \"ulong\" }}]\n\
                 cleanup = {{ name = \"DisposeList\", arguments = {arguments} }}\n"
            ))
        };

        let class = cleanup("[\"count\"]").unwrap();
        assert_eq!(class.methods[0].cleanup.as_ref().unwrap().arguments, vec!["count".to_string()]);

        assert_eq!(
            cleanup("[\"nope\"]").unwrap_err(),
            ModelError::UnknownCleanupArgument {
                class: "A".into(),
                method: "Clone".into(),
                argument: "nope".into(),
            }
        );
        assert_eq!(
            cleanup("[\"1); Evil(\"]").unwrap_err(),
            ModelError::InvalidIdentifier {
                class: "A".into(),
                name: "1); Evil(".into(),
            }
        );
    }

    #[test]
    fn invalid_descriptor_namespace_rejected() {
        let err = build_one("name = \"A\"\nnamespace = \"Image.2Magick\"\n").unwrap_err();
        assert_eq!(
            err,
            ModelError::InvalidIdentifier {
                class: "A".into(),
                name: "2Magick".into(),
            }
        );
    }

    #[test]
    fn file_names_must_stay_in_output_dir() {
        for (file, reason) in [
            ("../x.cs", "must be a plain file name without directories"),
            ("sub\\x.cs", "must be a plain file name without directories"),
            ("x..cs", "must not contain empty or '..' segments"),
            ("Shared.txt", "must end in .cs"),
        ] {
            let err = build_one(&format!("name = \"A\"\nfile = '{file}'\n")).unwrap_err();
            assert_eq!(
                err,
                ModelError::InvalidFileName {
                    class: "A".into(),
                    file: file.into(),
                    reason,
                }
            );
        }
        assert_eq!(build_one("name = \"A\"\nfile = \"A.Shared.cs\"\n").unwrap().file_name, "A.Shared.cs");
    }

    #[test]
    fn duplicate_output_file_rejected() {
        let err = Model::build(
            GeneratorConfig::default(),
            &[
                spec("name = \"A\"\nfile = \"Shared.cs\"\n"),
                spec("name = \"B\"\nfile = \"shared.cs\"\n"),
            ],
        )
        .unwrap_err();
        assert_eq!(
            err,
            ModelError::OutputCollision {
                file: "shared.cs".into(),
                first: "A".into(),
                second: "B".into(),
            }
        );
    }

    #[test]
    fn class_file_cannot_replace_exception_helper() {
        let source = [spec("name = \"A\"\nfile = \"MagickExceptionHelper.g.cs\"\n")];
        let err = Model::build(GeneratorConfig::default(), &source).unwrap_err();
        assert_eq!(
            err,
            ModelError::OutputCollision {
                file: naming::EXCEPTION_HELPER_FILE.into(),
                first: "A".into(),
                second: "exception helper".into(),
            }
        );

        let mut config = GeneratorConfig::default();
        config.emit_exception_helper = false;
        assert!(Model::build(config, &source).is_ok());
    }

    #[test]
    fn depth_variant_collision_rejected() {
        let mut config = GeneratorConfig::default();
        config.matrix.quantum_mode = QuantumMode::Expand;
        let sources = [
            spec("name = \"Pixels\"\ninstance = true\n[[properties]]\nname = \"Value\"\ntype = \"QuantumType\"\n"),
            spec("name = \"Other\"\nfile = \"Pixels.Q16.cs\"\n"),
        ];
        let err = Model::build(config.clone(), &sources).unwrap_err();
        assert_eq!(
            err,
            ModelError::OutputCollision {
                file: "Pixels.Q16.cs".into(),
                first: "Pixels".into(),
                second: "Other".into(),
            }
        );

        config.matrix.quantum_mode = QuantumMode::Alias;
        assert!(Model::build(config, &sources).is_ok());
    }

    #[test]
    fn variants_follow_quantum_mode() {
        let mut config = GeneratorConfig::default();
        config.matrix.quantum_mode = QuantumMode::Expand;
        let class = Model::build(
            config.clone(),
            &[spec("name = \"Pixels\"\ninstance = true\n[[properties]]\nname = \"Value\"\ntype = \"QuantumType\"\n")],
        )
        .unwrap()
        .classes
        .remove(0);
        let names: Vec<String> = class
            .variants(&config.matrix)
            .into_iter()
            .map(|depth| class.variant_file_name(depth))
            .collect();
        assert_eq!(names, vec!["Pixels.Q8.cs", "Pixels.Q16.cs", "Pixels.Q16HDRI.cs"]);

        config.matrix.quantum_mode = QuantumMode::Alias;
        assert_eq!(class.variants(&config.matrix), vec![None]);
    }

    #[test]
    fn void_property_rejected() {
        let err = build_one(
            "name = \"A\"\ninstance = true\n[[properties]]\nname = \"X\"\ntype = \"void\"\n",
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::InvalidType { .. }));
    }

    #[test]
    fn quantum_usage_detected() {
        let class = build_one(
            r#"
name = "PixelCollection"
instance = true
[[methods]]
name = "SetArea"
throws = true
arguments = [{ name = "values", type = "QuantumType[]" }]
"#,
        )
        .unwrap();
        assert!(class.uses_quantum());
        let plain = build_one("name = \"B\"\ninstance = true\n").unwrap();
        assert!(!plain.uses_quantum());
    }
}
