//! Extern declarations and delegates.
//!
//! Native parameter types follow the marshaling rules:
//!
//! - owned instances, strings → `IntPtr`
//! - `bool` → `[MarshalAs(UnmanagedType.Bool)] bool`
//! - arrays → `IntPtr name, UIntPtr nameLength`
//! - everything else → the mapped native type
//!
//! Instance members take a leading `IntPtr Instance`; throwing members a
//! trailing `out IntPtr exception`.

use super::ClassEmitter;
use crate::model::{ArgumentDescriptor, ClassDescriptor};
use crate::naming;
use crate::platform::{self, Architecture, ConcreteDeclaration};
use crate::types::TypeDescriptor;

const BOOL_PARAMETER: &str = "[MarshalAs(UnmanagedType.Bool)]";
const BOOL_RETURN: &str = "[return: MarshalAs(UnmanagedType.Bool)]";

/// A declaration before architecture expansion.
struct LogicalDeclaration {
    attributes: Vec<String>,
    signature: String,
    newer_runtime: bool,
}

/// Native parameters for an argument list.
pub(super) fn native_parameters(arguments: &[ArgumentDescriptor]) -> Vec<String> {
    let mut params = Vec::with_capacity(arguments.len());
    for arg in arguments {
        if arg.ty.is_array() {
            params.push(format!("IntPtr {}", arg.name));
            params.push(format!("UIntPtr {}", naming::length_param(&arg.name)));
            continue;
        }
        let direction = if arg.is_out { "out " } else { "" };
        params.push(native_parameter(&arg.ty, direction, &arg.name));
    }
    params
}

fn native_parameter(ty: &TypeDescriptor, direction: &str, name: &str) -> String {
    if ty.is_bool() {
        format!("{BOOL_PARAMETER} {direction}bool {name}")
    } else {
        format!("{direction}{} {name}", ty.native)
    }
}

fn return_attributes(ty: &TypeDescriptor) -> Vec<String> {
    if ty.is_bool() {
        vec![BOOL_RETURN.to_string()]
    } else {
        Vec::new()
    }
}

fn extern_signature(return_type: &str, entry: &str, params: Vec<String>) -> String {
    format!("public static extern {return_type} {entry}({});", params.join(", "))
}

/// Frame a member's native parameters with the instance and exception slots.
fn framed(uses_instance: bool, mut params: Vec<String>, throws: bool) -> Vec<String> {
    if uses_instance {
        params.insert(0, "IntPtr Instance".to_string());
    }
    if throws {
        params.push("out IntPtr exception".to_string());
    }
    params
}

fn logical_declarations(class: &ClassDescriptor) -> Vec<LogicalDeclaration> {
    let mut decls = Vec::new();

    if class.owns_instance() {
        if let Some(ctor) = &class.constructor {
            decls.push(LogicalDeclaration {
                attributes: Vec::new(),
                signature: extern_signature(
                    "IntPtr",
                    &naming::create_entry(&class.name),
                    framed(false, native_parameters(&ctor.arguments), ctor.throws),
                ),
                newer_runtime: ctor
                    .arguments
                    .iter()
                    .any(|a| a.ty.only_supported_in_newer_runtime),
            });
        }
        decls.push(LogicalDeclaration {
            attributes: Vec::new(),
            signature: extern_signature(
                "void",
                &naming::dispose_entry(&class.name),
                vec!["IntPtr instance".to_string()],
            ),
            newer_runtime: false,
        });
    }

    for prop in &class.properties {
        let uses_instance = prop.uses_instance;
        decls.push(LogicalDeclaration {
            attributes: return_attributes(&prop.ty),
            signature: extern_signature(
                &prop.ty.native,
                &naming::property_getter(&class.name, &prop.name),
                framed(uses_instance, Vec::new(), prop.throws),
            ),
            newer_runtime: prop.newer_runtime(),
        });
        if !prop.is_read_only {
            decls.push(LogicalDeclaration {
                attributes: Vec::new(),
                signature: extern_signature(
                    "void",
                    &naming::property_setter(&class.name, &prop.name),
                    framed(
                        uses_instance,
                        vec![native_parameter(&prop.ty, "", "value")],
                        prop.throws,
                    ),
                ),
                newer_runtime: prop.newer_runtime(),
            });
        }
    }

    for method in &class.methods {
        let attributes = if method.sets_instance {
            Vec::new()
        } else {
            return_attributes(&method.return_type)
        };
        decls.push(LogicalDeclaration {
            attributes,
            signature: extern_signature(
                method.native_return(),
                &naming::entry_point(&class.name, &method.name),
                framed(
                    method.uses_instance,
                    native_parameters(&method.arguments),
                    method.throws,
                ),
            ),
            newer_runtime: method.newer_runtime(),
        });
    }

    decls
}

impl ClassEmitter<'_> {
    pub(super) fn write_delegates(&mut self) {
        for (i, delegate) in self.class.delegates.iter().enumerate() {
            if i > 0 {
                self.w.blank();
            }
            self.w
                .line("[UnmanagedFunctionPointer(CallingConvention.Cdecl)]");
            if delegate.return_type.is_bool() {
                self.w.line(BOOL_RETURN);
            }
            self.w.line(format!(
                "private delegate {} {}({});",
                delegate.return_type.native,
                delegate.name,
                native_parameters(&delegate.arguments).join(", ")
            ));
        }
    }

    pub(super) fn write_native_methods(&mut self) {
        let config = self.ctx.config();
        let matrix = &config.matrix;
        let library = &config.library;

        // Every logical declaration expanded once, then grouped per block.
        let expanded: Vec<(bool, Vec<ConcreteDeclaration>)> = logical_declarations(self.class)
            .into_iter()
            .map(|decl| {
                (
                    decl.newer_runtime,
                    platform::expand_declaration(
                        matrix,
                        library,
                        self.depth,
                        &decl.attributes,
                        &decl.signature,
                    ),
                )
            })
            .collect();

        self.w.line("private static class NativeMethods");
        self.w.open();
        for (i, arch) in platform::ordered_architectures(matrix).into_iter().enumerate() {
            if i > 0 {
                self.w.blank();
            }
            self.write_architecture_block(arch, &expanded);
        }
        self.w.close();
    }

    fn write_architecture_block(&mut self, arch: Architecture, expanded: &[(bool, Vec<ConcreteDeclaration>)]) {
        let config = self.ctx.config();
        let guard = platform::block_guard(&config.matrix, arch);
        if let Some(guard) = &guard {
            self.w.line(format!("#if {}", guard.expression()));
        }

        let name = arch.class_name();
        self.w.line(format!("public static class {name}"));
        self.w.open();
        let initializer = config.library.initializer.clone();
        if !initializer.is_empty() {
            self.w.line(format!("static {name}()"));
            self.w.open();
            self.w.line(initializer);
            self.w.close();
        }

        for (newer_runtime, concretes) in expanded {
            let Some(concrete) = concretes.iter().find(|c| c.arch == arch) else {
                continue;
            };
            self.w.blank();
            self.guarded(*newer_runtime, |e| e.w.lines(&concrete.lines));
        }

        self.w.close();
        if guard.is_some() {
            self.w.line("#endif");
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::GeneratorConfig;
    use crate::platform::Architecture;
    use crate::test_helpers::{build_model, class_file};

    const IMAGE: &str = r#"
name = "MagickImage"
instance = true

[constructor]
throws = true

[[properties]]
name = "IsEnabled"
type = "bool"
throws = true

[[properties]]
name = "Depth"
type = "size_t"
read_only = true

[[methods]]
name = "Label"
return = "string"
arguments = [{ name = "value", type = "string" }]
"#;

    #[test]
    fn bool_setter_with_instance_and_exception() {
        let model = build_model(GeneratorConfig::default(), &[IMAGE]);
        let text = class_file(&model, "MagickImage");
        assert!(text.contains(
            "public static extern void MagickImage_IsEnabled_Set(IntPtr Instance, [MarshalAs(UnmanagedType.Bool)] bool value, out IntPtr exception);"
        ));
        assert!(text.contains(
            "[return: MarshalAs(UnmanagedType.Bool)]\n        public static extern bool MagickImage_IsEnabled_Get(IntPtr Instance, out IntPtr exception);"
        ));
    }

    #[test]
    fn lifecycle_entries() {
        let model = build_model(GeneratorConfig::default(), &[IMAGE]);
        let text = class_file(&model, "MagickImage");
        assert!(text.contains("public static extern IntPtr MagickImage_Create(out IntPtr exception);"));
        assert!(text.contains("public static extern void MagickImage_Dispose(IntPtr instance);"));
    }

    #[test]
    fn read_only_property_has_no_setter() {
        let model = build_model(GeneratorConfig::default(), &[IMAGE]);
        let text = class_file(&model, "MagickImage");
        assert!(text.contains("public static extern UIntPtr MagickImage_Depth_Get(IntPtr Instance);"));
        assert!(!text.contains("MagickImage_Depth_Set"));
    }

    #[test]
    fn strings_cross_as_pointers() {
        let model = build_model(GeneratorConfig::default(), &[IMAGE]);
        let text = class_file(&model, "MagickImage");
        assert!(text.contains("public static extern IntPtr MagickImage_Label(IntPtr Instance, IntPtr value);"));
    }

    #[test]
    fn blocks_are_64bit_first_and_guarded() {
        let model = build_model(GeneratorConfig::default(), &[IMAGE]);
        let text = class_file(&model, "MagickImage");
        let x64 = text.find("#if PLATFORM_x64 || PLATFORM_AnyCPU\n      public static class X64").unwrap();
        let x86 = text.find("#if PLATFORM_x86 || PLATFORM_AnyCPU\n      public static class X86").unwrap();
        assert!(x64 < x86);
        assert!(text.contains("static X64()\n        {\n          NativeLibrary.DoInitialize();\n        }"));
        assert_eq!(
            text.matches("[DllImport(NativeLibrary.X64Name, CallingConvention = CallingConvention.Cdecl)]").count(),
            text.matches("[DllImport(NativeLibrary.X86Name, CallingConvention = CallingConvention.Cdecl)]").count()
        );
    }

    #[test]
    fn single_architecture_is_unguarded() {
        let mut config = GeneratorConfig::default();
        config.matrix.architectures = vec![Architecture::X64];
        let model = build_model(config, &[IMAGE]);
        let text = class_file(&model, "MagickImage");
        assert!(!text.contains("PLATFORM_"));
        assert!(!text.contains("X86"));
    }

    #[test]
    fn arrays_pass_pointer_and_length() {
        let model = build_model(
            GeneratorConfig::default(),
            &[r#"
name = "PixelCollection"
instance = true
[[methods]]
name = "SetArea"
throws = true
arguments = [{ name = "x", type = "ssize_t" }, { name = "values", type = "QuantumType[]" }]
"#],
        );
        let text = class_file(&model, "PixelCollection");
        assert!(text.contains(
            "public static extern void PixelCollection_SetArea(IntPtr Instance, IntPtr x, IntPtr values, UIntPtr valuesLength, out IntPtr exception);"
        ));
    }

    #[test]
    fn helper_members_take_no_instance() {
        let model = build_model(
            GeneratorConfig::default(),
            &[
                "name = \"MagickImage\"\ninstance = true\n",
                r#"
name = "MagickImageCollection"
[[methods]]
name = "Merge"
return = "MagickImage"
throws = true
arguments = [{ name = "image", type = "MagickImage" }]
"#,
            ],
        );
        let text = class_file(&model, "MagickImageCollection");
        assert!(text.contains(
            "public static extern IntPtr MagickImageCollection_Merge(IntPtr image, out IntPtr exception);"
        ));
        assert!(text.contains("MagickImageCollection_Merge(MagickImage.GetInstance(image), out exception);"));
    }

    #[test]
    fn delegates_are_cdecl() {
        let model = build_model(
            GeneratorConfig::default(),
            &[r#"
name = "MagickImage"
instance = true
[[delegates]]
name = "ProgressDelegate"
return = "bool"
arguments = [{ name = "origin", type = "IntPtr" }, { name = "offset", type = "long" }, { name = "extent", type = "MagickSizeType" }, { name = "userData", type = "IntPtr" }]
"#],
        );
        let text = class_file(&model, "MagickImage");
        assert!(text.contains(
            "[UnmanagedFunctionPointer(CallingConvention.Cdecl)]\n    [return: MarshalAs(UnmanagedType.Bool)]\n    private delegate bool ProgressDelegate(IntPtr origin, long offset, ulong extent, IntPtr userData);"
        ));
    }

    #[test]
    fn newer_runtime_members_are_guarded() {
        let mut config = GeneratorConfig::default();
        config.types.custom.insert(
            "ReadOnlySpanByte".into(),
            crate::config::CustomType {
                native: "IntPtr".into(),
                newer_runtime: true,
            },
        );
        let model = build_model(
            config,
            &[r#"
name = "MagickImage"
instance = true
[[methods]]
name = "ReadSpan"
throws = true
arguments = [{ name = "data", type = "ReadOnlySpanByte" }]
"#],
        );
        let text = class_file(&model, "MagickImage");
        assert!(text.contains(
            "#if NETSTANDARD2_1\n        [DllImport(NativeLibrary.X64Name, CallingConvention = CallingConvention.Cdecl)]\n        public static extern void MagickImage_ReadSpan(IntPtr Instance, IntPtr data, out IntPtr exception);\n        #endif"
        ));
    }
}
