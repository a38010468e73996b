//! The private `Native{Class}` wrapper and its managed-side helpers.
//!
//! Owning wrappers follow a one-way lifecycle:
//!
//! ```text
//! Created ──Class_Create──▶ Active ──Class_Dispose──▶ Disposed
//!                             │                          │
//!                        Instance = h              Instance throws
//!                                                  ObjectDisposedException
//! ```
//!
//! `IntPtr.Zero` is the disposed sentinel. Reassigning `Instance` releases
//! the previous handle, so assigning zero twice releases once.

use super::exception::Check;
use super::{ClassEmitter, native_call};
use crate::model::{ArgumentDescriptor, MethodDescriptor, PropertyDescriptor, WrapperKind};
use crate::naming;
use crate::types::{QUANTUM_TYPE, TypeDescriptor};

/// Marshaler class providing `CreateInstance` for a converted argument.
fn creator(ty: &TypeDescriptor) -> String {
    if ty.is_string() {
        "UTF8Marshaler".to_string()
    } else if ty.is_array() {
        "NativeArray".to_string()
    } else {
        ty.managed.clone()
    }
}

/// Expression passing a managed value to native code.
fn to_native(ty: &TypeDescriptor, name: &str) -> String {
    if ty.needs_create() {
        format!("{}.Instance", naming::native_local(name))
    } else if let Some(traits) = ty.instance() {
        format!("{}.GetInstance({name})", traits.class)
    } else if let Some(cast) = &ty.native_cast {
        format!("{cast}{name}")
    } else {
        name.to_string()
    }
}

/// Expression converting a native value to its managed form.
fn to_managed(ty: &TypeDescriptor, expr: &str) -> String {
    if ty.is_native_string() {
        format!("UTF8Marshaler.NativeToManagedAndRelinquish({expr})")
    } else if ty.is_string() {
        format!("UTF8Marshaler.NativeToManaged({expr})")
    } else if ty.is_dynamic() {
        format!("{}.CreateInstance({expr})", ty.managed)
    } else if ty.has_instance() {
        format!("{}.Create({expr})", ty.managed)
    } else if let Some(cast) = &ty.managed_cast {
        format!("{cast}{expr}")
    } else {
        expr.to_string()
    }
}

/// Managed parameter list of a public overload.
fn managed_parameters<'a>(arguments: impl Iterator<Item = &'a ArgumentDescriptor>) -> String {
    arguments
        .map(|arg| {
            let direction = if arg.is_out { "out " } else { "" };
            format!("{direction}{} {}", arg.ty.managed_parameter(), arg.name)
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Arguments of a native call, framed by `Instance` and `out exception`.
fn call_arguments(uses_instance: bool, arguments: &[ArgumentDescriptor], throws: bool) -> Vec<String> {
    let mut args = Vec::with_capacity(arguments.len() + 2);
    if uses_instance {
        args.push("Instance".to_string());
    }
    for arg in arguments {
        if arg.is_out {
            args.push(format!("out {}", naming::out_local(&arg.name)));
        } else if arg.ty.is_array() {
            args.push(to_native(&arg.ty, &arg.name));
            args.push(format!("(UIntPtr)({0} == null ? 0 : {0}.Length)", arg.name));
        } else {
            args.push(to_native(&arg.ty, &arg.name));
        }
    }
    if throws {
        args.push("out exception".to_string());
    }
    args
}

impl ClassEmitter<'_> {
    pub(super) fn write_native_wrapper(&mut self) {
        let class = self.class;
        let kind = class.wrapper_kind();
        let name = naming::native_class(&class.name);
        match kind.base_class() {
            Some(base) => self.w.line(format!("private sealed class {name} : {base}")),
            None => self.w.line(format!("private static class {name}")),
        }
        self.w.open();

        let mut first = true;
        if matches!(kind, WrapperKind::Instance | WrapperKind::ConstInstance) {
            self.write_instance_members(kind == WrapperKind::Instance, &mut first);
        }
        if kind == WrapperKind::Instance {
            self.write_dispose(&mut first);
        }
        self.write_constructors(kind, &mut first);
        let static_members = kind == WrapperKind::Static;
        for prop in &class.properties {
            self.gap(&mut first);
            self.guarded(prop.newer_runtime(), |e| e.write_property(prop, static_members));
        }
        for method in &class.methods {
            self.gap(&mut first);
            self.guarded(method.newer_runtime(), |e| e.write_method(method, static_members));
        }

        self.w.close();
    }

    fn gap(&mut self, first: &mut bool) {
        if !*first {
            self.w.blank();
        }
        *first = false;
    }

    fn write_instance_members(&mut self, owner: bool, first: &mut bool) {
        self.gap(first);
        self.w.line("private IntPtr _instance = IntPtr.Zero;");
        self.w.blank();
        self.w.line("public override IntPtr Instance");
        self.w.open();
        self.w.line("get");
        self.w.open();
        self.w
            .write_if("_instance == IntPtr.Zero", "throw new ObjectDisposedException(TypeName);");
        self.w.line("return _instance;");
        self.w.close();
        self.w.line("set");
        self.w.open();
        if owner {
            self.w.write_if("_instance != IntPtr.Zero", "Dispose(_instance);");
        }
        self.w.line("_instance = value;");
        self.w.close();
        self.w.close();
        self.w.blank();
        self.w.line("protected override string TypeName");
        self.w.open();
        self.w.line("get");
        self.w.open();
        self.w.line(format!("return nameof({});", self.class.name));
        self.w.close();
        self.w.close();
    }

    fn write_dispose(&mut self, first: &mut bool) {
        let entry = naming::dispose_entry(&self.class.name);
        let args = ["instance".to_string()];
        self.gap(first);
        if self.class.has_no_constructor {
            self.w.line("public static void DisposeInstance(IntPtr instance)");
            self.w.open();
            self.write_dispatch(|arch| format!("{};", native_call(arch, &entry, &args)));
            self.w.close();
            self.w.blank();
            self.w.line("protected override void Dispose(IntPtr instance)");
            self.w.open();
            self.w.line("DisposeInstance(instance);");
            self.w.close();
        } else {
            self.w.line("protected override void Dispose(IntPtr instance)");
            self.w.open();
            self.write_dispatch(|arch| format!("{};", native_call(arch, &entry, &args)));
            self.w.close();
        }
    }

    fn write_constructors(&mut self, kind: WrapperKind, first: &mut bool) {
        let class = self.class;
        let name = naming::native_class(&class.name);
        let adopts = matches!(kind, WrapperKind::Instance | WrapperKind::ConstInstance)
            && (class.has_native_constructor || class.is_const || class.dynamic.native_to_managed());
        if adopts {
            self.gap(first);
            self.w.line(format!("public {name}(IntPtr instance)"));
            self.w.open();
            self.w.line("Instance = instance;");
            self.w.close();
        }

        let Some(ctor) = class.constructor.as_ref().filter(|_| kind == WrapperKind::Instance) else {
            return;
        };
        self.gap(first);
        self.w.line(format!(
            "public {name}({})",
            managed_parameters(ctor.arguments.iter().filter(|a| !a.is_hidden))
        ));
        self.w.open();
        let usings = self.open_usings(&ctor.arguments);
        self.write_out_locals(&ctor.arguments);
        if ctor.throws {
            self.write_exception_slot();
        }
        self.w.line("IntPtr result;");
        let entry = naming::create_entry(&class.name);
        let args = call_arguments(false, &ctor.arguments, ctor.throws);
        self.write_dispatch(|arch| format!("result = {};", native_call(arch, &entry, &args)));
        if ctor.throws {
            self.write_check(&Check::Result);
        }
        self.write_out_conversions(&ctor.arguments);
        self.w
            .write_if("result == IntPtr.Zero", "throw new InvalidOperationException();");
        self.w.line("Instance = result;");
        self.close_usings(usings);
        self.w.close();
    }

    fn write_property(&mut self, prop: &PropertyDescriptor, static_members: bool) {
        let class = &self.class.name;
        let modifier = if prop.is_static || static_members { "static " } else { "" };
        let check = Check::Plain {
            is_static: prop.is_static,
        };
        self.w.line(format!(
            "public {modifier}{} {}",
            prop.ty.managed_parameter(),
            prop.name
        ));
        self.w.open();

        self.w.line("get");
        self.w.open();
        if prop.throws {
            self.write_exception_slot();
        }
        self.w.line(format!("{} result;", prop.ty.native));
        let getter = naming::property_getter(class, &prop.name);
        let args = call_arguments(prop.uses_instance, &[], prop.throws);
        self.write_dispatch(|arch| format!("result = {};", native_call(arch, &getter, &args)));
        if prop.throws {
            self.write_check(&check);
        }
        self.w.line(format!("return {};", to_managed(&prop.ty, "result")));
        self.w.close();

        if !prop.is_read_only {
            let value = ArgumentDescriptor {
                name: "value".to_string(),
                ty: prop.ty.clone(),
                is_out: false,
                is_hidden: false,
            };
            let values = std::slice::from_ref(&value);
            self.w.line("set");
            self.w.open();
            let usings = self.open_usings(values);
            if prop.throws {
                self.write_exception_slot();
            }
            let setter = naming::property_setter(class, &prop.name);
            let args = call_arguments(prop.uses_instance, values, prop.throws);
            self.write_dispatch(|arch| format!("{};", native_call(arch, &setter, &args)));
            if prop.throws {
                self.write_check(&check);
            }
            self.close_usings(usings);
            self.w.close();
        }

        self.w.close();
    }

    fn write_method(&mut self, method: &MethodDescriptor, static_members: bool) {
        let modifier = if method.is_static || static_members { "static " } else { "" };
        let return_type = if method.sets_instance {
            "void".to_string()
        } else {
            method.return_type.managed_parameter()
        };
        self.w.line(format!(
            "public {modifier}{return_type} {}({})",
            method.name,
            managed_parameters(method.visible_arguments())
        ));
        self.w.open();

        let usings = self.open_usings(&method.arguments);
        self.write_out_locals(&method.arguments);
        if method.throws {
            self.write_exception_slot();
        }
        let has_result = method.native_return() != "void";
        if has_result {
            self.w.line(format!("{} result;", method.native_return()));
        }

        let entry = naming::entry_point(&self.class.name, &method.name);
        let args = call_arguments(method.uses_instance, &method.arguments, method.throws);
        let assign = if has_result { "result = " } else { "" };
        self.write_dispatch(|arch| format!("{assign}{};", native_call(arch, &entry, &args)));

        if method.throws {
            let check = Check::for_method(method, self.class);
            self.write_check(&check);
        }
        self.write_out_conversions(&method.arguments);
        if method.sets_instance {
            self.w.line("Instance = result;");
        } else if has_result {
            self.w
                .line(format!("return {};", to_managed(&method.return_type, "result")));
        }

        self.close_usings(usings);
        self.w.close();
    }

    /// Stacked `using` statements for converted arguments. Returns whether a
    /// block was opened.
    fn open_usings(&mut self, arguments: &[ArgumentDescriptor]) -> bool {
        let converted: Vec<&ArgumentDescriptor> = arguments
            .iter()
            .filter(|a| !a.is_out && a.ty.needs_create())
            .collect();
        if converted.is_empty() {
            return false;
        }
        for arg in converted {
            self.w.line(format!(
                "using (INativeInstance {} = {}.CreateInstance({}))",
                naming::native_local(&arg.name),
                creator(&arg.ty),
                arg.name
            ));
        }
        self.w.open();
        true
    }

    fn close_usings(&mut self, opened: bool) {
        if opened {
            self.w.close();
        }
    }

    fn write_out_locals(&mut self, arguments: &[ArgumentDescriptor]) {
        for arg in arguments.iter().filter(|a| a.is_out) {
            self.w
                .line(format!("{} {};", arg.ty.native, naming::out_local(&arg.name)));
        }
    }

    fn write_out_conversions(&mut self, arguments: &[ArgumentDescriptor]) {
        for arg in arguments.iter().filter(|a| a.is_out) {
            self.w.line(format!(
                "{} = {};",
                arg.name,
                to_managed(&arg.ty, &naming::out_local(&arg.name))
            ));
        }
    }

    /// Parameter type other classes use to refer to this one.
    fn own_parameter_type(&self) -> String {
        let class = self.class;
        if class.is_quantum_type {
            format!("{}<{QUANTUM_TYPE}>", naming::interface_name(&class.name))
        } else if class.has_interface {
            naming::interface_name(&class.name)
        } else {
            class.name.clone()
        }
    }

    /// Receiver expression, cast back to the class when declared as an interface.
    fn own_receiver(&self) -> String {
        if self.class.is_quantum_type || self.class.has_interface {
            format!("(({})instance)", self.class.name)
        } else {
            "instance".to_string()
        }
    }

    pub(super) fn write_get_instance(&mut self) {
        self.w.line(format!(
            "internal static IntPtr GetInstance({} instance)",
            self.own_parameter_type()
        ));
        self.w.open();
        self.w.write_if("instance == null", "return IntPtr.Zero;");
        self.w
            .line(format!("return {}._nativeInstance.Instance;", self.own_receiver()));
        self.w.close();
    }

    pub(super) fn write_create_instance(&mut self) {
        let class = self.class;
        let mut first = true;
        if class.dynamic.managed_to_native() {
            self.gap(&mut first);
            self.w.line(format!(
                "internal static INativeInstance CreateInstance({} instance)",
                self.own_parameter_type()
            ));
            self.w.open();
            self.w.write_if("instance == null", "return NativeInstance.Zero;");
            self.w
                .line(format!("return {}.CreateNativeInstance();", self.own_receiver()));
            self.w.close();
        }
        if class.dynamic.native_to_managed() {
            let native = naming::native_class(&class.name);
            self.gap(&mut first);
            self.w.line(format!(
                "internal static {} CreateInstance(IntPtr instance)",
                class.name
            ));
            self.w.open();
            self.w.write_if("instance == IntPtr.Zero", "return null;");
            self.w.line(format!(
                "using ({native} nativeInstance = new {native}(instance))"
            ));
            self.w.open();
            self.w.line(format!("return new {}(nativeInstance);", class.name));
            self.w.close();
            self.w.close();
        }
    }
}
