//! C# interop source emission.
//!
//! Each validated class becomes one file (one per quantum depth in expand
//! mode) laid out as:
//!
//! ```text
//! // license header
//! using ...;
//! [QuantumType alias]
//!
//! namespace N
//! {
//!   public partial class C
//!   {
//!     [delegates]
//!     private static class NativeMethods     ← signature.rs
//!     {
//!       #if PLATFORM_x64 || PLATFORM_AnyCPU
//!       public static class X64 { extern ... }
//!       #endif
//!       #if PLATFORM_x86 || PLATFORM_AnyCPU
//!       public static class X86 { extern ... }
//!       #endif
//!     }
//!     private NativeC _nativeInstance;
//!     private sealed class NativeC : ...      ← instance.rs
//!     GetInstance / CreateInstance helpers
//!   }
//! }
//! ```
//!
//! Emission is a pure function of the model: same input, same bytes.

pub mod exception;
mod instance;
mod signature;

use crate::model::{ClassDescriptor, GenerationContext, Model};
use crate::platform::{self, Architecture, QuantumDepth};
use crate::writer::CodeWriter;

/// One emitted source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmittedFile {
    /// Class the file was emitted for; `None` for shared helpers.
    pub class: Option<String>,
    pub file_name: String,
    pub depth: Option<QuantumDepth>,
    pub content: String,
}

/// Emit every class, then the exception helper when enabled.
pub fn emit_model(model: &Model) -> Vec<EmittedFile> {
    let mut files: Vec<EmittedFile> = model
        .classes
        .iter()
        .flat_map(|class| emit_class_files(&model.context, class))
        .collect();
    if model.context.config().emit_exception_helper {
        files.push(exception::emit_exception_helper(&model.context));
    }
    files
}

/// Files for one class according to the quantum mode.
pub fn emit_class_files(ctx: &GenerationContext, class: &ClassDescriptor) -> Vec<EmittedFile> {
    class
        .variants(&ctx.config().matrix)
        .into_iter()
        .map(|depth| EmittedFile {
            class: Some(class.name.clone()),
            file_name: class.variant_file_name(depth),
            depth,
            content: emit_class(ctx, class, depth),
        })
        .collect()
}

/// Render one class. With `depth`, `QuantumType` is substituted and the file
/// is guarded by the depth symbol; without, the alias chain is emitted when
/// the class needs it. The license header is never substituted.
pub fn emit_class(ctx: &GenerationContext, class: &ClassDescriptor, depth: Option<QuantumDepth>) -> String {
    let indent = &ctx.config().format.indent;
    let mut header = CodeWriter::new(indent);
    write_header(&mut header, ctx);

    let mut emitter = ClassEmitter {
        ctx,
        class,
        depth,
        w: CodeWriter::new(indent),
    };
    emitter.write_file();
    let body = emitter.w.finish();
    let body = match depth {
        Some(depth) => platform::substitute_quantum(&body, depth),
        None => body,
    };
    header.finish() + &body
}

/// Writes one class file. Split across `signature`, `instance`, and
/// `exception` by concern.
struct ClassEmitter<'a> {
    ctx: &'a GenerationContext,
    class: &'a ClassDescriptor,
    depth: Option<QuantumDepth>,
    w: CodeWriter,
}

impl ClassEmitter<'_> {
    fn write_file(&mut self) {
        self.w.line("using System;");
        self.w.line("using System.Runtime.InteropServices;");
        if self.depth.is_none() && self.class.uses_quantum() {
            self.w.blank();
            let alias = platform::quantum_alias_lines(&self.ctx.config().matrix);
            self.w.lines(alias);
        }
        self.w.blank();
        if let Some(depth) = self.depth {
            self.w.line(format!("#if {}", depth.symbol()));
            self.w.blank();
        }

        self.w.line(format!("namespace {}", self.class.namespace));
        self.w.open();
        self.write_class();
        self.w.close();

        if self.depth.is_some() {
            self.w.blank();
            self.w.line("#endif");
        }
    }

    fn write_class(&mut self) {
        let class = self.class;
        let modifier = if class.is_static { " static" } else { "" };
        let disposable = if class.owns_instance() && !class.is_dynamic() {
            " : IDisposable"
        } else {
            ""
        };
        self.w.line(format!(
            "{}{modifier} partial class {}{disposable}",
            class.access.keyword(),
            class.name
        ));
        self.w.open();

        if !class.delegates.is_empty() {
            self.write_delegates();
            self.w.blank();
        }
        self.write_native_methods();
        self.w.blank();
        if self.has_native_field() {
            self.w.line(format!(
                "private {} _nativeInstance;",
                crate::naming::native_class(&class.name)
            ));
            self.w.blank();
        }
        self.write_native_wrapper();
        if class.is_dynamic() {
            self.w.blank();
            self.write_create_instance();
        } else if class.owns_instance() {
            self.w.blank();
            self.write_get_instance();
        }

        self.w.close();
    }

    fn has_native_field(&self) -> bool {
        !self.class.is_dynamic() && self.class.wrapper_kind() != crate::model::WrapperKind::Static
    }

    /// Write the call statement for every architecture block.
    fn write_dispatch<F>(&mut self, statement: F)
    where
        F: Fn(Architecture) -> String,
    {
        let indent = self.w.indent_unit().to_string();
        let lines = platform::dispatch_lines(&self.ctx.config().matrix, &indent, statement);
        self.w.lines(lines);
    }

    /// Run `body` inside `#if {newer_runtime_symbol}` when `newer` is set.
    fn guarded<F>(&mut self, newer: bool, body: F)
    where
        F: FnOnce(&mut Self),
    {
        if newer {
            let symbol = self.ctx.config().newer_runtime_symbol.clone();
            self.w.line(format!("#if {symbol}"));
            body(self);
            self.w.line("#endif");
        } else {
            body(self);
        }
    }
}

/// `NativeMethods.X64.Entry(args)`.
fn native_call(arch: Architecture, entry: &str, args: &[String]) -> String {
    format!("NativeMethods.{}.{entry}({})", arch.class_name(), args.join(", "))
}

fn write_header(w: &mut CodeWriter, ctx: &GenerationContext) {
    for line in &ctx.config().license_header {
        if line.is_empty() {
            w.line("//");
        } else {
            w.line(format!("// {line}"));
        }
    }
    w.line("// <auto-generated/>");
    w.blank();
}
