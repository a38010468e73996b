//! Post-call exception checks and the severity dispatch helper.
//!
//! Every throwing call is immediately followed by its check, before any other
//! statement touches the result:
//!
//! ```text
//! IntPtr exception = IntPtr.Zero;
//! result = NativeMethods.X64.Entry(..., out exception);
//! CheckException(exception);          ← plain
//! CheckException(exception, result);  ← result released on error
//! MagickException magickException = MagickExceptionHelper.Create(exception);
//! if (magickException is MagickErrorException) { cleanup; throw; }   ← cleanup hint
//! ```

use super::{ClassEmitter, EmittedFile, write_header};
use crate::model::{ClassDescriptor, GenerationContext, MethodDescriptor};
use crate::runtime::severity::{ERROR_BASE, ExceptionKind};
use crate::writer::CodeWriter;

pub use crate::naming::EXCEPTION_HELPER_FILE;

/// How a throwing call is checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum Check {
    /// Throw errors, raise warnings.
    Plain { is_static: bool },
    /// As plain, and release `result` before throwing.
    Result,
    /// Run a cleanup statement on a non-null `result` before throwing.
    Cleanup { statement: String, raise_warning: bool },
}

impl Check {
    /// The check a method needs.
    pub(super) fn for_method(method: &MethodDescriptor, class: &ClassDescriptor) -> Self {
        if let Some(cleanup) = &method.cleanup {
            let args: Vec<&str> = std::iter::once("result")
                .chain(cleanup.arguments.iter().map(String::as_str))
                .collect();
            return Check::Cleanup {
                statement: format!("{}({});", cleanup.name, args.join(", ")),
                raise_warning: !method.is_static,
            };
        }
        if method.sets_instance {
            return Check::Result;
        }
        if let Some(returned) = method.return_type.instance() {
            if class.owns_instance() && returned.class == class.name && !method.is_static {
                return Check::Result;
            }
            return Check::Cleanup {
                statement: format!("{}.Dispose(result);", returned.class),
                raise_warning: !method.is_static,
            };
        }
        Check::Plain {
            is_static: method.is_static,
        }
    }
}

impl ClassEmitter<'_> {
    pub(super) fn write_exception_slot(&mut self) {
        self.w.line("IntPtr exception = IntPtr.Zero;");
    }

    pub(super) fn write_check(&mut self, check: &Check) {
        match check {
            Check::Plain { is_static: true } => self.w.line("MagickExceptionHelper.Check(exception);"),
            Check::Plain { is_static: false } => self.w.line("CheckException(exception);"),
            Check::Result => self.w.line("CheckException(exception, result);"),
            Check::Cleanup {
                statement,
                raise_warning,
            } => {
                self.w
                    .line("MagickException magickException = MagickExceptionHelper.Create(exception);");
                self.w.line("if (magickException is MagickErrorException)");
                self.w.open();
                self.w.write_if("result != IntPtr.Zero", statement);
                self.w.line("throw magickException;");
                self.w.close();
                if *raise_warning {
                    self.w.line("RaiseWarning(magickException);");
                }
            }
        }
    }
}

/// Emit `MagickExceptionHelper.g.cs` from the runtime severity table.
pub fn emit_exception_helper(ctx: &GenerationContext) -> EmittedFile {
    let config = ctx.config();
    let mut w = CodeWriter::new(&config.format.indent);
    write_header(&mut w, ctx);
    w.line("using System;");
    w.blank();
    w.line(format!("namespace {}", config.namespace));
    w.open();
    w.line("internal static partial class MagickExceptionHelper");
    w.open();

    w.line("private static MagickException Create(ExceptionSeverity severity, string message)");
    w.open();
    w.line("switch (severity)");
    w.open();
    for kind in ExceptionKind::named() {
        let Some(severity) = kind.severity_name() else {
            continue;
        };
        w.line(format!("case ExceptionSeverity.{severity}:"));
        w.indent();
        w.line(format!("return new {}(message);", kind.exception_name()));
        w.dedent();
    }
    w.line("default:");
    w.indent();
    w.write_if(
        &format!("(int)severity < {ERROR_BASE}"),
        &format!("return new {}(message);", ExceptionKind::WARNING.exception_name()),
    );
    w.line(format!("return new {}(message);", ExceptionKind::ERROR.exception_name()));
    w.dedent();
    w.close();
    w.close();

    w.blank();
    w.line("private static string CreateMessage(string reason, string description)");
    w.open();
    w.write_if("string.IsNullOrEmpty(description)", "return reason;");
    w.line("return reason + \" (\" + description + \")\";");
    w.close();

    w.close();
    w.close();

    EmittedFile {
        class: None,
        file_name: EXCEPTION_HELPER_FILE.to_string(),
        depth: None,
        content: w.finish(),
    }
}
