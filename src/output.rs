//! CLI output formatting for all pipeline stages.
//!
//! Output is class-centric: each class leads with its positional index and
//! name, with the descriptor path and emitted files as indented context.
//!
//! # Output Format
//!
//! ## Scan
//!
//! ```text
//! Classes
//! 001 MagickImage (instance, 3 properties, 5 methods)
//!     Source: MagickImage.toml
//! 002 ResourceLimits (static, 2 properties)
//!     Source: ResourceLimits.toml
//!
//! Config
//!     namespace ImageMagick
//!     x64, x86 (AnyCPU) · Q8, Q16, Q16HDRI (alias)
//! ```
//!
//! ## Generate
//!
//! ```text
//! 001 MagickImage
//!     MagickImage.cs: written
//! 002 PixelCollection
//!     PixelCollection.Q8.cs: cached
//!     PixelCollection.Q16.cs: cached
//! MagickExceptionHelper.g.cs: written
//! ```
//!
//! Each stage has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout.

use crate::config::{GeneratorConfig, QuantumMode};
use crate::descriptor::{ClassSpec, DynamicMode};
use crate::generate::{FileStatus, GenerateEvent};
use crate::runtime::ExceptionKind;
use crate::scan::Manifest;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn count(n: usize, singular: &str, plural: &str) -> String {
    if n == 1 {
        format!("{n} {singular}")
    } else {
        format!("{n} {plural}")
    }
}

/// `instance, 3 properties, 5 methods`
fn class_summary(spec: &ClassSpec) -> String {
    let mut parts = Vec::new();
    let role = if spec.is_static {
        Some("static")
    } else if spec.is_const {
        Some("const")
    } else if spec.instance {
        Some("instance")
    } else {
        None
    };
    parts.extend(role.map(str::to_string));
    if spec.dynamic != DynamicMode::None {
        parts.push("dynamic".to_string());
    }
    if !spec.properties.is_empty() {
        parts.push(count(spec.properties.len(), "property", "properties"));
    }
    if !spec.methods.is_empty() {
        parts.push(count(spec.methods.len(), "method", "methods"));
    }
    if !spec.delegates.is_empty() {
        parts.push(count(spec.delegates.len(), "delegate", "delegates"));
    }
    parts.join(", ")
}

fn matrix_summary(config: &GeneratorConfig) -> String {
    let matrix = &config.matrix;
    let archs: Vec<String> = matrix.architectures.iter().map(|a| a.to_string()).collect();
    let depths: Vec<String> = matrix.quantum_depths.iter().map(|d| d.to_string()).collect();
    let any_cpu = if matrix.any_cpu { " (AnyCPU)" } else { "" };
    let mode = match matrix.quantum_mode {
        QuantumMode::Alias => "alias",
        QuantumMode::Expand => "expand",
    };
    format!(
        "{}{any_cpu} \u{00b7} {} ({mode})",
        archs.join(", "),
        depths.join(", ")
    )
}

// ============================================================================
// Stage 1: Scan output
// ============================================================================

pub fn format_scan_output(manifest: &Manifest) -> Vec<String> {
    let mut lines = vec!["Classes".to_string()];
    for (i, entry) in manifest.classes.iter().enumerate() {
        let summary = class_summary(&entry.descriptor);
        if summary.is_empty() {
            lines.push(format!("{} {}", format_index(i + 1), entry.descriptor.name));
        } else {
            lines.push(format!(
                "{} {} ({summary})",
                format_index(i + 1),
                entry.descriptor.name
            ));
        }
        lines.push(format!("{}Source: {}", indent(1), entry.source_path));
    }

    lines.push(String::new());
    lines.push("Config".to_string());
    lines.push(format!("{}namespace {}", indent(1), manifest.config.namespace));
    lines.push(format!("{}{}", indent(1), matrix_summary(&manifest.config)));
    lines
}

pub fn print_scan_output(manifest: &Manifest) {
    for line in format_scan_output(manifest) {
        println!("{}", line);
    }
}

// ============================================================================
// Stage 2: Generate output
// ============================================================================

/// Format a single generate progress event as display lines.
pub fn format_generate_event(event: &GenerateEvent) -> Vec<String> {
    match event {
        GenerateEvent::ClassStarted { index, class, .. } => {
            vec![format!("{} {}", format_index(*index), class)]
        }
        GenerateEvent::FileGenerated(file) => {
            let status = match file.status {
                FileStatus::Cached => "cached",
                FileStatus::Copied => "copied",
                FileStatus::Written => "written",
            };
            let depth = if file.class.is_some() { 1 } else { 0 };
            vec![format!("{}{}: {}", indent(depth), file.path, status)]
        }
    }
}

// ============================================================================
// Severity lookup
// ============================================================================

/// Describe how a native severity code maps to an exception kind.
///
/// ```text
/// 425 → CorruptImageError (MagickCorruptImageErrorException)
/// ```
pub fn format_severity(code: i32) -> Vec<String> {
    let kind = ExceptionKind::from_severity(code);
    let band = if kind.is_error() { "Error" } else { "Warning" };
    let name = kind.severity_name().unwrap_or_else(|| band.to_string());
    let mut lines = vec![format!(
        "{code} \u{2192} {name} ({})",
        kind.exception_name()
    )];
    if kind.severity_name().is_none() {
        lines.push(format!("{}no named kind; generic fallback", indent(1)));
    }
    lines
}

pub fn print_severity(code: i32) {
    for line in format_severity(code) {
        println!("{}", line);
    }
}
