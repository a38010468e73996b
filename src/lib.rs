//! # magick-interop
//!
//! Interop code generator for the ImageMagick .NET binding. Each native
//! class is described once as data; the generator emits the P/Invoke glue
//! the managed binding compiles against: extern declarations per
//! architecture, argument marshaling, post-call exception checks, and the
//! private wrapper that owns the native handle.
//!
//! # Architecture: Two-Stage Pipeline
//!
//! ```text
//! 1. Scan      descriptors/  →  manifest.json   (authored data → validated model)
//! 2. Generate  manifest      →  generated/*.cs  (model → interop source files)
//! ```
//!
//! The manifest is human-readable JSON, so a failing generation can be
//! inspected without re-running the scan. Validation happens entirely in
//! the scan stage: a manifest that exists always generates.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`scan`] | Stage 1 — walks the descriptor root, loads and validates every class |
//! | [`generate`] | Stage 2 — writes emitted files, consulting the cache |
//! | [`config`] | `interop.toml` loading, merging over stock defaults, validation |
//! | [`descriptor`] | Authored class descriptors (TOML or JSON) |
//! | [`model`] | Validated descriptor tree and the explicit generation context |
//! | [`types`] | Fixed managed ↔ native type table |
//! | [`naming`] | Identifier checks and native entry-point naming |
//! | [`platform`] | Architecture blocks, build guards, quantum-depth variants |
//! | [`writer`] | Indented line writer for emitted C# |
//! | [`emit`] | Signature, exception check, and wrapper emission |
//! | [`runtime`] | Severity table, exception translation, owned native handles |
//! | [`cache`] | Content-addressed output cache |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Descriptors Are Data
//!
//! The native surface is authored as plain TOML or JSON rather than as code.
//! Adding a native function is a one-line change reviewed like any other
//! data, and the same descriptor drives the 64-bit block, the 32-bit block,
//! and every quantum depth.
//!
//! ## No Global Registry
//!
//! Cross-class references (an argument typed `MagickSettings`, a dynamic
//! `MagickColor`) resolve through a [`model::GenerationContext`] built once
//! from every descriptor and passed to each emitter. Emission is a pure
//! function of that context: same descriptors, same bytes.
//!
//! ## Runtime Semantics in Rust
//!
//! The severity table in [`runtime::severity`] is the single source for the
//! emitted `MagickExceptionHelper`, and [`runtime`] carries the exception and
//! handle rules the emitted wrappers follow, so they can be tested directly.

pub mod cache;
pub mod config;
pub mod descriptor;
pub mod emit;
pub mod generate;
pub mod model;
pub mod naming;
pub mod output;
pub mod platform;
pub mod runtime;
pub mod scan;
pub mod types;
pub mod writer;

#[cfg(test)]
pub(crate) mod test_helpers;
