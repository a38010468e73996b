//! Runtime semantics the emitted wrappers rely on, expressed in Rust.
//!
//! - [`severity`]: severity code → exception kind table
//! - [`exception`]: native exception translation, error/warning routing
//! - [`handle`]: exclusively owned native handle with idempotent release

pub mod exception;
pub mod handle;
pub mod severity;

pub use exception::{MagickException, NativeExceptionSource};
pub use handle::{HandleError, HandleState, NativeHandle, NativeRelease, RawHandle};
pub use severity::{Band, ExceptionKind, Subsystem};
