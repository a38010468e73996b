//! Translation of native exception records.
//!
//! A throwing native call fills an out-parameter with an exception handle
//! (null on success). The handle is read once, translated into a
//! [`MagickException`] carrying its related exceptions, and released. Errors
//! become `Err` values; warnings go to the caller's channel and the call
//! succeeds.

use super::handle::{NULL_HANDLE, RawHandle};
use super::severity::ExceptionKind;
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::debug;

/// Translated native exception.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct MagickException {
    kind: ExceptionKind,
    message: String,
    related: Vec<MagickException>,
}

impl MagickException {
    pub fn new(kind: ExceptionKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            related: Vec::new(),
        }
    }

    /// Build from native fields using the message rule.
    pub fn from_native(severity: i32, reason: &str, description: Option<&str>) -> Self {
        Self::new(
            ExceptionKind::from_severity(severity),
            format_message(reason, description),
        )
    }

    pub fn with_related(mut self, related: Vec<MagickException>) -> Self {
        self.related = related;
        self
    }

    pub fn kind(&self) -> ExceptionKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn related(&self) -> &[MagickException] {
        &self.related
    }

    pub fn is_error(&self) -> bool {
        self.kind.is_error()
    }
}

/// `reason (description)` when a description is present, else `reason`.
pub fn format_message(reason: &str, description: Option<&str>) -> String {
    match description {
        Some(d) if !d.is_empty() => format!("{reason} ({d})"),
        _ => reason.to_string(),
    }
}

/// Read access to native exception records.
pub trait NativeExceptionSource {
    fn severity(&self, handle: RawHandle) -> i32;
    fn reason(&self, handle: RawHandle) -> Option<String>;
    fn description(&self, handle: RawHandle) -> Option<String>;
    fn related_count(&self, handle: RawHandle) -> usize;
    fn related(&self, handle: RawHandle, index: usize) -> RawHandle;
    /// Release a top-level exception record and everything it owns.
    fn dispose(&self, handle: RawHandle);
}

fn translate<S: NativeExceptionSource + ?Sized>(source: &S, handle: RawHandle) -> MagickException {
    let reason = source.reason(handle).unwrap_or_default();
    let description = source.description(handle);
    let related = (0..source.related_count(handle))
        .map(|i| source.related(handle, i))
        .filter(|&h| h != NULL_HANDLE)
        .map(|h| translate(source, h))
        .collect();
    MagickException::from_native(source.severity(handle), &reason, description.as_deref())
        .with_related(related)
}

/// Translate and release an exception handle. `None` for a null handle.
pub fn create<S: NativeExceptionSource + ?Sized>(
    source: &S,
    handle: RawHandle,
) -> Option<MagickException> {
    if handle == NULL_HANDLE {
        return None;
    }
    let exception = translate(source, handle);
    source.dispose(handle);
    debug!(kind = %exception.kind(), related = exception.related().len(), "translated native exception");
    Some(exception)
}

/// Route a translated exception: errors are returned, warnings are sent to
/// `warnings` when a channel is given.
pub fn check<S: NativeExceptionSource + ?Sized>(
    source: &S,
    handle: RawHandle,
    warnings: Option<&Sender<MagickException>>,
) -> Result<(), MagickException> {
    match create(source, handle) {
        None => Ok(()),
        Some(e) if e.is_error() => Err(e),
        Some(w) => {
            if let Some(tx) = warnings {
                // A dropped receiver means nobody is listening.
                let _ = tx.send(w);
            }
            Ok(())
        }
    }
}

/// Perform one throwing native call.
///
/// The exception slot starts null, is handed to `call`, and is checked before
/// the result reaches the caller. On error `cleanup` receives the partially
/// created result.
pub fn invoke<S, T, F, C>(
    source: &S,
    warnings: Option<&Sender<MagickException>>,
    call: F,
    cleanup: C,
) -> Result<T, MagickException>
where
    S: NativeExceptionSource + ?Sized,
    F: FnOnce(&mut RawHandle) -> T,
    C: FnOnce(T),
{
    let mut exception = NULL_HANDLE;
    let result = call(&mut exception);
    match check(source, exception, warnings) {
        Ok(()) => Ok(result),
        Err(e) => {
            cleanup(result);
            Err(e)
        }
    }
}


#[cfg(test)]
mod tests {
    use super::mock::{MockExceptions, record};
    use super::*;
    use crate::runtime::severity::{Band, Subsystem};
    use std::cell::Cell;
    use std::sync::mpsc;

    #[test]
    fn message_rule() {
        assert_eq!(format_message("Bad", Some("file.png")), "Bad (file.png)");
        assert_eq!(format_message("Bad", Some("")), "Bad");
        assert_eq!(format_message("Bad", None), "Bad");
    }

    #[test]
    fn null_handle_is_no_exception() {
        let source = MockExceptions::default();
        assert!(create(&source, NULL_HANDLE).is_none());
        assert!(source.disposed().is_empty());
    }

    #[test]
    fn create_translates_and_disposes_once() {
        let source =
            MockExceptions::default().with(7, record(425, "corrupt", Some("image.jpg")));
        let e = create(&source, 7).unwrap();
        assert_eq!(e.message(), "corrupt (image.jpg)");
        assert_eq!(
            e.kind(),
            ExceptionKind {
                band: Band::Error,
                subsystem: Some(Subsystem::CorruptImage)
            }
        );
        assert_eq!(source.disposed(), vec![7]);
    }

    #[test]
    fn related_exceptions_form_chain() {
        let mut top = record(450, "coder failed", None);
        top.related = vec![8, 9];
        let source = MockExceptions::default()
            .with(7, top)
            .with(8, record(325, "truncated", None))
            .with(9, record(700, "unknown", Some("x")));
        let e = create(&source, 7).unwrap();
        assert_eq!(e.related().len(), 2);
        assert_eq!(e.related()[0].message(), "truncated");
        assert!(!e.related()[0].is_error());
        assert_eq!(e.related()[1].kind(), ExceptionKind::ERROR);
        // Only the top-level record is released.
        assert_eq!(source.disposed(), vec![7]);
    }

    #[test]
    fn check_returns_errors() {
        let source = MockExceptions::default().with(1, record(410, "bad option", None));
        let err = check(&source, 1, None).unwrap_err();
        assert!(err.is_error());
        assert_eq!(err.to_string(), "MagickOptionErrorException: bad option");
    }

    #[test]
    fn check_routes_warnings_to_channel() {
        let source = MockExceptions::default().with(1, record(350, "coder warning", None));
        let (tx, rx) = mpsc::channel();
        check(&source, 1, Some(&tx)).unwrap();
        let warning = rx.try_recv().unwrap();
        assert_eq!(warning.message(), "coder warning");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn warning_without_listener_still_succeeds() {
        let source = MockExceptions::default().with(1, record(0, "odd", None));
        let (tx, rx) = mpsc::channel();
        drop(rx);
        assert!(check(&source, 1, Some(&tx)).is_ok());
        assert!(check(&MockExceptions::default(), NULL_HANDLE, None).is_ok());
    }

    #[test]
    fn invoke_checks_before_returning() {
        let source = MockExceptions::default().with(5, record(420, "missing delegate", None));
        let cleaned = Cell::new(None);
        let result = invoke(
            &source,
            None,
            |exception| {
                *exception = 5;
                0xBEEF_usize
            },
            |partial| cleaned.set(Some(partial)),
        );
        assert!(result.is_err());
        assert_eq!(cleaned.get(), Some(0xBEEF));
        assert_eq!(source.disposed(), vec![5]);
    }

    #[test]
    fn invoke_success_skips_cleanup() {
        let source = MockExceptions::default();
        let cleaned = Cell::new(false);
        let result = invoke(&source, None, |_| 42, |_| cleaned.set(true));
        assert_eq!(result, Ok(42));
        assert!(!cleaned.get());
    }
}
