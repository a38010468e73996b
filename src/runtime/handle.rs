//! Owned native instance handles.
//!
//! ```text
//!   Created ──activate──▶ Active ──dispose──▶ Disposed
//!                           │ ▲                  │
//!                           └─┘ replace          └─ dispose again: no-op
//!                                                   access: HandleError::Disposed
//! ```
//!
//! A [`NativeHandle`] releases its pointer exactly once, on [`dispose`] or on
//! drop, and never hands out a pointer after release.
//!
//! [`dispose`]: NativeHandle::dispose

use std::num::NonZeroUsize;
use thiserror::Error;

/// Raw native pointer value. Zero is the null sentinel.
pub type RawHandle = usize;

pub const NULL_HANDLE: RawHandle = 0;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandleError {
    #[error("{0} has been disposed")]
    Disposed(&'static str),
    #[error("{0} has no native instance yet")]
    Uninitialized(&'static str),
    #[error("native {0} constructor returned a null handle")]
    NullHandle(&'static str),
}

/// Releases a native pointer, e.g. by calling `{Class}_Dispose`.
pub trait NativeRelease {
    fn release(&self, handle: RawHandle);
}

impl<F: Fn(RawHandle)> NativeRelease for F {
    fn release(&self, handle: RawHandle) {
        self(handle)
    }
}

/// Lifecycle state of a [`NativeHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    Created,
    Active,
    Disposed,
}

/// Exclusively owned native instance.
pub struct NativeHandle<R: NativeRelease> {
    type_name: &'static str,
    raw: Option<NonZeroUsize>,
    state: HandleState,
    releaser: R,
}

impl<R: NativeRelease> NativeHandle<R> {
    /// A handle with no native instance yet.
    pub fn new(type_name: &'static str, releaser: R) -> Self {
        Self {
            type_name,
            raw: None,
            state: HandleState::Created,
            releaser,
        }
    }

    /// Take ownership of a pointer returned by a native constructor.
    pub fn adopt(type_name: &'static str, raw: RawHandle, releaser: R) -> Result<Self, HandleError> {
        let mut handle = Self::new(type_name, releaser);
        handle.activate(raw)?;
        Ok(handle)
    }

    /// Install a pointer. An existing pointer is released first.
    pub fn activate(&mut self, raw: RawHandle) -> Result<(), HandleError> {
        if self.state == HandleState::Disposed {
            return Err(HandleError::Disposed(self.type_name));
        }
        let raw = NonZeroUsize::new(raw).ok_or(HandleError::NullHandle(self.type_name))?;
        if let Some(old) = self.raw.replace(raw) {
            self.releaser.release(old.get());
        }
        self.state = HandleState::Active;
        Ok(())
    }

    /// The live pointer.
    pub fn get(&self) -> Result<RawHandle, HandleError> {
        match (self.state, self.raw) {
            (HandleState::Active, Some(raw)) => Ok(raw.get()),
            (HandleState::Disposed, _) => Err(HandleError::Disposed(self.type_name)),
            _ => Err(HandleError::Uninitialized(self.type_name)),
        }
    }

    pub fn state(&self) -> HandleState {
        self.state
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Release the pointer. Returns whether this call released it; later
    /// calls are no-ops.
    pub fn dispose(&mut self) -> bool {
        self.state = HandleState::Disposed;
        match self.raw.take() {
            Some(raw) => {
                self.releaser.release(raw.get());
                true
            }
            None => false,
        }
    }

    /// Give up ownership without releasing.
    pub fn into_raw(mut self) -> Option<RawHandle> {
        self.state = HandleState::Disposed;
        self.raw.take().map(NonZeroUsize::get)
    }
}

impl<R: NativeRelease> Drop for NativeHandle<R> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<R: NativeRelease> std::fmt::Debug for NativeHandle<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeHandle")
            .field("type_name", &self.type_name)
            .field("state", &self.state)
            .finish()
    }
}
