use std::fmt;
use std::sync::Arc;

use crate::Error;

/// Signature of a user-supplied error callback: the error message and its numeric
/// [code][Error::code].
pub type ErrorCallback = dyn Fn(&str, usize) + Send + Sync;

/// Determines how a [`SlotPool`][crate::SlotPool] reports errors.
///
/// By default, errors are returned to the caller as `Err`.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// use slot_pool::{Error, ErrorPolicy, SlotPool};
///
/// let last_code = Arc::new(AtomicUsize::new(usize::MAX));
///
/// let pool = SlotPool::<u32>::builder(1)
///     .error_policy(ErrorPolicy::callback({
///         let last_code = Arc::clone(&last_code);
///         move |_message, code| last_code.store(code, Ordering::Relaxed)
///     }))
///     .build()
///     .unwrap();
///
/// let first = pool.emplace(1).unwrap();
///
/// // With a callback installed, exhaustion is reported to the callback
/// // and the caller receives an empty handle.
/// let second = pool.emplace(2).unwrap();
/// assert!(second.is_empty());
/// assert_eq!(last_code.load(Ordering::Relaxed), Error::POOL_EXHAUSTED);
/// # drop(first);
/// ```
#[derive(Clone, Default)]
#[non_exhaustive]
pub enum ErrorPolicy {
    /// Errors are returned to the caller as `Err`. This is the default.
    #[default]
    Propagate,

    /// Errors are passed to the callback, after which the operation returns a safe default
    /// (an empty [`Handle`][crate::Handle]) where one exists.
    ///
    /// Errors raised while building the pool have no safe default. They are passed to the
    /// callback and then still returned as `Err`.
    Callback(Arc<ErrorCallback>),
}

impl ErrorPolicy {
    /// Creates a [`Callback`][Self::Callback] policy from a closure.
    #[must_use]
    pub fn callback(f: impl Fn(&str, usize) + Send + Sync + 'static) -> Self {
        Self::Callback(Arc::new(f))
    }

    /// Whether errors are swallowed after being passed to a callback.
    #[must_use]
    #[inline]
    pub fn is_callback(&self) -> bool {
        matches!(self, Self::Callback(_))
    }

    /// Passes the error to the callback, if there is one.
    ///
    /// Returns `true` if the error was handled by a callback and the caller should fall back to a
    /// safe default, `false` if the error must be returned to the caller.
    pub(crate) fn notify(&self, error: &Error) -> bool {
        match self {
            Self::Propagate => false,
            Self::Callback(callback) => {
                callback(&error.to_string(), error.code());
                true
            }
        }
    }
}

impl fmt::Debug for ErrorPolicy {
    #[cfg_attr(test, mutants::skip)] // No API contract to test.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Propagate => write!(f, "Propagate"),
            Self::Callback(_) => write!(f, "Callback(..)"),
        }
    }
}
