use thiserror::Error;

/// Errors reported by a [`SlotPool`][crate::SlotPool].
///
/// Every variant carries a stable numeric code (see [`Error::code()`]), which is what an
/// [error callback][crate::ErrorPolicy::Callback] receives alongside the message.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The pool was configured with a capacity of zero slots.
    #[error("pool capacity must be greater than zero")]
    InvalidArgument,

    /// Every slot of the pool holds a live object, so nothing more can be emplaced until
    /// a handle is dropped.
    #[error("pool exhausted: all {capacity} slots are in use")]
    PoolExhausted {
        /// The fixed capacity of the exhausted pool.
        capacity: usize,
    },

    /// The storage block for the pool could not be allocated, either because its size does
    /// not fit in the address space or because the allocator refused the request.
    #[error("cannot allocate storage for {capacity} slots of {slot_size} bytes")]
    AllocationFailure {
        /// The requested capacity, in slots.
        capacity: usize,

        /// The size of a single slot, in bytes.
        slot_size: usize,
    },
}

impl Error {
    /// Code passed to error callbacks for [`Error::InvalidArgument`].
    pub const INVALID_ARGUMENT: usize = 0;

    /// Code passed to error callbacks for [`Error::PoolExhausted`].
    pub const POOL_EXHAUSTED: usize = 1;

    /// Code passed to error callbacks for [`Error::AllocationFailure`].
    pub const ALLOCATION_FAILURE: usize = 2;

    /// The numeric code of this error.
    ///
    /// # Example
    ///
    /// ```
    /// use slot_pool::{Error, SlotPool};
    ///
    /// let error = SlotPool::<u32>::new(0).unwrap_err();
    /// assert_eq!(error.code(), Error::INVALID_ARGUMENT);
    /// ```
    #[must_use]
    pub fn code(&self) -> usize {
        match self {
            Self::InvalidArgument => Self::INVALID_ARGUMENT,
            Self::PoolExhausted { .. } => Self::POOL_EXHAUSTED,
            Self::AllocationFailure { .. } => Self::ALLOCATION_FAILURE,
        }
    }
}

/// Error returned by [`SlotPool::try_emplace_with()`][crate::SlotPool::try_emplace_with].
///
/// Either the pool itself refused the request or the caller-supplied constructor failed. In the
/// latter case the reserved slot has already been returned to the pool when you see this error.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EmplaceError<E> {
    /// The pool could not provide a slot.
    #[error(transparent)]
    Pool(#[from] Error),

    /// The constructor returned an error. The pool state is as it was before the call.
    #[error("object construction failed")]
    Construction(#[source] E),
}

/// A specialized `Result` type for pool operations, returning the crate's
/// [`Error`] type as the error value unless told otherwise.
pub(crate) type Result<T, E = Error> = std::result::Result<T, E>;
