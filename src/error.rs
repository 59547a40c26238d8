use crate::alloc::AllocError;

/// Errors surfaced by [`Sequence`](crate::Sequence) and
/// [`SeqHashMap`](crate::SeqHashMap).
///
/// Every failing operation leaves its container exactly as it was before
/// the call; nothing is retried internally.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Bounds-checked access to a key that is not present.
    #[error("key not found")]
    KeyNotFound,

    /// The allocator refused to supply node budget.
    #[error(transparent)]
    AllocationFailure(#[from] AllocError),

    /// The payload constructor reported an error.
    #[error("entry construction failed: {0}")]
    ConstructionFailure(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// `set_max_load_factor` was given a value that is not finite and positive.
    #[error("max load factor must be finite and positive, got {0}")]
    InvalidLoadFactor(f32),

    /// Growing the table would need more buckets than can be allocated.
    #[error("bucket array would exceed the maximum capacity")]
    CapacityOverflow,
}
