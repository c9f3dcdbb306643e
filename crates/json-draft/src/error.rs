//! Error type shared by every drafting operation.

use thiserror::Error;

/// Errors raised by draft operations.
///
/// All variants describe API misuse. None of them is recoverable by
/// retrying, and an operation that fails leaves the draft untouched.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DraftError {
    /// A draft handle was required but a plain value was passed.
    #[error("expected a draft, got: {0}")]
    NotADraft(String),
    /// Only objects (with a draftable prototype) and arrays can be drafted.
    #[error("value cannot be drafted: {0}")]
    NotDraftable(String),
    /// Property definitions cannot be captured by a draft.
    #[error("defineProperty is not supported on drafts (property {0:?})")]
    DefineProperty(String),
    /// Prototype identity is fixed for the lifetime of a draft.
    #[error("setPrototypeOf is not supported on drafts")]
    SetPrototype,
    /// Array drafts only support deleting indices.
    #[error("only array indices can be deleted from an array draft, got {0:?}")]
    ArrayDelete(String),
    /// Array drafts only support writing indices and `length`.
    #[error("only array indices and 'length' can be set on an array draft, got {0:?}")]
    ArraySet(String),
    /// `length` must be a non-negative integer that fits in 32 bits.
    #[error("invalid array length: {0}")]
    InvalidArrayLength(String),
    /// A write would grow an array draft past
    /// [`DraftConfig::max_array_len`](crate::DraftConfig::max_array_len).
    #[error("array length {0} exceeds the limit of {1}")]
    ArrayTooLarge(usize, usize),
    /// An array operation was invoked on an object draft.
    #[error("array operation {0:?} called on an object draft")]
    NotAnArray(String),
    /// The session that owned this draft has finished.
    #[error("cannot use a draft after its session has finished (revoked)")]
    Revoked,
    /// A draft was reached again while it was being finalized.
    #[error("draft contains a reference to itself")]
    CircularDraft,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, DraftError>;
