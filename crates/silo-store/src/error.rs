/// Errors from the storage engine.
///
/// Every public operation is total: expected negative outcomes (missing,
/// expired, mismatched input) come back as values of this enum, never as
/// panics, so batch callers can proceed key-by-key.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Unsupported value type, malformed match spec, or an `append` across
    /// categories.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The key has no readable record.
    #[error("key not found: {0}")]
    NotFound(String),

    /// The key's record existed but its expiry deadline has passed. A
    /// distinguished flavor of not-found; the record is already gone.
    #[error("key expired: {0}")]
    Expired(String),

    /// A raw binary payload reached the configured size cap.
    #[error("binary payload too large: {0} bytes")]
    LimitExceeded(u64),

    /// A write, lock, or permission failure underneath.
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// `true` for both plain not-found and the expired flavor of it.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Expired(_))
    }
}

/// Result alias for engine operations.
pub type StoreResult<T> = Result<T, StoreError>;
