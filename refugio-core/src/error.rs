use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("invalid date range: {0}")]
    InvalidDates(String),

    /// Business outcome, not a fault: the requested range conflicts with an
    /// existing reservation or live hold.
    #[error("dates unavailable")]
    Unavailable,

    /// Normal, non-retryable for this id: the hold expired or was already
    /// confirmed by a concurrent caller.
    #[error("hold not found: {0}")]
    HoldNotFound(Uuid),

    #[error("cabin not found: {0}")]
    CabinNotFound(Uuid),

    #[error("another booking attempt is in progress for this cabin")]
    LockContention,

    #[error("storage error: {0}")]
    Storage(String),
}

impl BookingError {
    pub fn storage(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        BookingError::Storage(err.to_string())
    }
}
