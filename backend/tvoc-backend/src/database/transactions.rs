use crate::error::{BoxDynError, TvocError};

/// Classification of errors raised inside a database transaction.
///
/// Temporary errors cause the transaction to be retried (by calling the
/// transaction closure again), permanent errors abort it immediately.
pub enum TransactionError {
    /// The transaction was unable to complete, but should be retried.
    Temporary(BoxDynError),
    /// The transaction was unable to complete and should not be retried.
    Permanent(BoxDynError),
    /// A database error.
    /// Serialisation failures are treated as temporary, everything else as permanent.
    Diesel(diesel::result::Error),
}

impl From<BoxDynError> for TransactionError {
    fn from(value: BoxDynError) -> Self {
        Self::Permanent(value)
    }
}

impl From<diesel::result::Error> for TransactionError {
    fn from(value: diesel::result::Error) -> Self {
        Self::Diesel(value)
    }
}

impl From<TvocError> for TransactionError {
    fn from(value: TvocError) -> Self {
        Self::Permanent(Box::new(value))
    }
}

/// An error type that indicates a permanent transaction failure.
pub trait PermanentTransactionError {
    /// Construct the error instance representing "too many temporary errors".
    /// The `limit` is the error limit that was reached.
    fn too_many_temporary_errors(limit: u64) -> Self;

    /// Construct the error instance representing a general permanent error.
    fn permanent_error(source: BoxDynError) -> Self;
}

impl PermanentTransactionError for TvocError {
    fn too_many_temporary_errors(limit: u64) -> Self {
        Self::DatabaseTransactionRetryLimitReached { limit }
    }

    fn permanent_error(source: BoxDynError) -> Self {
        // Errors of our own type travel through the transaction machinery
        // unchanged, so user errors keep their status code.
        match source.downcast::<TvocError>() {
            Ok(error) => *error,
            Err(source) => Self::PermanentDatabaseTransactionError { source },
        }
    }
}
