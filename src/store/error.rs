//! Store failure taxonomy.
//!
//! Every DAO operation surfaces one of three kinds: `Unavailable` is
//! retryable with backoff, the other two are fatal for the row being
//! processed.

use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(#[source] sqlx::Error),
    #[error("store conflict: {0}")]
    Conflict(#[source] sqlx::Error),
    #[error("store constraint violated: {0}")]
    ConstraintViolated(#[source] sqlx::Error),
}

pub(crate) type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    #[must_use]
    pub(crate) fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::Database(db) => {
                let code = db.code().map(|c| c.into_owned()).unwrap_or_default();
                if code == "23505" {
                    StoreError::Conflict(error)
                } else if code.starts_with("23") {
                    StoreError::ConstraintViolated(error)
                } else {
                    StoreError::Unavailable(error)
                }
            }
            sqlx::Error::RowNotFound => StoreError::ConstraintViolated(error),
            _ => StoreError::Unavailable(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_errors_are_retryable() {
        let error = StoreError::from(sqlx::Error::PoolTimedOut);
        assert!(error.is_retryable());
    }

    #[test]
    fn row_not_found_is_fatal() {
        let error = StoreError::from(sqlx::Error::RowNotFound);
        assert!(!error.is_retryable());
        assert!(matches!(error, StoreError::ConstraintViolated(_)));
    }
}
