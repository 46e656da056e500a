//! Ephemeral in-memory stores: signed share records and feedback tallies.
//!
//! Nothing here survives a restart. Every read that checks a record and
//! every delete that follows a failed check happen under the same lock.

mod feedback;
mod secure;

pub use feedback::FeedbackStore;
pub use secure::{SecureStore, ShareId, ShareRecord};

use stillwater_common::StillwaterError;
use thiserror::Error;

/// Store-level failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("{0}")]
    Validation(String),

    #[error("Invalid share id")]
    MalformedId,

    #[error("Share not found")]
    NotFound,

    #[error("Share has expired")]
    Expired,

    #[error("Share failed its integrity check")]
    Tampered,

    #[error("Failed to encode share: {0}")]
    Encoding(String),
}

impl From<StoreError> for StillwaterError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Validation(msg) => StillwaterError::Validation(msg),
            StoreError::MalformedId => StillwaterError::Validation(err.to_string()),
            StoreError::NotFound => StillwaterError::NotFound,
            StoreError::Expired => StillwaterError::Expired,
            StoreError::Tampered => StillwaterError::Tampered,
            StoreError::Encoding(msg) => StillwaterError::Internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_map_to_statuses() {
        let cases = [
            (StoreError::Validation("Question is required".into()), 400),
            (StoreError::MalformedId, 400),
            (StoreError::NotFound, 404),
            (StoreError::Expired, 404),
            (StoreError::Tampered, 400),
            (StoreError::Encoding("x".into()), 500),
        ];
        for (err, status) in cases {
            assert_eq!(StillwaterError::from(err).status_code(), status);
        }
    }
}
