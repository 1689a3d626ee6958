// SPDX-License-Identifier: MIT OR Apache-2.0

//! Coordinator-level errors.

use coursekit_access::DenyReason;
use coursekit_core::keys::KeyError;
use coursekit_store::StoreError;
use thiserror::Error;

/// Everything a coordinator operation can fail with.
///
/// The host maps these onto its protocol: key errors and invalid
/// submissions are the caller's fault, denials carry their reason code,
/// `TryAgain` asks the caller to retry a conflicted write, and
/// `StoreUnavailable` is an opaque retryable infrastructure failure.
#[derive(Error, Debug, PartialEq)]
pub enum CoordinatorError {
    #[error(transparent)]
    Key(#[from] KeyError),

    #[error("access denied: {0}")]
    Denied(DenyReason),

    #[error("invalid submission: {0}")]
    InvalidSubmission(String),

    /// Published content that cannot be worked with, e.g. a problem
    /// definition that does not deserialize. Logged with full context.
    #[error("invalid content: {0}")]
    Content(String),

    /// An optimistic write lost its race more times than the retry budget
    /// allows.
    #[error("write conflict, try again")]
    TryAgain,

    /// Store I/O failure or request deadline exceeded.
    #[error("store unavailable")]
    StoreUnavailable,
}

impl CoordinatorError {
    pub fn deny_reason(&self) -> Option<&DenyReason> {
        match self {
            CoordinatorError::Denied(reason) => Some(reason),
            _ => None,
        }
    }
}

impl From<StoreError> for CoordinatorError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => CoordinatorError::Denied(DenyReason::NotFound),
            StoreError::Unavailable(_) => CoordinatorError::StoreUnavailable,
            StoreError::Conflict => CoordinatorError::TryAgain,
        }
    }
}

/// Convert a store's associated error through [`StoreError`].
pub(crate) fn store_error<E: Into<StoreError>>(err: E) -> CoordinatorError {
    err.into().into()
}
