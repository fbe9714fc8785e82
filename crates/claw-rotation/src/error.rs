//! Error types for credential rotation.
//!
//! [`Error`] is the coordinator's failure taxonomy. Each variant maps to one
//! [`ErrorKind`], which is what callers branch on for retry and alerting
//! decisions. [`StoreError`] and [`TargetError`] are returned by the two
//! collaborators and are folded into [`Error`] by the coordinator.
//!
//! None of these types carry credential material.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that terminate a rotation.
#[derive(Debug, Error)]
pub enum Error {
    /// The request was missing a required field.
    #[error("invalid rotation request: {reason}")]
    Validation {
        /// The reason the request was rejected.
        reason: String,
    },

    /// The secret record could not be read, or is unusable as read.
    #[error("failed to retrieve secret {secret_id}: {reason}")]
    Retrieval {
        /// The secret being rotated.
        secret_id: String,
        /// The reason retrieval failed.
        reason: String,
    },

    /// The configured credential length is outside the supported range.
    #[error("invalid credential length {length}: must be between {minimum} and {maximum}")]
    InvalidLength {
        /// The requested length.
        length: usize,
        /// The smallest supported length.
        minimum: usize,
        /// The largest supported length.
        maximum: usize,
    },

    /// The new credential could not be staged before touching the target.
    #[error("failed to stage pending credential for {secret_id}: {reason}")]
    Staging {
        /// The secret being rotated.
        secret_id: String,
        /// The reason staging failed.
        reason: String,
    },

    /// The target resource rejected or did not acknowledge the new credential.
    #[error("failed to update target resource {resource}: {reason}")]
    TargetUpdate {
        /// The resource identifier taken from the secret record.
        resource: String,
        /// The reason the update failed.
        reason: String,
    },

    /// The request token was committed earlier but a later rotation has
    /// since replaced its credential.
    #[error("request token {request_token} for secret {secret_id} was superseded by a later rotation")]
    Superseded {
        /// The secret being rotated.
        secret_id: String,
        /// The stale token.
        request_token: String,
    },

    /// The target accepted the new credential but the store was not updated.
    #[error(
        "target resource {resource} now uses the new credential but secret {secret_id} \
         still advertises the previous one: {reason}"
    )]
    StoreUpdate {
        /// The secret being rotated.
        secret_id: String,
        /// The resource that already carries the new credential.
        resource: String,
        /// The reason the commit failed.
        reason: String,
    },
}

impl Error {
    /// Returns the kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Retrieval { .. } => ErrorKind::Retrieval,
            Self::InvalidLength { .. } => ErrorKind::InvalidLength,
            Self::Staging { .. } => ErrorKind::Staging,
            Self::Superseded { .. } => ErrorKind::Superseded,
            Self::TargetUpdate { .. } => ErrorKind::TargetUpdate,
            Self::StoreUpdate { .. } => ErrorKind::StoreUpdate,
        }
    }

    /// Returns the target resource involved, when the failure got that far.
    #[must_use]
    pub fn resource(&self) -> Option<&str> {
        match self {
            Self::TargetUpdate { resource, .. } | Self::StoreUpdate { resource, .. } => {
                Some(resource)
            }
            _ => None,
        }
    }
}

/// Result type alias for rotation operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Discriminant of a rotation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Bad input; no side effects.
    #[serde(rename = "ValidationError")]
    Validation,
    /// Store unreachable or record missing; no side effects.
    #[serde(rename = "RetrievalError")]
    Retrieval,
    /// Misconfigured credential length.
    #[serde(rename = "InvalidLengthError")]
    InvalidLength,
    /// Pending credential could not be staged; no side effects on the target.
    #[serde(rename = "StagingError")]
    Staging,
    /// The token's rotation was already replaced by a newer one; no side effects.
    #[serde(rename = "SupersededError")]
    Superseded,
    /// Target write failed; target and store are still consistent.
    #[serde(rename = "TargetUpdateError")]
    TargetUpdate,
    /// Store write failed after the target write succeeded.
    #[serde(rename = "StoreUpdateError")]
    StoreUpdate,
}

impl ErrorKind {
    /// Returns the wire name of this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "ValidationError",
            Self::Retrieval => "RetrievalError",
            Self::InvalidLength => "InvalidLengthError",
            Self::Staging => "StagingError",
            Self::Superseded => "SupersededError",
            Self::TargetUpdate => "TargetUpdateError",
            Self::StoreUpdate => "StoreUpdateError",
        }
    }

    /// Whether re-invoking the rotation with the same request is safe.
    ///
    /// Validation, length and superseded errors fail the same way again,
    /// and a store update failure needs reconciliation first.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Retrieval | Self::Staging | Self::TargetUpdate)
    }

    /// Whether the target and the store may now disagree.
    #[must_use]
    pub const fn requires_reconciliation(self) -> bool {
        matches!(self, Self::StoreUpdate)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors building a [`CharacterPolicy`](crate::generator::CharacterPolicy).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    /// The symbol class has no characters.
    #[error("symbol class cannot be empty")]
    EmptySymbols,

    /// The symbol class contains something other than ASCII punctuation.
    #[error("symbol class may only contain ASCII punctuation, found {found:?}")]
    NotPunctuation {
        /// The offending character.
        found: char,
    },
}

/// Errors returned by a [`CredentialStore`](crate::store::CredentialStore).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No secret with this identifier exists.
    #[error("secret not found: {secret_id}")]
    NotFound {
        /// The missing secret.
        secret_id: String,
    },

    /// The store could not be reached.
    #[error("secret store unavailable: {reason}")]
    Unavailable {
        /// Why the store is unavailable.
        reason: String,
    },

    /// The request token was already used with a different credential.
    #[error("request token {request_token} already used with a different credential")]
    TokenConflict {
        /// The conflicting token.
        request_token: String,
    },

    /// The token was committed, but a later commit replaced its credential.
    #[error("request token {request_token} was superseded by a later commit")]
    Superseded {
        /// The stale token.
        request_token: String,
    },

    /// The store refused the operation.
    #[error("secret store rejected the request: {reason}")]
    Rejected {
        /// Why the request was rejected.
        reason: String,
    },
}

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors returned by a [`TargetResource`](crate::target::TargetResource).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TargetError {
    /// No resource with this identifier exists.
    #[error("unknown resource: {resource}")]
    UnknownResource {
        /// The missing resource.
        resource: String,
    },

    /// The resource could not be reached.
    #[error("target resource unavailable: {reason}")]
    Unavailable {
        /// Why the resource is unavailable.
        reason: String,
    },

    /// The resource refused the new credential.
    #[error("target resource rejected the credential: {reason}")]
    Rejected {
        /// Why the credential was rejected.
        reason: String,
    },
}

/// Result type alias for target operations.
pub type TargetResult<T> = std::result::Result<T, TargetError>;
