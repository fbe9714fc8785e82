//! Core types for credential rotation.
//!
//! - [`RotationRequest`]: the secret to rotate and the caller's request token
//! - [`Credential`]: credential text that zeroizes on drop and never prints
//! - [`GeneratedCredential`]: a freshly generated credential and its length
//! - [`SecretRecord`]: the store's record for one secret
//! - [`RotationResult`]: the terminal outcome of one request

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{Error, ErrorKind, Result};

/// A request to rotate one secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationRequest {
    /// Identifier of the secret in the store.
    pub secret_id: String,
    /// Caller-supplied token that deduplicates retried attempts.
    pub request_token: String,
}

impl RotationRequest {
    /// Creates a new request. Call [`validate`](Self::validate) before use.
    #[must_use]
    pub fn new(secret_id: impl Into<String>, request_token: impl Into<String>) -> Self {
        Self {
            secret_id: secret_id.into(),
            request_token: request_token.into(),
        }
    }

    /// Checks that both fields are present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if either field is empty or whitespace.
    pub fn validate(&self) -> Result<()> {
        if self.secret_id.trim().is_empty() {
            return Err(Error::Validation {
                reason: "secret id is required".to_string(),
            });
        }

        if self.request_token.trim().is_empty() {
            return Err(Error::Validation {
                reason: "request token is required".to_string(),
            });
        }

        Ok(())
    }
}

/// Credential text.
///
/// The contents are cleared from memory on drop, never appear in `Debug`
/// output, and are compared in constant time.
#[derive(Clone, Zeroize, ZeroizeOnDrop, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential {
    value: String,
}

impl Credential {
    /// Wraps credential text.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    /// Returns the credential text.
    ///
    /// Only collaborators that must transmit the credential should call this.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.value
    }

    /// Returns the number of characters in the credential.
    #[must_use]
    pub fn len(&self) -> usize {
        self.value.chars().count()
    }

    /// Returns true if the credential is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("len", &self.len())
            .field("value", &"[REDACTED]")
            .finish()
    }
}

impl PartialEq for Credential {
    fn eq(&self, other: &Self) -> bool {
        use subtle::ConstantTimeEq;
        self.value.as_bytes().ct_eq(other.value.as_bytes()).into()
    }
}

impl Eq for Credential {}

/// A credential produced by the [`PasswordGenerator`](crate::generator::PasswordGenerator).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedCredential {
    value: Credential,
    length: usize,
}

impl GeneratedCredential {
    pub(crate) fn new(value: Credential) -> Self {
        let length = value.len();
        Self { value, length }
    }

    /// Returns the generated credential.
    #[must_use]
    pub const fn value(&self) -> &Credential {
        &self.value
    }

    /// Returns the number of characters generated.
    #[must_use]
    pub const fn length(&self) -> usize {
        self.length
    }

    /// Consumes the wrapper and returns the credential.
    #[must_use]
    pub fn into_credential(self) -> Credential {
        self.value
    }
}

/// The store's record for one secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretRecord {
    /// Identifier of the secret.
    pub id: String,
    /// Opaque fields such as the resource identifier and username.
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    /// The credential the store currently advertises.
    pub credential: Credential,
}

impl SecretRecord {
    /// Creates a record with no attributes.
    #[must_use]
    pub fn new(id: impl Into<String>, credential: Credential) -> Self {
        Self {
            id: id.into(),
            attributes: BTreeMap::new(),
            credential,
        }
    }

    /// Adds an attribute.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Returns an attribute value.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Returns a copy of this record carrying a different credential.
    #[must_use]
    pub fn with_credential(&self, credential: Credential) -> Self {
        Self {
            id: self.id.clone(),
            attributes: self.attributes.clone(),
            credential,
        }
    }
}

/// Terminal status of a rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RotationStatus {
    /// Target and store both carry the new credential.
    Success,
    /// The rotation stopped with the given kind of failure.
    Failed(ErrorKind),
}

/// The outcome of one request, as reported to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationResult {
    /// Success or the failure kind.
    pub status: RotationStatus,
    /// Human-readable message. Never contains credential material.
    pub detail: String,
}

impl RotationResult {
    /// Message reported for a successful rotation.
    pub const SUCCESS_DETAIL: &'static str = "Secret rotated successfully";

    /// Creates a success result.
    #[must_use]
    pub fn success() -> Self {
        Self {
            status: RotationStatus::Success,
            detail: Self::SUCCESS_DETAIL.to_string(),
        }
    }

    /// Creates a failure result from a rotation error.
    #[must_use]
    pub fn failed(err: &Error) -> Self {
        Self {
            status: RotationStatus::Failed(err.kind()),
            detail: err.to_string(),
        }
    }

    /// Returns true if the rotation succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == RotationStatus::Success
    }

    /// Returns the failure kind, if any.
    #[must_use]
    pub const fn kind(&self) -> Option<ErrorKind> {
        match self.status {
            RotationStatus::Success => None,
            RotationStatus::Failed(kind) => Some(kind),
        }
    }
}

/// Details of a completed rotation, for callers of
/// [`RotationCoordinator::try_rotate`](crate::coordinator::RotationCoordinator::try_rotate).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationOutcome {
    /// The resource that received the new credential.
    pub resource: String,
    /// Store version after the commit.
    pub version: u64,
    /// The store had already committed this token with this credential.
    pub replayed: bool,
    /// The credential was taken from an earlier attempt with the same token.
    pub reused_pending: bool,
}
