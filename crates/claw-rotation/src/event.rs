//! Event payload in, structured response out.
//!
//! The host environment delivers a rotation as a JSON event:
//!
//! ```json
//! {"SecretId": "db-1", "ClientRequestToken": "tok-A"}
//! ```
//!
//! `secretId` and `requestToken` are accepted as aliases. A payload that is
//! not JSON, or lacks either field, produces a `ValidationError` response
//! without touching a collaborator. Either way the rejection is journaled.

use serde::{Deserialize, Serialize};

use crate::coordinator::RotationCoordinator;
use crate::error::{Error, ErrorKind};
use crate::store::CredentialStore;
use crate::target::TargetResource;
use crate::types::{RotationRequest, RotationResult, RotationStatus};

/// A rotation event as delivered by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationEvent {
    /// Identifier of the secret to rotate.
    #[serde(rename = "SecretId", alias = "secretId", default)]
    pub secret_id: Option<String>,
    /// Request token of this attempt.
    #[serde(rename = "ClientRequestToken", alias = "requestToken", default)]
    pub request_token: Option<String>,
}

impl RotationEvent {
    /// Parses an event payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the payload is not a JSON object.
    pub fn from_json(payload: &str) -> Result<Self, Error> {
        serde_json::from_str(payload).map_err(|e| Error::Validation {
            reason: format!("malformed event payload: {e}"),
        })
    }

    /// Converts the event into a request. Missing fields become empty and
    /// are rejected by [`RotationRequest::validate`].
    #[must_use]
    pub fn into_request(self) -> RotationRequest {
        RotationRequest::new(
            self.secret_id.unwrap_or_default(),
            self.request_token.unwrap_or_default(),
        )
    }
}

/// The structured response returned to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RotationResponse {
    /// 200 on success, 400 for validation failures, 500 otherwise.
    pub status_code: u16,
    /// Human-readable message.
    pub body: String,
    /// The failure kind, absent on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl RotationResponse {
    /// Returns true if the response reports success.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.error_kind.is_none()
    }

    /// Serializes the response.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl From<&RotationResult> for RotationResponse {
    fn from(result: &RotationResult) -> Self {
        let (status_code, error_kind) = match result.status {
            RotationStatus::Success => (200, None),
            RotationStatus::Failed(ErrorKind::Validation) => (400, Some(ErrorKind::Validation)),
            RotationStatus::Failed(kind) => (500, Some(kind)),
        };
        Self {
            status_code,
            body: result.detail.clone(),
            error_kind,
        }
    }
}

/// Handles one event payload end to end.
pub async fn handle_event<S, T>(coordinator: &RotationCoordinator<S, T>, payload: &str) -> RotationResponse
where
    S: CredentialStore,
    T: TargetResource,
{
    let result = match RotationEvent::from_json(payload) {
        Ok(event) => coordinator.rotate(&event.into_request()).await,
        Err(err) => coordinator.reject(&RotationRequest::new("", ""), &err),
    };
    RotationResponse::from(&result)
}
