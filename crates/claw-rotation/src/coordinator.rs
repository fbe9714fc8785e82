//! The rotation state machine.
//!
//! A rotation runs these steps in order and stops at the first failure:
//!
//! 1. validate the request
//! 2. fetch the secret record
//! 3. look up the token: reuse the credential staged for it, or generate
//!    and stage one
//! 4. apply the credential to the target resource
//! 5. commit the record with the new credential to the store
//!
//! A token that was already committed, and is still current, succeeds at
//! step 3 without touching the target. A token whose rotation a later one
//! replaced fails at step 3 as [`ErrorKind::Superseded`], so a late replay
//! never rolls the target back.
//!
//! Steps 1-4 leave the store's advertised credential unchanged, so a
//! failure there can be retried with the same request. A failure in step 5
//! leaves the target on the new credential while the store still advertises
//! the old one. That case is reported as [`ErrorKind::StoreUpdate`], logged
//! at error level and journaled for reconciliation.
//!
//! Nothing is retried here; the caller re-invokes with the same token.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{Instrument, Span, debug, error, info, info_span, warn};

use crate::config::{ConfigError, RotationConfig};
use crate::error::{Error, ErrorKind, Result};
use crate::generator::PasswordGenerator;
use crate::journal::{JournalEntry, RotationJournal};
use crate::store::{CredentialStore, TokenStatus};
use crate::target::TargetResource;
use crate::types::{Credential, RotationOutcome, RotationRequest, RotationResult};

/// Runs `future` with an upper bound, flattening both failure modes into a
/// message.
async fn bounded<T, E, F>(limit: Duration, future: F) -> std::result::Result<T, String>
where
    F: Future<Output = std::result::Result<T, E>>,
    E: Display,
{
    match tokio::time::timeout(limit, future).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err(format!("timed out after {}ms", limit.as_millis())),
    }
}

/// Coordinates one credential rotation across a store and a target.
pub struct RotationCoordinator<S, T> {
    store: S,
    target: T,
    generator: PasswordGenerator,
    config: RotationConfig,
    journal: Arc<RotationJournal>,
    span: Span,
}

impl<S, T> RotationCoordinator<S, T>
where
    S: CredentialStore,
    T: TargetResource,
{
    /// Creates a coordinator.
    ///
    /// The configured length is checked on every rotation rather than here,
    /// so a bad length surfaces as an `InvalidLengthError` result.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured symbol class is unusable.
    pub fn new(store: S, target: T, config: RotationConfig) -> std::result::Result<Self, ConfigError> {
        let generator = PasswordGenerator::with_policy(config.character_policy()?);
        Ok(Self {
            store,
            target,
            generator,
            config,
            journal: Arc::new(RotationJournal::new()),
            span: info_span!("credential_rotation"),
        })
    }

    /// Emits all events under `span` instead of the default span.
    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Records attempts in a shared journal.
    #[must_use]
    pub fn with_journal(mut self, journal: Arc<RotationJournal>) -> Self {
        self.journal = journal;
        self
    }

    /// Returns the credential store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Returns the target resource.
    #[must_use]
    pub const fn target(&self) -> &T {
        &self.target
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &RotationConfig {
        &self.config
    }

    /// Returns the journal.
    #[must_use]
    pub fn journal(&self) -> &Arc<RotationJournal> {
        &self.journal
    }

    /// Rotates the credential named by `request` and reports the outcome.
    ///
    /// Never panics on bad input; every failure is a [`RotationResult`] with
    /// the matching [`ErrorKind`].
    pub async fn rotate(&self, request: &RotationRequest) -> RotationResult {
        let span = info_span!(
            parent: &self.span,
            "rotate",
            secret_id = %request.secret_id,
            request_token = %request.request_token
        );

        let outcome = self.try_rotate(request).instrument(span.clone()).await;

        span.in_scope(|| {
            let (result, resource) = match outcome {
                Ok(outcome) => {
                    info!(
                        resource = %outcome.resource,
                        version = outcome.version,
                        replayed = outcome.replayed,
                        "secret rotated"
                    );
                    (RotationResult::success(), Some(outcome.resource))
                }
                Err(err) => {
                    report(&err);
                    (RotationResult::failed(&err), err.resource().map(str::to_string))
                }
            };

            self.journal
                .record(JournalEntry::new(request, resource, &result));
            result
        })
    }

    /// Reports and journals a request rejected before it could be rotated,
    /// such as an event payload that did not parse.
    pub fn reject(&self, request: &RotationRequest, err: &Error) -> RotationResult {
        let span = info_span!(
            parent: &self.span,
            "rotate",
            secret_id = %request.secret_id,
            request_token = %request.request_token
        );
        span.in_scope(|| {
            report(err);
            let result = RotationResult::failed(err);
            self.journal
                .record(JournalEntry::new(request, err.resource().map(str::to_string), &result));
            result
        })
    }

    /// Rotates the credential named by `request`.
    ///
    /// Does not log the failure or write the journal; [`rotate`](Self::rotate)
    /// does both.
    ///
    /// # Errors
    ///
    /// Returns the error of the first step that failed.
    pub async fn try_rotate(&self, request: &RotationRequest) -> Result<RotationOutcome> {
        request.validate()?;
        let secret_id = request.secret_id.as_str();
        let request_token = request.request_token.as_str();
        let timeouts = self.config.timeouts;

        let record = bounded(timeouts.fetch(), self.store.fetch(secret_id))
            .await
            .map_err(|reason| Error::Retrieval {
                secret_id: secret_id.to_string(),
                reason,
            })?;

        let attribute = self.config.resource_attribute.as_str();
        let resource = record
            .attribute(attribute)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| Error::Retrieval {
                secret_id: secret_id.to_string(),
                reason: format!("record has no '{attribute}' attribute"),
            })?
            .to_string();
        debug!(%resource, "fetched secret record");

        let status = bounded(
            timeouts.fetch(),
            self.store.token_status(secret_id, request_token),
        )
        .await
        .map_err(|reason| Error::Retrieval {
            secret_id: secret_id.to_string(),
            reason,
        })?;

        let (credential, reused_pending) = match status {
            TokenStatus::Current { version } => {
                debug!(version, "token already committed");
                return Ok(RotationOutcome {
                    resource,
                    version,
                    replayed: true,
                    reused_pending: true,
                });
            }
            TokenStatus::Superseded => {
                return Err(Error::Superseded {
                    secret_id: secret_id.to_string(),
                    request_token: request_token.to_string(),
                });
            }
            TokenStatus::Staged(credential) => {
                debug!("reusing credential staged by an earlier attempt");
                (credential, true)
            }
            TokenStatus::Unused => (self.stage_new_credential(secret_id, request_token).await?, false),
        };

        bounded(
            timeouts.apply(),
            self.target.apply(&resource, &credential, true),
        )
        .await
        .map_err(|reason| Error::TargetUpdate {
            resource: resource.clone(),
            reason,
        })?;
        info!(%resource, "target resource accepted new credential");

        let updated = record.with_credential(credential);
        let receipt = bounded(
            timeouts.commit(),
            self.store.commit(secret_id, request_token, &updated),
        )
        .await
        .map_err(|reason| Error::StoreUpdate {
            secret_id: secret_id.to_string(),
            resource: resource.clone(),
            reason,
        })?;

        Ok(RotationOutcome {
            resource,
            version: receipt.version,
            replayed: receipt.replayed,
            reused_pending,
        })
    }

    /// Generates a credential and stages it under the token.
    async fn stage_new_credential(&self, secret_id: &str, request_token: &str) -> Result<Credential> {
        let credential = self
            .generator
            .generate(self.config.password_length)?
            .into_credential();

        bounded(
            self.config.timeouts.commit(),
            self.store.stage(secret_id, request_token, &credential),
        )
        .await
        .map_err(|reason| Error::Staging {
            secret_id: secret_id.to_string(),
            reason,
        })?;
        debug!(length = credential.len(), "staged new credential");

        Ok(credential)
    }
}

/// Logs a failed rotation at the level its kind calls for.
fn report(err: &Error) {
    let kind = err.kind();
    match kind {
        ErrorKind::StoreUpdate => error!(
            error_kind = %kind,
            requires_reconciliation = true,
            "rotation left target and store inconsistent: {err}"
        ),
        ErrorKind::InvalidLength => error!(error_kind = %kind, "rotation misconfigured: {err}"),
        ErrorKind::Validation | ErrorKind::Superseded => {
            warn!(error_kind = %kind, "rotation request rejected: {err}");
        }
        ErrorKind::Retrieval | ErrorKind::Staging | ErrorKind::TargetUpdate => warn!(
            error_kind = %kind,
            retryable = kind.is_retryable(),
            "rotation failed: {err}"
        ),
    }
}

impl<S, T> std::fmt::Debug for RotationCoordinator<S, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RotationCoordinator")
            .field("config", &self.config)
            .field("journal", &self.journal)
            .finish_non_exhaustive()
    }
}
