//! The target resource side of a rotation.
//!
//! [`TargetResource`] applies a credential to the live resource (a database
//! instance's master credential, for example). [`MemoryTarget`] keeps the
//! live credential per resource in memory and records every change it
//! accepts, without the credential itself.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::RwLock;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::{TargetError, TargetResult};
use crate::types::Credential;

/// A live resource whose credential can be changed.
pub trait TargetResource: Send + Sync {
    /// Sets the credential of `resource`.
    ///
    /// With `immediate` set the change takes effect before the call returns;
    /// otherwise it is deferred to the resource's next maintenance point.
    ///
    /// # Errors
    ///
    /// Returns an error if the resource is unknown, unreachable, or refuses
    /// the credential.
    fn apply<'a>(
        &'a self,
        resource: &'a str,
        credential: &'a Credential,
        immediate: bool,
    ) -> Pin<Box<dyn Future<Output = TargetResult<()>> + Send + 'a>>;
}

/// A credential change accepted by [`MemoryTarget`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedChange {
    /// The resource that was changed.
    pub resource: String,
    /// Whether the change was applied immediately.
    pub immediate: bool,
    /// When the change was accepted.
    pub applied_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct State {
    live: HashMap<String, Credential>,
    deferred: HashMap<String, Credential>,
    history: Vec<AppliedChange>,
}

/// An in-memory [`TargetResource`].
///
/// By default any resource identifier is accepted and created on first use.
/// In strict mode only resources registered with
/// [`with_resource`](Self::with_resource) or
/// [`with_credentials`](Self::with_credentials) are accepted.
#[derive(Default)]
pub struct MemoryTarget {
    state: RwLock<State>,
    strict: bool,
    fault: RwLock<Option<TargetError>>,
    delay: RwLock<Option<Duration>>,
    calls: RwLock<usize>,
}

impl MemoryTarget {
    /// Creates an empty, permissive target.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a strict target seeded with live credentials.
    #[must_use]
    pub fn with_credentials(credentials: impl IntoIterator<Item = (String, Credential)>) -> Self {
        let target = Self {
            strict: true,
            ..Self::default()
        };
        {
            let mut state = target
                .state
                .write()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            state.live.extend(credentials);
        }
        target
    }

    /// Registers a resource and makes the target strict.
    #[must_use]
    pub fn with_resource(mut self, resource: impl Into<String>, credential: Credential) -> Self {
        self.strict = true;
        {
            let mut state = self
                .state
                .write()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            state.live.insert(resource.into(), credential);
        }
        self
    }

    /// Returns the credential currently in effect on `resource`.
    #[must_use]
    pub fn live_credential(&self, resource: &str) -> Option<Credential> {
        self.state
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .live
            .get(resource)
            .cloned()
    }

    /// Returns the credential waiting for the next maintenance point.
    #[must_use]
    pub fn deferred_credential(&self, resource: &str) -> Option<Credential> {
        self.state
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .deferred
            .get(resource)
            .cloned()
    }

    /// Returns true if `resource` currently accepts `credential`.
    #[must_use]
    pub fn accepts(&self, resource: &str, credential: &Credential) -> bool {
        self.live_credential(resource)
            .is_some_and(|live| &live == credential)
    }

    /// Returns all live credentials.
    #[must_use]
    pub fn credentials(&self) -> HashMap<String, Credential> {
        self.state
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .live
            .clone()
    }

    /// Returns every accepted change, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<AppliedChange> {
        self.state
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .history
            .clone()
    }

    /// Returns how many times [`TargetResource::apply`] has been called.
    #[must_use]
    pub fn calls(&self) -> usize {
        *self
            .calls
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Makes every apply fail with `error` until cleared.
    pub fn fail(&self, error: TargetError) {
        *self
            .fault
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(error);
    }

    /// Makes every apply wait for `delay` first.
    pub fn delay(&self, delay: Duration) {
        *self
            .delay
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(delay);
    }

    /// Removes the injected fault and delay.
    pub fn clear_faults(&self) {
        *self
            .fault
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = None;
        *self
            .delay
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = None;
    }

    fn apply_now(&self, resource: &str, credential: &Credential, immediate: bool) -> TargetResult<()> {
        if let Some(error) = self
            .fault
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
        {
            return Err(error);
        }

        if credential.is_empty() {
            return Err(TargetError::Rejected {
                reason: "credential cannot be empty".to_string(),
            });
        }

        let mut state = self
            .state
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        if self.strict && !state.live.contains_key(resource) {
            return Err(TargetError::UnknownResource {
                resource: resource.to_string(),
            });
        }

        if immediate {
            state.deferred.remove(resource);
            state.live.insert(resource.to_string(), credential.clone());
        } else {
            state.deferred.insert(resource.to_string(), credential.clone());
        }
        state.history.push(AppliedChange {
            resource: resource.to_string(),
            immediate,
            applied_at: Utc::now(),
        });

        Ok(())
    }
}

impl TargetResource for MemoryTarget {
    fn apply<'a>(
        &'a self,
        resource: &'a str,
        credential: &'a Credential,
        immediate: bool,
    ) -> Pin<Box<dyn Future<Output = TargetResult<()>> + Send + 'a>> {
        Box::pin(async move {
            {
                let mut calls = self
                    .calls
                    .write()
                    .unwrap_or_else(std::sync::PoisonError::into_inner);
                *calls += 1;
            }

            let delay = *self
                .delay
                .read()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            self.apply_now(resource, credential, immediate)
        })
    }
}

impl std::fmt::Debug for MemoryTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let resources = self
            .state
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .live
            .len();
        f.debug_struct("MemoryTarget")
            .field("resources_count", &resources)
            .field("strict", &self.strict)
            .finish_non_exhaustive()
    }
}
