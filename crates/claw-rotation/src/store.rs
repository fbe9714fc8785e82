//! The secret store side of a rotation.
//!
//! [`CredentialStore`] is the narrow interface the coordinator needs from the
//! system of record. [`MemoryCredentialStore`] implements it in memory with
//! the same token semantics a real store is expected to provide:
//!
//! - a commit for a `(secret id, request token)` pair that was already
//!   committed with the same credential is an idempotent replay
//! - a commit reusing a token with a different credential is a conflict
//! - a commit for a token whose credential a later commit replaced is
//!   refused as superseded
//! - a credential staged for a token stays retrievable until a commit for
//!   that secret succeeds, so a retried attempt applies the same credential
//!   instead of generating another
//!
//! Committed tokens are remembered by the version they produced, never by
//! credential.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::RwLock;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::types::{Credential, SecretRecord};

/// Acknowledgement of a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitReceipt {
    /// Version of the secret after the commit.
    pub version: u64,
    /// The token had already been committed with this credential.
    pub replayed: bool,
}

/// Where a request token stands for one secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenStatus {
    /// The token has not been seen.
    Unused,
    /// A credential was staged for the token but not committed.
    Staged(Credential),
    /// The token was committed and its credential is still current.
    Current {
        /// Version the commit produced.
        version: u64,
    },
    /// The token was committed, but a later commit replaced its credential.
    Superseded,
}

/// Access to the system of record for credentials.
pub trait CredentialStore: Send + Sync {
    /// Reads the current record for a secret.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unreachable or the secret is missing.
    fn fetch<'a>(
        &'a self,
        secret_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = StoreResult<SecretRecord>> + Send + 'a>>;

    /// Writes a record, scoped by a request token.
    ///
    /// Repeating a commit with the same token and credential must succeed
    /// without a second mutation.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails or the token conflicts.
    fn commit<'a>(
        &'a self,
        secret_id: &'a str,
        request_token: &'a str,
        record: &'a SecretRecord,
    ) -> Pin<Box<dyn Future<Output = StoreResult<CommitReceipt>> + Send + 'a>>;

    /// Reports whether a request token is unused, staged or committed.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unreachable or the secret is missing.
    fn token_status<'a>(
        &'a self,
        secret_id: &'a str,
        request_token: &'a str,
    ) -> Pin<Box<dyn Future<Output = StoreResult<TokenStatus>> + Send + 'a>>;

    /// Durably stages a credential for a request token.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails, the token was already committed,
    /// or a different credential is already staged for the token.
    fn stage<'a>(
        &'a self,
        secret_id: &'a str,
        request_token: &'a str,
        credential: &'a Credential,
    ) -> Pin<Box<dyn Future<Output = StoreResult<()>> + Send + 'a>>;
}

/// Store operations, used for fault injection and call accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    /// [`CredentialStore::fetch`].
    Fetch,
    /// [`CredentialStore::commit`].
    Commit,
    /// [`CredentialStore::token_status`].
    TokenStatus,
    /// [`CredentialStore::stage`].
    Stage,
}

/// A secret as held by [`MemoryCredentialStore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSecret {
    /// The current record.
    pub record: SecretRecord,
    /// Incremented on every non-replayed commit.
    pub version: u64,
    /// Tokens already committed, with the version each one produced.
    #[serde(default)]
    pub committed: HashMap<String, u64>,
}

impl StoredSecret {
    /// Wraps a record at version 1 with no committed tokens.
    #[must_use]
    pub fn new(record: SecretRecord) -> Self {
        Self {
            record,
            version: 1,
            committed: HashMap::new(),
        }
    }
}

/// A credential staged for a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedCredential {
    /// The secret being rotated.
    pub secret_id: String,
    /// The token of the attempt that staged it.
    pub request_token: String,
    /// The staged credential.
    pub credential: Credential,
}

/// Serializable contents of a [`MemoryCredentialStore`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    /// All secrets.
    #[serde(default)]
    pub secrets: Vec<StoredSecret>,
    /// Credentials staged and not yet committed.
    #[serde(default)]
    pub staged: Vec<StagedCredential>,
}

#[derive(Debug, Default)]
struct Faults {
    errors: HashMap<StoreOperation, StoreError>,
    delays: HashMap<StoreOperation, Duration>,
}

/// An in-memory [`CredentialStore`].
///
/// Faults and delays can be injected per operation to rehearse the failure
/// paths of a rotation.
#[derive(Default)]
pub struct MemoryCredentialStore {
    secrets: RwLock<HashMap<String, StoredSecret>>,
    staged: RwLock<HashMap<(String, String), Credential>>,
    faults: RwLock<Faults>,
    calls: RwLock<HashMap<StoreOperation, usize>>,
}

impl MemoryCredentialStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding the given records.
    #[must_use]
    pub fn with_records(records: impl IntoIterator<Item = SecretRecord>) -> Self {
        let store = Self::new();
        for record in records {
            store.insert(record);
        }
        store
    }

    /// Restores a store from a snapshot.
    #[must_use]
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let store = Self::new();
        {
            let mut secrets = store
                .secrets
                .write()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            for secret in snapshot.secrets {
                secrets.insert(secret.record.id.clone(), secret);
            }
        }
        {
            let mut staged = store
                .staged
                .write()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            for entry in snapshot.staged {
                staged.insert((entry.secret_id, entry.request_token), entry.credential);
            }
        }
        store
    }

    /// Captures the current contents, sorted by secret id.
    #[must_use]
    pub fn snapshot(&self) -> StoreSnapshot {
        let mut secrets: Vec<StoredSecret> = self
            .secrets
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        secrets.sort_by(|a, b| a.record.id.cmp(&b.record.id));

        let mut staged: Vec<StagedCredential> = self
            .staged
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .iter()
            .map(|((secret_id, request_token), credential)| StagedCredential {
                secret_id: secret_id.clone(),
                request_token: request_token.clone(),
                credential: credential.clone(),
            })
            .collect();
        staged.sort_by(|a, b| {
            (a.secret_id.as_str(), a.request_token.as_str())
                .cmp(&(b.secret_id.as_str(), b.request_token.as_str()))
        });

        StoreSnapshot { secrets, staged }
    }

    /// Inserts or replaces a record at version 1.
    pub fn insert(&self, record: SecretRecord) {
        let mut secrets = self
            .secrets
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        secrets.insert(record.id.clone(), StoredSecret::new(record));
    }

    /// Returns the current record for a secret.
    #[must_use]
    pub fn record(&self, secret_id: &str) -> Option<SecretRecord> {
        self.secrets
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(secret_id)
            .map(|s| s.record.clone())
    }

    /// Returns the current version of a secret.
    #[must_use]
    pub fn version(&self, secret_id: &str) -> Option<u64> {
        self.secrets
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(secret_id)
            .map(|s| s.version)
    }

    /// Returns the credential staged for a token.
    #[must_use]
    pub fn staged(&self, secret_id: &str, request_token: &str) -> Option<Credential> {
        self.staged
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(&(secret_id.to_string(), request_token.to_string()))
            .cloned()
    }

    /// Makes every call to `operation` fail with `error` until cleared.
    pub fn fail(&self, operation: StoreOperation, error: StoreError) {
        let mut faults = self
            .faults
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        faults.errors.insert(operation, error);
    }

    /// Makes every call to `operation` wait for `delay` before running.
    pub fn delay(&self, operation: StoreOperation, delay: Duration) {
        let mut faults = self
            .faults
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        faults.delays.insert(operation, delay);
    }

    /// Removes all injected faults and delays.
    pub fn clear_faults(&self) {
        let mut faults = self
            .faults
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        faults.errors.clear();
        faults.delays.clear();
    }

    /// Returns how many times `operation` has been called.
    #[must_use]
    pub fn calls(&self, operation: StoreOperation) -> usize {
        self.calls
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(&operation)
            .copied()
            .unwrap_or(0)
    }

    /// Returns the total number of calls across all operations.
    #[must_use]
    pub fn total_calls(&self) -> usize {
        self.calls
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .values()
            .sum()
    }

    /// Counts the call and applies any injected delay or fault.
    async fn enter(&self, operation: StoreOperation) -> StoreResult<()> {
        {
            let mut calls = self
                .calls
                .write()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            *calls.entry(operation).or_insert(0) += 1;
        }

        let (delay, error) = {
            let faults = self
                .faults
                .read()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            (
                faults.delays.get(&operation).copied(),
                faults.errors.get(&operation).cloned(),
            )
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        error.map_or(Ok(()), Err)
    }

    fn fetch_now(&self, secret_id: &str) -> StoreResult<SecretRecord> {
        self.record(secret_id).ok_or_else(|| StoreError::NotFound {
            secret_id: secret_id.to_string(),
        })
    }

    fn commit_now(
        &self,
        secret_id: &str,
        request_token: &str,
        record: &SecretRecord,
    ) -> StoreResult<CommitReceipt> {
        let mut secrets = self
            .secrets
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        let stored = secrets
            .get_mut(secret_id)
            .ok_or_else(|| StoreError::NotFound {
                secret_id: secret_id.to_string(),
            })?;

        if let Some(&version) = stored.committed.get(request_token) {
            if version != stored.version {
                return Err(StoreError::Superseded {
                    request_token: request_token.to_string(),
                });
            }
            if stored.record.credential == record.credential {
                return Ok(CommitReceipt {
                    version,
                    replayed: true,
                });
            }
            return Err(StoreError::TokenConflict {
                request_token: request_token.to_string(),
            });
        }

        stored.record = SecretRecord {
            id: secret_id.to_string(),
            attributes: record.attributes.clone(),
            credential: record.credential.clone(),
        };
        stored.version += 1;
        let version = stored.version;
        stored.committed.insert(request_token.to_string(), version);
        drop(secrets);

        // Staged credentials never outlive a commit for their secret.
        self.staged
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .retain(|(id, _), _| id != secret_id);

        Ok(CommitReceipt {
            version,
            replayed: false,
        })
    }

    fn token_status_now(&self, secret_id: &str, request_token: &str) -> StoreResult<TokenStatus> {
        let committed = {
            let secrets = self
                .secrets
                .read()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            let stored = secrets.get(secret_id).ok_or_else(|| StoreError::NotFound {
                secret_id: secret_id.to_string(),
            })?;
            stored
                .committed
                .get(request_token)
                .map(|&version| (version, version == stored.version))
        };

        Ok(match committed {
            Some((version, true)) => TokenStatus::Current { version },
            Some((_, false)) => TokenStatus::Superseded,
            None => self
                .staged(secret_id, request_token)
                .map_or(TokenStatus::Unused, TokenStatus::Staged),
        })
    }

    fn stage_now(
        &self,
        secret_id: &str,
        request_token: &str,
        credential: &Credential,
    ) -> StoreResult<()> {
        let already_committed = {
            let secrets = self
                .secrets
                .read()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            secrets
                .get(secret_id)
                .ok_or_else(|| StoreError::NotFound {
                    secret_id: secret_id.to_string(),
                })?
                .committed
                .contains_key(request_token)
        };
        if already_committed {
            return Err(StoreError::TokenConflict {
                request_token: request_token.to_string(),
            });
        }

        let mut staged = self
            .staged
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let key = (secret_id.to_string(), request_token.to_string());

        match staged.get(&key) {
            Some(existing) if existing != credential => Err(StoreError::TokenConflict {
                request_token: request_token.to_string(),
            }),
            Some(_) => Ok(()),
            None => {
                staged.insert(key, credential.clone());
                Ok(())
            }
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn fetch<'a>(
        &'a self,
        secret_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = StoreResult<SecretRecord>> + Send + 'a>> {
        Box::pin(async move {
            self.enter(StoreOperation::Fetch).await?;
            self.fetch_now(secret_id)
        })
    }

    fn commit<'a>(
        &'a self,
        secret_id: &'a str,
        request_token: &'a str,
        record: &'a SecretRecord,
    ) -> Pin<Box<dyn Future<Output = StoreResult<CommitReceipt>> + Send + 'a>> {
        Box::pin(async move {
            self.enter(StoreOperation::Commit).await?;
            self.commit_now(secret_id, request_token, record)
        })
    }

    fn token_status<'a>(
        &'a self,
        secret_id: &'a str,
        request_token: &'a str,
    ) -> Pin<Box<dyn Future<Output = StoreResult<TokenStatus>> + Send + 'a>> {
        Box::pin(async move {
            self.enter(StoreOperation::TokenStatus).await?;
            self.token_status_now(secret_id, request_token)
        })
    }

    fn stage<'a>(
        &'a self,
        secret_id: &'a str,
        request_token: &'a str,
        credential: &'a Credential,
    ) -> Pin<Box<dyn Future<Output = StoreResult<()>> + Send + 'a>> {
        Box::pin(async move {
            self.enter(StoreOperation::Stage).await?;
            self.stage_now(secret_id, request_token, credential)
        })
    }
}

impl std::fmt::Debug for MemoryCredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let secrets = self
            .secrets
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len();
        f.debug_struct("MemoryCredentialStore")
            .field("secrets_count", &secrets)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_record(credential: &str) -> SecretRecord {
        SecretRecord::new("db-1", Credential::new(credential))
            .with_attribute("dbInstanceIdentifier", "rds-1")
    }

    fn test_store() -> MemoryCredentialStore {
        MemoryCredentialStore::with_records([test_record("old")])
    }

    #[tokio::test]
    async fn fetch_existing_record() {
        let store = test_store();
        let record = store.fetch("db-1").await.expect("fetch should succeed");

        assert_eq!(record, test_record("old"));
        assert_eq!(store.calls(StoreOperation::Fetch), 1);
    }

    #[tokio::test]
    async fn fetch_missing_record() {
        let store = test_store();
        let err = store.fetch("db-2").await.expect_err("fetch should fail");

        assert_eq!(
            err,
            StoreError::NotFound {
                secret_id: "db-2".to_string()
            }
        );
    }

    #[tokio::test]
    async fn commit_bumps_version() {
        let store = test_store();
        let receipt = store
            .commit("db-1", "tok-A", &test_record("new"))
            .await
            .expect("commit should succeed");

        assert_eq!(receipt, CommitReceipt { version: 2, replayed: false });
        assert_eq!(store.version("db-1"), Some(2));
        assert_eq!(
            store.record("db-1").map(|r| r.credential),
            Some(Credential::new("new"))
        );
    }

    #[tokio::test]
    async fn commit_same_token_same_credential_is_replay() {
        let store = test_store();
        let record = test_record("new");
        store.commit("db-1", "tok-A", &record).await.expect("first commit");
        let receipt = store
            .commit("db-1", "tok-A", &record)
            .await
            .expect("replayed commit");

        assert_eq!(receipt, CommitReceipt { version: 2, replayed: true });
        assert_eq!(store.version("db-1"), Some(2));
    }

    #[tokio::test]
    async fn commit_same_token_different_credential_conflicts() {
        let store = test_store();
        store
            .commit("db-1", "tok-A", &test_record("new"))
            .await
            .expect("first commit");
        let err = store
            .commit("db-1", "tok-A", &test_record("other"))
            .await
            .expect_err("conflicting commit");

        assert!(matches!(err, StoreError::TokenConflict { .. }));
        assert_eq!(
            store.record("db-1").map(|r| r.credential),
            Some(Credential::new("new"))
        );
    }

    #[tokio::test]
    async fn commit_missing_secret() {
        let store = MemoryCredentialStore::new();
        let err = store
            .commit("db-1", "tok-A", &test_record("new"))
            .await
            .expect_err("commit should fail");
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn stage_then_token_status() {
        let store = test_store();
        let credential = Credential::new("staged");

        assert_eq!(
            store.token_status("db-1", "tok-A").await.expect("status"),
            TokenStatus::Unused
        );
        store
            .stage("db-1", "tok-A", &credential)
            .await
            .expect("stage should succeed");

        assert_eq!(
            store.token_status("db-1", "tok-A").await.expect("status"),
            TokenStatus::Staged(credential.clone())
        );
        assert_eq!(
            store.token_status("db-1", "tok-B").await.expect("status"),
            TokenStatus::Unused
        );
    }

    #[tokio::test]
    async fn token_status_missing_secret() {
        let store = test_store();
        let err = store
            .token_status("db-9", "tok-A")
            .await
            .expect_err("status should fail");
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn token_status_tracks_supersession() {
        let store = test_store();
        store
            .commit("db-1", "tok-A", &test_record("first"))
            .await
            .expect("commit A");
        assert_eq!(
            store.token_status("db-1", "tok-A").await.expect("status"),
            TokenStatus::Current { version: 2 }
        );

        store
            .commit("db-1", "tok-B", &test_record("second"))
            .await
            .expect("commit B");
        assert_eq!(
            store.token_status("db-1", "tok-A").await.expect("status"),
            TokenStatus::Superseded
        );
        assert_eq!(
            store.token_status("db-1", "tok-B").await.expect("status"),
            TokenStatus::Current { version: 3 }
        );
    }

    #[tokio::test]
    async fn commit_superseded_token_is_refused() {
        let store = test_store();
        let first = test_record("first");
        store.commit("db-1", "tok-A", &first).await.expect("commit A");
        store
            .commit("db-1", "tok-B", &test_record("second"))
            .await
            .expect("commit B");

        let err = store
            .commit("db-1", "tok-A", &first)
            .await
            .expect_err("stale replay should fail");

        assert!(matches!(err, StoreError::Superseded { .. }));
        assert_eq!(store.version("db-1"), Some(3));
        assert_eq!(
            store.record("db-1").map(|r| r.credential),
            Some(Credential::new("second"))
        );
    }

    #[tokio::test]
    async fn stage_committed_token_conflicts() {
        let store = test_store();
        store
            .commit("db-1", "tok-A", &test_record("new"))
            .await
            .expect("commit");
        let err = store
            .stage("db-1", "tok-A", &Credential::new("another"))
            .await
            .expect_err("stage should fail");
        assert!(matches!(err, StoreError::TokenConflict { .. }));
    }

    #[tokio::test]
    async fn commit_discards_staged_credentials_for_secret() {
        let store = MemoryCredentialStore::with_records([
            test_record("old"),
            SecretRecord::new("db-2", Credential::new("other")),
        ]);
        store.stage("db-1", "tok-A", &Credential::new("new")).await.expect("stage A");
        store.stage("db-1", "tok-X", &Credential::new("abandoned")).await.expect("stage X");
        store.stage("db-2", "tok-C", &Credential::new("kept")).await.expect("stage C");

        store.commit("db-1", "tok-A", &test_record("new")).await.expect("commit");

        assert_eq!(store.staged("db-1", "tok-A"), None);
        assert_eq!(store.staged("db-1", "tok-X"), None);
        assert_eq!(store.staged("db-2", "tok-C"), Some(Credential::new("kept")));
    }

    #[tokio::test]
    async fn stage_is_idempotent_but_not_overwritable() {
        let store = test_store();
        let credential = Credential::new("staged");
        store.stage("db-1", "tok-A", &credential).await.expect("stage");
        store
            .stage("db-1", "tok-A", &credential)
            .await
            .expect("restage same credential");

        let err = store
            .stage("db-1", "tok-A", &Credential::new("different"))
            .await
            .expect_err("overwrite should fail");
        assert!(matches!(err, StoreError::TokenConflict { .. }));
    }

    #[tokio::test]
    async fn stage_missing_secret() {
        let store = MemoryCredentialStore::new();
        let err = store
            .stage("db-1", "tok-A", &Credential::new("x"))
            .await
            .expect_err("stage should fail");
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn injected_fault_applies_until_cleared() {
        let store = test_store();
        store.fail(
            StoreOperation::Fetch,
            StoreError::Unavailable {
                reason: "maintenance".to_string(),
            },
        );

        assert!(store.fetch("db-1").await.is_err());
        assert!(store.fetch("db-1").await.is_err());
        store.clear_faults();
        assert!(store.fetch("db-1").await.is_ok());
        assert_eq!(store.calls(StoreOperation::Fetch), 3);
    }

    #[tokio::test]
    async fn failed_commit_leaves_record_untouched() {
        let store = test_store();
        store.fail(
            StoreOperation::Commit,
            StoreError::Rejected {
                reason: "throttled".to_string(),
            },
        );

        assert!(store.commit("db-1", "tok-A", &test_record("new")).await.is_err());
        assert_eq!(store.version("db-1"), Some(1));
        assert_eq!(
            store.record("db-1").map(|r| r.credential),
            Some(Credential::new("old"))
        );
    }

    #[tokio::test]
    async fn snapshot_roundtrip_preserves_tokens() {
        let store = test_store();
        let record = test_record("new");
        store.stage("db-1", "tok-A", &record.credential).await.expect("stage");
        store.commit("db-1", "tok-A", &record).await.expect("commit");
        store.stage("db-1", "tok-B", &Credential::new("next")).await.expect("stage B");

        let json = serde_json::to_string(&store.snapshot()).expect("serialize");
        let restored =
            MemoryCredentialStore::from_snapshot(serde_json::from_str(&json).expect("deserialize"));

        assert_eq!(restored.version("db-1"), Some(2));
        assert_eq!(restored.staged("db-1", "tok-B"), Some(Credential::new("next")));
        let receipt = restored
            .commit("db-1", "tok-A", &record)
            .await
            .expect("replay after restore");
        assert!(receipt.replayed);
    }

    #[tokio::test]
    async fn snapshot_holds_only_current_credential_after_two_rotations() {
        let store = test_store();
        for (token, credential) in [("tok-A", "first-secret"), ("tok-B", "second-secret")] {
            store
                .stage("db-1", token, &Credential::new(credential))
                .await
                .expect("stage");
            store
                .commit("db-1", token, &test_record(credential))
                .await
                .expect("commit");
        }

        let snapshot = store.snapshot();
        let json = serde_json::to_string(&snapshot).expect("serialize");

        assert!(snapshot.staged.is_empty());
        assert!(!json.contains("first-secret"));
        assert!(!json.contains("old"));
        assert_eq!(json.matches("second-secret").count(), 1);
    }

    #[test]
    fn debug_does_not_expose_credentials() {
        let store = test_store();
        let debug_str = format!("{store:?}");
        assert!(debug_str.contains("secrets_count"));
        assert!(!debug_str.contains("old"));
    }
}
