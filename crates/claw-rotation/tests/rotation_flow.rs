//! End-to-end rotation flows against recording collaborators.
//!
//! These tests verify:
//! 1. The exact calls made on the success path
//! 2. Which calls are skipped on each failure path
//! 3. Retry with the same token applies the same credential

use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

use claw_rotation::{
    CommitReceipt, Credential, CredentialStore, ErrorKind, RotationConfig, RotationCoordinator,
    RotationRequest, RotationStatus, SecretRecord, StoreError, StoreResult, TargetError,
    TargetResource, TargetResult, TokenStatus,
};

// ============================================================================
// Recording collaborators
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
struct CommitCall {
    secret_id: String,
    request_token: String,
    record: SecretRecord,
}

#[derive(Default)]
struct RecordingStore {
    record: Option<SecretRecord>,
    fail_commit: bool,
    staged: Mutex<Option<Credential>>,
    fetches: Mutex<usize>,
    commits: Mutex<Vec<CommitCall>>,
}

impl RecordingStore {
    fn holding(record: SecretRecord) -> Self {
        Self {
            record: Some(record),
            ..Self::default()
        }
    }

    fn commits(&self) -> Vec<CommitCall> {
        self.commits.lock().expect("lock").clone()
    }

    fn fetches(&self) -> usize {
        *self.fetches.lock().expect("lock")
    }
}

impl CredentialStore for RecordingStore {
    fn fetch<'a>(
        &'a self,
        secret_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = StoreResult<SecretRecord>> + Send + 'a>> {
        Box::pin(async move {
            *self.fetches.lock().expect("lock") += 1;
            self.record.clone().ok_or_else(|| StoreError::NotFound {
                secret_id: secret_id.to_string(),
            })
        })
    }

    fn commit<'a>(
        &'a self,
        secret_id: &'a str,
        request_token: &'a str,
        record: &'a SecretRecord,
    ) -> Pin<Box<dyn Future<Output = StoreResult<CommitReceipt>> + Send + 'a>> {
        Box::pin(async move {
            self.commits.lock().expect("lock").push(CommitCall {
                secret_id: secret_id.to_string(),
                request_token: request_token.to_string(),
                record: record.clone(),
            });
            if self.fail_commit {
                return Err(StoreError::Unavailable {
                    reason: "throttled".to_string(),
                });
            }
            Ok(CommitReceipt {
                version: 2,
                replayed: false,
            })
        })
    }

    fn token_status<'a>(
        &'a self,
        _secret_id: &'a str,
        _request_token: &'a str,
    ) -> Pin<Box<dyn Future<Output = StoreResult<TokenStatus>> + Send + 'a>> {
        Box::pin(async move {
            Ok(self
                .staged
                .lock()
                .expect("lock")
                .clone()
                .map_or(TokenStatus::Unused, TokenStatus::Staged))
        })
    }

    fn stage<'a>(
        &'a self,
        _secret_id: &'a str,
        _request_token: &'a str,
        credential: &'a Credential,
    ) -> Pin<Box<dyn Future<Output = StoreResult<()>> + Send + 'a>> {
        Box::pin(async move {
            *self.staged.lock().expect("lock") = Some(credential.clone());
            Ok(())
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ApplyCall {
    resource: String,
    credential: Credential,
    immediate: bool,
}

#[derive(Default)]
struct RecordingTarget {
    fail: bool,
    applies: Mutex<Vec<ApplyCall>>,
}

impl RecordingTarget {
    fn applies(&self) -> Vec<ApplyCall> {
        self.applies.lock().expect("lock").clone()
    }
}

impl TargetResource for RecordingTarget {
    fn apply<'a>(
        &'a self,
        resource: &'a str,
        credential: &'a Credential,
        immediate: bool,
    ) -> Pin<Box<dyn Future<Output = TargetResult<()>> + Send + 'a>> {
        Box::pin(async move {
            self.applies.lock().expect("lock").push(ApplyCall {
                resource: resource.to_string(),
                credential: credential.clone(),
                immediate,
            });
            if self.fail {
                return Err(TargetError::Unavailable {
                    reason: "instance is modifying".to_string(),
                });
            }
            Ok(())
        })
    }
}

fn scenario_record() -> SecretRecord {
    SecretRecord::new("db-1", Credential::new("old")).with_attribute("resource", "rds-1")
}

fn scenario_config() -> RotationConfig {
    RotationConfig {
        resource_attribute: "resource".to_string(),
        ..RotationConfig::default()
    }
}

// ============================================================================
// Success path
// ============================================================================

#[tokio::test]
async fn test_rotation_scenario_calls_each_collaborator_once() {
    let coordinator = RotationCoordinator::new(
        RecordingStore::holding(scenario_record()),
        RecordingTarget::default(),
        scenario_config(),
    )
    .expect("valid config");

    let result = coordinator
        .rotate(&RotationRequest::new("db-1", "tok-A"))
        .await;

    assert_eq!(result.status, RotationStatus::Success);

    let applies = coordinator.target().applies();
    assert_eq!(applies.len(), 1);
    assert_eq!(applies[0].resource, "rds-1");
    assert!(applies[0].immediate);
    assert_eq!(applies[0].credential.len(), 32);
    assert_ne!(applies[0].credential, Credential::new("old"));

    let commits = coordinator.store().commits();
    assert_eq!(commits.len(), 1);
    assert_eq!(commits[0].secret_id, "db-1");
    assert_eq!(commits[0].request_token, "tok-A");
    assert_eq!(commits[0].record.attributes, scenario_record().attributes);
    assert_eq!(commits[0].record.credential, applies[0].credential);
}

// ============================================================================
// Failure paths
// ============================================================================

#[tokio::test]
async fn test_missing_request_fields_invoke_no_collaborator() {
    let coordinator = RotationCoordinator::new(
        RecordingStore::holding(scenario_record()),
        RecordingTarget::default(),
        scenario_config(),
    )
    .expect("valid config");

    let missing_id = coordinator.rotate(&RotationRequest::new("", "tok-A")).await;
    let missing_token = coordinator.rotate(&RotationRequest::new("db-1", "")).await;

    assert_eq!(missing_id.kind(), Some(ErrorKind::Validation));
    assert_eq!(missing_token.kind(), Some(ErrorKind::Validation));
    assert_eq!(coordinator.store().fetches(), 0);
    assert!(coordinator.store().commits().is_empty());
    assert!(coordinator.target().applies().is_empty());
}

#[tokio::test]
async fn test_target_failure_never_commits() {
    let coordinator = RotationCoordinator::new(
        RecordingStore::holding(scenario_record()),
        RecordingTarget {
            fail: true,
            ..RecordingTarget::default()
        },
        scenario_config(),
    )
    .expect("valid config");

    let result = coordinator
        .rotate(&RotationRequest::new("db-1", "tok-A"))
        .await;

    assert_eq!(result.kind(), Some(ErrorKind::TargetUpdate));
    assert!(result.kind().is_some_and(ErrorKind::is_retryable));
    assert!(coordinator.store().commits().is_empty());
}

#[tokio::test]
async fn test_store_failure_after_target_is_distinct() {
    let coordinator = RotationCoordinator::new(
        RecordingStore {
            fail_commit: true,
            ..RecordingStore::holding(scenario_record())
        },
        RecordingTarget::default(),
        scenario_config(),
    )
    .expect("valid config");

    let result = coordinator
        .rotate(&RotationRequest::new("db-1", "tok-A"))
        .await;

    let kind = result.kind().expect("should fail");
    assert_eq!(kind, ErrorKind::StoreUpdate);
    assert!(kind.requires_reconciliation());
    assert!(!kind.is_retryable());
    assert_eq!(coordinator.target().applies().len(), 1);
    assert_eq!(coordinator.journal().needing_reconciliation().len(), 1);
}

#[tokio::test]
async fn test_retry_with_same_token_applies_same_credential() {
    let coordinator = RotationCoordinator::new(
        RecordingStore::holding(scenario_record()),
        RecordingTarget {
            fail: true,
            ..RecordingTarget::default()
        },
        scenario_config(),
    )
    .expect("valid config");
    let request = RotationRequest::new("db-1", "tok-A");

    coordinator.rotate(&request).await;
    coordinator.rotate(&request).await;

    let applies = coordinator.target().applies();
    assert_eq!(applies.len(), 2);
    assert_eq!(applies[0].credential, applies[1].credential);
}
