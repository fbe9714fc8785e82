//! Record of rotation attempts.
//!
//! Every request handled by the coordinator leaves one [`JournalEntry`]. The
//! journal never holds credential material. Its main consumer is whoever has
//! to reconcile secrets left in the inconsistent state after a
//! `StoreUpdateError`.

use std::collections::HashSet;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;
use crate::types::{RotationRequest, RotationResult, RotationStatus};

/// One rotation attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// When the attempt finished.
    pub timestamp: DateTime<Utc>,
    /// The secret being rotated.
    pub secret_id: String,
    /// The token of the attempt.
    pub request_token: String,
    /// The target resource, when the attempt got far enough to know it.
    pub resource: Option<String>,
    /// How the attempt ended.
    pub status: RotationStatus,
    /// The result message.
    pub detail: String,
}

impl JournalEntry {
    /// Creates an entry with the current timestamp.
    #[must_use]
    pub fn new(request: &RotationRequest, resource: Option<String>, result: &RotationResult) -> Self {
        Self {
            timestamp: Utc::now(),
            secret_id: request.secret_id.clone(),
            request_token: request.request_token.clone(),
            resource,
            status: result.status,
            detail: result.detail.clone(),
        }
    }

    /// Returns the failure kind, if the attempt failed.
    #[must_use]
    pub const fn kind(&self) -> Option<ErrorKind> {
        match self.status {
            RotationStatus::Success => None,
            RotationStatus::Failed(kind) => Some(kind),
        }
    }
}

/// Filter criteria for querying the journal.
#[derive(Debug, Clone, Default)]
pub struct JournalFilter {
    /// Filter by secret ID.
    pub secret_id: Option<String>,
    /// Filter by request token.
    pub request_token: Option<String>,
    /// Filter by status.
    pub status: Option<RotationStatus>,
    /// Filter entries after this time.
    pub after: Option<DateTime<Utc>>,
    /// Maximum number of entries to return.
    pub limit: Option<usize>,
}

impl JournalFilter {
    /// Creates a filter that matches all entries.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Filters by secret ID.
    #[must_use]
    pub fn for_secret(mut self, secret_id: impl Into<String>) -> Self {
        self.secret_id = Some(secret_id.into());
        self
    }

    /// Filters by request token.
    #[must_use]
    pub fn for_token(mut self, request_token: impl Into<String>) -> Self {
        self.request_token = Some(request_token.into());
        self
    }

    /// Filters by status.
    #[must_use]
    pub fn with_status(mut self, status: RotationStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Filters entries after a given time.
    #[must_use]
    pub fn after(mut self, time: DateTime<Utc>) -> Self {
        self.after = Some(time);
        self
    }

    /// Limits the number of returned entries.
    #[must_use]
    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    fn matches(&self, entry: &JournalEntry) -> bool {
        if self.secret_id.as_ref().is_some_and(|id| &entry.secret_id != id) {
            return false;
        }

        if self
            .request_token
            .as_ref()
            .is_some_and(|token| &entry.request_token != token)
        {
            return false;
        }

        if self.status.is_some_and(|status| entry.status != status) {
            return false;
        }

        if self.after.is_some_and(|after| entry.timestamp <= after) {
            return false;
        }

        true
    }
}

/// An in-memory journal of rotation attempts.
pub struct RotationJournal {
    entries: RwLock<Vec<JournalEntry>>,
}

impl RotationJournal {
    /// Creates an empty journal.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Records an entry.
    pub fn record(&self, entry: JournalEntry) {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        entries.push(entry);
    }

    /// Queries the journal, newest first.
    #[must_use]
    pub fn query(&self, filter: &JournalFilter) -> Vec<JournalEntry> {
        let entries = self
            .entries
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        let mut results: Vec<JournalEntry> = entries
            .iter()
            .rev()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();

        if let Some(limit) = filter.limit {
            results.truncate(limit);
        }

        results
    }

    /// Returns the latest `StoreUpdateError` per secret that no later
    /// successful rotation has superseded, newest first.
    ///
    /// These are the secrets whose target may hold a credential the store
    /// does not advertise.
    #[must_use]
    pub fn needing_reconciliation(&self) -> Vec<JournalEntry> {
        let entries = self
            .entries
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        let mut settled: HashSet<&str> = HashSet::new();
        let mut results = Vec::new();

        for entry in entries.iter().rev() {
            if settled.contains(entry.secret_id.as_str()) {
                continue;
            }
            match entry.status {
                RotationStatus::Success => {
                    settled.insert(entry.secret_id.as_str());
                }
                RotationStatus::Failed(kind) if kind.requires_reconciliation() => {
                    settled.insert(entry.secret_id.as_str());
                    results.push(entry.clone());
                }
                RotationStatus::Failed(_) => {}
            }
        }

        results
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    /// Returns true if the journal is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes all entries.
    pub fn clear(&self) {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        entries.clear();
    }
}

impl Default for RotationJournal {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RotationJournal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RotationJournal")
            .field("entries_count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn success(secret_id: &str, token: &str) -> JournalEntry {
        JournalEntry::new(
            &RotationRequest::new(secret_id, token),
            Some("rds-1".to_string()),
            &RotationResult::success(),
        )
    }

    fn store_failure(secret_id: &str, token: &str) -> JournalEntry {
        let err = Error::StoreUpdate {
            secret_id: secret_id.to_string(),
            resource: "rds-1".to_string(),
            reason: "secret store unavailable: timeout".to_string(),
        };
        JournalEntry::new(
            &RotationRequest::new(secret_id, token),
            err.resource().map(str::to_string),
            &RotationResult::failed(&err),
        )
    }

    fn target_failure(secret_id: &str, token: &str) -> JournalEntry {
        let err = Error::TargetUpdate {
            resource: "rds-1".to_string(),
            reason: "rejected".to_string(),
        };
        JournalEntry::new(
            &RotationRequest::new(secret_id, token),
            err.resource().map(str::to_string),
            &RotationResult::failed(&err),
        )
    }

    #[test]
    fn journal_new_is_empty() {
        let journal = RotationJournal::new();
        assert!(journal.is_empty());
        assert!(journal.needing_reconciliation().is_empty());
    }

    #[test]
    fn query_newest_first_with_filters() {
        let journal = RotationJournal::new();
        journal.record(success("db-1", "tok-A"));
        journal.record(target_failure("db-2", "tok-B"));
        journal.record(success("db-2", "tok-C"));

        let all = journal.query(&JournalFilter::new());
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].request_token, "tok-C");

        let db2 = journal.query(&JournalFilter::new().for_secret("db-2"));
        assert_eq!(db2.len(), 2);

        let failures = journal.query(
            &JournalFilter::new().with_status(RotationStatus::Failed(ErrorKind::TargetUpdate)),
        );
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].kind(), Some(ErrorKind::TargetUpdate));

        let token = journal.query(&JournalFilter::new().for_token("tok-A"));
        assert_eq!(token.len(), 1);
        assert_eq!(token[0].secret_id, "db-1");

        let limited = journal.query(&JournalFilter::new().limit(1));
        assert_eq!(limited.len(), 1);
    }

    #[test]
    fn query_after_timestamp() {
        let journal = RotationJournal::new();
        journal.record(success("db-1", "tok-A"));
        let cutoff = Utc::now();
        std::thread::sleep(std::time::Duration::from_millis(10));
        journal.record(success("db-1", "tok-B"));

        let recent = journal.query(&JournalFilter::new().after(cutoff));
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].request_token, "tok-B");
    }

    #[test]
    fn store_failure_needs_reconciliation() {
        let journal = RotationJournal::new();
        journal.record(success("db-1", "tok-A"));
        journal.record(store_failure("db-1", "tok-B"));

        let pending = journal.needing_reconciliation();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].request_token, "tok-B");
        assert_eq!(pending[0].resource.as_deref(), Some("rds-1"));
    }

    #[test]
    fn later_success_settles_reconciliation() {
        let journal = RotationJournal::new();
        journal.record(store_failure("db-1", "tok-B"));
        journal.record(target_failure("db-1", "tok-B"));
        journal.record(success("db-1", "tok-B"));
        journal.record(store_failure("db-2", "tok-C"));

        let pending = journal.needing_reconciliation();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].secret_id, "db-2");
    }

    #[test]
    fn later_non_store_failure_does_not_settle() {
        let journal = RotationJournal::new();
        journal.record(store_failure("db-1", "tok-B"));
        journal.record(target_failure("db-1", "tok-C"));

        assert_eq!(journal.needing_reconciliation().len(), 1);
    }

    #[test]
    fn clear_removes_entries() {
        let journal = RotationJournal::new();
        journal.record(success("db-1", "tok-A"));
        journal.clear();
        assert!(journal.is_empty());
    }
}
