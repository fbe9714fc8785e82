//! Local state file used to rehearse rotations.
//!
//! ```json
//! {
//!   "store": {
//!     "secrets": [
//!       {"record": {"id": "db-1", "attributes": {"dbInstanceIdentifier": "rds-1"},
//!                   "credential": "old"}, "version": 1}
//!     ]
//!   },
//!   "targets": {"rds-1": "old"}
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use claw_rotation::{Credential, MemoryCredentialStore, MemoryTarget, StoreSnapshot};

/// Contents of a state file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateFile {
    /// Secret store contents.
    #[serde(default)]
    pub store: StoreSnapshot,
    /// Live credential per target resource.
    #[serde(default)]
    pub targets: BTreeMap<String, Credential>,
}

impl StateFile {
    /// Reads a state file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read state file '{}'", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("invalid state file '{}'", path.display()))
    }

    /// Writes the state file.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let mut content = serde_json::to_string_pretty(self).context("failed to serialize state")?;
        content.push('\n');
        std::fs::write(path, content)
            .with_context(|| format!("failed to write state file '{}'", path.display()))
    }

    /// Builds in-memory collaborators seeded from this state.
    #[must_use]
    pub fn into_collaborators(self) -> (MemoryCredentialStore, MemoryTarget) {
        let store = MemoryCredentialStore::from_snapshot(self.store);
        let target = MemoryTarget::with_credentials(self.targets);
        (store, target)
    }

    /// Captures the state of in-memory collaborators.
    #[must_use]
    pub fn capture(store: &MemoryCredentialStore, target: &MemoryTarget) -> Self {
        Self {
            store: store.snapshot(),
            targets: target.credentials().into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claw_rotation::SecretRecord;
    use tempfile::TempDir;

    #[test]
    fn load_documented_layout() {
        let json = r#"{
            "store": {"secrets": [{"record": {"id": "db-1",
                "attributes": {"dbInstanceIdentifier": "rds-1"}, "credential": "old"},
                "version": 1}]},
            "targets": {"rds-1": "old"}
        }"#;
        let state: StateFile = serde_json::from_str(json).expect("should parse");
        let (store, target) = state.into_collaborators();

        assert_eq!(store.version("db-1"), Some(1));
        assert!(target.accepts("rds-1", &Credential::new("old")));
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("state.json");

        let store = MemoryCredentialStore::with_records([SecretRecord::new(
            "db-1",
            Credential::new("old"),
        )]);
        let target = MemoryTarget::new().with_resource("rds-1", Credential::new("old"));
        let state = StateFile::capture(&store, &target);
        state.save(&path).expect("save");

        let loaded = StateFile::load(&path).expect("load");
        assert_eq!(loaded, state);
    }

    #[test]
    fn load_missing_file_names_path() {
        let err = StateFile::load(Path::new("/nonexistent/state.json")).expect_err("missing");
        assert!(err.to_string().contains("/nonexistent/state.json"));
    }
}
