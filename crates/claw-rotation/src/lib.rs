//! # Claw Rotation
//!
//! Rotates a credential shared between a secret store and a database
//! instance:
//!
//! - **Policy-compliant generation**: every credential mixes uppercase,
//!   lowercase, digits and symbols, drawn from the OS CSPRNG
//! - **Two-phase update**: the target is changed first, then the store; the
//!   window between the two is reported as its own error kind
//! - **Token idempotency**: the new credential is staged under the request
//!   token, so a retried request reuses it
//! - **Journal**: every attempt is recorded without credential material
//!
//! ## Example
//!
//! ```rust
//! use claw_rotation::{
//!     Credential, MemoryCredentialStore, MemoryTarget, RotationConfig, RotationCoordinator,
//!     RotationRequest, SecretRecord,
//! };
//!
//! # tokio::runtime::Runtime::new().expect("runtime").block_on(async {
//! let store = MemoryCredentialStore::with_records([
//!     SecretRecord::new("db-1", Credential::new("old"))
//!         .with_attribute("dbInstanceIdentifier", "rds-1"),
//! ]);
//! let target = MemoryTarget::new().with_resource("rds-1", Credential::new("old"));
//!
//! let coordinator = RotationCoordinator::new(store, target, RotationConfig::default())
//!     .expect("valid config");
//! let result = coordinator.rotate(&RotationRequest::new("db-1", "tok-A")).await;
//! assert!(result.is_success());
//! # });
//! ```
//!
//! ## Security Considerations
//!
//! - [`Credential`] zeroizes on drop, redacts itself in `Debug` output and
//!   compares in constant time
//! - Error messages, results and journal entries never include a credential

pub mod config;
pub mod coordinator;
pub mod error;
pub mod event;
pub mod generator;
pub mod journal;
pub mod store;
pub mod target;
pub mod types;

// Re-export commonly used types
pub use error::{
    Error, ErrorKind, PolicyError, Result, StoreError, StoreResult, TargetError, TargetResult,
};
pub use types::{
    Credential, GeneratedCredential, RotationOutcome, RotationRequest, RotationResult,
    RotationStatus, SecretRecord,
};

pub use config::{ConfigError, RotationConfig, StepTimeouts};

pub use generator::{CharacterPolicy, PasswordGenerator};

pub use store::{
    CommitReceipt, CredentialStore, MemoryCredentialStore, StoreOperation, StoreSnapshot,
    TokenStatus,
};

pub use target::{MemoryTarget, TargetResource};

pub use coordinator::RotationCoordinator;

pub use event::{RotationEvent, RotationResponse, handle_event};

pub use journal::{JournalEntry, JournalFilter, RotationJournal};
