//! # claw-rotation-cli
//!
//! Command-line front end for `claw-rotation`.
//!
//! Provides commands for:
//! - Generating a policy-compliant credential
//! - Rehearsing a rotation event against a local JSON state file

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod commands;
pub mod state;

pub use cli::{Cli, Commands};
pub use state::StateFile;
