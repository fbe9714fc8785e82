//! Command implementations.
//!
//! Each command writes its output to the supplied writer so tests can
//! capture it.

use std::io::{Read, Write};
use std::path::Path;

use anyhow::Context;
use tracing::info;

use claw_rotation::{
    PasswordGenerator, RotationConfig, RotationCoordinator, RotationResponse, handle_event,
};

use crate::state::StateFile;

/// Loads the config file, or the defaults when none is given.
///
/// # Errors
///
/// Returns an error if the file cannot be loaded or is invalid.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<RotationConfig> {
    match path {
        Some(path) => RotationConfig::from_file(path).context("failed to load rotation config"),
        None => Ok(RotationConfig::default()),
    }
}

/// Reads an event payload from a file, or stdin for `-`.
///
/// # Errors
///
/// Returns an error if the source cannot be read.
pub fn read_event(source: &str) -> anyhow::Result<String> {
    if source == "-" {
        let mut payload = String::new();
        std::io::stdin()
            .read_to_string(&mut payload)
            .context("failed to read event from stdin")?;
        return Ok(payload);
    }

    std::fs::read_to_string(source).with_context(|| format!("failed to read event file '{source}'"))
}

/// Writes one generated credential followed by a newline.
///
/// # Errors
///
/// Returns an error if the length or symbol class is invalid, or writing fails.
pub fn generate<W: Write>(
    out: &mut W,
    config: &RotationConfig,
    length: Option<usize>,
) -> anyhow::Result<()> {
    let generator = PasswordGenerator::with_policy(config.character_policy()?);
    let generated = generator.generate(length.unwrap_or(config.password_length))?;
    writeln!(out, "{}", generated.value().expose())?;
    Ok(())
}

/// Runs one rotation event against the state file and writes the JSON
/// response. The state file is rewritten with whatever the attempt changed.
///
/// # Errors
///
/// Returns an error if the state file cannot be read or written, or the
/// config is unusable. Rotation failures are reported in the response.
pub async fn rotate<W: Write>(
    out: &mut W,
    config: RotationConfig,
    state_path: &Path,
    payload: &str,
) -> anyhow::Result<RotationResponse> {
    let (store, target) = StateFile::load(state_path)?.into_collaborators();
    let coordinator = RotationCoordinator::new(store, target, config)?;

    let response = handle_event(&coordinator, payload).await;

    StateFile::capture(coordinator.store(), coordinator.target()).save(state_path)?;
    info!(path = %state_path.display(), "state file updated");

    writeln!(out, "{}", response.to_json()?)?;
    Ok(response)
}
