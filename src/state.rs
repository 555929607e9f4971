//! State file persistence
//!
//! The state file is pretty-printed JSON. The previous file is copied to
//! `<path>.backup` before every overwrite.

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use declarative::StateDocument;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Format version written into new state files
pub const STATE_VERSION: u32 = 1;

// ============================================================================
// State File
// ============================================================================

/// On-disk form of the state document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateFile {
    pub version: u32,

    /// Last time the state was written
    pub last_updated: DateTime<Utc>,

    #[serde(flatten)]
    pub document: StateDocument,
}

impl Default for StateFile {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            last_updated: Utc::now(),
            document: StateDocument::new(),
        }
    }
}

impl StateFile {
    /// Load state from disk, or return an empty state if the file doesn't exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("State file {} does not exist, starting empty", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file: {}", path.display()))?;
        let state: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse state file: {}", path.display()))?;

        if state.version > STATE_VERSION {
            bail!(
                "State file {} has version {}, this build understands up to {}",
                path.display(),
                state.version,
                STATE_VERSION
            );
        }

        log::debug!(
            "Loaded state serial {} with {} resources from {}",
            state.document.serial,
            state.document.len(),
            path.display()
        );
        Ok(state)
    }

    /// Save state to disk, backing up the previous file
    pub fn save(&mut self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create state directory: {}", dir.display()))?;
        }

        if path.exists() {
            let backup = backup_path(path);
            fs::copy(path, &backup)
                .with_context(|| format!("Failed to back up state to {}", backup.display()))?;
        }

        self.version = STATE_VERSION;
        self.last_updated = Utc::now();
        let content = serde_json::to_string_pretty(&*self).context("Failed to serialize state")?;
        fs::write(path, content + "\n")
            .with_context(|| format!("Failed to write state file: {}", path.display()))?;

        log::debug!(
            "Saved state serial {} to {}",
            self.document.serial,
            path.display()
        );
        Ok(())
    }

    /// Save only if `document` differs from what was loaded at `loaded_serial`
    ///
    /// Returns whether anything was written.
    pub fn save_if_changed(&mut self, path: &Path, loaded_serial: u64) -> Result<bool> {
        if self.document.serial == loaded_serial {
            log::debug!("State unchanged, not writing {}", path.display());
            return Ok(false);
        }
        self.save(path)?;
        Ok(true)
    }
}

/// `<path>.backup`
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".backup");
    PathBuf::from(name)
}

// ============================================================================
// Tests
// ============================================================================
