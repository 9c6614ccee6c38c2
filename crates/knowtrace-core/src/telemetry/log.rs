//! Local append-only interaction log
//!
//! A single pretty-printed JSON array of events. Appends rewrite the whole
//! file; the log is a low-volume fallback store, not a high-throughput
//! journal. The file is unlocked, so concurrent processes appending to the
//! same log can lose updates (last writer wins on the whole file).

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};
use crate::telemetry::event::InteractionEvent;

/// Handle on the local interaction log file
#[derive(Debug, Clone)]
pub struct InteractionLog {
    path: PathBuf,
}

impl InteractionLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read every event in the log
    ///
    /// An absent file is an empty log. A present but malformed file is an
    /// error: silently dropping recorded history would look like data loss.
    pub fn read_all(&self) -> Result<Vec<InteractionEvent>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path)?;
        serde_json::from_str(&content).map_err(|e| Error::LogParse {
            path: self.path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Append one event, rewriting the file
    pub fn append(&self, event: &InteractionEvent) -> Result<()> {
        let mut events = self.read_all()?;
        events.push(event.clone());
        self.write_events(&events)?;
        debug!(path = %self.path.display(), total = events.len(), "appended event to local log");
        Ok(())
    }

    /// Reset the log to an empty array
    pub fn clear(&self) -> Result<()> {
        self.write_events(&[])
    }

    fn write_events(&self, events: &[InteractionEvent]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(events)
            .map_err(|e| Error::Other(format!("failed to serialize interaction log: {}", e)))?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}
