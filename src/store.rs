use crate::error::Result;
use crate::model::FlashSummary;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Single persisted slot holding the outcome of the last flash.
pub struct SummaryStore {
    path: PathBuf,
}

impl SummaryStore {
    pub fn new(path: PathBuf) -> Self {
        SummaryStore { path }
    }

    pub fn path(self: &Self) -> &Path {
        &self.path
    }

    pub fn read(self: &Self) -> Result<Option<FlashSummary>> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => Ok(Some(serde_json::from_str(&text)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn write(self: &Self, summary: &FlashSummary) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_vec(summary)?)?;
        log::debug!("Flash summary saved to {}", self.path.display());
        Ok(())
    }

    pub fn clear(self: &Self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
