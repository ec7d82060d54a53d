// Calibration persistence port
//
// The wizard only talks to `CalibrationPersistence`; the binary uses a JSON
// file and tests use the in-memory store.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::CalibrationData;
use crate::error::CalibrationError;

pub trait CalibrationPersistence {
    /// Store `data`, replacing any previous record
    fn save(&mut self, data: &CalibrationData) -> Result<(), CalibrationError>;

    /// Previously saved record, or `None` if nothing was saved yet
    fn load(&self) -> Result<Option<CalibrationData>, CalibrationError>;

    fn has_saved_data(&self) -> bool;
}

/// JSON file store with the keys `background`, `low`, `high`, `speed`
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "calibration.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

fn persistence_error(action: &str, path: &Path, err: impl std::fmt::Display) -> CalibrationError {
    CalibrationError::Persistence {
        reason: format!("Failed to {} {}: {}", action, path.display(), err),
    }
}

impl CalibrationPersistence for JsonFileStore {
    fn save(&mut self, data: &CalibrationData) -> Result<(), CalibrationError> {
        let json = serde_json::to_string_pretty(data)
            .map_err(|e| persistence_error("serialize", &self.path, e))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| persistence_error("create", parent, e))?;
        }

        // Write-then-rename so a crash never leaves a half-written record
        let temp = self.temp_path();
        fs::write(&temp, json).map_err(|e| persistence_error("write", &temp, e))?;
        fs::rename(&temp, &self.path).map_err(|e| persistence_error("replace", &self.path, e))?;

        log::info!("[Persistence] Saved calibration to {}", self.path.display());
        Ok(())
    }

    fn load(&self) -> Result<Option<CalibrationData>, CalibrationError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(persistence_error("read", &self.path, e)),
        };

        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|e| persistence_error("parse", &self.path, e))
    }

    fn has_saved_data(&self) -> bool {
        self.path.is_file()
    }
}

/// In-process store for tests and simulations
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    data: Option<CalibrationData>,
    save_count: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(data: CalibrationData) -> Self {
        Self {
            data: Some(data),
            save_count: 0,
        }
    }

    pub fn saved(&self) -> Option<CalibrationData> {
        self.data
    }

    pub fn save_count(&self) -> usize {
        self.save_count
    }
}

impl CalibrationPersistence for MemoryStore {
    fn save(&mut self, data: &CalibrationData) -> Result<(), CalibrationError> {
        self.data = Some(*data);
        self.save_count += 1;
        Ok(())
    }

    fn load(&self) -> Result<Option<CalibrationData>, CalibrationError> {
        Ok(self.data)
    }

    fn has_saved_data(&self) -> bool {
        self.data.is_some()
    }
}
