//! Host preferences
//!
//! A small persisted record the host keeps between invocations, holding the
//! last directory a book was unpacked into. Stored as TOML next to whatever
//! other state the host maintains; a missing file simply loads as defaults.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::error::UnpackError;

/// Preferences persisted between export invocations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// The directory the last export was placed in
    pub last_dir: Option<PathBuf>,
}

impl Preferences {
    /// Loads preferences from a TOML file
    ///
    /// # Parameters
    /// - `path`: The preferences file location
    ///
    /// # Return
    /// - `Ok(Preferences)`: The stored preferences, or the defaults when the
    ///   file does not exist yet
    /// - `Err(UnpackError)`: The file exists but cannot be read or parsed
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, UnpackError> {
        if !path.as_ref().is_file() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        toml::from_str(&content).map_err(UnpackError::from)
    }

    /// Saves preferences to a TOML file
    ///
    /// Intermediate directories are created as needed; an existing file is
    /// overwritten.
    ///
    /// # Parameters
    /// - `path`: The preferences file location
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), UnpackError> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;

        Ok(())
    }

    /// Returns the stored directory if it still exists
    ///
    /// A remembered directory that has since been removed or replaced by a
    /// file is ignored, so the host can fall back to its own default.
    pub fn base_dir(&self) -> Option<&Path> {
        self.last_dir.as_deref().filter(|dir| dir.is_dir())
    }

    /// Remembers the directory of a completed export
    pub fn remember_dir<P: Into<PathBuf>>(&mut self, dir: P) {
        self.last_dir = Some(dir.into());
    }
}
