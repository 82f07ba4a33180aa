// src/store/json_file.rs

//! JSON file persistence shared by the local and cache stores.

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::attributes::Contents;
use crate::error::{Error, Result};

/// A JSON object stored at a fixed path
#[derive(Debug, Clone)]
pub struct JsonFile {
    path: PathBuf,
}

impl JsonFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the file
    ///
    /// A missing or blank file reads as empty contents. A file that exists
    /// but isn't a valid syspurpose object is an [`Error::Parse`].
    pub fn read(&self) -> Result<Contents> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("{} does not exist, treating as empty", self.path.display());
                return Ok(Contents::new());
            }
            Err(e) => return Err(Error::io(&self.path, e)),
        };

        if text.trim().is_empty() {
            return Ok(Contents::new());
        }

        let contents: Contents = serde_json::from_str(&text).map_err(|e| Error::Parse {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        contents.check_known_fields().map_err(|message| Error::Parse {
            path: self.path.clone(),
            message,
        })?;

        Ok(contents)
    }

    /// Read the file, treating unparseable contents as empty
    ///
    /// I/O errors other than a missing file still propagate.
    pub fn read_or_default(&self) -> Result<Contents> {
        match self.read() {
            Err(e) if e.is_parse() => {
                warn!("Ignoring unreadable syspurpose data: {}", e);
                Ok(Contents::new())
            }
            other => other,
        }
    }

    /// Write `contents` with temp-file-then-rename
    pub fn write(&self, contents: &Contents) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.is_dir() {
                debug!("Creating directory {}", parent.display());
                fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
            }
        }

        let mut data = serde_json::to_string_pretty(contents)?;
        data.push('\n');

        let temp_path = self.path.with_extension("tmp");
        let written = write_synced(&temp_path, data.as_bytes())
            .and_then(|()| fs::rename(&temp_path, &self.path).map_err(|e| Error::io(&self.path, e)));
        if let Err(e) = written {
            let _ = fs::remove_file(&temp_path);
            return Err(e);
        }

        debug!("Wrote {} keys to {}", contents.len(), self.path.display());
        Ok(())
    }

    /// Write only when the file doesn't already hold `contents`
    ///
    /// Returns whether a write happened.
    pub fn write_if_changed(&self, contents: &Contents) -> Result<bool> {
        if let Ok(current) = self.read() {
            if &current == contents && self.path.exists() {
                return Ok(false);
            }
        }
        self.write(contents)?;
        Ok(true)
    }
}

fn write_synced(path: &Path, data: &[u8]) -> Result<()> {
    let mut file = File::create(path).map_err(|e| Error::io(path, e))?;
    file.write_all(data)
        .and_then(|_| file.sync_data())
        .map_err(|e| Error::io(path, e))
}
