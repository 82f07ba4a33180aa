// src/store/mod.rs

//! Local and cache stores
//!
//! Both stores persist a [`Contents`] map as a JSON object, but with
//! different policies for falsy values:
//!
//! - the local store is the user-editable file and never holds a falsy
//!   value; clearing a field removes the key
//! - the cache store is the last state agreed with the server and keeps
//!   falsy values, which is how "explicitly cleared" stays distinguishable
//!   from "never synced"

mod json_file;

pub use json_file::JsonFile;

use std::path::{Path, PathBuf};

use crate::attributes::Contents;
use crate::error::Result;

/// Default location of the user-editable syspurpose file
pub const DEFAULT_LOCAL_PATH: &str = "/etc/rhsm/syspurpose/syspurpose.json";

/// Default location of the last-synced snapshot
pub const DEFAULT_CACHE_PATH: &str = "/var/lib/rhsm/cache/syspurpose.json";

/// The user-facing syspurpose file
#[derive(Debug, Clone)]
pub struct LocalStore {
    file: JsonFile,
}

impl LocalStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            file: JsonFile::new(path),
        }
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn read(&self) -> Result<Contents> {
        self.file.read()
    }

    pub fn read_or_default(&self) -> Result<Contents> {
        self.file.read_or_default()
    }

    /// Write `contents` without its falsy entries
    pub fn write(&self, contents: &Contents) -> Result<()> {
        self.file.write(&contents.truthy())
    }

    /// Write the truthy subset of `contents` if the file differs
    pub fn write_if_changed(&self, contents: &Contents) -> Result<bool> {
        self.file.write_if_changed(&contents.truthy())
    }
}

impl Default for LocalStore {
    fn default() -> Self {
        Self::new(DEFAULT_LOCAL_PATH)
    }
}

/// Snapshot of the last state agreed between local and server
#[derive(Debug, Clone)]
pub struct CacheStore {
    file: JsonFile,
}

impl CacheStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            file: JsonFile::new(path),
        }
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn read(&self) -> Result<Contents> {
        self.file.read()
    }

    pub fn read_or_default(&self) -> Result<Contents> {
        self.file.read_or_default()
    }

    /// Write `contents` in full, falsy values included
    pub fn write(&self, contents: &Contents) -> Result<()> {
        self.file.write(contents)
    }

    pub fn write_if_changed(&self, contents: &Contents) -> Result<bool> {
        self.file.write_if_changed(contents)
    }
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_PATH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::Value;
    use serde_json::json;
    use tempfile::TempDir;

    fn mixed_contents() -> Contents {
        let mut c = Contents::new();
        c.insert("role", "Server");
        c.insert("usage", "");
        c.insert("service_level_agreement", Value::Null);
        c.insert("addons", Vec::<String>::new());
        c.insert("future_settings", Value::Other(json!({})));
        c.insert("future_flag", Value::Other(json!(false)));
        c
    }

    #[test]
    fn test_local_store_strips_falsy() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::new(dir.path().join("syspurpose.json"));
        store.write(&mixed_contents()).unwrap();

        let read = store.read().unwrap();
        assert_eq!(read.len(), 1);
        assert!(read.iter().all(|(_, v)| !v.is_falsy()));
        assert!(!read.contains_key("future_settings"));
    }

    #[test]
    fn test_local_store_keeps_truthy_unknown_values() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::new(dir.path().join("syspurpose.json"));

        let mut c = mixed_contents();
        c.insert("future_settings", Value::Other(json!({"mode": "strict"})));
        store.write(&c).unwrap();

        let read = store.read().unwrap();
        assert_eq!(read.len(), 2);
        assert_eq!(read.get("future_settings"), Some(&Value::Other(json!({"mode": "strict"}))));
    }

    #[test]
    fn test_cache_store_keeps_falsy() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::new(dir.path().join("cache.json"));
        store.write(&mixed_contents()).unwrap();

        assert_eq!(store.read().unwrap(), mixed_contents());
    }

    #[test]
    fn test_local_round_trip_non_ascii() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::new(dir.path().join("syspurpose.json"));

        let mut c = Contents::new();
        c.insert("role", "Σύστημα");
        c.insert("addons", vec!["πρόσθετο".to_string(), "addon".to_string()]);
        store.write(&c).unwrap();

        assert_eq!(store.read().unwrap(), c);
    }
}
