// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::path::PathBuf;

use syspurpose::{
    CacheStore, Contents, Field, LocalStore, RemoteError, RemoteGateway, RemoteUpdate,
    SyncedStore, ValidFields, Value,
};
use tempfile::TempDir;

pub const CONSUMER_UUID: &str = "5e1b2c3d-aaaa-bbbb-cccc-0123456789ab";

/// How the fake server answers the capability check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Supported,
    Unsupported,
    Unreachable,
}

/// In-memory entitlement server
///
/// Successful pushes are applied to `remote`, so a following sync sees
/// what a real server would return.
pub struct MockGateway {
    pub capability: Capability,
    /// Consumer attributes in server field names
    pub remote: RefCell<Contents>,
    pub fail_fetch: bool,
    pub fail_push: bool,
    pub valid: Option<ValidFields>,
    pub pushes: RefCell<Vec<RemoteUpdate>>,
    pub capability_calls: Cell<usize>,
    pub valid_field_calls: Cell<usize>,
}

impl MockGateway {
    pub fn new(remote: Contents) -> Self {
        Self {
            capability: Capability::Supported,
            remote: RefCell::new(remote),
            fail_fetch: false,
            fail_push: false,
            valid: None,
            pushes: RefCell::new(Vec::new()),
            capability_calls: Cell::new(0),
            valid_field_calls: Cell::new(0),
        }
    }

    /// A server reporting all four fields as unset
    pub fn empty_server() -> Self {
        Self::new(server_contents(&[
            ("role", ""),
            ("usage", ""),
            ("serviceLevel", ""),
        ]))
        .with_server_addons(&[])
    }

    pub fn with_server_addons(self, addons: &[&str]) -> Self {
        self.remote.borrow_mut().insert(
            "addOns",
            addons.iter().map(|a| a.to_string()).collect::<Vec<_>>(),
        );
        self
    }

    pub fn push_count(&self) -> usize {
        self.pushes.borrow().len()
    }

    pub fn remote_value(&self, server_key: &str) -> Option<Value> {
        self.remote.borrow().get(server_key).cloned()
    }
}

impl RemoteGateway for MockGateway {
    fn has_capability(&self, name: &str) -> Result<bool, RemoteError> {
        self.capability_calls.set(self.capability_calls.get() + 1);
        match self.capability {
            Capability::Supported => Ok(name == "syspurpose"),
            Capability::Unsupported => Ok(false),
            Capability::Unreachable => Err(RemoteError::Unavailable("connection refused".to_string())),
        }
    }

    fn get_remote_contents(&self, _consumer_uuid: &str) -> Result<Contents, RemoteError> {
        if self.fail_fetch {
            return Err(RemoteError::Status {
                code: 500,
                url: "https://mock/consumers".to_string(),
            });
        }
        Ok(self.remote.borrow().clone())
    }

    fn push(&self, _consumer_uuid: &str, update: &RemoteUpdate) -> Result<(), RemoteError> {
        if self.fail_push {
            return Err(RemoteError::Unavailable("timed out".to_string()));
        }

        let mut remote = self.remote.borrow_mut();
        if let Some(role) = &update.role {
            remote.insert(Field::Role.server_name(), role.as_str());
        }
        if let Some(usage) = &update.usage {
            remote.insert(Field::Usage.server_name(), usage.as_str());
        }
        if let Some(sla) = &update.service_level {
            remote.insert(Field::ServiceLevelAgreement.server_name(), sla.as_str());
        }
        if let Some(addons) = &update.addons {
            remote.insert(Field::Addons.server_name(), addons.clone());
        }
        self.pushes.borrow_mut().push(update.clone());
        Ok(())
    }

    fn get_valid_fields(&self, _consumer_uuid: &str) -> Result<ValidFields, RemoteError> {
        self.valid_field_calls.set(self.valid_field_calls.get() + 1);
        self.valid
            .clone()
            .ok_or_else(|| RemoteError::Status {
                code: 404,
                url: "https://mock/owners".to_string(),
            })
    }
}

/// Scratch directory holding a local file and a cache file
pub struct Fixture {
    pub dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn local_path(&self) -> PathBuf {
        self.dir.path().join("syspurpose/syspurpose.json")
    }

    pub fn cache_path(&self) -> PathBuf {
        self.dir.path().join("cache/syspurpose.json")
    }

    pub fn local(&self) -> LocalStore {
        LocalStore::new(self.local_path())
    }

    pub fn cache(&self) -> CacheStore {
        CacheStore::new(self.cache_path())
    }

    pub fn write_local(&self, contents: &Contents) {
        self.local().write(contents).unwrap();
    }

    pub fn write_cache(&self, contents: &Contents) {
        self.cache().write(contents).unwrap();
    }

    pub fn read_local(&self) -> Contents {
        self.local().read().unwrap()
    }

    pub fn read_cache(&self) -> Contents {
        self.cache().read().unwrap()
    }

    /// Open a registered store against `gateway`
    pub fn store<'g>(&self, gateway: &'g MockGateway) -> SyncedStore<&'g MockGateway> {
        SyncedStore::new(
            self.local(),
            self.cache(),
            gateway,
            Some(CONSUMER_UUID.to_string()),
        )
        .unwrap()
    }

    /// Open a store for a system that isn't registered
    pub fn unregistered_store<'g>(&self, gateway: &'g MockGateway) -> SyncedStore<&'g MockGateway> {
        SyncedStore::new(self.local(), self.cache(), gateway, None).unwrap()
    }
}

/// Build contents from string pairs
pub fn contents(pairs: &[(&str, &str)]) -> Contents {
    pairs.iter().map(|(k, v)| (*k, *v)).collect()
}

/// Same as [`contents`], named for maps in server vocabulary
pub fn server_contents(pairs: &[(&str, &str)]) -> Contents {
    contents(pairs)
}
