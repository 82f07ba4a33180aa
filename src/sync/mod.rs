// src/sync/mod.rs

//! Synced store: the orchestrator tying stores, merge and server together
//!
//! A [`SyncedStore`] holds the local attributes in memory. Mutators edit
//! that copy; [`SyncedStore::sync`] reconciles it with the cache and the
//! entitlement server and persists the outcome:
//!
//! 1. check that the consumer is registered and the server supports
//!    syspurpose
//! 2. fetch the remote attributes and translate their names
//! 3. three-way merge local against remote, with the cache as base
//! 4. write the truthy subset of the result locally
//! 5. push to the server only if a field it reports differs
//! 6. write the result to the cache
//!
//! The cache records what the server last agreed to. Any server failure
//! before the merge degrades to a local-only sync, which keeps the local
//! file and leaves the cache alone. A failed push keeps the previous
//! cached value for every field the server still disagrees on, so the
//! next sync sees the local edit again and retries it.

mod report;
mod validation;

pub use report::{SyncReport, SERVER_SOURCE};
pub use validation::{check_values, ValidationWarning};

use std::path::PathBuf;

use strum_macros::{AsRefStr, Display};
use tracing::{debug, info, warn};

use crate::attributes::{Contents, Field, Value};
use crate::config::SyspurposeConfig;
use crate::error::{Error, Result};
use crate::identity::ConsumerIdentity;
use crate::merge::{three_way_merge, ConflictPolicy, DiffChange};
use crate::remote::{translate_from_server, RemoteGateway, RemoteUpdate, ValidFields, SYSPURPOSE_CAPABILITY};
use crate::store::{CacheStore, LocalStore};

/// How far a sync got
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum SyncMode {
    /// Local, cache and server were reconciled
    Full,
    /// The server was unavailable; only the local file was written
    LocalOnly,
}

/// Outcome of one [`SyncedStore::sync`]
#[derive(Debug, Clone, PartialEq)]
pub struct SyncResult {
    /// The reconciled attributes
    pub result: Contents,
    pub mode: SyncMode,
    /// The server accepted an update
    pub remote_changed: bool,
    /// The local file was rewritten
    pub local_changed: bool,
    /// The cache file was rewritten
    pub cached_changed: bool,
    /// Per-field provenance of the merge
    pub changes: Vec<DiffChange>,
    /// Non-fatal problems hit along the way
    pub warnings: Vec<String>,
    /// Local file the result was written to
    pub local_path: PathBuf,
}

impl SyncResult {
    /// Whether the sync touched nothing
    pub fn is_noop(&self) -> bool {
        !self.remote_changed && !self.local_changed && !self.cached_changed
    }

    pub fn report(&self) -> SyncReport {
        SyncReport::from_result(self)
    }
}

/// Local attributes kept in step with the cache and entitlement server
pub struct SyncedStore<G: RemoteGateway> {
    local: LocalStore,
    cache: CacheStore,
    gateway: G,
    consumer_uuid: Option<String>,
    on_conflict: ConflictPolicy,
    use_valid_fields: bool,
    local_contents: Contents,
    changed: bool,
    // None: not fetched yet; Some(None): fetch failed, skip checks
    valid_fields: Option<Option<ValidFields>>,
    warnings: Vec<ValidationWarning>,
}

impl<G: RemoteGateway> SyncedStore<G> {
    /// Create a store over explicit files, reading the local contents
    pub fn new(local: LocalStore, cache: CacheStore, gateway: G, consumer_uuid: Option<String>) -> Result<Self> {
        let local_contents = local.read_or_default()?;
        debug!(
            "Loaded {} syspurpose values from {}",
            local_contents.len(),
            local.path().display()
        );

        Ok(Self {
            local,
            cache,
            gateway,
            consumer_uuid,
            on_conflict: ConflictPolicy::default(),
            use_valid_fields: false,
            local_contents,
            changed: false,
            valid_fields: None,
            warnings: Vec::new(),
        })
    }

    /// Create a store from configuration
    ///
    /// An identity that can't be read is treated as "not registered".
    pub fn open(config: &SyspurposeConfig, gateway: G, identity: &dyn ConsumerIdentity) -> Result<Self> {
        let consumer_uuid = match identity.consumer_uuid() {
            Ok(uuid) => uuid,
            Err(e) => {
                warn!("Unable to determine consumer identity, continuing unregistered: {}", e);
                None
            }
        };

        Ok(Self::new(config.local_store(), config.cache_store(), gateway, consumer_uuid)?
            .with_conflict_policy(config.sync.on_conflict)
            .with_valid_fields(config.sync.use_valid_fields))
    }

    pub fn with_conflict_policy(mut self, on_conflict: ConflictPolicy) -> Self {
        self.on_conflict = on_conflict;
        self
    }

    /// Check `set` and `add` against the server's valid fields
    pub fn with_valid_fields(mut self, enabled: bool) -> Self {
        self.use_valid_fields = enabled;
        self
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn consumer_uuid(&self) -> Option<&str> {
        self.consumer_uuid.as_deref()
    }

    pub fn local_path(&self) -> &std::path::Path {
        self.local.path()
    }

    /// Validation warnings raised by edits so far
    pub fn warnings(&self) -> &[ValidationWarning] {
        &self.warnings
    }

    /// Whether there are unsynced edits
    pub fn is_changed(&self) -> bool {
        self.changed
    }

    /// The in-memory local attributes, including unsynced edits
    pub fn get_local_contents(&self) -> &Contents {
        &self.local_contents
    }

    /// The last-synced snapshot
    pub fn get_cached_contents(&self) -> Result<Contents> {
        self.cache.read_or_default()
    }

    /// Replace the local attributes and write them immediately
    pub fn update_local(&mut self, contents: Contents) -> Result<bool> {
        self.local_contents = contents.truthy();
        self.local.write_if_changed(&self.local_contents)
    }

    /// Set `key` to a single value
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<bool> {
        let value = value.into();
        let changed = self.local_contents.set(key, value.clone())?;
        if let Some(text) = value.as_text() {
            self.validate(key, &[text.to_string()]);
        }
        self.changed |= changed;
        Ok(changed)
    }

    /// Clear `key`
    pub fn unset(&mut self, key: &str) -> Result<bool> {
        let changed = self.local_contents.unset(key)?;
        self.changed |= changed;
        Ok(changed)
    }

    /// Add `value` to the list under `key`
    pub fn add(&mut self, key: &str, value: impl Into<String>) -> Result<bool> {
        let value = value.into();
        let changed = self.local_contents.add(key, value.clone())?;
        self.validate(key, &[value]);
        self.changed |= changed;
        Ok(changed)
    }

    /// Remove `value` from the list under `key`
    pub fn remove(&mut self, key: &str, value: &str) -> Result<bool> {
        let changed = self.local_contents.remove_value(key, value)?;
        self.changed |= changed;
        Ok(changed)
    }

    /// Reconcile local, cache and server, and persist the result
    ///
    /// Server failures never surface as errors; they turn the sync into a
    /// local-only one. Only local I/O failures are returned.
    pub fn sync(&mut self) -> Result<SyncResult> {
        let Some(uuid) = self.consumer_uuid.clone() else {
            debug!("System is not registered, syncing locally only");
            return self.sync_local_only(Vec::new());
        };

        match self.gateway.has_capability(SYSPURPOSE_CAPABILITY) {
            Ok(true) => {}
            Ok(false) => {
                info!("Entitlement server does not support system purpose, syncing locally only");
                return self.sync_local_only(Vec::new());
            }
            Err(e) => {
                warn!("Unable to reach entitlement server: {}", e);
                return self.sync_local_only(vec![format!("Unable to reach entitlement server: {e}")]);
            }
        }

        let remote = match self.gateway.get_remote_contents(&uuid) {
            Ok(server) => translate_from_server(&server),
            Err(e) => {
                warn!("Unable to fetch system purpose from entitlement server: {}", e);
                return self.sync_local_only(vec![format!(
                    "Unable to fetch system purpose from entitlement server: {e}"
                )]);
            }
        };

        let base = self.cache.read_or_default()?;
        let outcome = three_way_merge(&self.local_contents, &base, &remote, self.on_conflict);
        for key in &outcome.conflicts {
            info!("'{}' changed both locally and on the server, {} value kept", key, self.on_conflict);
        }

        let local_contents = outcome.result.truthy();
        let local_changed = self.local.write_if_changed(&local_contents)?;

        let mut warnings = Vec::new();
        let (remote_changed, pushed) = match RemoteUpdate::pending(&outcome.result, &remote) {
            Ok(None) => {
                debug!("Entitlement server already up to date");
                (false, true)
            }
            Ok(Some(update)) => match self.gateway.push(&uuid, &update) {
                Ok(()) => (true, true),
                Err(e) => {
                    warn!("Unable to update system purpose on entitlement server: {}", e);
                    warnings.push(format!("Unable to update system purpose on entitlement server: {e}"));
                    (false, false)
                }
            },
            Err(e) => {
                warn!("Not updating entitlement server: {}", e);
                warnings.push(format!("Not updating entitlement server: {e}"));
                (false, false)
            }
        };

        let cached = if pushed {
            outcome.result.clone()
        } else {
            agreed_with_server(&outcome.result, &base, &remote)
        };
        let cached_changed = self.cache.write_if_changed(&cached)?;

        self.local_contents = local_contents;
        self.changed = false;

        Ok(SyncResult {
            result: outcome.result,
            mode: SyncMode::Full,
            remote_changed,
            local_changed,
            cached_changed,
            changes: outcome.changes,
            warnings,
            local_path: self.local.path().to_path_buf(),
        })
    }

    fn sync_local_only(&mut self, warnings: Vec<String>) -> Result<SyncResult> {
        let base = self.cache.read_or_default()?;
        let outcome = three_way_merge(&self.local_contents, &base, &Contents::new(), self.on_conflict);

        let local_contents = outcome.result.truthy();
        let local_changed = self.local.write_if_changed(&local_contents)?;
        self.local_contents = local_contents.clone();
        self.changed = false;

        Ok(SyncResult {
            result: local_contents,
            mode: SyncMode::LocalOnly,
            remote_changed: false,
            local_changed,
            cached_changed: false,
            changes: outcome.changes,
            warnings,
            local_path: self.local.path().to_path_buf(),
        })
    }

    /// Sync if any mutator reported a change
    pub fn finish(mut self) -> Result<Option<SyncResult>> {
        if !self.changed {
            debug!("No syspurpose changes to sync");
            return Ok(None);
        }
        self.sync().map(Some)
    }

    /// Run `f` against the store, then [`finish`](Self::finish) it
    ///
    /// If `f` fails its edits are dropped unsynced and the error is
    /// returned.
    pub fn scoped<T, E, F>(mut self, f: F) -> std::result::Result<(T, Option<SyncResult>), E>
    where
        F: FnOnce(&mut Self) -> std::result::Result<T, E>,
        E: From<Error>,
    {
        let value = f(&mut self)?;
        let result = self.finish()?;
        Ok((value, result))
    }

    fn validate(&mut self, key: &str, values: &[String]) {
        if !self.use_valid_fields {
            return;
        }
        let Some(valid) = self.valid_fields() else {
            return;
        };
        if let Some(warning) = check_values(valid, key, values) {
            warn!("{}", warning);
            self.warnings.push(warning);
        }
    }

    fn valid_fields(&mut self) -> Option<&ValidFields> {
        if self.valid_fields.is_none() {
            let fetched = match &self.consumer_uuid {
                None => None,
                Some(uuid) => match self.gateway.get_valid_fields(uuid) {
                    Ok(valid) => Some(valid),
                    Err(e) => {
                        debug!("Unable to fetch valid fields, skipping validation: {}", e);
                        None
                    }
                },
            };
            self.valid_fields = Some(fetched);
        }
        self.valid_fields.as_ref().and_then(|v| v.as_ref())
    }
}

/// The merged result, minus what the server hasn't accepted
///
/// Fields the server reports with a different value keep their previous
/// cached value, or stay out of the cache if it had none.
fn agreed_with_server(merged: &Contents, base: &Contents, remote: &Contents) -> Contents {
    let mut agreed = merged.clone();
    for field in Field::ALL {
        let key = field.as_ref();
        let Some(remote_val) = remote.get(key) else {
            continue;
        };
        if merged.get(key).unwrap_or(&Value::Null).same_as(remote_val) {
            continue;
        }
        match base.get(key) {
            Some(previous) => agreed.insert(key, previous.clone()),
            None => agreed.remove(key),
        };
    }
    agreed
}
