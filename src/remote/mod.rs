// src/remote/mod.rs

//! Entitlement server boundary
//!
//! The sync engine talks to the server only through [`RemoteGateway`].
//! Every call returns a typed [`RemoteError`] so the orchestrator can
//! decide, per error kind, to fall back to a local-only sync instead of
//! failing.
//!
//! The server names two fields differently from the local file
//! (`serviceLevel`, `addOns`); the translation helpers here are the only
//! place that vocabulary crosses over.

pub mod http;

pub use http::CandlepinClient;

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

use crate::attributes::{Contents, Field, SyspurposeAttributes, Value};
use crate::error::Error;

/// Capability a server must advertise to take part in syspurpose sync
pub const SYSPURPOSE_CAPABILITY: &str = "syspurpose";

/// Failures talking to the entitlement server
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Transport failure, timeout or refused connection
    #[error("entitlement server unavailable: {0}")]
    Unavailable(String),

    /// The server answered with a non-success status
    #[error("HTTP {code} from {url}")]
    Status { code: u16, url: String },

    /// The response body wasn't what the endpoint promises
    #[error("malformed response from entitlement server: {0}")]
    Malformed(String),

    /// There is no consumer to talk about
    #[error("system is not registered")]
    NotRegistered,
}

/// Operations the sync engine needs from the entitlement server
pub trait RemoteGateway {
    /// Whether the server advertises `name` in its capabilities
    fn has_capability(&self, name: &str) -> Result<bool, RemoteError>;

    /// Current system purpose of the consumer, in server field names
    ///
    /// Fields the server doesn't know about are absent from the map.
    fn get_remote_contents(&self, consumer_uuid: &str) -> Result<Contents, RemoteError>;

    /// Update the consumer's system purpose
    fn push(&self, consumer_uuid: &str, update: &RemoteUpdate) -> Result<(), RemoteError>;

    /// Values the consumer's organization accepts, in local field names
    fn get_valid_fields(&self, consumer_uuid: &str) -> Result<ValidFields, RemoteError>;
}

impl<G: RemoteGateway + ?Sized> RemoteGateway for &G {
    fn has_capability(&self, name: &str) -> Result<bool, RemoteError> {
        (**self).has_capability(name)
    }

    fn get_remote_contents(&self, consumer_uuid: &str) -> Result<Contents, RemoteError> {
        (**self).get_remote_contents(consumer_uuid)
    }

    fn push(&self, consumer_uuid: &str, update: &RemoteUpdate) -> Result<(), RemoteError> {
        (**self).push(consumer_uuid, update)
    }

    fn get_valid_fields(&self, consumer_uuid: &str) -> Result<ValidFields, RemoteError> {
        (**self).get_valid_fields(consumer_uuid)
    }
}

impl<G: RemoteGateway + ?Sized> RemoteGateway for Box<G> {
    fn has_capability(&self, name: &str) -> Result<bool, RemoteError> {
        (**self).has_capability(name)
    }

    fn get_remote_contents(&self, consumer_uuid: &str) -> Result<Contents, RemoteError> {
        (**self).get_remote_contents(consumer_uuid)
    }

    fn push(&self, consumer_uuid: &str, update: &RemoteUpdate) -> Result<(), RemoteError> {
        (**self).push(consumer_uuid, update)
    }

    fn get_valid_fields(&self, consumer_uuid: &str) -> Result<ValidFields, RemoteError> {
        (**self).get_valid_fields(consumer_uuid)
    }
}

/// Gateway for systems without a server connection
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineGateway;

impl RemoteGateway for OfflineGateway {
    fn has_capability(&self, _name: &str) -> Result<bool, RemoteError> {
        Err(RemoteError::NotRegistered)
    }

    fn get_remote_contents(&self, _consumer_uuid: &str) -> Result<Contents, RemoteError> {
        Err(RemoteError::NotRegistered)
    }

    fn push(&self, _consumer_uuid: &str, _update: &RemoteUpdate) -> Result<(), RemoteError> {
        Err(RemoteError::NotRegistered)
    }

    fn get_valid_fields(&self, _consumer_uuid: &str) -> Result<ValidFields, RemoteError> {
        Err(RemoteError::NotRegistered)
    }
}

/// Body of a consumer update
///
/// `None` fields are not sent. An empty string or empty list clears the
/// field on the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RemoteUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<String>,

    #[serde(rename = "serviceLevel", skip_serializing_if = "Option::is_none")]
    pub service_level: Option<String>,

    #[serde(rename = "addOns", skip_serializing_if = "Option::is_none")]
    pub addons: Option<Vec<String>>,
}

impl RemoteUpdate {
    /// Build the update that brings `remote` in line with `merged`
    ///
    /// Both maps use local field names. Only fields the remote reports are
    /// included; returns `None` when every such field already matches.
    /// Fails with `InvalidArgument` when a known field in `merged` holds a
    /// value the server can't store.
    pub fn pending(merged: &Contents, remote: &Contents) -> Result<Option<RemoteUpdate>, Error> {
        let reported: Vec<Field> = Field::ALL
            .into_iter()
            .filter(|field| remote.contains_key(field.as_ref()))
            .collect();

        let in_sync = reported.iter().all(|field| {
            let merged_val = merged.get(field.as_ref()).unwrap_or(&Value::Null);
            remote
                .get(field.as_ref())
                .is_some_and(|remote_val| merged_val.same_as(remote_val))
        });
        if in_sync {
            return Ok(None);
        }

        let attrs = SyspurposeAttributes::try_from(merged)?;
        let mut update = RemoteUpdate::default();
        for field in reported {
            update.copy_field(field, &attrs);
        }
        Ok(Some(update))
    }

    fn copy_field(&mut self, field: Field, attrs: &SyspurposeAttributes) {
        let text = || Some(attrs.scalar(field).unwrap_or_default().to_string());
        match field {
            Field::Role => self.role = text(),
            Field::Usage => self.usage = text(),
            Field::ServiceLevelAgreement => self.service_level = text(),
            Field::Addons => self.addons = Some(attrs.addons.clone()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.role.is_none() && self.usage.is_none() && self.service_level.is_none() && self.addons.is_none()
    }
}

/// Server-advertised acceptable values per field
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidFields(BTreeMap<String, Vec<String>>);

impl ValidFields {
    pub fn new(fields: BTreeMap<String, Vec<String>>) -> Self {
        Self(fields)
    }

    /// Build from the server's `systemPurposeAttributes` object
    ///
    /// The server reports `roles` and `support_level` where the local file
    /// says `role` and `service_level_agreement`.
    pub fn from_server(raw: BTreeMap<String, Vec<String>>) -> Self {
        let fields = raw
            .into_iter()
            .map(|(key, values)| {
                let key = match key.as_str() {
                    "roles" => Field::Role.to_string(),
                    "support_level" => Field::ServiceLevelAgreement.to_string(),
                    other => match Field::from_server_name(other) {
                        Some(field) => field.to_string(),
                        None => key,
                    },
                };
                (key, values)
            })
            .collect();
        Self(fields)
    }

    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.0.get(key).map(|v| v.as_slice())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(|k| k.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Case-insensitive membership test
    pub fn accepts(&self, key: &str, value: &str) -> bool {
        let wanted = value.to_lowercase();
        self.get(key)
            .is_some_and(|valid| valid.iter().any(|v| v.to_lowercase() == wanted))
    }
}

/// Rename server field names to local ones
pub fn translate_from_server(server: &Contents) -> Contents {
    server
        .iter()
        .map(|(key, value)| {
            let key = match Field::from_server_name(key) {
                Some(field) => field.to_string(),
                None => key.clone(),
            };
            (key, value.clone())
        })
        .collect()
}
