// src/identity.rs

//! Consumer identity
//!
//! A registered system is identified by its consumer UUID, which the
//! entitlement server embeds as the common name of the consumer
//! certificate. No certificate means the system is not registered.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;
use x509_cert::der::DecodePem;
use x509_cert::Certificate;

use crate::config::IdentityConfig;
use crate::error::{Error, Result};

/// Source of the consumer UUID
pub trait ConsumerIdentity {
    /// The consumer UUID, or `None` when the system is not registered
    fn consumer_uuid(&self) -> Result<Option<String>>;
}

/// A fixed UUID (or none), for configured overrides and tests
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity(Option<String>);

impl StaticIdentity {
    pub fn new(uuid: impl Into<String>) -> Self {
        Self(Some(uuid.into()))
    }

    pub fn unregistered() -> Self {
        Self(None)
    }
}

impl ConsumerIdentity for StaticIdentity {
    fn consumer_uuid(&self) -> Result<Option<String>> {
        Ok(self.0.clone())
    }
}

/// Reads the UUID from the consumer certificate's subject
#[derive(Debug, Clone)]
pub struct CertificateIdentity {
    cert_path: PathBuf,
}

impl CertificateIdentity {
    pub fn new(cert_path: impl Into<PathBuf>) -> Self {
        Self {
            cert_path: cert_path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.cert_path
    }
}

impl ConsumerIdentity for CertificateIdentity {
    fn consumer_uuid(&self) -> Result<Option<String>> {
        let pem = match fs::read(&self.cert_path) {
            Ok(pem) => pem,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No consumer certificate at {}", self.cert_path.display());
                return Ok(None);
            }
            Err(e) => return Err(Error::io(&self.cert_path, e)),
        };

        let cert = Certificate::from_pem(&pem).map_err(|e| {
            Error::Identity(format!(
                "Failed to parse consumer certificate {}: {}",
                self.cert_path.display(),
                e
            ))
        })?;

        let subject = cert.tbs_certificate.subject.to_string();
        common_name(&subject).map(|cn| Some(cn.to_string())).ok_or_else(|| {
            Error::Identity(format!(
                "Consumer certificate {} has no CN in subject '{}'",
                self.cert_path.display(),
                subject
            ))
        })
    }
}

/// Pick the identity source described by `config`
///
/// An explicit `consumer_uuid` wins over the certificate.
pub fn from_config(config: &IdentityConfig) -> Box<dyn ConsumerIdentity> {
    match &config.consumer_uuid {
        Some(uuid) => Box::new(StaticIdentity::new(uuid.clone())),
        None => Box::new(CertificateIdentity::new(&config.consumer_cert)),
    }
}

/// Extract the CN attribute from an RFC 4514 subject string
pub fn common_name(subject: &str) -> Option<&str> {
    subject
        .split([',', '+'])
        .map(str::trim)
        .find_map(|rdn| {
            let (attr, value) = rdn.split_once('=')?;
            attr.trim().eq_ignore_ascii_case("CN").then(|| value.trim())
        })
        .filter(|cn| !cn.is_empty())
}
