// src/remote/http.rs

//! HTTP gateway to a candlepin entitlement server
//!
//! A thin blocking client covering only the calls syspurpose sync needs.
//! Connection failures are retried with a linear backoff; any other
//! failure is returned to the caller at once.

use std::cell::OnceCell;
use std::collections::BTreeMap;
use std::fs;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::{Certificate, Identity, Proxy};
use tracing::{debug, info, warn};
use url::Url;

use super::{RemoteError, RemoteGateway, RemoteUpdate, ValidFields};
use crate::attributes::{Contents, Field, Value};
use crate::config::{IdentityConfig, ServerConfig};
use crate::error::{Error, Result};

/// Retry delay in milliseconds, multiplied by the attempt number
const RETRY_DELAY_MS: u64 = 1000;

/// Blocking client for the entitlement server's consumer API
pub struct CandlepinClient {
    client: Client,
    base_url: Url,
    max_retries: u32,
    capabilities: OnceCell<Vec<String>>,
}

impl CandlepinClient {
    /// Build a client from the `[server]` and `[identity]` config sections
    ///
    /// The consumer certificate and key are presented for mutual TLS when
    /// both files exist.
    pub fn new(server: &ServerConfig, identity: &IdentityConfig) -> Result<Self> {
        let url = server
            .url
            .as_deref()
            .ok_or_else(|| Error::Config("server.url is not set".to_string()))?;
        let base_url = parse_base_url(url)?;

        let mut builder = Client::builder().timeout(Duration::from_secs(server.timeout_secs));

        if let Some(ca_path) = &server.ca_cert {
            let pem = fs::read(ca_path).map_err(|e| Error::io(ca_path, e))?;
            let cert = Certificate::from_pem(&pem).map_err(|e| {
                Error::Config(format!("Invalid CA certificate {}: {e}", ca_path.display()))
            })?;
            builder = builder.add_root_certificate(cert);
        }

        if let Some(proxy_url) = &server.proxy {
            let proxy = Proxy::all(proxy_url.as_str())
                .map_err(|e| Error::Config(format!("Invalid proxy URL '{proxy_url}': {e}")))?;
            debug!("Using proxy for entitlement server requests");
            builder = builder.proxy(proxy);
        }

        if let Some(client_identity) = load_client_identity(identity)? {
            builder = builder.identity(client_identity);
        }

        let client = builder
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            max_retries: server.retries.max(1),
            capabilities: OnceCell::new(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> std::result::Result<Url, RemoteError> {
        self.base_url
            .join(path)
            .map_err(|e| RemoteError::Malformed(format!("bad endpoint '{path}': {e}")))
    }

    fn send_with_retry(
        &self,
        url: &Url,
        build: impl Fn() -> RequestBuilder,
    ) -> std::result::Result<Response, RemoteError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match build().send() {
                Ok(response) => {
                    let status = response.status();
                    if !status.is_success() {
                        return Err(RemoteError::Status {
                            code: status.as_u16(),
                            url: url.to_string(),
                        });
                    }
                    return Ok(response);
                }
                Err(e) => {
                    if !e.is_connect() || attempt >= self.max_retries {
                        return Err(RemoteError::Unavailable(format!(
                            "{url} failed after {attempt} attempts: {e}"
                        )));
                    }
                    warn!("Request to {} failed (attempt {}): {}, retrying...", url, attempt, e);
                    std::thread::sleep(Duration::from_millis(RETRY_DELAY_MS * attempt as u64));
                }
            }
        }
    }

    fn get_json(&self, path: &str) -> std::result::Result<serde_json::Value, RemoteError> {
        let url = self.endpoint(path)?;
        debug!("GET {}", url);
        let response = self.send_with_retry(&url, || self.client.get(url.clone()))?;
        response
            .json()
            .map_err(|e| RemoteError::Malformed(format!("{url}: {e}")))
    }
}

impl RemoteGateway for CandlepinClient {
    fn has_capability(&self, name: &str) -> std::result::Result<bool, RemoteError> {
        if self.capabilities.get().is_none() {
            let status = self.get_json("status")?;
            let capabilities = string_list(status.get("managerCapabilities"));
            debug!("Server capabilities: {}", capabilities.join(", "));
            let _ = self.capabilities.set(capabilities);
        }

        Ok(self
            .capabilities
            .get()
            .is_some_and(|caps| caps.iter().any(|c| c == name)))
    }

    fn get_remote_contents(&self, consumer_uuid: &str) -> std::result::Result<Contents, RemoteError> {
        let consumer = self.get_json(&format!("consumers/{consumer_uuid}"))?;
        let consumer = consumer
            .as_object()
            .ok_or_else(|| RemoteError::Malformed("consumer is not a JSON object".to_string()))?;

        let mut contents = Contents::new();
        for field in Field::ALL {
            if let Some(value) = consumer.get(field.server_name()) {
                contents.insert(field.server_name(), Value::from(value.clone()));
            }
        }
        Ok(contents)
    }

    fn push(&self, consumer_uuid: &str, update: &RemoteUpdate) -> std::result::Result<(), RemoteError> {
        let url = self.endpoint(&format!("consumers/{consumer_uuid}"))?;
        debug!("PUT {}", url);
        self.send_with_retry(&url, || self.client.put(url.clone()).json(update))?;
        info!("Updated system purpose for consumer {}", consumer_uuid);
        Ok(())
    }

    fn get_valid_fields(&self, consumer_uuid: &str) -> std::result::Result<ValidFields, RemoteError> {
        let owner = self.get_json(&format!("consumers/{consumer_uuid}/owner"))?;
        let owner_key = owner
            .get("key")
            .and_then(|k| k.as_str())
            .ok_or_else(|| RemoteError::Malformed("owner has no key".to_string()))?;

        let purpose = self.get_json(&format!("owners/{owner_key}/system_purpose"))?;
        let raw: BTreeMap<String, Vec<String>> = purpose
            .get("systemPurposeAttributes")
            .and_then(|a| a.as_object())
            .map(|attrs| {
                attrs
                    .iter()
                    .map(|(key, values)| (key.clone(), string_list(Some(values))))
                    .collect()
            })
            .unwrap_or_default();

        Ok(ValidFields::from_server(raw))
    }
}

/// Parse the server URL so that relative endpoints join under its path
fn parse_base_url(url: &str) -> Result<Url> {
    let mut base =
        Url::parse(url).map_err(|e| Error::Config(format!("Invalid server URL '{url}': {e}")))?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    Ok(base)
}

fn load_client_identity(config: &IdentityConfig) -> Result<Option<Identity>> {
    if !config.consumer_cert.exists() || !config.consumer_key.exists() {
        debug!("No consumer certificate/key pair, connecting without client identity");
        return Ok(None);
    }

    let mut pem = fs::read(&config.consumer_key).map_err(|e| Error::io(&config.consumer_key, e))?;
    pem.push(b'\n');
    pem.extend(fs::read(&config.consumer_cert).map_err(|e| Error::io(&config.consumer_cert, e))?);

    Identity::from_pem(&pem).map(Some).map_err(|e| {
        Error::Identity(format!(
            "Failed to load consumer certificate {}: {e}",
            config.consumer_cert.display()
        ))
    })
}

fn string_list(value: Option<&serde_json::Value>) -> Vec<String> {
    value
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|i| i.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
