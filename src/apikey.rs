//! API-key resolution for the mapping provider.
//!
//! Keys are looked up through a cascade, most local source first: a
//! process environment variable, a configured literal, the on-disk key
//! cache, and finally the remote key registry. A registry hit is written
//! back to the cache so later sessions can start without the RPC.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;
use thiserror::Error;

use crate::config::NetworkConfig;
use crate::traits::KeyService;

/// Error raised when no source can supply a key.
#[derive(Debug, Clone, Error)]
pub enum KeyError {
    #[error("API key {name:?} not found in environment, configuration, cache or registry")]
    NotFound { name: String },
}

// ==================== Local key cache ====================

/// Persistent key-value cache, one JSON mapping on disk.
#[derive(Debug, Clone)]
pub struct KeyCache {
    path: PathBuf,
}

impl KeyCache {
    /// Cache in the user data directory.
    pub fn new() -> Self {
        let dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("searchpanel");
        Self {
            path: dir.join("api_keys.json"),
        }
    }

    /// Cache at an explicit path (used by tests).
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    /// Read a cached key. Any read or parse failure counts as a miss.
    pub fn get(&self, name: &str) -> Option<String> {
        let raw = fs::read_to_string(&self.path).ok()?;
        let map: HashMap<String, String> = serde_json::from_str(&raw).ok()?;
        map.get(name).cloned()
    }

    pub fn put(&self, name: &str, value: &str) -> Result<()> {
        let mut map: HashMap<String, String> = fs::read_to_string(&self.path)
            .ok()
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default();
        map.insert(name.to_string(), value.to_string());

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create cache directory {parent:?}"))?;
        }
        let raw = serde_json::to_string_pretty(&map).context("Failed to serialize key cache")?;
        fs::write(&self.path, raw)
            .with_context(|| format!("Failed to write key cache {:?}", self.path))?;
        Ok(())
    }
}

impl Default for KeyCache {
    fn default() -> Self {
        Self::new()
    }
}

// ==================== Remote key registry ====================

#[derive(Debug, Deserialize)]
struct KeyResponse {
    key: Option<String>,
}

/// Key registry reached over HTTP: fetch or store a key by name.
#[derive(Clone, Debug)]
pub struct HttpKeyService {
    client: reqwest::Client,
    url: String,
}

impl HttpKeyService {
    pub fn new(url: String, network_config: &NetworkConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(
                network_config.request_timeout_secs,
            ))
            .connect_timeout(std::time::Duration::from_secs(
                network_config.connect_timeout_secs,
            ))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, url })
    }
}

impl KeyService for HttpKeyService {
    async fn fetch_key(&self, name: &str) -> Result<Option<String>> {
        let response = self
            .client
            .post(format!("{}/get", self.url))
            .json(&serde_json::json!({ "name": name }))
            .send()
            .await
            .context("Failed to reach key registry")?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Key registry returned error status: {}", status);
        }

        let data = response
            .json::<KeyResponse>()
            .await
            .context("Failed to parse key registry response")?;

        Ok(data.key)
    }

    async fn store_key(&self, name: &str, value: &str) -> Result<()> {
        let response = self
            .client
            .post(format!("{}/set", self.url))
            .json(&serde_json::json!({ "name": name, "key": value }))
            .send()
            .await
            .context("Failed to reach key registry")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Key registry returned error status: {}", status);
        }
        Ok(())
    }
}

// ==================== Resolution cascade ====================

/// Resolves one named API key through the source cascade.
#[derive(Debug, Clone)]
pub struct ApiKeyManager<S> {
    name: String,
    configured: Option<String>,
    cache: KeyCache,
    service: S,
}

impl<S: KeyService> ApiKeyManager<S> {
    pub fn new(name: String, configured: Option<String>, cache: KeyCache, service: S) -> Self {
        Self {
            name,
            configured,
            cache,
            service,
        }
    }

    fn env_var_name(&self) -> String {
        self.name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect()
    }

    /// Walk the cascade and return the first key found.
    ///
    /// A registry failure is treated as a miss (the caller degrades with
    /// a notification), never as a crash.
    pub async fn resolve(&self) -> Result<String, KeyError> {
        if let Ok(key) = std::env::var(self.env_var_name())
            && !key.is_empty()
        {
            tracing::info!(name = %self.name, "API key resolved from environment");
            return Ok(key);
        }

        if let Some(key) = &self.configured {
            tracing::info!(name = %self.name, "API key resolved from configuration");
            return Ok(key.clone());
        }

        if let Some(key) = self.cache.get(&self.name) {
            tracing::info!(name = %self.name, "API key resolved from local cache");
            return Ok(key);
        }

        match self.service.fetch_key(&self.name).await {
            Ok(Some(key)) => {
                tracing::info!(name = %self.name, "API key resolved from registry");
                if let Err(e) = self.cache.put(&self.name, &key) {
                    tracing::warn!(error = %e, "Failed to cache API key");
                }
                Ok(key)
            }
            Ok(None) => Err(KeyError::NotFound {
                name: self.name.clone(),
            }),
            Err(e) => {
                tracing::warn!(name = %self.name, error = %e, "Key registry fetch failed");
                Err(KeyError::NotFound {
                    name: self.name.clone(),
                })
            }
        }
    }

    /// Store a key, writing through to both the cache and the registry.
    pub async fn store(&self, value: &str) -> Result<()> {
        self.cache.put(&self.name, value)?;
        self.service.store_key(&self.name, value).await
    }
}
