//! Credential store keyed by registry host
//!
//! Reads the same JSON layout the registry login command writes:
//! `{"registry": {"auths": {"<host>": {"username", "password", "auth"}}}}`
//! where `auth` is base64 of `username:password`.

use crate::error::{IoResultExt, MigrateError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Directory under `$HOME` holding the credentials file
pub const CONFIG_DIR: &str = ".artifact-migrate";

/// Credentials file name
pub const CONFIG_FILE: &str = "config.json";

/// Basic-auth credentials
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    #[serde(default, skip_serializing)]
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    registry: Option<RegistrySection>,
}

#[derive(Debug, Default, Deserialize)]
struct RegistrySection {
    #[serde(default)]
    auths: HashMap<String, AuthEntry>,
}

#[derive(Debug, Default, Deserialize)]
struct AuthEntry {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    auth: String,
    #[serde(default, rename = "serveraddress")]
    server_address: String,
}

impl AuthEntry {
    fn into_credentials(self, key: &str) -> Result<Credentials> {
        if !self.username.is_empty() {
            return Ok(Credentials::new(self.username, self.password));
        }

        let decoded = STANDARD
            .decode(self.auth.trim())
            .map_err(|e| MigrateError::config(format!("Invalid auth for '{}': {}", key, e)))?;
        let decoded = String::from_utf8(decoded)
            .map_err(|e| MigrateError::config(format!("Invalid auth for '{}': {}", key, e)))?;
        let (user, password) = decoded
            .split_once(':')
            .ok_or_else(|| MigrateError::config(format!("Invalid auth for '{}': missing ':'", key)))?;

        Ok(Credentials::new(user, password))
    }
}

/// Credentials indexed by registry host
#[derive(Debug, Default, Clone)]
pub struct CredentialStore {
    auths: HashMap<String, Credentials>,
}

impl CredentialStore {
    /// `$HOME/.artifact-migrate/config.json`
    pub fn default_path() -> Option<PathBuf> {
        std::env::var_os("HOME").map(|home| PathBuf::from(home).join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Load a credentials file; a missing file yields an empty store
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No credentials file at {}", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).with_path(path)?;
        Self::from_json(&content).map_err(|e| e.with_context(format!("Reading {}", path.display())))
    }

    /// Parse credentials from JSON text
    pub fn from_json(content: &str) -> Result<Self> {
        let file: ConfigFile = serde_json::from_str(content)?;
        let mut auths = HashMap::new();

        for (key, entry) in file.registry.unwrap_or_default().auths {
            if entry.username.is_empty() && entry.auth.is_empty() {
                continue;
            }
            let alias = entry.server_address.clone();
            let credentials = entry.into_credentials(&key)?;
            if !alias.is_empty() {
                auths.entry(alias).or_insert_with(|| credentials.clone());
            }
            auths.insert(key, credentials);
        }

        Ok(Self { auths })
    }

    /// Add or replace credentials for a host
    pub fn insert(&mut self, host: impl Into<String>, credentials: Credentials) {
        self.auths.insert(host.into(), credentials);
    }

    /// Find credentials for a host. Keys may be bare hosts or full URLs.
    pub fn lookup(&self, host: &str) -> Option<&Credentials> {
        if let Some(credentials) = self.auths.get(host) {
            return Some(credentials);
        }
        self.auths
            .iter()
            .find(|(key, _)| key_host(key).as_deref() == Some(host))
            .map(|(_, credentials)| credentials)
    }

    /// Find credentials for the host of a URL
    pub fn lookup_url(&self, url: &str) -> Option<&Credentials> {
        let host = key_host(url)?;
        self.lookup(&host)
    }

    pub fn is_empty(&self) -> bool {
        self.auths.is_empty()
    }
}

fn key_host(key: &str) -> Option<String> {
    let with_scheme = if key.contains("://") {
        key.to_string()
    } else {
        format!("https://{}", key)
    };
    url::Url::parse(&with_scheme)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
}
