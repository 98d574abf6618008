//! Persisted settings: active provider, credentials, volume, window size.
//!
//! Stored as TOML at `<config_dir>/polyplay/config.toml`. Queue and position
//! are never persisted.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::model::DEFAULT_VOLUME_PERCENT;
use crate::provider::ProviderKind;
use crate::session::CredentialStore;

const APP_DIR: &str = "polyplay";
const CONFIG_FILE: &str = "config.toml";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowGeometry {
    pub columns: u16,
    pub rows: u16,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub provider: String,
    pub volume: u8,
    /// Keyed by lower-case provider name
    pub credentials: BTreeMap<String, String>,
    pub window: Option<WindowGeometry>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Yandex.name().to_string(),
            volume: DEFAULT_VOLUME_PERCENT,
            credentials: BTreeMap::new(),
            window: None,
        }
    }
}

impl AppConfig {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Reads the config, falling back to defaults when the file is missing or
    /// unreadable
    pub fn load_from(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(Some(config)) => {
                tracing::debug!(path = %path.display(), "Config loaded");
                config
            }
            Ok(None) => {
                tracing::info!(path = %path.display(), "No config file, using defaults");
                Self::default()
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read config, using defaults");
                Self::default()
            }
        }
    }

    fn try_load(path: &Path) -> anyhow::Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let mut config: Self = toml::from_str(&contents)?;
        config.volume = config.volume.min(100);
        Ok(Some(config))
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents).with_context(|| format!("writing {}", path.display()))?;
        tracing::debug!(path = %path.display(), "Config saved");
        Ok(())
    }

    /// The stored provider, or the default one when the name is not registered
    pub fn provider_kind(&self) -> ProviderKind {
        ProviderKind::from_name(&self.provider).unwrap_or_else(|| {
            tracing::warn!(provider = %self.provider, "Unknown provider in config, using default");
            ProviderKind::Yandex
        })
    }
}

impl CredentialStore for AppConfig {
    fn credential(&self, kind: ProviderKind) -> Option<String> {
        self.credentials
            .get(&kind.credential_key())
            .filter(|c| !c.is_empty())
            .cloned()
    }

    fn store_credential(&mut self, kind: ProviderKind, credential: &str) {
        self.credentials.insert(kind.credential_key(), credential.to_string());
    }
}

/// Credential store that writes every accepted credential through to disk
pub struct PersistedCredentials {
    path: Option<PathBuf>,
    config: AppConfig,
}

impl PersistedCredentials {
    pub fn new(path: Option<PathBuf>, config: AppConfig) -> Self {
        Self { path, config }
    }
}

impl CredentialStore for PersistedCredentials {
    fn credential(&self, kind: ProviderKind) -> Option<String> {
        self.config.credential(kind)
    }

    fn store_credential(&mut self, kind: ProviderKind, credential: &str) {
        self.config.store_credential(kind, credential);
        let Some(path) = &self.path else {
            return;
        };
        // Other fields may have changed on disk since startup; only merge ours
        let mut on_disk = AppConfig::load_from(path);
        on_disk.store_credential(kind, credential);
        if let Err(e) = on_disk.save_to(path) {
            tracing::warn!(error = %e, "Failed to persist credential");
        }
    }
}
