use std::path::Path;

use anyhow::Context;
use serde::Deserialize;
use tracing::info;

use crate::engine::validation::{self, Limits};

/// Top-level server configuration, loaded from ephemera.toml.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    pub server: ServerSection,
    pub storage: StorageSection,
    pub limits: LimitsSection,
    pub stream: StreamSection,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub web_address: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            web_address: "0.0.0.0:8080".into(),
        }
    }
}

/// Where live rooms are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Sqlite,
}

impl std::str::FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(format!("unknown storage backend: {other}")),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    pub backend: StorageBackend,
    /// Only used by the sqlite backend.
    pub database_url: String,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            database_url: "sqlite:ephemera.db?mode=rwc".into(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LimitsSection {
    pub max_message_length: usize,
    pub max_username_length: usize,
}

impl Default for LimitsSection {
    fn default() -> Self {
        Self {
            max_message_length: validation::MAX_MESSAGE_LENGTH,
            max_username_length: validation::MAX_USERNAME_LENGTH,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StreamSection {
    /// Seconds between keep-alive comments on event streams.
    pub heartbeat_secs: u64,
}

impl Default for StreamSection {
    fn default() -> Self {
        Self { heartbeat_secs: 20 }
    }
}

impl ServerConfig {
    /// Load config from a TOML file. Falls back to defaults if the file doesn't exist.
    /// Environment variables override TOML values.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let mut config = if Path::new(path).exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {path}"))?;
            Self::from_toml(&contents)
                .with_context(|| format!("failed to parse config file {path}"))?
        } else {
            info!("No config file found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that parse but cannot run.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.stream.heartbeat_secs == 0 {
            anyhow::bail!("stream.heartbeat_secs must be at least 1");
        }
        Ok(())
    }

    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Apply overrides from a variable lookup (the process environment in production).
    fn apply_env_overrides(
        &mut self,
        var: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<()> {
        if let Some(v) = var("WEB_ADDRESS") {
            self.server.web_address = v;
        }
        if let Some(v) = var("STORAGE_BACKEND") {
            self.storage.backend = v.parse().map_err(anyhow::Error::msg)?;
        }
        if let Some(v) = var("DATABASE_URL") {
            self.storage.database_url = v;
        }
        if let Some(v) = var("MAX_MESSAGE_LENGTH")
            && let Ok(len) = v.parse()
        {
            self.limits.max_message_length = len;
        }
        if let Some(v) = var("MAX_USERNAME_LENGTH")
            && let Ok(len) = v.parse()
        {
            self.limits.max_username_length = len;
        }
        if let Some(v) = var("HEARTBEAT_SECS")
            && let Ok(secs) = v.parse()
        {
            self.stream.heartbeat_secs = secs;
        }
        Ok(())
    }

    /// Input limits for the room engine.
    pub fn engine_limits(&self) -> Limits {
        Limits {
            max_message_length: self.limits.max_message_length,
            max_username_length: self.limits.max_username_length,
        }
    }
}
