use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_TIMEOUT_MS: u64 = 2000;

/// Which side of the replication protocol a node plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Assigns ids, applies writes first, pushes them to replicas.
    Primary,
    /// Serves reads locally, forwards client writes, applies pushed writes.
    Replica,
}

impl FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "primary" => Ok(Role::Primary),
            "replica" => Ok(Role::Replica),
            other => Err(anyhow::anyhow!("Unknown role '{}', expected primary or replica", other)),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Primary => write!(f, "primary"),
            Role::Replica => write!(f, "replica"),
        }
    }
}

/// Feature switches covering the differences between node variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Capabilities {
    /// Wire `PUT /note/{id}`. Without it the verb answers 405.
    pub full_replace: bool,
    /// Push committed writes to replicas (primary only).
    pub propagate: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            full_replace: true,
            propagate: true,
        }
    }
}

/// Node configuration document.
///
/// `replicas` is positional: entry 0 is the primary, every later entry is a
/// replica the primary pushes to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeConfig {
    pub service_port: u16,
    /// Sync-mode label. Only reported at startup.
    #[serde(default)]
    pub sync: String,
    pub replicas: Vec<String>,
    /// Bound on every outbound propagation or forward call.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub capabilities: Capabilities,
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

impl NodeConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let config: NodeConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.replicas.is_empty() {
            anyhow::bail!("Config must list at least the primary address in `replicas`");
        }
        if self.replicas.iter().any(|addr| addr.trim().is_empty()) {
            anyhow::bail!("Config contains an empty peer address");
        }
        Ok(())
    }

    pub fn primary_addr(&self) -> Result<&str> {
        self.replicas
            .first()
            .map(String::as_str)
            .ok_or_else(|| anyhow::anyhow!("No primary address configured"))
    }

    /// Addresses the primary propagates to.
    pub fn replica_addrs(&self) -> &[String] {
        self.replicas.get(1..).unwrap_or(&[])
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
