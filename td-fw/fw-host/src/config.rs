//! Host configuration
//!
//! Settings come from an optional JSON file and are then overridden by
//! command line arguments. Every field has a default, so an empty file or
//! no file at all is valid.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use fw_core::ShellConfig;
use serde::{Deserialize, Serialize};

/// Serial settings of the UUT link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UutConfig {
    /// Serial device, e.g. `/dev/ttyS1`; no UUT link when unset
    pub device: Option<String>,
    pub baud_rate: u32,
    /// How long one read on the link may block
    pub read_timeout_ms: u64,
}

impl Default for UutConfig {
    fn default() -> Self {
        Self {
            device: None,
            baud_rate: 115_200,
            read_timeout_ms: 20,
        }
    }
}

/// One physical memory range exposed to `md`, `mr` and `mw`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryWindowConfig {
    pub base: u64,
    pub len: usize,
}

/// Host pipeline settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Reply timeout for query steps outside any test case
    pub default_step_timeout_ms: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            default_step_timeout_ms: 1_000,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub shell: ShellConfig,
    pub uut: UutConfig,
    pub executor: ExecutorConfig,
    pub memory_windows: Vec<MemoryWindowConfig>,
}

impl HostConfig {
    /// Load a JSON config file
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: HostConfig = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Apply command line overrides
    pub fn apply_overrides(&mut self, uut_device: Option<String>, uut_baud: Option<u32>) {
        if let Some(device) = uut_device {
            self.uut.device = Some(device);
        }
        if let Some(baud) = uut_baud {
            self.uut.baud_rate = baud;
        }
    }
}
