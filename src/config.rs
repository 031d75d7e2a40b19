// SPDX-License-Identifier: Apache-2.0

//! Guard configuration
//!
//! Loaded from `tenant-guard.json` in the data directory. Every field has a
//! default, so a partial file (or no file at all) is valid.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{GuardError, GuardResult};
use crate::schema::TENANT_FIELD;

pub const CONFIG_FILE_NAME: &str = "tenant-guard.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardConfig {
    /// Maximum number of query events kept in memory
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,
    /// Field searched for a tenant id on entities without their own descriptor
    #[serde(default = "default_tenant_field")]
    pub default_tenant_field: String,
    /// Threshold for slow query detection (milliseconds)
    #[serde(default = "default_slow_threshold")]
    pub slow_query_threshold_ms: u64,
    /// Violations after which an entity gets its own report recommendation
    #[serde(default = "default_entity_violation_threshold")]
    pub entity_violation_threshold: usize,
    /// Argument keys replaced by `***` in logged snapshots
    #[serde(default = "default_redacted_fields")]
    pub redacted_fields: Vec<String>,
    /// Emit a tracing diagnostic for every risky query
    #[serde(default = "default_true")]
    pub diagnostics_enabled: bool,
    /// Refuse to start when the schema registry is inconsistent
    #[serde(default)]
    pub strict_schema: bool,
}

fn default_true() -> bool {
    true
}

fn default_log_capacity() -> usize {
    1000
}

fn default_tenant_field() -> String {
    TENANT_FIELD.to_string()
}

fn default_slow_threshold() -> u64 {
    1000 // 1 second
}

fn default_entity_violation_threshold() -> usize {
    5
}

fn default_redacted_fields() -> Vec<String> {
    ["password", "passwordHash", "token", "secret"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            log_capacity: default_log_capacity(),
            default_tenant_field: default_tenant_field(),
            slow_query_threshold_ms: default_slow_threshold(),
            entity_violation_threshold: default_entity_violation_threshold(),
            redacted_fields: default_redacted_fields(),
            diagnostics_enabled: true,
            strict_schema: false,
        }
    }
}

impl GuardConfig {
    /// Load configuration from the data directory, falling back to defaults
    pub fn load(data_dir: &Path) -> GuardResult<Self> {
        let config_path = data_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            debug!("No guard config file found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| GuardError::config(format!("Failed to read config: {}", e)))?;

        let config: GuardConfig = serde_json::from_str(&content)
            .map_err(|e| GuardError::config(format!("Failed to parse config: {}", e)))?;

        if config.log_capacity == 0 {
            return Err(GuardError::config("log_capacity must be at least 1"));
        }

        info!("Loaded guard configuration from {:?}", config_path);
        Ok(config)
    }

    /// Save configuration to the data directory
    pub fn save(&self, data_dir: &Path) -> GuardResult<()> {
        let config_path = data_dir.join(CONFIG_FILE_NAME);

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| GuardError::config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(&config_path, content)
            .map_err(|e| GuardError::config(format!("Failed to write config: {}", e)))?;

        debug!("Saved guard configuration to {:?}", config_path);
        Ok(())
    }

    pub fn is_redacted(&self, key: &str) -> bool {
        self.redacted_fields
            .iter()
            .any(|field| field.eq_ignore_ascii_case(key))
    }
}
