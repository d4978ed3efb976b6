// Configuration merging with priority

use super::{EngineConfig, ServerConfig, ThinkGymConfig};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Partial configuration for merging
/// Uses Option<T> for all fields to support partial overrides
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PartialConfig {
    #[serde(default)]
    pub server: Option<PartialServerConfig>,
    #[serde(default)]
    pub engine: Option<PartialEngineConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PartialServerConfig {
    pub port: Option<u16>,
    pub bind: Option<String>,
    pub cors_origins: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PartialEngineConfig {
    pub command: Option<Vec<String>>,
    pub working_dir: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
    pub mock: Option<bool>,
    pub max_concurrent: Option<usize>,
    pub max_queued: Option<usize>,
}

/// Configuration merger
/// Priority order: CLI -> File -> Defaults
pub struct ConfigMerger {
    defaults: ThinkGymConfig,
    file: Option<ThinkGymConfig>,
    cli: Option<PartialConfig>,
}

impl ConfigMerger {
    /// Create a new config merger with defaults
    pub fn new() -> Self {
        Self {
            defaults: ThinkGymConfig::default(),
            file: None,
            cli: None,
        }
    }

    /// Set file config
    pub fn with_file(mut self, config: Option<ThinkGymConfig>) -> Self {
        self.file = config;
        self
    }

    /// Set CLI overrides
    pub fn with_cli(mut self, config: Option<PartialConfig>) -> Self {
        self.cli = config;
        self
    }

    /// Merge all configs with priority
    pub fn merge(&self) -> ThinkGymConfig {
        // The file layer is deserialized with serde defaults, so it is already complete
        let mut result = self.file.clone().unwrap_or_else(|| self.defaults.clone());

        if let Some(ref cli) = self.cli {
            result = self.merge_partial(&result, cli);
        }

        result
    }

    /// Merge partial config into full config
    fn merge_partial(&self, base: &ThinkGymConfig, partial: &PartialConfig) -> ThinkGymConfig {
        ThinkGymConfig {
            server: partial
                .server
                .as_ref()
                .map(|p| self.merge_partial_server(&base.server, p))
                .unwrap_or_else(|| base.server.clone()),
            engine: partial
                .engine
                .as_ref()
                .map(|p| self.merge_partial_engine(&base.engine, p))
                .unwrap_or_else(|| base.engine.clone()),
        }
    }

    fn merge_partial_server(&self, base: &ServerConfig, p: &PartialServerConfig) -> ServerConfig {
        ServerConfig {
            port: p.port.unwrap_or(base.port),
            bind: p.bind.clone().unwrap_or_else(|| base.bind.clone()),
            cors_origins: p
                .cors_origins
                .clone()
                .unwrap_or_else(|| base.cors_origins.clone()),
        }
    }

    fn merge_partial_engine(&self, base: &EngineConfig, p: &PartialEngineConfig) -> EngineConfig {
        EngineConfig {
            command: p.command.clone().unwrap_or_else(|| base.command.clone()),
            working_dir: p.working_dir.clone().or_else(|| base.working_dir.clone()),
            timeout_secs: p.timeout_secs.unwrap_or(base.timeout_secs),
            mock: p.mock.unwrap_or(base.mock),
            max_concurrent: p.max_concurrent.unwrap_or(base.max_concurrent),
            max_queued: p.max_queued.unwrap_or(base.max_queued),
        }
    }
}

impl Default for ConfigMerger {
    fn default() -> Self {
        Self::new()
    }
}
