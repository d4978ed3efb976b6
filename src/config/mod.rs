//! Server and engine configuration
//!
//! Configuration comes from three layers, highest priority first:
//! CLI flags (and their env vars), a TOML file, built-in defaults.
//! `merger` combines them.

pub mod merger;

pub use merger::{ConfigMerger, PartialConfig, PartialEngineConfig, PartialServerConfig};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default timeout for a single invocation when a caller does not pick one
pub const DEFAULT_INVOKE_TIMEOUT_SECS: u64 = 30;

/// Timeout the thinking routes use for engine calls
pub const DEFAULT_ROUTE_TIMEOUT_SECS: u64 = 25;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub bind: String,
    /// Allowed CORS origins; empty means any origin
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            bind: "127.0.0.1".to_string(),
            cors_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Program followed by leading arguments, e.g. `["python3", "backend/run.py"]`
    pub command: Vec<String>,
    /// Working directory for engine processes; the server's own when unset
    pub working_dir: Option<PathBuf>,
    pub timeout_secs: u64,
    /// Pass `--mock` to the engine
    pub mock: bool,
    pub max_concurrent: usize,
    pub max_queued: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            command: vec!["thinkgym-engine".to_string()],
            working_dir: None,
            timeout_secs: DEFAULT_ROUTE_TIMEOUT_SECS,
            mock: true,
            max_concurrent: 4,
            max_queued: 16,
        }
    }
}

impl EngineConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ThinkGymConfig {
    pub server: ServerConfig,
    pub engine: EngineConfig,
}

impl ThinkGymConfig {
    /// Check invariants the rest of the server relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.command.is_empty() || self.engine.command[0].trim().is_empty() {
            return Err(ConfigError::Invalid(
                "engine.command must name a program".to_string(),
            ));
        }
        if self.engine.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "engine.timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.engine.max_concurrent == 0 {
            return Err(ConfigError::Invalid(
                "engine.max_concurrent must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Default config file location (`$XDG_CONFIG_HOME/thinkgym/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("thinkgym").join("config.toml"))
}

/// Parse a config file
pub fn load_config_file(path: &Path) -> Result<ThinkGymConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load the file layer.
///
/// An explicit path must exist. Without one the default location is tried
/// and silently skipped when absent.
pub fn load_file_layer(explicit: Option<&Path>) -> Result<Option<ThinkGymConfig>, ConfigError> {
    match explicit {
        Some(path) => load_config_file(path).map(Some),
        None => match default_config_path() {
            Some(path) if path.exists() => {
                log::info!("Loading config from {:?}", path);
                load_config_file(&path).map(Some)
            }
            _ => Ok(None),
        },
    }
}

/// Resolve the engine program to an absolute path.
///
/// Tries `PATH` first, then the directory of the running executable, so a
/// `thinkgym-engine` built next to the server is found without installing it.
pub fn resolve_engine_program(program: &str) -> Option<PathBuf> {
    let as_path = Path::new(program);
    if as_path.components().count() > 1 {
        return as_path.exists().then(|| as_path.to_path_buf());
    }

    if let Ok(found) = which::which(program) {
        log::info!("Found engine {} at: {:?}", program, found);
        return Some(found);
    }

    let sibling = std::env::current_exe()
        .ok()?
        .parent()?
        .join(format!("{}{}", program, std::env::consts::EXE_SUFFIX));
    if sibling.exists() {
        log::info!("Found engine {} next to server at: {:?}", program, sibling);
        Some(sibling)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = ThinkGymConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.engine.timeout(), Duration::from_secs(25));
        assert!(config.engine.mock);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[engine]\ncommand = [\"python3\", \"backend/run.py\"]").unwrap();

        let config = load_config_file(file.path()).unwrap();
        assert_eq!(config.engine.command, vec!["python3", "backend/run.py"]);
        assert_eq!(config.engine.timeout_secs, DEFAULT_ROUTE_TIMEOUT_SECS);
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_file_layer(Some(&dir.path().join("absent.toml")));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[engine\ncommand = ").unwrap();
        assert!(matches!(
            load_config_file(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_empty_command() {
        let mut config = ThinkGymConfig::default();
        config.engine.command.clear();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = ThinkGymConfig::default();
        config.engine.max_concurrent = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_resolve_engine_program_with_path() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let path = file.path().to_string_lossy().to_string();
        assert_eq!(resolve_engine_program(&path), Some(file.path().to_path_buf()));
        assert_eq!(resolve_engine_program("/definitely/not/here/engine"), None);
    }
}
