use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::paths::Paths;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Resolved XDG-compliant paths (not serialized)
    #[serde(skip)]
    pub paths: Paths,

    #[serde(default)]
    pub gatekeeper: GatekeeperConfig,

    #[serde(default)]
    pub audit: AuditConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatekeeperConfig {
    /// Wall-clock limit for a single command, in seconds
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,

    /// Byte cap applied separately to captured stdout and stderr
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,

    /// Maximum candidate length after sanitization; longer input is rejected
    #[serde(default = "default_max_candidate_chars")]
    pub max_candidate_chars: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Maximum characters of stdout/stderr stored per audit record
    #[serde(default = "default_excerpt_max_chars")]
    pub excerpt_max_chars: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_bind")]
    pub bind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default value functions
fn default_command_timeout() -> u64 {
    30
}
fn default_max_output_bytes() -> usize {
    10_000
}
fn default_max_candidate_chars() -> usize {
    1000
}
fn default_excerpt_max_chars() -> usize {
    4096
}
fn default_true() -> bool {
    true
}
fn default_port() -> u16 {
    8750
}
fn default_bind() -> String {
    "127.0.0.1".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for GatekeeperConfig {
    fn default() -> Self {
        Self {
            command_timeout_secs: default_command_timeout(),
            max_output_bytes: default_max_output_bytes(),
            max_candidate_chars: default_max_candidate_chars(),
        }
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            excerpt_max_chars: default_excerpt_max_chars(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            port: default_port(),
            bind: default_bind(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Paths::resolve()?;
        paths.ensure_dirs()?;
        let path = paths.config_file();

        if !path.exists() {
            // Create default config file on first run
            let config = Config {
                paths,
                ..Config::default()
            };
            config.save_with_template()?;
            return Ok(config);
        }

        let content = fs::read_to_string(&path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.paths = paths;

        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = self.paths.config_file();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;

        Ok(())
    }

    /// Save config with a helpful template (for first-time setup)
    pub fn save_with_template(&self) -> Result<()> {
        let path = self.paths.config_file();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&path, DEFAULT_CONFIG_TEMPLATE)?;
        eprintln!("Created default config at {}", path.display());

        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let paths = Paths::resolve()?;
        Ok(paths.config_file())
    }

    pub fn get_value(&self, key: &str) -> Result<String> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["gatekeeper", "command_timeout_secs"] => {
                Ok(self.gatekeeper.command_timeout_secs.to_string())
            }
            ["gatekeeper", "max_output_bytes"] => {
                Ok(self.gatekeeper.max_output_bytes.to_string())
            }
            ["gatekeeper", "max_candidate_chars"] => {
                Ok(self.gatekeeper.max_candidate_chars.to_string())
            }
            ["audit", "excerpt_max_chars"] => Ok(self.audit.excerpt_max_chars.to_string()),
            ["server", "enabled"] => Ok(self.server.enabled.to_string()),
            ["server", "port"] => Ok(self.server.port.to_string()),
            ["server", "bind"] => Ok(self.server.bind.clone()),
            ["logging", "level"] => Ok(self.logging.level.clone()),
            _ => anyhow::bail!("Unknown config key: {}", key),
        }
    }

    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["gatekeeper", "command_timeout_secs"] => {
                self.gatekeeper.command_timeout_secs = value.parse()?
            }
            ["gatekeeper", "max_output_bytes"] => {
                self.gatekeeper.max_output_bytes = value.parse()?
            }
            ["gatekeeper", "max_candidate_chars"] => {
                self.gatekeeper.max_candidate_chars = value.parse()?
            }
            ["audit", "excerpt_max_chars"] => self.audit.excerpt_max_chars = value.parse()?,
            ["server", "enabled"] => self.server.enabled = value.parse()?,
            ["server", "port"] => self.server.port = value.parse()?,
            ["server", "bind"] => self.server.bind = value.to_string(),
            ["logging", "level"] => self.logging.level = value.to_string(),
            _ => anyhow::bail!("Unknown config key: {}", key),
        }

        Ok(())
    }
}

/// Default config template with helpful comments (used for first-time setup)
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# Deskgate Configuration
# Auto-created on first run. Edit as needed.

[gatekeeper]
# Wall-clock limit for a single diagnostic command, in seconds.
# Quick commands (ping, hostname, ...) are capped lower internally;
# nothing ever runs longer than this value.
command_timeout_secs = 30

# Byte cap applied separately to captured stdout and stderr.
# Output beyond the cap is dropped and flagged as truncated.
max_output_bytes = 10000

# Candidates longer than this (after sanitization) are rejected as malformed.
max_candidate_chars = 1000

[audit]
# Stdout/stderr stored per audit record are clipped to this many characters.
excerpt_max_chars = 4096

[server]
enabled = true
port = 8750
bind = "127.0.0.1"

[logging]
level = "info"
"#;
