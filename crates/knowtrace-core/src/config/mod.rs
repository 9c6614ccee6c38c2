//! Configuration management with file persistence

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

/// Knowtrace configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub graph: GraphConfig,
    pub backend: BackendConfig,
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Path to the knowledge graph JSON file. Defaults to
    /// `{data_dir}/graph.json` when unset.
    pub file: Option<PathBuf>,
    /// Label under which this dataset's nodes and interactions are stored
    /// in the remote backend. Interpolated into query label positions, so
    /// it is restricted to identifier characters.
    pub dataset_label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(skip)]
    pub password: Option<String>,
    pub uri: String,
    pub database: String,
    pub username: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Path to the local interaction log. Defaults to
    /// `{data_dir}/interactions.json` when unset.
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            graph: GraphConfig {
                file: None,
                dataset_label: "knowtrace".to_string(),
            },
            backend: BackendConfig {
                password: None,
                uri: "http://localhost:7474".to_string(),
                database: "neo4j".to_string(),
                username: "neo4j".to_string(),
                timeout_secs: 10,
            },
            telemetry: TelemetryConfig { log_file: None },
        }
    }
}

impl GraphConfig {
    /// Resolve the graph file path, falling back to the data directory
    pub fn resolved_file(&self) -> anyhow::Result<PathBuf> {
        match &self.file {
            Some(path) => Ok(path.clone()),
            None => Ok(Config::data_dir()?.join("graph.json")),
        }
    }
}

impl BackendConfig {
    pub fn resolved_password(&self) -> anyhow::Result<Option<String>> {
        self.enforce_env_only()?;

        Ok(env::var("KNOWTRACE_BACKEND_PASSWORD").ok())
    }

    pub fn redacted_password(&self) -> anyhow::Result<Option<String>> {
        self.resolved_password().map(|opt| opt.map(|pw| redact(&pw)))
    }

    pub fn enforce_env_only(&self) -> anyhow::Result<()> {
        if self.password.is_some() {
            return Err(anyhow!(
                "Backend passwords must be provided via environment variables, not stored in configuration"
            ));
        }
        Ok(())
    }
}

/// `***` plus the last four characters of a secret. Counted in characters,
/// not bytes: a byte-indexed suffix can start inside a multi-byte character.
fn redact(secret: &str) -> String {
    let total = secret.chars().count();
    if total <= 4 {
        "***".to_string()
    } else {
        let suffix: String = secret.chars().skip(total - 4).collect();
        format!("***{}", suffix)
    }
}

impl TelemetryConfig {
    /// Resolve the interaction log path, falling back to the data directory
    pub fn resolved_log_file(&self) -> anyhow::Result<PathBuf> {
        match &self.log_file {
            Some(path) => Ok(path.clone()),
            None => Ok(Config::data_dir()?.join("interactions.json")),
        }
    }
}

/// A dataset label is interpolated into query label positions and must be a
/// plain identifier
pub fn valid_dataset_label(label: &str) -> bool {
    let mut chars = label.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        let dir = if let Ok(custom_dir) = env::var("KNOWTRACE_CONFIG_DIR") {
            PathBuf::from(custom_dir)
        } else {
            dirs::config_dir()
                .ok_or_else(|| anyhow!("Could not determine config directory"))?
                .join("knowtrace")
        };
        Ok(dir)
    }

    /// Get the config file path
    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Get the data directory path (graph file and interaction log defaults)
    pub fn data_dir() -> anyhow::Result<PathBuf> {
        let dir = if let Ok(custom_dir) = env::var("KNOWTRACE_DATA_DIR") {
            PathBuf::from(custom_dir)
        } else {
            dirs::data_dir()
                .ok_or_else(|| anyhow!("Could not determine data directory"))?
                .join("knowtrace")
        };
        Ok(dir)
    }

    /// Load configuration from file, or create default if it doesn't exist
    pub fn load() -> anyhow::Result<Self> {
        let path = Self::config_path()?;

        if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config: Config = toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            config.validate()?;
            Ok(config)
        } else {
            // Return default config without creating file
            Ok(Config::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> anyhow::Result<()> {
        self.validate()?;

        let dir = Self::config_dir()?;
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;

        let path = Self::config_path()?;
        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(&path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        self.backend.enforce_env_only()?;

        if !valid_dataset_label(&self.graph.dataset_label) {
            return Err(anyhow!(
                "Invalid dataset label '{}': must match [A-Za-z_][A-Za-z0-9_]*",
                self.graph.dataset_label
            ));
        }
        if self.backend.timeout_secs == 0 {
            return Err(anyhow!("backend.timeout_secs must be at least 1"));
        }
        Ok(())
    }

    /// Get a configuration value by key
    pub fn get(&self, key: &str) -> anyhow::Result<String> {
        match key {
            // Graph settings
            "graph.file" => Ok(self.graph.resolved_file()?.display().to_string()),
            "graph.dataset_label" => Ok(self.graph.dataset_label.clone()),

            // Backend settings
            "backend.uri" => Ok(self.backend.uri.clone()),
            "backend.database" => Ok(self.backend.database.clone()),
            "backend.username" => Ok(self.backend.username.clone()),
            "backend.timeout_secs" => Ok(self.backend.timeout_secs.to_string()),

            // Telemetry settings
            "telemetry.log_file" => Ok(self.telemetry.resolved_log_file()?.display().to_string()),

            // Password (special handling - show redacted)
            "backend.password" | "password" => match self.backend.redacted_password()? {
                Some(redacted) => Ok(redacted),
                None => Ok("(not set - use KNOWTRACE_BACKEND_PASSWORD env var)".to_string()),
            },

            _ => Err(anyhow!(
                "Unknown configuration key: {}. Use `knowtrace config list` to see available keys.",
                key
            )),
        }
    }

    /// Set a configuration value by key
    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        match key {
            // Graph settings
            "graph.file" => {
                self.graph.file = Some(PathBuf::from(value));
            }
            "graph.dataset_label" => {
                if !valid_dataset_label(value) {
                    return Err(anyhow!(
                        "Invalid dataset label '{}': must match [A-Za-z_][A-Za-z0-9_]*",
                        value
                    ));
                }
                self.graph.dataset_label = value.to_string();
            }

            // Backend settings
            "backend.uri" => {
                self.backend.uri = value.trim_end_matches('/').to_string();
            }
            "backend.database" => {
                self.backend.database = value.to_string();
            }
            "backend.username" => {
                self.backend.username = value.to_string();
            }
            "backend.timeout_secs" => {
                let secs: u64 = value
                    .parse()
                    .with_context(|| format!("Invalid timeout_secs value: {}", value))?;
                if secs == 0 {
                    return Err(anyhow!("backend.timeout_secs must be at least 1"));
                }
                self.backend.timeout_secs = secs;
            }

            // Telemetry settings
            "telemetry.log_file" => {
                self.telemetry.log_file = Some(PathBuf::from(value));
            }

            // Password cannot be set via config
            "backend.password" | "password" => {
                return Err(anyhow!(
                    "Passwords cannot be stored in configuration for security. \
                     Set the KNOWTRACE_BACKEND_PASSWORD environment variable instead."
                ));
            }

            _ => {
                return Err(anyhow!(
                    "Unknown configuration key: {}. Use `knowtrace config list` to see available keys.",
                    key
                ));
            }
        }
        Ok(())
    }

    /// List all configuration keys and their values
    pub fn list(&self) -> anyhow::Result<Vec<(String, String)>> {
        let keys = vec![
            "graph.file",
            "graph.dataset_label",
            "backend.uri",
            "backend.database",
            "backend.username",
            "backend.timeout_secs",
            "backend.password",
            "telemetry.log_file",
        ];

        keys.into_iter()
            .map(|key| {
                let value = self.get(key)?;
                Ok((key.to_string(), value))
            })
            .collect()
    }

    /// Reset configuration to defaults
    pub fn reset() -> anyhow::Result<()> {
        let path = Self::config_path()?;
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove config file: {}", path.display()))?;
        }
        Ok(())
    }
}
