use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::keymap::{KeyBindingError, KeyMap};
use crate::query::PollPolicy;

pub const CONFIG_ENV: &str = "SKYVIEW_CONFIG";

/// Colour palette selection
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ThemeName {
    #[default]
    Dark,
    HighContrast,
}

/// Background load settings
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Per-request timeout
    pub timeout_ms: u64,
    /// Spinner frame interval
    pub spinner_ms: u64,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            spinner_ms: 100,
        }
    }
}

impl LoaderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn spinner_interval(&self) -> Duration {
        Duration::from_millis(self.spinner_ms)
    }
}

/// Page size per resource kind
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PaginationConfig {
    pub functions: i64,
    pub log_groups: i64,
    pub log_streams: i64,
    pub log_events: i64,
    pub alarms: i64,
    pub metrics: i64,
    pub stacks: i64,
    pub stack_events: i64,
    pub tables: i64,
    pub items: i64,
    pub buckets: i64,
    pub objects: i64,
    pub state_machines: i64,
    pub executions: i64,
    pub parameters: i64,
    pub vpcs: i64,
    pub event_buses: i64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            functions: 50,
            log_groups: 50,
            log_streams: 50,
            log_events: 100,
            alarms: 100,
            metrics: 500,
            stacks: 100,
            stack_events: 100,
            tables: 100,
            items: 200,
            buckets: 1000,
            objects: 1000,
            state_machines: 100,
            executions: 100,
            parameters: 50,
            vpcs: 100,
            event_buses: 100,
        }
    }
}

impl PaginationConfig {
    fn entries(&self) -> [(&'static str, i64); 17] {
        [
            ("functions", self.functions),
            ("log_groups", self.log_groups),
            ("log_streams", self.log_streams),
            ("log_events", self.log_events),
            ("alarms", self.alarms),
            ("metrics", self.metrics),
            ("stacks", self.stacks),
            ("stack_events", self.stack_events),
            ("tables", self.tables),
            ("items", self.items),
            ("buckets", self.buckets),
            ("objects", self.objects),
            ("state_machines", self.state_machines),
            ("executions", self.executions),
            ("parameters", self.parameters),
            ("vpcs", self.vpcs),
            ("event_buses", self.event_buses),
        ]
    }

    /// The page size for `resource`; validated limits are positive.
    pub fn limit(&self, resource: &str) -> usize {
        self.entries()
            .iter()
            .find(|(name, _)| *name == resource)
            .map(|(_, limit)| (*limit).max(1) as usize)
            .unwrap_or(50)
    }
}

/// Insights polling
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct InsightsConfig {
    pub max_polls: u32,
    pub poll_interval_ms: u64,
}

impl Default for InsightsConfig {
    fn default() -> Self {
        Self {
            max_polls: 10,
            poll_interval_ms: 2000,
        }
    }
}

impl InsightsConfig {
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            max_polls: self.max_polls,
            interval: Duration::from_millis(self.poll_interval_ms),
        }
    }
}

/// Credential session countdown
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    pub duration_minutes: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            duration_minutes: 60,
        }
    }
}

/// Root configuration file structure
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SkyviewConfig {
    pub theme: ThemeName,

    /// Profile used at startup when neither the flag nor the environment
    /// names one
    pub profile: Option<String>,

    pub region: Option<String>,

    /// Default log filter directive
    pub log_level: Option<String>,

    pub loader: LoaderConfig,
    pub pagination: PaginationConfig,
    pub insights: InsightsConfig,
    pub session: SessionConfig,

    /// Action name -> key binding overrides
    pub keymap: BTreeMap<String, String>,
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("pagination.{resource} must be positive, got {value}")]
    InvalidLimit { resource: String, value: i64 },
    #[error("{field} must be positive")]
    NonPositive { field: &'static str },
    #[error("invalid key binding: {0}")]
    InvalidKeyBinding(#[from] KeyBindingError),
}

impl SkyviewConfig {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_str(&content)
    }

    /// Load configuration from a string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        // An empty file is a valid, all-defaults config.
        let config: SkyviewConfig = if content.trim().is_empty() {
            SkyviewConfig::default()
        } else {
            serde_yaml::from_str(content)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Candidate paths in lookup order
    pub fn candidates(start_dir: &Path) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Ok(env_path) = std::env::var(CONFIG_ENV) {
            paths.push(PathBuf::from(env_path));
        }
        paths.push(start_dir.join("skyview.yaml"));
        paths.push(start_dir.join(".skyview.yaml"));
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("skyview").join("config.yaml"));
        }
        paths
    }

    /// Search the standard locations; defaults when nothing exists.
    pub fn discover(start_dir: &Path) -> Result<(Option<PathBuf>, Self), ConfigError> {
        Self::discover_in(&Self::candidates(start_dir))
    }

    pub fn discover_in(candidates: &[PathBuf]) -> Result<(Option<PathBuf>, Self), ConfigError> {
        for path in candidates {
            if path.is_file() {
                return Ok((Some(path.clone()), Self::load(path)?));
            }
        }
        Ok((None, Self::default()))
    }

    /// Validate the configuration
    fn validate(&self) -> Result<(), ConfigError> {
        for (resource, value) in self.pagination.entries() {
            if value <= 0 {
                return Err(ConfigError::InvalidLimit {
                    resource: resource.to_string(),
                    value,
                });
            }
        }
        if self.loader.timeout_ms == 0 {
            return Err(ConfigError::NonPositive {
                field: "loader.timeout_ms",
            });
        }
        if self.loader.spinner_ms == 0 {
            return Err(ConfigError::NonPositive {
                field: "loader.spinner_ms",
            });
        }
        if self.insights.max_polls == 0 {
            return Err(ConfigError::NonPositive {
                field: "insights.max_polls",
            });
        }
        if self.session.duration_minutes == 0 {
            return Err(ConfigError::NonPositive {
                field: "session.duration_minutes",
            });
        }
        self.keymap()?;
        Ok(())
    }

    /// Default keymap with the configured overrides applied
    pub fn keymap(&self) -> Result<KeyMap, ConfigError> {
        Ok(KeyMap::with_overrides(&self.keymap)?)
    }

    pub fn session_duration(&self) -> Duration {
        Duration::from_secs(self.session.duration_minutes * 60)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }
}
