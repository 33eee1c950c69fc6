//! Application configuration.
//!
//! Loads from an optional YAML file layered over built-in defaults, the same
//! `config` + `serde` pattern the teacher used for its own settings file.
//! Everything here is ambient tool configuration (HTTP timeouts, pool sizes,
//! retry budget, regex timeout, output format) — never per-run policy like
//! filters or `keep N`, which stay CLI flags/orchestrator arguments.

use crate::error::{PurgeError, Result};
use config::{Config as ConfigRs, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;


/// Root configuration structure.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Config {
    #[serde(default)]
    pub output: Output,
    #[serde(default)]
    pub network: Network,
    #[serde(default)]
    pub pools: Pools,
    #[serde(default)]
    pub regex: RegexSettings,
    #[serde(default)]
    pub retry: RetrySettings,
    #[serde(default)]
    pub registries: Registries,
}

impl Config {
    /// Parses a `Config` from a YAML string. Primarily used for testing.
    pub fn from_yaml_str(s: &str) -> Result<Self> {
        let builder = ConfigRs::builder()
            .add_source(ConfigRs::try_from(&Config::default())?)
            .add_source(File::from_str(s, FileFormat::Yaml));

        Self::from_builder(builder)
    }

    /// Loads a `Config` from an optional file path. A default configuration
    /// is returned when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder =
            ConfigRs::builder().add_source(ConfigRs::try_from(&Config::default())?);

        if let Some(p) = path {
            builder = builder.add_source(File::from(p).required(true));
        }

        Self::from_builder(builder)
    }

    fn from_builder(builder: config::ConfigBuilder<config::builder::DefaultState>) -> Result<Self> {
        builder
            .build()
            .and_then(|cfg| cfg.try_deserialize())
            .map_err(|e| PurgeError::config_with_source("failed to deserialize configuration", e))
    }
}

impl From<config::ConfigError> for PurgeError {
    fn from(e: config::ConfigError) -> Self {
        PurgeError::config_with_source("failed to build configuration", e)
    }
}

/// Output formatting settings.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Output {
    #[serde(default)]
    pub format: OutputFormat,
    #[serde(default)]
    pub color: ColorChoice,
}

#[derive(Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ColorChoice {
    #[default]
    Auto,
    Always,
    Never,
}

/// HTTP transport settings consumed by `client::ClientConfig`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Network {
    #[serde(default = "default_network_timeout")]
    pub timeout_seconds: u64,
    #[serde(default = "default_max_idle_per_host")]
    pub max_idle_per_host: usize,
}

impl Default for Network {
    fn default() -> Self {
        Self {
            timeout_seconds: default_network_timeout(),
            max_idle_per_host: default_max_idle_per_host(),
        }
    }
}

fn default_network_timeout() -> u64 {
    30
}

fn default_max_idle_per_host() -> usize {
    16
}

/// Worker pool sizing. `0` means "let the executor pick a CPU-count-based
/// default"; an explicit value is clamped by `executor::clamp_mutation_workers`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Pools {
    #[serde(default)]
    pub discovery_workers: usize,
    #[serde(default)]
    pub mutation_workers: usize,
}

impl Default for Pools {
    fn default() -> Self {
        Self {
            discovery_workers: 0,
            mutation_workers: 0,
        }
    }
}

/// Regex engine settings (§4.1's mandatory match timeout).
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegexSettings {
    #[serde(default = "default_regex_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for RegexSettings {
    fn default() -> Self {
        Self {
            timeout_ms: default_regex_timeout_ms(),
        }
    }
}

fn default_regex_timeout_ms() -> u64 {
    60_000
}

/// Mutation job retry/backoff settings, mirrored onto `executor::RetryPolicy`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetrySettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    200
}

/// Named-registry profiles, unchanged in shape from the teacher's config:
/// the CLI resolves `--registry <name>` or a `current` default against this
/// list, but credential resolution itself stays out of scope.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Registries {
    #[serde(default)]
    pub current: Option<String>,
    #[serde(default)]
    pub list: Vec<Registry>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Registry {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub insecure: bool,
}
