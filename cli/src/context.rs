//! Application context that holds resolved configuration.
//!
//! Built following the precedence order:
//! 1. Default values
//! 2. Config file values
//! 3. Environment variables
//! 4. CLI flags
//!
//! Once built, the context is passed as read-only throughout the application.

use crate::format::{ColorChoice, OutputFormat};
use acr_purge_core::Config;
use std::env;
use std::path::Path;

/// Verbosity, driven by a repeated `-v` flag and mapped onto a `tracing` level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum VerbosityLevel {
    Normal,
    Verbose,
    VeryVerbose,
    Trace,
}

impl VerbosityLevel {
    pub fn from_count(count: u8) -> Self {
        match count {
            0 => Self::Normal,
            1 => Self::Verbose,
            2 => Self::VeryVerbose,
            _ => Self::Trace,
        }
    }

    pub fn tracing_level(self) -> tracing::Level {
        match self {
            Self::Normal => tracing::Level::WARN,
            Self::Verbose => tracing::Level::INFO,
            Self::VeryVerbose => tracing::Level::DEBUG,
            Self::Trace => tracing::Level::TRACE,
        }
    }
}

/// Application context with resolved configuration and runtime state.
#[derive(Debug, Clone)]
pub struct AppContext {
    pub config: Config,
    pub verbosity: VerbosityLevel,
    pub color: ColorChoice,
    pub output: OutputFormat,
}

impl AppContext {
    /// Builds context with precedence: defaults > config file > env vars > CLI flags.
    pub fn build(
        cli_color: ColorChoice,
        cli_output: Option<OutputFormat>,
        verbosity: VerbosityLevel,
        config_path: Option<&Path>,
    ) -> Self {
        let mut config = Config::default();

        let resolved_path = config_path
            .map(Path::to_path_buf)
            .or_else(crate::config::default_config_path);
        if let Some(path) = resolved_path.as_deref() {
            if let Ok(file_config) = Config::load(Some(path)) {
                config = file_config;
            }
        }

        if let Ok(value) = env::var("ACR_PURGE_COLOR") {
            config.output.color = match ColorChoice::from(value.as_str()) {
                ColorChoice::Always => acr_purge_core::config::ColorChoice::Always,
                ColorChoice::Never => acr_purge_core::config::ColorChoice::Never,
                ColorChoice::Auto => acr_purge_core::config::ColorChoice::Auto,
            };
        }

        let mut color: ColorChoice = config.output.color.into();
        if cli_color != ColorChoice::Auto {
            color = cli_color;
        }

        let mut output: OutputFormat = config.output.format.into();
        if let Some(cli_output) = cli_output {
            output = cli_output;
        }

        Self {
            config,
            verbosity,
            color,
            output,
        }
    }

    /// Minimal context for unit tests that only exercise output formatting.
    #[cfg(test)]
    pub fn for_test(color: ColorChoice) -> Self {
        Self {
            config: Config::default(),
            verbosity: VerbosityLevel::Normal,
            color,
            output: OutputFormat::Pretty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn build_loads_settings_from_explicit_config_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "network:\n  timeout_seconds: 7\n").unwrap();

        let ctx = AppContext::build(
            ColorChoice::Auto,
            None,
            VerbosityLevel::Normal,
            Some(file.path()),
        );

        assert_eq!(ctx.config.network.timeout_seconds, 7);
    }

    #[test]
    fn build_falls_back_to_defaults_when_config_missing() {
        let ctx = AppContext::build(
            ColorChoice::Never,
            None,
            VerbosityLevel::Normal,
            Some(std::path::Path::new("/nonexistent/acr-purge-config.yaml")),
        );

        assert_eq!(ctx.config, Config::default());
        assert_eq!(ctx.color, ColorChoice::Never);
    }

    #[test]
    fn cli_color_overrides_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "output:\n  color: never\n").unwrap();

        let ctx = AppContext::build(
            ColorChoice::Always,
            None,
            VerbosityLevel::Normal,
            Some(file.path()),
        );

        assert_eq!(ctx.color, ColorChoice::Always);
    }
}
