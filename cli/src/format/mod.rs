//! Terminal output: color control, plain/tty formatters, and the
//! pretty/JSON rendering used for run summaries.

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use serde::{Deserialize, Serialize};
use std::io::IsTerminal;

/// Color output control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorChoice {
    /// Automatically detect if colors should be used (default)
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<&str> for ColorChoice {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "always" => ColorChoice::Always,
            "never" => ColorChoice::Never,
            _ => ColorChoice::Auto,
        }
    }
}

impl From<acr_purge_core::config::ColorChoice> for ColorChoice {
    fn from(c: acr_purge_core::config::ColorChoice) -> Self {
        match c {
            acr_purge_core::config::ColorChoice::Always => ColorChoice::Always,
            acr_purge_core::config::ColorChoice::Never => ColorChoice::Never,
            acr_purge_core::config::ColorChoice::Auto => ColorChoice::Auto,
        }
    }
}

impl std::fmt::Display for ColorChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColorChoice::Auto => write!(f, "auto"),
            ColorChoice::Always => write!(f, "always"),
            ColorChoice::Never => write!(f, "never"),
        }
    }
}

/// Output format for CLI command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable pretty format
    Pretty,
    /// JSON format
    Json,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            _ => OutputFormat::Pretty,
        }
    }
}

impl From<acr_purge_core::config::OutputFormat> for OutputFormat {
    fn from(f: acr_purge_core::config::OutputFormat) -> Self {
        match f {
            acr_purge_core::config::OutputFormat::Json => OutputFormat::Json,
            acr_purge_core::config::OutputFormat::Pretty => OutputFormat::Pretty,
        }
    }
}

/// Trait for types that can be formatted for CLI output.
pub trait Formattable: Serialize {
    /// Format the type for pretty (human-readable) output.
    fn format_pretty(&self) -> String;
}

/// Format a single item for output.
pub fn format_output<T: Formattable>(item: &T, format: OutputFormat) -> Result<String, String> {
    match format {
        OutputFormat::Pretty => Ok(item.format_pretty()),
        OutputFormat::Json => serde_json::to_string_pretty(item)
            .map_err(|e| format!("failed to serialize to JSON: {e}")),
    }
}

/// Trait for output formatting that can be TTY-aware or plain text.
pub trait OutputFormatter: Send + Sync {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
    fn warning(&self, message: &str);
    fn spinner(&self, message: &str) -> ProgressBar;
    fn finish_progress(&self, pb: ProgressBar, message: &str);
}

/// TTY-aware formatter with colors and progress indicators.
pub struct TtyFormatter;

impl OutputFormatter for TtyFormatter {
    fn success(&self, message: &str) {
        println!("{} {}", "✓".green().bold(), message);
    }

    fn error(&self, message: &str) {
        eprintln!("{} {}", "✗".red().bold(), message);
    }

    fn warning(&self, message: &str) {
        eprintln!("{} {}", "⚠".yellow().bold(), message);
    }

    fn spinner(&self, message: &str) -> ProgressBar {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap(),
        );
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(std::time::Duration::from_millis(100));
        spinner
    }

    fn finish_progress(&self, pb: ProgressBar, message: &str) {
        pb.finish_with_message(format!("{} {}", "✓".green(), message));
    }
}

/// Plain text formatter for non-TTY output (piped, scripted).
pub struct PlainFormatter;

impl OutputFormatter for PlainFormatter {
    fn success(&self, message: &str) {
        println!("✓ {}", message);
    }

    fn error(&self, message: &str) {
        eprintln!("✗ {}", message);
    }

    fn warning(&self, message: &str) {
        eprintln!("⚠ {}", message);
    }

    fn spinner(&self, message: &str) -> ProgressBar {
        println!("{}", message);
        ProgressBar::hidden()
    }

    fn finish_progress(&self, pb: ProgressBar, message: &str) {
        pb.finish();
        println!("✓ {}", message);
    }
}

/// Creates the appropriate formatter based on TTY state and color choice.
pub fn create_formatter_with_color(color: ColorChoice) -> Box<dyn OutputFormatter> {
    let use_color = match color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => {
            if std::env::var("NO_COLOR").is_ok() {
                false
            } else {
                std::io::stdout().is_terminal() || std::io::stderr().is_terminal()
            }
        }
    };

    if use_color {
        Box::new(TtyFormatter)
    } else {
        Box::new(PlainFormatter)
    }
}

/// Creates the appropriate formatter from context.
pub fn create_formatter(ctx: &crate::context::AppContext) -> Box<dyn OutputFormatter> {
    create_formatter_with_color(ctx.color)
}

pub fn success(ctx: &crate::context::AppContext, message: &str) {
    create_formatter(ctx).success(message);
}

pub fn error(ctx: &crate::context::AppContext, message: &str) {
    create_formatter(ctx).error(message);
}

pub fn warning(ctx: &crate::context::AppContext, message: &str) {
    create_formatter(ctx).warning(message);
}

/// Prints a message at the specified verbosity level. Messages go to stderr
/// so that stdout stays reserved for dry-run target lines and summaries.
pub fn print(
    ctx: &crate::context::AppContext,
    level: crate::context::VerbosityLevel,
    message: &str,
) {
    if ctx.verbosity >= level {
        eprintln!("{}", message);
    }
}
