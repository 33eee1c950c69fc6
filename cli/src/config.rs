//! CLI-local configuration plumbing.
//!
//! The settings themselves are [`acr_purge_core::Config`]; this module only
//! locates the settings file on disk and normalizes the `--registry` flag
//! into the full endpoint URL the HTTP client needs.

use std::env;
use std::path::PathBuf;

/// Resolves the settings file path: `ACR_PURGE_CONFIG` env var, else the
/// platform config directory, else `None` (run on defaults).
pub fn default_config_path() -> Option<PathBuf> {
    if let Ok(path) = env::var("ACR_PURGE_CONFIG") {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|dir| dir.join("acr-purge").join("config.yaml"))
}

/// Normalizes a `--registry` host into a full base URL for the registry
/// client. A host with an explicit scheme is passed through unchanged.
pub fn registry_endpoint(host: &str, insecure: bool) -> String {
    if host.contains("://") {
        return host.trim_end_matches('/').to_string();
    }
    let scheme = if insecure { "http" } else { "https" };
    format!("{scheme}://{}", host.trim_end_matches('/'))
}

/// Strips the scheme back off a registry host, for the `login_url` prefix
/// printed in dry-run output (e.g. `myregistry.azurecr.io/repo:tag`).
pub fn display_host(host: &str) -> String {
    host.trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/')
        .to_string()
}
