//! Flags and plumbing shared between the `purge` and `annotate` subcommands.

use crate::context::AppContext;
use acr_purge_core::auth::Credentials;
use acr_purge_core::client::{ClientConfig, HttpRegistryClient};
use acr_purge_core::executor::clamp_mutation_workers;
use acr_purge_core::RetryPolicy;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Flags every purge-family subcommand accepts.
#[derive(clap::Args, Debug)]
pub struct CommonArgs {
    /// Registry host (e.g. `myregistry.azurecr.io`) or a name from the
    /// configured `registries.list`. Falls back to `registries.current`
    /// when omitted.
    #[arg(long, env = "ACR_PURGE_REGISTRY")]
    pub registry: Option<String>,

    /// Connect over plain HTTP instead of HTTPS.
    #[arg(long)]
    pub insecure: bool,

    /// Basic auth username. Must be paired with `--password`.
    #[arg(long, env = "ACR_PURGE_USERNAME")]
    pub username: Option<String>,

    /// Basic auth password. Must be paired with `--username`.
    #[arg(long, env = "ACR_PURGE_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// `<repo-regex>:<tag-regex>` filter; repeatable. Omit for "every repository".
    #[arg(long = "filter", value_name = "REPO-REGEX:TAG-REGEX")]
    pub filters: Vec<String>,

    /// Only consider things older than this, e.g. `3d12h`, `36h`, `90m`.
    #[arg(long)]
    pub ago: Option<String>,

    /// Keep the N most recently pushed matches per repository/digest.
    #[arg(long, default_value_t = 0)]
    pub keep: usize,

    /// Operate on locked (delete/write disabled) tags and manifests too.
    #[arg(long)]
    pub include_locked: bool,

    /// Print what would be done without mutating the registry.
    #[arg(long)]
    pub dry_run: bool,

    /// Manifest-discovery worker count. 0 lets the tool pick a CPU-based default.
    #[arg(long)]
    pub discovery_workers: Option<usize>,

    /// Mutation (delete/annotate) worker count, clamped to [1, 32].
    #[arg(long)]
    pub mutation_workers: Option<usize>,
}

/// Parses `--ago` into the cutoff timestamp the core compares manifests
/// and tags against. `None` means "no age filter".
pub fn resolve_time_to_compare(
    ctx: &AppContext,
    ago: Option<&str>,
) -> Result<Option<DateTime<Utc>>, String> {
    match ago {
        None => Ok(None),
        Some(s) => {
            let parsed = acr_purge_core::parse_ago(s).map_err(|e| e.to_string())?;
            if parsed.capped {
                crate::format::warning(ctx, "--ago duration capped at 150 years");
            }
            Ok(Some(Utc::now() + parsed.duration))
        }
    }
}

/// Resolves `--registry` against `registries.list`/`registries.current`:
/// a value matching a configured name's `name` field is replaced by that
/// entry's `url`/`insecure`; anything else (or the configured default, if
/// `--registry` was omitted) is treated as a literal host.
fn resolve_registry(ctx: &AppContext, common: &CommonArgs) -> Result<(String, bool), String> {
    let selector = common
        .registry
        .clone()
        .or_else(|| ctx.config.registries.current.clone())
        .ok_or_else(|| {
            "--registry is required (or set registries.current in the config file)".to_string()
        })?;

    match ctx
        .config
        .registries
        .list
        .iter()
        .find(|r| r.name == selector)
    {
        Some(entry) => Ok((entry.url.clone(), entry.insecure || common.insecure)),
        None => Ok((selector, common.insecure)),
    }
}

/// Builds the registry client and the bare host string used as the
/// dry-run/login-URL display prefix.
pub fn build_client(
    ctx: &AppContext,
    common: &CommonArgs,
) -> Result<(HttpRegistryClient, String), String> {
    let (host, insecure) = resolve_registry(ctx, common)?;
    let endpoint = crate::config::registry_endpoint(&host, insecure);
    let login_url = crate::config::display_host(&host);

    let credentials = match (&common.username, &common.password) {
        (Some(u), Some(p)) => Credentials::basic(u, p),
        (None, None) => Credentials::anonymous(),
        _ => return Err("--username and --password must both be set, or neither".to_string()),
    };

    let client_config = ClientConfig::new()
        .with_timeout(ctx.config.network.timeout_seconds)
        .with_max_idle_per_host(ctx.config.network.max_idle_per_host);

    let client = HttpRegistryClient::with_config(endpoint, client_config, credentials)
        .map_err(|e| e.to_string())?;

    Ok((client, login_url))
}

/// Resolves the discovery pool size: CLI flag, else config, else a CPU-based default.
pub fn resolve_discovery_workers(ctx: &AppContext, cli_value: Option<usize>) -> usize {
    let requested = cli_value.unwrap_or(ctx.config.pools.discovery_workers);
    if requested == 0 {
        available_parallelism()
    } else {
        requested
    }
}

/// Resolves the mutation pool size the same way, additionally clamping to
/// `[1, 32]` and warning if an explicit value needed clamping.
pub fn resolve_mutation_workers(ctx: &AppContext, cli_value: Option<usize>) -> usize {
    let requested = cli_value.unwrap_or(ctx.config.pools.mutation_workers);
    let base = if requested == 0 {
        available_parallelism()
    } else {
        requested
    };
    let clamped = clamp_mutation_workers(base);
    if clamped != base {
        crate::format::warning(
            ctx,
            &format!("mutation worker count {base} clamped to {clamped}"),
        );
    }
    clamped
}

fn available_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// Builds the retry policy from resolved configuration.
pub fn resolve_retry_policy(ctx: &AppContext) -> RetryPolicy {
    RetryPolicy {
        max_attempts: ctx.config.retry.max_attempts,
        base_delay: Duration::from_millis(ctx.config.retry.base_delay_ms),
    }
}

/// Resolves the mandatory regex match timeout from configuration.
pub fn resolve_regex_timeout(ctx: &AppContext) -> Duration {
    Duration::from_millis(ctx.config.regex.timeout_ms)
}

/// Parses a `KEY=VALUE` pair for `--annotation`.
pub fn parse_key_val(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("invalid KEY=VALUE: {s:?}"))
}
