//! `acr-purge purge`: delete matching tags and, optionally, the manifests
//! tag deletion leaves dangling.

use super::common::{
    self, resolve_discovery_workers, resolve_mutation_workers, resolve_regex_timeout,
    resolve_retry_policy, resolve_time_to_compare, CommonArgs,
};
use crate::context::{AppContext, VerbosityLevel};
use crate::format::{self, Formattable, OutputFormat};
use acr_purge_core::{Mode, Orchestrator, RunConfig, RunSummary};
use serde::Serialize;

#[derive(clap::Args, Debug)]
pub struct PurgeArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Also delete manifests that tag deletion leaves dangling.
    #[arg(long, conflicts_with = "untagged_only")]
    pub untagged: bool,

    /// Skip tag deletion; only delete manifests already dangling.
    #[arg(long, conflicts_with = "untagged")]
    pub untagged_only: bool,
}

pub fn run(ctx: &AppContext, args: PurgeArgs) -> i32 {
    let mode = if args.untagged_only {
        Mode::UntaggedOnly
    } else {
        Mode::Standard {
            sweep_untagged: args.untagged,
        }
    };

    if matches!(mode, Mode::Standard { .. })
        && (args.common.filters.is_empty() || args.common.ago.is_none())
    {
        format::error(
            ctx,
            "standard mode requires both --filter and --ago; pass --untagged-only if you meant to sweep dangling manifests across every repository",
        );
        return 2;
    }

    let time_to_compare = match resolve_time_to_compare(ctx, args.common.ago.as_deref()) {
        Ok(t) => t,
        Err(e) => {
            format::error(ctx, &e);
            return 2;
        }
    };

    let (client, login_url) = match common::build_client(ctx, &args.common) {
        Ok(v) => v,
        Err(e) => {
            format::error(ctx, &e);
            return 2;
        }
    };

    let run_config = RunConfig {
        mode,
        filters: args.common.filters.clone(),
        time_to_compare,
        keep: args.common.keep,
        include_locked: args.common.include_locked,
        dry_run: args.common.dry_run,
        login_url,
        discovery_workers: resolve_discovery_workers(ctx, args.common.discovery_workers),
        mutation_workers: resolve_mutation_workers(ctx, args.common.mutation_workers),
        regex_timeout: resolve_regex_timeout(ctx),
        retry: resolve_retry_policy(ctx),
    };

    format::print(
        ctx,
        VerbosityLevel::Verbose,
        &format!(
            "resolved {}: discovery_workers={} mutation_workers={}",
            run_config.login_url, run_config.discovery_workers, run_config.mutation_workers
        ),
    );

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            format::error(ctx, &format!("failed to start async runtime: {e}"));
            return 2;
        }
    };

    let formatter = format::create_formatter(ctx);
    let spinner = formatter.spinner(&format!("purging {}", run_config.login_url));

    let orchestrator = Orchestrator::new(&client, runtime.handle().clone());
    let (summary, result) = runtime.block_on(orchestrator.run(&run_config));

    formatter.finish_progress(spinner, "purge run complete");

    print_summary(ctx, &summary);

    match result {
        Ok(()) => {
            format::success(ctx, "purge run finished without errors");
            0
        }
        Err(e) => {
            format::error(ctx, &e.to_string());
            1
        }
    }
}

#[derive(Debug, Serialize)]
struct SummaryView {
    tags_deleted: u64,
    manifests_deleted: u64,
    repos_processed: u64,
    repos_skipped: u64,
}

impl From<&RunSummary> for SummaryView {
    fn from(s: &RunSummary) -> Self {
        Self {
            tags_deleted: s.tags_deleted,
            manifests_deleted: s.manifests_deleted,
            repos_processed: s.repos_processed,
            repos_skipped: s.repos_skipped,
        }
    }
}

impl Formattable for SummaryView {
    fn format_pretty(&self) -> String {
        format!(
            "tags deleted: {}\nmanifests deleted: {}\nrepositories processed: {}\nrepositories skipped: {}",
            self.tags_deleted, self.manifests_deleted, self.repos_processed, self.repos_skipped
        )
    }
}

fn print_summary(ctx: &AppContext, summary: &RunSummary) {
    let view = SummaryView::from(summary);
    match format::format_output(&view, ctx.output) {
        Ok(out) => println!("{out}"),
        Err(e) => format::error(ctx, &e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_view_pretty_includes_all_counters() {
        let summary = RunSummary {
            tags_deleted: 3,
            manifests_deleted: 1,
            repos_processed: 2,
            repos_skipped: 1,
        };
        let view = SummaryView::from(&summary);
        let text = view.format_pretty();
        assert!(text.contains("tags deleted: 3"));
        assert!(text.contains("manifests deleted: 1"));
        assert!(text.contains("repositories processed: 2"));
        assert!(text.contains("repositories skipped: 1"));
    }

    #[test]
    fn summary_json_round_trips_counters() {
        let summary = RunSummary {
            tags_deleted: 5,
            manifests_deleted: 0,
            repos_processed: 4,
            repos_skipped: 0,
        };
        let view = SummaryView::from(&summary);
        let json = format::format_output(&view, OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["tags_deleted"], 5);
        assert_eq!(value["repos_processed"], 4);
    }

    /// End-to-end: `run()` in untagged-only mode (where `filter`/`ago` are
    /// optional) against an empty catalog touches only `_catalog` and
    /// reports a zeroed summary, with no deletions attempted.
    #[test]
    fn run_against_empty_catalog_reports_zero_summary() {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .unwrap();
        let mut server = rt.block_on(mockito::Server::new_async());
        let _m = rt.block_on(
            server
                .mock("GET", "/v2/_catalog?n=50")
                .with_status(200)
                .with_body(r#"{"repositories":[]}"#)
                .create_async(),
        );

        let ctx = AppContext::for_test(crate::format::ColorChoice::Never);
        let args = PurgeArgs {
            common: CommonArgs {
                registry: Some(server.url()),
                insecure: true,
                username: None,
                password: None,
                filters: Vec::new(),
                ago: None,
                keep: 0,
                include_locked: false,
                dry_run: true,
                discovery_workers: Some(1),
                mutation_workers: Some(1),
            },
            untagged: false,
            untagged_only: true,
        };

        let exit_code = run(&ctx, args);
        assert_eq!(exit_code, 0);
    }

    /// Standard mode with neither `--filter` nor `--ago` must refuse to run
    /// rather than silently matching every tag in every repository.
    #[test]
    fn standard_mode_without_filter_or_ago_is_rejected() {
        let ctx = AppContext::for_test(crate::format::ColorChoice::Never);
        let args = PurgeArgs {
            common: CommonArgs {
                registry: Some("myregistry.azurecr.io".to_string()),
                insecure: false,
                username: None,
                password: None,
                filters: Vec::new(),
                ago: None,
                keep: 0,
                include_locked: false,
                dry_run: true,
                discovery_workers: Some(1),
                mutation_workers: Some(1),
            },
            untagged: false,
            untagged_only: false,
        };

        assert_eq!(run(&ctx, args), 2);
    }

    /// A filter alone, without `--ago`, is still rejected in standard mode.
    #[test]
    fn standard_mode_with_filter_but_no_ago_is_rejected() {
        let ctx = AppContext::for_test(crate::format::ColorChoice::Never);
        let args = PurgeArgs {
            common: CommonArgs {
                registry: Some("myregistry.azurecr.io".to_string()),
                insecure: false,
                username: None,
                password: None,
                filters: vec![".*:.*".to_string()],
                ago: None,
                keep: 0,
                include_locked: false,
                dry_run: true,
                discovery_workers: Some(1),
                mutation_workers: Some(1),
            },
            untagged: false,
            untagged_only: false,
        };

        assert_eq!(run(&ctx, args), 2);
    }
}
