//! `acr-purge annotate`: attach a lifecycle-annotation referrer artifact to
//! selected manifests instead of deleting them.

use super::common::{
    self, parse_key_val, resolve_discovery_workers, resolve_mutation_workers,
    resolve_regex_timeout, resolve_retry_policy, resolve_time_to_compare, CommonArgs,
};
use crate::context::{AppContext, VerbosityLevel};
use crate::format::{self, Formattable};
use acr_purge_core::{AnnotateConfig, AnnotateScope, AnnotateSummary, Annotator};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(clap::Args, Debug)]
pub struct AnnotateArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Artifact type recorded on the pushed referrer.
    #[arg(long, default_value = "application/vnd.acr-purge.lifecycle")]
    pub artifact_type: String,

    /// `KEY=VALUE` annotation to attach; repeatable.
    #[arg(long = "annotation", value_parser = parse_key_val)]
    pub annotations: Vec<(String, String)>,

    /// Also annotate manifests left dangling, not just selected tags.
    #[arg(long)]
    pub untagged: bool,
}

pub fn run(ctx: &AppContext, args: AnnotateArgs) -> i32 {
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

    let annotations: BTreeMap<String, String> = args.annotations.into_iter().collect();

    let run_config = AnnotateConfig {
        scope: AnnotateScope {
            include_untagged: args.untagged,
        },
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
        artifact_type: args.artifact_type,
        annotations,
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
    let spinner = formatter.spinner(&format!("annotating {}", run_config.login_url));

    let annotator = Annotator::new(&client, runtime.handle().clone());
    let (summary, result) = runtime.block_on(annotator.run(&run_config));

    formatter.finish_progress(spinner, "annotate run complete");

    print_summary(ctx, &summary);

    match result {
        Ok(()) => {
            format::success(ctx, "annotate run finished without errors");
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
    manifests_annotated: u64,
    repos_processed: u64,
    repos_skipped: u64,
}

impl From<&AnnotateSummary> for SummaryView {
    fn from(s: &AnnotateSummary) -> Self {
        Self {
            manifests_annotated: s.manifests_annotated,
            repos_processed: s.repos_processed,
            repos_skipped: s.repos_skipped,
        }
    }
}

impl Formattable for SummaryView {
    fn format_pretty(&self) -> String {
        format!(
            "manifests annotated: {}\nrepositories processed: {}\nrepositories skipped: {}",
            self.manifests_annotated, self.repos_processed, self.repos_skipped
        )
    }
}

fn print_summary(ctx: &AppContext, summary: &AnnotateSummary) {
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
        let summary = AnnotateSummary {
            manifests_annotated: 7,
            repos_processed: 2,
            repos_skipped: 0,
        };
        let view = SummaryView::from(&summary);
        let text = view.format_pretty();
        assert!(text.contains("manifests annotated: 7"));
        assert!(text.contains("repositories processed: 2"));
    }

    #[test]
    fn parse_key_val_splits_on_first_equals() {
        let (k, v) = parse_key_val("owner=platform=team").unwrap();
        assert_eq!(k, "owner");
        assert_eq!(v, "platform=team");
    }

    #[test]
    fn parse_key_val_rejects_missing_equals() {
        assert!(parse_key_val("no-equals-here").is_err());
    }
}
