//! Annotator: the same-shape sibling of the Orchestrator's delete path.
//! Instead of deleting selected tags/manifests, it pushes a lifecycle-
//! annotation referrer artifact onto each selected digest and leaves the
//! subject untouched — used for "mark for later" runs that stop short of
//! deletion.

use crate::error::Result;
use crate::executor::{Pool, RetryPolicy};
use crate::filter::FilterResolver;
use crate::manifest_resolver::{ManifestResolver, ResolveOptions};
use crate::registry::{ReferrerArtifact, RegistryClient};
use crate::tag_selector::TagSelector;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Duration;
use tracing::info;


/// Whether an annotate pass also sweeps untagged manifests, mirroring
/// [`crate::orchestrator::Mode`] but without a delete-only counterpart —
/// annotation always looks at tagged items; untagged coverage is opt-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnnotateScope {
    pub include_untagged: bool,
}

/// One annotate run's configuration.
#[derive(Debug, Clone)]
pub struct AnnotateConfig {
    pub scope: AnnotateScope,
    pub filters: Vec<String>,
    pub time_to_compare: Option<DateTime<Utc>>,
    pub keep: usize,
    pub include_locked: bool,
    pub dry_run: bool,
    pub login_url: String,
    pub discovery_workers: usize,
    pub mutation_workers: usize,
    pub regex_timeout: Duration,
    pub retry: RetryPolicy,
    pub artifact_type: String,
    pub annotations: BTreeMap<String, String>,
}

/// Counters accumulated across every repository in an annotate run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AnnotateSummary {
    pub manifests_annotated: u64,
    pub repos_processed: u64,
    pub repos_skipped: u64,
}

/// Drives an annotate run end to end. Same multi-thread-runtime requirement
/// as [`crate::orchestrator::Orchestrator`]: `ManifestResolver::resolve` is
/// moved off the async worker via `block_in_place`.
pub struct Annotator<'a> {
    client: &'a dyn RegistryClient,
    runtime: tokio::runtime::Handle,
}

impl<'a> Annotator<'a> {
    pub fn new(client: &'a dyn RegistryClient, runtime: tokio::runtime::Handle) -> Self {
        Self { client, runtime }
    }

    pub async fn run(&self, config: &AnnotateConfig) -> (AnnotateSummary, Result<()>) {
        let mut summary = AnnotateSummary::default();

        let resolver = FilterResolver::new(self.client, config.regex_timeout);
        let repo_map = if config.filters.is_empty() {
            match resolver.list_all_repositories().await {
                Ok(repos) => repos.into_iter().map(|r| (r, ".*".to_string())).collect(),
                Err(e) => return (summary, Err(e)),
            }
        } else {
            match resolver.resolve(&config.filters).await {
                Ok(map) => map.into_iter().collect::<HashMap<_, _>>(),
                Err(e) => return (summary, Err(e)),
            }
        };

        let discovery_pool = match Pool::new(config.discovery_workers, self.runtime.clone()) {
            Ok(p) => p,
            Err(e) => return (summary, Err(e)),
        };
        let mutation_pool = match Pool::new(config.mutation_workers, self.runtime.clone()) {
            Ok(p) => p,
            Err(e) => return (summary, Err(e)),
        };

        for (repo, tag_regex) in &repo_map {
            match self
                .run_one_repo(config, repo, tag_regex, &discovery_pool, &mutation_pool, &mut summary)
                .await
            {
                Ok(()) => summary.repos_processed += 1,
                Err(e) if e.is_not_found() => summary.repos_skipped += 1,
                Err(e) => return (summary, Err(e)),
            }
        }

        (summary, Ok(()))
    }

    async fn run_one_repo(
        &self,
        config: &AnnotateConfig,
        repo: &str,
        tag_regex: &str,
        discovery_pool: &Pool,
        mutation_pool: &Pool,
        summary: &mut AnnotateSummary,
    ) -> Result<()> {
        let selector = TagSelector::new(self.client, config.regex_timeout);
        let selection = selector
            .select(
                repo,
                tag_regex,
                config.time_to_compare,
                config.keep,
                config.include_locked,
            )
            .await?;

        let mut targets: HashSet<String> = selection
            .to_delete
            .iter()
            .map(|t| t.digest.clone())
            .collect();

        if config.scope.include_untagged {
            let resolver = ManifestResolver::new(self.client, discovery_pool);
            let options = ResolveOptions {
                dry_run: false,
                include_locked: config.include_locked,
                preserve_untagged_non_regular: true,
                time_to_compare: config.time_to_compare,
                keep: config.keep,
            };
            let repo_owned = repo.to_string();
            let counts = selection.deleted_tag_count_per_digest.clone();
            let candidates = tokio::task::block_in_place(|| {
                resolver.resolve(&repo_owned, &counts, options)
            })?;
            targets.extend(candidates.into_iter().map(|m| m.digest));
        }

        if config.dry_run {
            for digest in &targets {
                println!("{}/{}@{} (annotate)", config.login_url, repo, digest);
            }
            summary.manifests_annotated += targets.len() as u64;
            return Ok(());
        }

        let outcome = self.push_annotations(repo, &targets, config, mutation_pool);
        summary.manifests_annotated += outcome.success_count as u64;
        info!(repo, annotated = outcome.success_count, "annotate pass complete");
        if let Some(err) = outcome.first_error {
            return Err(err);
        }
        Ok(())
    }

    fn push_annotations(
        &self,
        repo: &str,
        targets: &HashSet<String>,
        config: &AnnotateConfig,
        pool: &Pool,
    ) -> crate::executor::PoolOutcome {
        let client = self.client;
        let runtime = pool.runtime();
        let repo = repo.to_string();
        let artifact_type = config.artifact_type.clone();
        let annotations = config.annotations.clone();

        let jobs: Vec<_> = targets
            .iter()
            .map(|digest| {
                let digest = digest.clone();
                let repo = repo.clone();
                let runtime = runtime.clone();
                let artifact_type = artifact_type.clone();
                let annotations = annotations.clone();
                Box::new(move |_: &tokio_util::sync::CancellationToken| -> Result<()> {
                    let artifact = ReferrerArtifact {
                        artifact_type: artifact_type.clone(),
                        subject_digest: digest.clone(),
                        annotations: annotations.clone(),
                    };
                    runtime
                        .block_on(client.push_referrer(&repo, &artifact))
                        .map(|_| ())
                }) as Box<dyn Fn(&tokio_util::sync::CancellationToken) -> Result<()> + Send>
            })
            .collect();

        pool.run_mutation_batch(jobs, config.retry)
    }
}
