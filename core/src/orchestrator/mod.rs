//! Orchestrator: drives one purge run across every filtered repository,
//! wiring FilterResolver, TagSelector, ManifestResolver and the executor
//! pools together, honoring dry-run and accumulating run-wide counters.

use crate::error::Result;
use crate::executor::{Pool, RetryPolicy};
use crate::filter::FilterResolver;
use crate::manifest_resolver::{ManifestResolver, ResolveOptions};
use crate::registry::{AttributeUpdate, RegistryClient};
use crate::tag_selector::TagSelector;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{info, warn};

#[cfg(test)]
mod tests;

/// Which classes of digest a run operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Delete matching tags; optionally also sweep the untagged manifests
    /// that deletion pass left dangling.
    Standard { sweep_untagged: bool },
    /// Skip tag deletion entirely; only delete manifests already dangling.
    UntaggedOnly,
}

/// One purge run's configuration. `filters` is empty in [`Mode::UntaggedOnly`]
/// without an explicit filter, meaning "every repository".
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub mode: Mode,
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
}

/// Counters accumulated across every repository in a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub tags_deleted: u64,
    pub manifests_deleted: u64,
    pub repos_processed: u64,
    pub repos_skipped: u64,
}

/// Drives a purge run end to end. Must be driven from a multi-thread Tokio
/// runtime: [`ManifestResolver::resolve`] blocks its calling thread for the
/// whole repository walk, so `run_one_repo` moves that call off the async
/// worker via [`tokio::task::block_in_place`], which panics under a
/// current-thread runtime.
pub struct Orchestrator<'a> {
    client: &'a dyn RegistryClient,
    runtime: tokio::runtime::Handle,
}

impl<'a> Orchestrator<'a> {
    pub fn new(client: &'a dyn RegistryClient, runtime: tokio::runtime::Handle) -> Self {
        Self { client, runtime }
    }

    /// Runs the configured pass across every matching repository, in order.
    /// A single repository's error aborts the run; counters accumulated
    /// before the error are still returned alongside it.
    pub async fn run(&self, config: &RunConfig) -> (RunSummary, Result<()>) {
        let mut summary = RunSummary::default();

        let repo_map = match self.build_repo_map(config).await {
            Ok(m) => m,
            Err(e) => return (summary, Err(e)),
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
                .run_one_repo(
                    config,
                    repo,
                    tag_regex,
                    &discovery_pool,
                    &mutation_pool,
                    &mut summary,
                )
                .await
            {
                Ok(()) => summary.repos_processed += 1,
                Err(e) if e.is_not_found() => {
                    warn!(repo, "repository not found, skipping");
                    summary.repos_skipped += 1;
                }
                Err(e) => return (summary, Err(e)),
            }
        }

        (summary, Ok(()))
    }

    async fn build_repo_map(&self, config: &RunConfig) -> Result<HashMap<String, String>> {
        if config.filters.is_empty() {
            let resolver = FilterResolver::new(self.client, config.regex_timeout);
            let repos = resolver.list_all_repositories().await?;
            return Ok(repos.into_iter().map(|r| (r, ".*".to_string())).collect());
        }

        let resolver = FilterResolver::new(self.client, config.regex_timeout);
        let map = resolver.resolve(&config.filters).await?;
        Ok(map.into_iter().collect())
    }

    async fn run_one_repo(
        &self,
        config: &RunConfig,
        repo: &str,
        tag_regex: &str,
        discovery_pool: &Pool,
        mutation_pool: &Pool,
        summary: &mut RunSummary,
    ) -> Result<()> {
        let mut tag_deletion_counts: HashMap<String, u32> = HashMap::new();

        if !matches!(config.mode, Mode::UntaggedOnly) {
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
            tag_deletion_counts = selection.deleted_tag_count_per_digest;

            if config.dry_run {
                for tag in &selection.to_delete {
                    println!("{}/{}:{}", config.login_url, repo, tag.name);
                }
                summary.tags_deleted += selection.to_delete.len() as u64;
            } else {
                let outcome = self.delete_tags(repo, &selection.to_delete, config, mutation_pool);
                summary.tags_deleted += outcome.success_count as u64;
                if let Some(err) = outcome.first_error {
                    return Err(err);
                }
            }
        }

        let should_sweep_untagged = match config.mode {
            Mode::Standard { sweep_untagged } => sweep_untagged,
            Mode::UntaggedOnly => true,
        };

        if should_sweep_untagged {
            let resolver = ManifestResolver::new(self.client, discovery_pool);
            let options = ResolveOptions {
                dry_run: config.dry_run,
                include_locked: config.include_locked,
                preserve_untagged_non_regular: false,
                time_to_compare: config.time_to_compare,
                keep: config.keep,
            };
            let repo_owned = repo.to_string();
            let tag_deletion_counts_owned = tag_deletion_counts.clone();
            let deletable = tokio::task::block_in_place(|| {
                resolver.resolve(&repo_owned, &tag_deletion_counts_owned, options)
            })?;

            if config.dry_run {
                for manifest in &deletable {
                    println!("{}/{}@{}", config.login_url, repo, manifest.digest);
                }
                summary.manifests_deleted += deletable.len() as u64;
            } else {
                let outcome = self.delete_manifests(repo, &deletable, config, mutation_pool);
                summary.manifests_deleted += outcome.success_count as u64;
                if let Some(err) = outcome.first_error {
                    return Err(err);
                }
            }
        }

        info!(repo, tags = summary.tags_deleted, manifests = summary.manifests_deleted, "repository pass complete");
        Ok(())
    }

    fn delete_tags(
        &self,
        repo: &str,
        tags: &[crate::tag_selector::TagToDelete],
        config: &RunConfig,
        pool: &Pool,
    ) -> crate::executor::PoolOutcome {
        let client = self.client;
        let runtime = pool.runtime();
        let include_locked = config.include_locked;
        let repo = repo.to_string();

        let jobs: Vec<_> = tags
            .iter()
            .map(|tag| {
                let name = tag.name.clone();
                let repo = repo.clone();
                let runtime = runtime.clone();
                Box::new(move |_: &tokio_util::sync::CancellationToken| -> Result<()> {
                    runtime.block_on(async {
                        if include_locked {
                            let _ = client
                                .update_tag_attributes(&repo, &name, AttributeUpdate::unlock())
                                .await;
                        }
                        client.delete_tag(&repo, &name).await
                    })
                }) as Box<dyn Fn(&tokio_util::sync::CancellationToken) -> Result<()> + Send>
            })
            .collect();

        pool.run_mutation_batch(jobs, config.retry)
    }

    fn delete_manifests(
        &self,
        repo: &str,
        manifests: &[crate::registry::ManifestAttr],
        config: &RunConfig,
        pool: &Pool,
    ) -> crate::executor::PoolOutcome {
        let client = self.client;
        let runtime = pool.runtime();
        let include_locked = config.include_locked;
        let repo = repo.to_string();

        let jobs: Vec<_> = manifests
            .iter()
            .map(|manifest| {
                let digest = manifest.digest.clone();
                let repo = repo.clone();
                let runtime = runtime.clone();
                Box::new(move |_: &tokio_util::sync::CancellationToken| -> Result<()> {
                    runtime.block_on(async {
                        if include_locked {
                            let _ = client
                                .update_manifest_attributes(&repo, &digest, AttributeUpdate::unlock())
                                .await;
                        }
                        client.delete_manifest(&repo, &digest).await
                    })
                }) as Box<dyn Fn(&tokio_util::sync::CancellationToken) -> Result<()> + Send>
            })
            .collect();

        pool.run_mutation_batch(jobs, config.retry)
    }
}
