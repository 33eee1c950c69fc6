//! ManifestResolver: the heart of the core. Walks a repository's manifest
//! list, classifies every entry, and resolves which untagged manifests are
//! truly dangling versus reachable through a tagged index or attached as a
//! referrer.
//!
//! The classification loop paginates sequentially (cheap, I/O-bound), but
//! index/referrer expansion needs its own fetch-and-recurse concurrency, so
//! this module runs synchronously on the discovery pool's worker threads,
//! blocking each job on the orchestrator's Tokio runtime handle for the
//! underlying `RegistryClient` calls — the same bridge [`crate::executor`]
//! describes for mutation jobs.

use crate::error::{PurgeError, Result};
use crate::executor::Pool;
use crate::oci::{self, is_index_media_type, is_regular_manifest_media_type};
use crate::registry::{ManifestAttr, RegistryClient};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;


/// Everything the classification loop needs to decide a record's fate and,
/// for the annotate pipeline, whether untagged non-regular manifests should
/// be preserved unconditionally (step 4 of the classification loop).
#[derive(Debug, Clone, Copy)]
pub struct ResolveOptions {
    pub dry_run: bool,
    pub include_locked: bool,
    /// Set by the annotate pipeline: untagged indexes/artifacts are kept as
    /// candidates without inspection, since annotation never deletes.
    pub preserve_untagged_non_regular: bool,
    pub time_to_compare: Option<DateTime<Utc>>,
    pub keep: usize,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            include_locked: false,
            preserve_untagged_non_regular: false,
            time_to_compare: None,
            keep: 0,
        }
    }
}

struct SharedState {
    ignore_list: Mutex<HashSet<String>>,
    candidates: Mutex<HashMap<String, ManifestAttr>>,
    first_error: Mutex<Option<PurgeError>>,
}

impl SharedState {
    fn new() -> Self {
        Self {
            ignore_list: Mutex::new(HashSet::new()),
            candidates: Mutex::new(HashMap::new()),
            first_error: Mutex::new(None),
        }
    }

    fn insert_ignore(&self, digest: &str) -> bool {
        self.ignore_list.lock().unwrap().insert(digest.to_string())
    }

    fn is_ignored(&self, digest: &str) -> bool {
        self.ignore_list.lock().unwrap().contains(digest)
    }

    fn record_error(&self, err: PurgeError) {
        let mut slot = self.first_error.lock().unwrap();
        if slot.is_none() {
            *slot = Some(err);
        }
    }
}

/// Walks one repository's manifests and resolves the final deletable set.
pub struct ManifestResolver<'a> {
    client: &'a dyn RegistryClient,
    discovery_pool: &'a Pool,
}

impl<'a> ManifestResolver<'a> {
    pub fn new(client: &'a dyn RegistryClient, discovery_pool: &'a Pool) -> Self {
        Self {
            client,
            discovery_pool,
        }
    }

    /// Resolves `repo`'s deletable (or, with `preserve_untagged_non_regular`,
    /// annotatable-candidate) manifest set. `tag_deletion_counts` is the
    /// per-digest count of tags [`crate::tag_selector::TagSelector`] already
    /// scheduled for deletion this pass, used for dry-run projection.
    pub fn resolve(
        &self,
        repo: &str,
        tag_deletion_counts: &HashMap<String, u32>,
        options: ResolveOptions,
    ) -> Result<Vec<ManifestAttr>> {
        let state = SharedState::new();
        let runtime = self.discovery_pool.runtime();
        let cancellation = self.discovery_pool.cancellation();

        self.discovery_pool.scope(|scope| {
            let mut last_digest: Option<String> = None;

            loop {
                if cancellation.is_cancelled() {
                    break;
                }

                let page = match runtime
                    .block_on(self.client.list_manifests(repo, last_digest.as_deref()))
                {
                    Ok(p) => p,
                    Err(e) => {
                        state.record_error(e);
                        cancellation.cancel();
                        break;
                    }
                };

                if page.manifests.is_empty() {
                    break;
                }

                for record in &page.manifests {
                    if record.digest.is_empty() {
                        continue;
                    }
                    if state.is_ignored(&record.digest) {
                        continue;
                    }
                    if !options.include_locked && (!record.delete_enabled || !record.write_enabled)
                    {
                        continue;
                    }

                    let retains_a_tag = !record.tags.is_empty()
                        && (!options.dry_run
                            || tag_deletion_counts
                                .get(&record.digest)
                                .copied()
                                .unwrap_or(0)
                                < record.tags.len() as u32);

                    if retains_a_tag {
                        if is_index_media_type(&record.media_type) {
                            spawn_index_expansion(
                                scope,
                                self.client,
                                runtime.clone(),
                                cancellation.clone(),
                                &state,
                                repo.to_string(),
                                record.digest.clone(),
                            );
                        }
                        continue;
                    }

                    if options.preserve_untagged_non_regular
                        && !is_regular_manifest_media_type(&record.media_type)
                    {
                        state
                            .candidates
                            .lock()
                            .unwrap()
                            .insert(record.digest.clone(), record.clone());
                        continue;
                    }

                    state
                        .candidates
                        .lock()
                        .unwrap()
                        .insert(record.digest.clone(), record.clone());

                    spawn_referrer_check(
                        scope,
                        self.client,
                        runtime.clone(),
                        cancellation.clone(),
                        &state,
                        repo.to_string(),
                        record.digest.clone(),
                    );
                }

                last_digest = Some(page.manifests.last().unwrap().digest.clone());
            }
        });

        if let Some(err) = state.first_error.into_inner().unwrap() {
            return Err(err);
        }

        let ignore_list = state.ignore_list.into_inner().unwrap();
        let candidates = state.candidates.into_inner().unwrap();

        let mut deletable: Vec<ManifestAttr> = candidates
            .into_iter()
            .filter(|(digest, _)| !ignore_list.contains(digest))
            .map(|(_, record)| record)
            .collect();

        sort_newest_first(&mut deletable);

        if let Some(cutoff) = options.time_to_compare {
            deletable.retain(|m| match m.last_update_time {
                Some(t) => t < cutoff,
                None => true,
            });
        }

        if options.keep > 0 {
            deletable.drain(0..options.keep.min(deletable.len()));
        }

        Ok(deletable)
    }
}

/// Sorts by `last_update_time` descending (newest first), with a
/// digest-string tie-break for determinism; unparseable/null timestamps sort
/// last (oldest), so they're deleted first when `keep` trims from the front.
fn sort_newest_first(manifests: &mut [ManifestAttr]) {
    manifests.sort_by(|a, b| match (a.last_update_time, b.last_update_time) {
        (Some(ta), Some(tb)) => tb.cmp(&ta).then_with(|| a.digest.cmp(&b.digest)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.digest.cmp(&b.digest),
    });
}

/// Fetches `digest`'s body, parses its `manifests[]`, and recursively
/// expands every child that is itself an index. Every direct child —
/// index or not — is added to `ignore_list`; only a newly-inserted index
/// child is queued for further expansion (dedups cycles and shared children).
#[allow(clippy::too_many_arguments)]
fn spawn_index_expansion<'scope>(
    scope: &rayon::Scope<'scope>,
    client: &'scope dyn RegistryClient,
    runtime: tokio::runtime::Handle,
    cancellation: tokio_util::sync::CancellationToken,
    state: &'scope SharedState,
    repo: String,
    digest: String,
) {
    scope.spawn(move |s| {
        if cancellation.is_cancelled() {
            return;
        }

        let result: Result<()> = (|| {
            let bytes = runtime.block_on(client.get_manifest(&repo, &digest))?;
            let projection = oci::parse_index_projection(&digest, &bytes)?;

            for child in projection.manifests {
                let newly_ignored = state.insert_ignore(&child.digest);
                if newly_ignored && is_index_media_type(&child.media_type) {
                    spawn_index_expansion(
                        s,
                        client,
                        runtime.clone(),
                        cancellation.clone(),
                        state,
                        repo.clone(),
                        child.digest,
                    );
                }
            }
            Ok(())
        })();

        if let Err(e) = result {
            state.record_error(e);
            cancellation.cancel();
        }
    });
}

/// Fetches `digest`'s body to determine whether it's a referrer (non-empty
/// `subject`). A 404 means the manifest vanished between listing and fetch:
/// treated as neither reachable nor deletable, so it's dropped from
/// `candidates` rather than left to be deleted (harmless either way, since a
/// delete of an absent manifest is a no-op success, but precise per spec).
#[allow(clippy::too_many_arguments)]
fn spawn_referrer_check<'scope>(
    scope: &rayon::Scope<'scope>,
    client: &'scope dyn RegistryClient,
    runtime: tokio::runtime::Handle,
    cancellation: tokio_util::sync::CancellationToken,
    state: &'scope SharedState,
    repo: String,
    digest: String,
) {
    scope.spawn(move |s| {
        if cancellation.is_cancelled() {
            return;
        }

        let result: Result<()> = (|| {
            let bytes = match runtime.block_on(client.get_manifest(&repo, &digest)) {
                Ok(b) => b,
                Err(e) if e.is_not_found() => {
                    state.candidates.lock().unwrap().remove(&digest);
                    return Ok(());
                }
                Err(e) => return Err(e),
            };

            let projection = oci::parse_referrer_projection(&digest, &bytes)?;
            if projection.is_referrer() {
                let newly_ignored = state.insert_ignore(&digest);
                if newly_ignored
                    && projection
                        .media_type
                        .as_deref()
                        .is_some_and(is_index_media_type)
                {
                    spawn_index_expansion(
                        s,
                        client,
                        runtime.clone(),
                        cancellation.clone(),
                        state,
                        repo.clone(),
                        digest.clone(),
                    );
                }
            }

            Ok(())
        })();

        if let Err(e) = result {
            state.record_error(e);
            cancellation.cancel();
        }
    });
}
