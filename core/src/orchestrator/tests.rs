use super::*;
use crate::error::PurgeError;
use crate::oci;
use crate::registry::*;
use async_trait::async_trait;
use std::collections::HashMap as Map;
use std::sync::Mutex as StdMutex;

fn tag(name: &str, digest: &str) -> TagAttr {
    TagAttr {
        name: name.to_string(),
        digest: digest.to_string(),
        last_update_time: Some(Utc::now()),
        delete_enabled: true,
        write_enabled: true,
    }
}

fn manifest(digest: &str, media_type: &str, tags: Vec<&str>) -> ManifestAttr {
    ManifestAttr {
        digest: digest.to_string(),
        media_type: media_type.to_string(),
        last_update_time: Some(Utc::now()),
        tags: tags.into_iter().map(str::to_string).collect(),
        delete_enabled: true,
        write_enabled: true,
    }
}

/// A single-repo fixture exercising the full tag-select + manifest-resolve +
/// delete pipeline. Deletions are recorded, not actually applied to the
/// fixture's own lists (the orchestrator never re-reads after deleting).
struct FixtureClient {
    repo: String,
    tags: Vec<TagAttr>,
    manifests: Vec<ManifestAttr>,
    bodies: Map<String, Vec<u8>>,
    deleted_tags: StdMutex<Vec<String>>,
    deleted_manifests: StdMutex<Vec<String>>,
}

impl FixtureClient {
    fn new(repo: &str) -> Self {
        Self {
            repo: repo.to_string(),
            tags: Vec::new(),
            manifests: Vec::new(),
            bodies: Map::new(),
            deleted_tags: StdMutex::new(Vec::new()),
            deleted_manifests: StdMutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl RegistryClient for FixtureClient {
    async fn list_repositories(
        &self,
        last_name: Option<&str>,
        _page_size: usize,
    ) -> Result<RepositoriesPage> {
        if last_name.is_some() {
            return Ok(RepositoriesPage::default());
        }
        Ok(RepositoriesPage {
            names: vec![self.repo.clone()],
            next_cursor: None,
        })
    }

    async fn list_tags(
        &self,
        _repo: &str,
        _ordering: TagOrdering,
        last_tag: Option<&str>,
    ) -> Result<TagsPage> {
        if last_tag.is_some() {
            return Ok(TagsPage::default());
        }
        Ok(TagsPage {
            tags: self.tags.clone(),
            link_header: None,
        })
    }

    async fn list_manifests(&self, _repo: &str, last_digest: Option<&str>) -> Result<ManifestsPage> {
        if last_digest.is_some() {
            return Ok(ManifestsPage::default());
        }
        Ok(ManifestsPage {
            manifests: self.manifests.clone(),
        })
    }

    async fn get_manifest(&self, _repo: &str, digest: &str) -> Result<Vec<u8>> {
        self.bodies
            .get(digest)
            .cloned()
            .ok_or_else(|| PurgeError::NotFound {
                resource_type: "manifest".to_string(),
                name: digest.to_string(),
            })
    }

    async fn delete_tag(&self, _repo: &str, name: &str) -> Result<()> {
        self.deleted_tags.lock().unwrap().push(name.to_string());
        Ok(())
    }

    async fn delete_manifest(&self, _repo: &str, digest: &str) -> Result<()> {
        self.deleted_manifests
            .lock()
            .unwrap()
            .push(digest.to_string());
        Ok(())
    }

    async fn update_tag_attributes(
        &self,
        _repo: &str,
        _name: &str,
        _update: AttributeUpdate,
    ) -> Result<()> {
        Ok(())
    }

    async fn update_manifest_attributes(
        &self,
        _repo: &str,
        _digest: &str,
        _update: AttributeUpdate,
    ) -> Result<()> {
        Ok(())
    }

    async fn push_referrer(&self, _repo: &str, _artifact: &ReferrerArtifact) -> Result<String> {
        unimplemented!()
    }
}

fn base_config(mode: Mode, dry_run: bool) -> RunConfig {
    RunConfig {
        mode,
        filters: vec!["repo:.*".to_string()],
        time_to_compare: None,
        keep: 0,
        include_locked: false,
        dry_run,
        login_url: "registry.example.com".to_string(),
        discovery_workers: 2,
        mutation_workers: 2,
        regex_timeout: std::time::Duration::from_secs(1),
        retry: crate::executor::RetryPolicy::default(),
    }
}

#[test]
fn standard_mode_deletes_matching_tags_and_leaves_untagged_alone() {
    let mut client = FixtureClient::new("repo");
    client.tags = vec![tag("v1", "sha256:a")];
    client.manifests = vec![manifest("sha256:a", oci::OCI_MANIFEST_V1, vec!["v1"])];

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap();
    let orchestrator = Orchestrator::new(&client, runtime.handle().clone());
    let config = base_config(Mode::Standard { sweep_untagged: false }, false);

    let (summary, result) = runtime.block_on(orchestrator.run(&config));
    result.unwrap();
    assert_eq!(summary.tags_deleted, 1);
    assert_eq!(summary.manifests_deleted, 0);
    assert_eq!(client.deleted_tags.lock().unwrap().as_slice(), ["v1"]);
}

#[test]
fn standard_with_sweep_deletes_both_tag_and_orphaned_manifest() {
    let mut client = FixtureClient::new("repo");
    client.tags = vec![tag("stale", "sha256:a")];
    client.manifests = vec![
        manifest("sha256:a", oci::OCI_MANIFEST_V1, vec!["stale"]),
        manifest("sha256:orphan", oci::OCI_MANIFEST_V1, vec![]),
    ];

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap();
    let orchestrator = Orchestrator::new(&client, runtime.handle().clone());
    let config = base_config(Mode::Standard { sweep_untagged: true }, false);

    let (summary, result) = runtime.block_on(orchestrator.run(&config));
    result.unwrap();
    assert_eq!(summary.tags_deleted, 1);
    assert_eq!(summary.manifests_deleted, 1);
    assert_eq!(
        client.deleted_manifests.lock().unwrap().as_slice(),
        ["sha256:orphan"]
    );
}

#[test]
fn untagged_only_mode_never_calls_delete_tag() {
    let mut client = FixtureClient::new("repo");
    client.tags = vec![tag("v1", "sha256:a")];
    client.manifests = vec![
        manifest("sha256:a", oci::OCI_MANIFEST_V1, vec!["v1"]),
        manifest("sha256:orphan", oci::OCI_MANIFEST_V1, vec![]),
    ];

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap();
    let orchestrator = Orchestrator::new(&client, runtime.handle().clone());
    let config = base_config(Mode::UntaggedOnly, false);

    let (summary, result) = runtime.block_on(orchestrator.run(&config));
    result.unwrap();
    assert_eq!(summary.tags_deleted, 0);
    assert_eq!(summary.manifests_deleted, 1);
    assert!(client.deleted_tags.lock().unwrap().is_empty());
}

#[test]
fn dry_run_records_counts_without_deleting_anything() {
    let mut client = FixtureClient::new("repo");
    client.tags = vec![tag("stale", "sha256:a")];
    client.manifests = vec![
        manifest("sha256:a", oci::OCI_MANIFEST_V1, vec!["stale"]),
        manifest("sha256:orphan", oci::OCI_MANIFEST_V1, vec![]),
    ];

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap();
    let orchestrator = Orchestrator::new(&client, runtime.handle().clone());
    let config = base_config(Mode::Standard { sweep_untagged: true }, true);

    let (summary, result) = runtime.block_on(orchestrator.run(&config));
    result.unwrap();
    assert_eq!(summary.tags_deleted, 1);
    assert_eq!(summary.manifests_deleted, 2, "dry-run projects the now-dangling manifest too");
    assert!(client.deleted_tags.lock().unwrap().is_empty());
    assert!(client.deleted_manifests.lock().unwrap().is_empty());
}
