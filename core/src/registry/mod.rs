//! The `RegistryClient` capability contract.
//!
//! This is the seam the core algorithms consume and never implement more
//! than one concrete instance of directly: FilterResolver, TagSelector,
//! ManifestResolver, Executor and Orchestrator are all generic over (or hold
//! a handle to) `dyn RegistryClient`. Credential resolution, retries, and
//! the wire format live in the concrete implementation (see `crate::client`);
//! this module only fixes the shape of the contract and the attribute types
//! that flow across it.

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[cfg(test)]
mod tests;

/// A single tag's list-endpoint attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagAttr {
    pub name: String,
    pub digest: String,
    pub last_update_time: Option<DateTime<Utc>>,
    pub delete_enabled: bool,
    pub write_enabled: bool,
}

/// A single manifest's list-endpoint attributes (lightweight; the full body
/// is fetched separately via [`RegistryClient::get_manifest`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestAttr {
    pub digest: String,
    pub media_type: String,
    pub last_update_time: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
    pub delete_enabled: bool,
    pub write_enabled: bool,
}

/// A page of repository names plus the cursor for the next page, if any.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RepositoriesPage {
    pub names: Vec<String>,
    pub next_cursor: Option<String>,
}

/// A page of tags plus the raw `Link` response header, if the server sent one.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TagsPage {
    pub tags: Vec<TagAttr>,
    pub link_header: Option<String>,
}

/// A page of manifest attributes. Manifest list pagination is cursor-only
/// (keyed by the last digest seen), with no `Link` header involved.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ManifestsPage {
    pub manifests: Vec<ManifestAttr>,
}

/// Requested mutation of a tag's or manifest's lock attributes. `None` means
/// "leave unchanged".
#[derive(Debug, Clone, Copy, Default)]
pub struct AttributeUpdate {
    pub delete_enabled: Option<bool>,
    pub write_enabled: Option<bool>,
}

impl AttributeUpdate {
    /// The update applied by unlock-then-delete: both flags forced true.
    pub fn unlock() -> Self {
        Self {
            delete_enabled: Some(true),
            write_enabled: Some(true),
        }
    }
}

/// Ordering requested from [`RegistryClient::list_tags`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagOrdering {
    /// Newest `last_update_time` first.
    TimeDesc,
}

/// An artifact to push with [`RegistryClient::push_referrer`]: an OCI
/// manifest whose `subject` points at an existing digest, carrying
/// `annotations` and an `artifactType` (used by the annotate pipeline to
/// attach lifecycle metadata).
#[derive(Debug, Clone)]
pub struct ReferrerArtifact {
    pub artifact_type: String,
    pub subject_digest: String,
    pub annotations: std::collections::BTreeMap<String, String>,
}

/// The capability the core consumes to talk to an OCI-compatible registry.
///
/// Implementations own HTTP transport, authentication, and retry-free error
/// mapping (network/4xx/5xx classification into [`crate::error::PurgeError`]
/// variants); the retry/backoff *policy* lives in the executor, which wraps
/// calls through this trait.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Lists up to `page_size` repositories starting after `last_name`.
    async fn list_repositories(
        &self,
        last_name: Option<&str>,
        page_size: usize,
    ) -> Result<RepositoriesPage>;

    /// Lists one page of tags for `repo`, ordered as requested, starting
    /// after `last_tag` (the cursor extracted from the previous page's
    /// `Link` header).
    async fn list_tags(
        &self,
        repo: &str,
        ordering: TagOrdering,
        last_tag: Option<&str>,
    ) -> Result<TagsPage>;

    /// Lists one page of manifest attributes for `repo`, starting after
    /// `last_digest`.
    async fn list_manifests(&self, repo: &str, last_digest: Option<&str>) -> Result<ManifestsPage>;

    /// Fetches a manifest's raw body. A 404 is surfaced as
    /// [`crate::error::PurgeError::NotFound`], which callers in the
    /// untagged-resolution path treat as "vanished", not an error.
    async fn get_manifest(&self, repo: &str, digest: &str) -> Result<Vec<u8>>;

    /// Deletes a tag. A 404 is treated as success by the caller.
    async fn delete_tag(&self, repo: &str, name: &str) -> Result<()>;

    /// Deletes a manifest. A 404 is treated as success by the caller.
    async fn delete_manifest(&self, repo: &str, digest: &str) -> Result<()>;

    /// Updates a tag's mutable lock attributes.
    async fn update_tag_attributes(
        &self,
        repo: &str,
        name: &str,
        update: AttributeUpdate,
    ) -> Result<()>;

    /// Updates a manifest's mutable lock attributes.
    async fn update_manifest_attributes(
        &self,
        repo: &str,
        digest: &str,
        update: AttributeUpdate,
    ) -> Result<()>;

    /// Pushes a lifecycle-annotation artifact referencing an existing
    /// manifest as its `subject`. Used only by the annotate pipeline.
    async fn push_referrer(&self, repo: &str, artifact: &ReferrerArtifact) -> Result<String>;
}

/// Extracts the `last` query parameter from a `Link` response header of the
/// form `</acr/v1/{repo}/_tags?last={name}&n=...>; rel="next"`.
///
/// Returns `None` when the header is absent, malformed, or carries an empty
/// `last` value — any of which terminates pagination. Percent-encoded `&`
/// inside the value (e.g. a tag name containing a literal `&`) is decoded.
pub fn parse_link_last(link_header: Option<&str>) -> Option<String> {
    let header = link_header?;
    let start = header.find('<')?;
    let end = header[start..].find('>')? + start;
    let url_part = &header[start + 1..end];

    let base = url::Url::parse("http://purge.invalid").ok()?;
    let parsed = url::Url::options()
        .base_url(Some(&base))
        .parse(url_part)
        .ok()?;

    parsed.query_pairs().find_map(|(k, v)| {
        if k == "last" && !v.is_empty() {
            Some(v.into_owned())
        } else {
            None
        }
    })
}
