//! OCI manifest media types and selective body projections.
//!
//! This module re-exports the data structures needed from the `oci-spec`
//! crate, plus a pair of lightweight, hand-rolled projections used by the
//! manifest resolver. Manifest bodies are untrusted, sometimes-large JSON
//! blobs; rather than require every body to parse as a full, schema-valid
//! [`ImageManifest`]/[`ImageIndex`] (which some registries' artifact
//! manifests don't), the resolver only ever needs two things out of a body:
//! its child descriptors (if it's an index) and its `subject` (if it's a
//! referrer). [`IndexProjection`] and `ReferrerProjection` decode exactly
//! that and nothing else.

use crate::error::{PurgeError, Result};
use serde::Deserialize;

pub use oci_spec::image::{Descriptor, ImageConfiguration, ImageIndex, ImageManifest, Platform};


/// `application/vnd.docker.distribution.manifest.v2+json`
pub const DOCKER_MANIFEST_V2: &str = "application/vnd.docker.distribution.manifest.v2+json";
/// `application/vnd.docker.distribution.manifest.list.v2+json`
pub const DOCKER_MANIFEST_LIST_V2: &str =
    "application/vnd.docker.distribution.manifest.list.v2+json";
/// `application/vnd.oci.image.manifest.v1+json`
pub const OCI_MANIFEST_V1: &str = "application/vnd.oci.image.manifest.v1+json";
/// `application/vnd.oci.image.index.v1+json`
pub const OCI_INDEX_V1: &str = "application/vnd.oci.image.index.v1+json";
/// `application/vnd.oci.artifact.manifest.v1+json`
pub const OCI_ARTIFACT_MANIFEST_V1: &str = "application/vnd.oci.artifact.manifest.v1+json";

/// True when `media_type` denotes a manifest list / image index, i.e. its
/// body may contain a `manifests[]` array of child descriptors.
pub fn is_index_media_type(media_type: &str) -> bool {
    media_type == DOCKER_MANIFEST_LIST_V2 || media_type == OCI_INDEX_V1
}

/// True when `media_type` denotes a plain, single-platform image manifest
/// (never itself an index, though it may still carry a `subject`).
pub fn is_regular_manifest_media_type(media_type: &str) -> bool {
    media_type == DOCKER_MANIFEST_V2 || media_type == OCI_MANIFEST_V1
}

/// A child entry of an index/manifest-list body. Only the two fields the
/// resolver needs (digest, media type) are decoded.
#[derive(Debug, Clone, Deserialize)]
pub struct ChildDescriptor {
    pub digest: String,
    #[serde(rename = "mediaType")]
    pub media_type: String,
}

/// Selective projection of an index/manifest-list body's `manifests[]` array.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct IndexProjection {
    #[serde(default)]
    pub manifests: Vec<ChildDescriptor>,
}

/// The `subject` field of a referrer-capable manifest.
#[derive(Debug, Clone, Deserialize)]
pub struct SubjectDescriptor {
    pub digest: String,
}

/// Selective projection of a manifest body's `subject` field (and its own
/// media type, needed to decide whether to also expand it as an index).
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ReferrerProjection {
    #[serde(rename = "mediaType")]
    pub media_type: Option<String>,
    pub subject: Option<SubjectDescriptor>,
}

impl ReferrerProjection {
    /// True when this body declares a non-empty `subject.digest`, making the
    /// manifest it came from a referrer.
    pub fn is_referrer(&self) -> bool {
        self.subject
            .as_ref()
            .is_some_and(|s| !s.digest.is_empty())
    }
}

/// Parses a manifest body's `manifests[]` array, ignoring every other field.
pub fn parse_index_projection(digest: &str, bytes: &[u8]) -> Result<IndexProjection> {
    serde_json::from_slice(bytes).map_err(|e| PurgeError::BadManifestJson {
        digest: digest.to_string(),
        message: format!("failed to parse index body: {e}"),
    })
}

/// Parses a manifest body's `subject`/`mediaType` fields, ignoring every
/// other field (config, layers, annotations, ...).
pub fn parse_referrer_projection(digest: &str, bytes: &[u8]) -> Result<ReferrerProjection> {
    serde_json::from_slice(bytes).map_err(|e| PurgeError::BadManifestJson {
        digest: digest.to_string(),
        message: format!("failed to parse referrer body: {e}"),
    })
}
