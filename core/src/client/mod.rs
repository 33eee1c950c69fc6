//! Async HTTP implementation of [`crate::registry::RegistryClient`].
//!
//! Talks the ACR-flavored distribution API: `/acr/v1/{repo}/_tags` and
//! `/acr/v1/{repo}/_manifests` for attribute-bearing listing and mutation,
//! plain `/v2/{repo}/manifests/{ref}` for manifest GET (shared with every
//! OCI-compliant registry). Retry/backoff policy is NOT implemented here;
//! this client only translates HTTP into [`PurgeError`] variants so the
//! executor's retry decorator can classify failures correctly.

use crate::auth::Credentials;
use crate::error::{PurgeError, Result};
use crate::registry::{
    AttributeUpdate, ManifestAttr, ManifestsPage, RegistryClient, ReferrerArtifact,
    RepositoriesPage, TagAttr, TagOrdering, TagsPage, parse_link_last,
};
use async_trait::async_trait;
use reqwest::{Client as ReqwestClient, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;


/// Tunables for the underlying `reqwest::Client`; retry policy lives in the executor, not here.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub timeout_seconds: u64,
    pub max_idle_per_host: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            max_idle_per_host: 10,
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    pub fn with_max_idle_per_host(mut self, max: usize) -> Self {
        self.max_idle_per_host = max;
        self
    }
}

#[derive(Debug, Deserialize)]
struct RepositoryCatalog {
    repositories: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct AcrTagsResponse {
    tags: Vec<TagAttr>,
}

#[derive(Debug, Deserialize)]
struct AcrManifestsResponse {
    manifests: Vec<ManifestAttr>,
}

#[derive(Debug, Serialize)]
struct AttributeUpdateBody {
    #[serde(rename = "changeableAttributes")]
    changeable_attributes: ChangeableAttributes,
}

#[derive(Debug, Serialize, Default)]
struct ChangeableAttributes {
    #[serde(skip_serializing_if = "Option::is_none", rename = "deleteEnabled")]
    delete_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "writeEnabled")]
    write_enabled: Option<bool>,
}

/// The production `RegistryClient`: a `reqwest::Client` pointed at one registry host.
#[derive(Debug, Clone)]
pub struct HttpRegistryClient {
    http: ReqwestClient,
    registry_url: String,
    credentials: Credentials,
}

impl HttpRegistryClient {
    pub fn new(registry_url: impl Into<String>, credentials: Credentials) -> Result<Self> {
        Self::with_config(registry_url, ClientConfig::default(), credentials)
    }

    pub fn with_config(
        registry_url: impl Into<String>,
        config: ClientConfig,
        credentials: Credentials,
    ) -> Result<Self> {
        let http = ReqwestClient::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .pool_max_idle_per_host(config.max_idle_per_host)
            .build()
            .map_err(|e| PurgeError::network_with_source("failed to build HTTP client", e))?;

        let registry_url = registry_url.into().trim_end_matches('/').to_string();

        Ok(Self {
            http,
            registry_url,
            credentials,
        })
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.credentials.to_header_value() {
            Some(header) => builder.header("Authorization", header),
            None => builder,
        }
    }

    async fn translate_status(
        &self,
        response: reqwest::Response,
        resource_type: &str,
        name: &str,
    ) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        match status {
            StatusCode::NOT_FOUND => Err(PurgeError::NotFound {
                resource_type: resource_type.to_string(),
                name: name.to_string(),
            }),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(PurgeError::Unauthorized {
                message: format!("{resource_type} {name}"),
                status_code: Some(status.as_u16()),
            }),
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get("Retry-After")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok());
                Err(PurgeError::RateLimit {
                    message: format!("rate limited on {resource_type} {name}"),
                    retry_after,
                })
            }
            s if s.is_server_error() => Err(PurgeError::Server {
                message: format!("server error on {resource_type} {name}"),
                status_code: s.as_u16(),
            }),
            other => Err(PurgeError::network(format!(
                "unexpected status {other} for {resource_type} {name}"
            ))),
        }
    }
}

#[async_trait]
impl RegistryClient for HttpRegistryClient {
    async fn list_repositories(
        &self,
        last_name: Option<&str>,
        page_size: usize,
    ) -> Result<RepositoriesPage> {
        let mut url = format!("{}/v2/_catalog?n={}", self.registry_url, page_size);
        if let Some(last) = last_name {
            url.push_str(&format!("&last={last}"));
        }

        let response = self
            .authorize(self.http.get(&url))
            .send()
            .await
            .map_err(|e| PurgeError::network_with_source("list_repositories failed", e))?;

        let link_header = response
            .headers()
            .get("Link")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let response = self
            .translate_status(response, "catalog", &self.registry_url)
            .await?;

        let body: RepositoryCatalog = response
            .json()
            .await
            .map_err(|e| PurgeError::network_with_source("invalid catalog JSON", e))?;

        Ok(RepositoriesPage {
            next_cursor: parse_link_last(link_header.as_deref()),
            names: body.repositories,
        })
    }

    async fn list_tags(
        &self,
        repo: &str,
        ordering: TagOrdering,
        last_tag: Option<&str>,
    ) -> Result<TagsPage> {
        let orderby = match ordering {
            TagOrdering::TimeDesc => "timedesc",
        };
        let mut url = format!(
            "{}/acr/v1/{}/_tags?orderby={}",
            self.registry_url, repo, orderby
        );
        if let Some(last) = last_tag {
            url.push_str(&format!("&last={last}"));
        }

        let response = self
            .authorize(self.http.get(&url))
            .send()
            .await
            .map_err(|e| PurgeError::network_with_source("list_tags failed", e))?;

        let link_header = response
            .headers()
            .get("Link")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let response = self.translate_status(response, "repository", repo).await?;

        let body: AcrTagsResponse = response
            .json()
            .await
            .map_err(|e| PurgeError::network_with_source("invalid tags JSON", e))?;

        Ok(TagsPage {
            tags: body.tags,
            link_header,
        })
    }

    async fn list_manifests(&self, repo: &str, last_digest: Option<&str>) -> Result<ManifestsPage> {
        let mut url = format!("{}/acr/v1/{}/_manifests", self.registry_url, repo);
        if let Some(last) = last_digest {
            url.push_str(&format!("?last={last}"));
        }

        let response = self
            .authorize(self.http.get(&url))
            .send()
            .await
            .map_err(|e| PurgeError::network_with_source("list_manifests failed", e))?;

        let response = self.translate_status(response, "repository", repo).await?;

        let body: AcrManifestsResponse = response
            .json()
            .await
            .map_err(|e| PurgeError::network_with_source("invalid manifests JSON", e))?;

        Ok(ManifestsPage {
            manifests: body.manifests,
        })
    }

    async fn get_manifest(&self, repo: &str, digest: &str) -> Result<Vec<u8>> {
        let url = format!("{}/v2/{}/manifests/{}", self.registry_url, repo, digest);

        let response = self
            .authorize(self.http.get(&url))
            .header(
                "Accept",
                "application/vnd.oci.image.manifest.v1+json, \
                 application/vnd.oci.image.index.v1+json, \
                 application/vnd.oci.artifact.manifest.v1+json, \
                 application/vnd.docker.distribution.manifest.v2+json, \
                 application/vnd.docker.distribution.manifest.list.v2+json",
            )
            .send()
            .await
            .map_err(|e| PurgeError::network_with_source("get_manifest failed", e))?;

        let response = self.translate_status(response, "manifest", digest).await?;

        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| PurgeError::network_with_source("failed to read manifest body", e))
    }

    async fn delete_tag(&self, repo: &str, name: &str) -> Result<()> {
        let url = format!("{}/acr/v1/{}/_tags/{}", self.registry_url, repo, name);
        let response = self
            .authorize(self.http.delete(&url))
            .send()
            .await
            .map_err(|e| PurgeError::network_with_source("delete_tag failed", e))?;

        match self.translate_status(response, "tag", name).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn delete_manifest(&self, repo: &str, digest: &str) -> Result<()> {
        let url = format!("{}/acr/v1/{}/_manifests/{}", self.registry_url, repo, digest);
        let response = self
            .authorize(self.http.delete(&url))
            .send()
            .await
            .map_err(|e| PurgeError::network_with_source("delete_manifest failed", e))?;

        match self.translate_status(response, "manifest", digest).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn update_tag_attributes(
        &self,
        repo: &str,
        name: &str,
        update: AttributeUpdate,
    ) -> Result<()> {
        let url = format!("{}/acr/v1/{}/_tags/{}", self.registry_url, repo, name);
        let body = AttributeUpdateBody {
            changeable_attributes: ChangeableAttributes {
                delete_enabled: update.delete_enabled,
                write_enabled: update.write_enabled,
            },
        };

        let response = self
            .authorize(self.http.patch(&url))
            .json(&body)
            .send()
            .await
            .map_err(|e| PurgeError::network_with_source("update_tag_attributes failed", e))?;

        self.translate_status(response, "tag", name).await.map(|_| ())
    }

    async fn update_manifest_attributes(
        &self,
        repo: &str,
        digest: &str,
        update: AttributeUpdate,
    ) -> Result<()> {
        let url = format!("{}/acr/v1/{}/_manifests/{}", self.registry_url, repo, digest);
        let body = AttributeUpdateBody {
            changeable_attributes: ChangeableAttributes {
                delete_enabled: update.delete_enabled,
                write_enabled: update.write_enabled,
            },
        };

        let response = self
            .authorize(self.http.patch(&url))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                PurgeError::network_with_source("update_manifest_attributes failed", e)
            })?;

        self.translate_status(response, "manifest", digest)
            .await
            .map(|_| ())
    }

    async fn push_referrer(&self, repo: &str, artifact: &ReferrerArtifact) -> Result<String> {
        let manifest = serde_json::json!({
            "schemaVersion": 2,
            "mediaType": "application/vnd.oci.image.manifest.v1+json",
            "artifactType": artifact.artifact_type,
            "config": {
                "mediaType": "application/vnd.oci.empty.v1+json",
                "digest": "sha256:44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a",
                "size": 2,
            },
            "layers": [],
            "subject": {
                "mediaType": "application/vnd.oci.image.manifest.v1+json",
                "digest": artifact.subject_digest,
            },
            "annotations": artifact.annotations,
        });
        let body = serde_json::to_vec(&manifest)
            .map_err(|e| PurgeError::network_with_source("failed to encode referrer", e))?;

        use sha2::{Digest as Sha2Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(&body);
        let digest = format!("sha256:{:x}", hasher.finalize());

        let url = format!("{}/v2/{}/manifests/{}", self.registry_url, repo, digest);
        let response = self
            .authorize(self.http.put(&url))
            .header("Content-Type", "application/vnd.oci.image.manifest.v1+json")
            .body(body)
            .send()
            .await
            .map_err(|e| PurgeError::network_with_source("push_referrer failed", e))?;

        self.translate_status(response, "referrer", &digest)
            .await
            .map(|_| digest)
    }
}
