//! TagSelector: paginated tag walk applying regex, age, and lock filters,
//! honoring `keep N` newest-by-time.

use crate::error::Result;
use crate::regexp::Regex;
use crate::registry::{RegistryClient, TagOrdering, parse_link_last};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Duration;


/// One tag scheduled for deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagToDelete {
    pub name: String,
    pub digest: String,
}

/// The repo-level result of a tag-selection pass: the tags to delete plus,
/// per manifest digest, how many of its tags are being deleted — consumed by
/// [`crate::manifest_resolver::ManifestResolver`] for dry-run projection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSelectionResult {
    pub to_delete: Vec<TagToDelete>,
    pub deleted_tag_count_per_digest: HashMap<String, u32>,
}

/// Walks one repository's tags and selects deletion candidates.
pub struct TagSelector<'a> {
    client: &'a dyn RegistryClient,
    regex_timeout: Duration,
}

impl<'a> TagSelector<'a> {
    pub fn new(client: &'a dyn RegistryClient, regex_timeout: Duration) -> Self {
        Self {
            client,
            regex_timeout,
        }
    }

    /// Selects tags in `repo` matching `combined_tag_regex`, older than
    /// `time_to_compare` (when given), unlocked (unless `include_locked`),
    /// keeping the `keep` newest eligible tags.
    pub async fn select(
        &self,
        repo: &str,
        combined_tag_regex: &str,
        time_to_compare: Option<DateTime<Utc>>,
        keep: usize,
        include_locked: bool,
    ) -> Result<TagSelectionResult> {
        let regex = Regex::compile_anchored(combined_tag_regex, self.regex_timeout)?;

        let mut to_delete = Vec::new();
        let mut deleted_tag_count_per_digest: HashMap<String, u32> = HashMap::new();
        let mut kept = 0usize;
        let mut last_tag: Option<String> = None;

        loop {
            let page = self
                .client
                .list_tags(repo, TagOrdering::TimeDesc, last_tag.as_deref())
                .await?;

            for tag in &page.tags {
                if !regex.match_string(&tag.name).await? {
                    continue;
                }

                let older_than_cutoff = match time_to_compare {
                    Some(cutoff) => tag.last_update_time.map(|t| t < cutoff).unwrap_or(true),
                    None => true,
                };
                if !older_than_cutoff {
                    continue;
                }

                let unlocked = include_locked || (tag.delete_enabled && tag.write_enabled);
                if !unlocked {
                    continue;
                }

                if kept < keep {
                    kept += 1;
                    continue;
                }

                *deleted_tag_count_per_digest
                    .entry(tag.digest.clone())
                    .or_insert(0) += 1;
                to_delete.push(TagToDelete {
                    name: tag.name.clone(),
                    digest: tag.digest.clone(),
                });
            }

            last_tag = parse_link_last(page.link_header.as_deref());
            if last_tag.is_none() {
                break;
            }
        }

        Ok(TagSelectionResult {
            to_delete,
            deleted_tag_count_per_digest,
        })
    }
}
