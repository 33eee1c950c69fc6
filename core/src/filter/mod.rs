//! FilterResolver: splits composite `repo-regex:tag-regex` filters, enumerates
//! repositories, and builds the per-repository combined tag regex consumed by
//! [`crate::tag_selector`].

use crate::error::{PurgeError, Result};
use crate::regexp::Regex;
use crate::registry::RegistryClient;
use std::collections::BTreeMap;
use std::time::Duration;


/// Page size used while walking `ListRepositories`; large enough that most
/// registries settle the whole catalog in a handful of pages.
const REPOSITORY_PAGE_SIZE: usize = 100;

/// Splits a raw filter of the form `<repo-regex>:<tag-regex>` on the
/// outermost `:` — the one not nested inside a parenthesized group (e.g. an
/// inline-flag or non-capture prefix `(?flags:…)`) or a character class
/// `[…]`. Backslash-escaped brackets/parens don't affect nesting depth.
///
/// Fails with [`PurgeError::InvalidFilter`] if no such colon exists, or if
/// splitting on it would leave either side empty.
pub fn split_filter(raw: &str) -> Result<(String, String)> {
    let mut paren_depth: i32 = 0;
    let mut bracket_depth: i32 = 0;
    let mut chars = raw.char_indices().peekable();
    let mut split_at = None;

    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '(' => paren_depth += 1,
            ')' => paren_depth -= 1,
            '[' => bracket_depth += 1,
            ']' => bracket_depth -= 1,
            ':' if paren_depth <= 0 && bracket_depth <= 0 => {
                split_at = Some(i);
                break;
            }
            _ => {}
        }
    }

    let split_at = split_at.ok_or_else(|| {
        PurgeError::InvalidFilter(raw.to_string(), "missing top-level ':' separator".to_string())
    })?;

    let repo_part = &raw[..split_at];
    let tag_part = &raw[split_at + 1..];

    if repo_part.is_empty() || tag_part.is_empty() {
        return Err(PurgeError::InvalidFilter(
            raw.to_string(),
            "both the repository and tag side must be non-empty".to_string(),
        ));
    }

    Ok((repo_part.to_string(), tag_part.to_string()))
}

/// Resolves raw filter strings against the registry's repository catalog
/// into a `repo name -> combined tag regex` map, one pagination pass per
/// matching repo's tag regex worth of work.
pub struct FilterResolver<'a> {
    client: &'a dyn RegistryClient,
    regex_timeout: Duration,
}

impl<'a> FilterResolver<'a> {
    pub fn new(client: &'a dyn RegistryClient, regex_timeout: Duration) -> Self {
        Self {
            client,
            regex_timeout,
        }
    }

    /// Walks `ListRepositories` to exhaustion, accumulating names in
    /// insertion (server-returned) order.
    pub async fn list_all_repositories(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let page = self
                .client
                .list_repositories(cursor.as_deref(), REPOSITORY_PAGE_SIZE)
                .await?;
            if page.names.is_empty() {
                break;
            }
            names.extend(page.names.iter().cloned());
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        Ok(names)
    }

    /// Builds the `repo -> combined_tag_regex` map for `raw_filters`.
    pub async fn resolve(&self, raw_filters: &[String]) -> Result<BTreeMap<String, String>> {
        let repos = self.list_all_repositories().await?;
        let mut map: BTreeMap<String, String> = BTreeMap::new();

        for raw in raw_filters {
            let (repo_pattern, tag_pattern) = split_filter(raw)?;
            let repo_regex = Regex::compile_anchored(&repo_pattern, self.regex_timeout)?;

            for repo in &repos {
                if repo_regex.match_string(repo).await? {
                    map.entry(repo.clone())
                        .and_modify(|existing| {
                            *existing = format!("{existing}|{tag_pattern}");
                        })
                        .or_insert_with(|| tag_pattern.clone());
                }
            }
        }

        Ok(map)
    }
}
