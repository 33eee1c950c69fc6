//! Timeout-bounded regex matching for repository/tag filters.
//!
//! Filters need PCRE-style constructs the `regex` crate's linear-time engine
//! doesn't support (lookaround, backtracking), so this wraps `fancy_regex`.
//! Backtracking engines can go pathological on crafted input, so every
//! [`Regex::match_string`] call is raced against a deadline on a dedicated
//! blocking thread; timeout is the only runtime error this module returns,
//! matching the filter/tag-selector contract that consumes it.

use crate::error::{PurgeError, Result};
use std::sync::Arc;
use std::time::Duration;

#[cfg(test)]
mod tests;

/// Applied when a caller doesn't override the match timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// A compiled, timeout-bounded regular expression.
#[derive(Clone)]
pub struct Regex {
    inner: Arc<fancy_regex::Regex>,
    timeout: Duration,
}

impl Regex {
    /// Compiles `pattern` with the default 60-second match timeout.
    pub fn compile(pattern: &str) -> Result<Self> {
        Self::compile_with_timeout(pattern, DEFAULT_TIMEOUT)
    }

    /// Compiles `pattern` with an explicit match timeout.
    pub fn compile_with_timeout(pattern: &str, timeout: Duration) -> Result<Self> {
        let inner = fancy_regex::Regex::new(pattern)
            .map_err(|e| PurgeError::RegexCompile(format!("{pattern:?}: {e}")))?;
        Ok(Self {
            inner: Arc::new(inner),
            timeout,
        })
    }

    /// Compiles an anchored `^pattern$` match, used for whole-name filters
    /// (repository names, tag names) rather than substring search.
    pub fn compile_anchored(pattern: &str, timeout: Duration) -> Result<Self> {
        Self::compile_with_timeout(&format!("^(?:{pattern})$"), timeout)
    }

    /// Matches `s` against the compiled pattern, bounded by the configured
    /// timeout. The match itself runs on a blocking thread so a pathological
    /// backtrack can't stall the async executor running this future.
    pub async fn match_string(&self, s: &str) -> Result<bool> {
        let inner = Arc::clone(&self.inner);
        let owned = s.to_string();
        let timeout = self.timeout;

        let join = tokio::task::spawn_blocking(move || inner.is_match(&owned));

        match tokio::time::timeout(timeout, join).await {
            Ok(Ok(Ok(matched))) => Ok(matched),
            Ok(Ok(Err(e))) => Err(PurgeError::RegexCompile(format!("match error: {e}"))),
            Ok(Err(join_err)) => Err(PurgeError::RegexCompile(format!(
                "regex worker panicked: {join_err}"
            ))),
            Err(_elapsed) => Err(PurgeError::RegexTimeout(timeout)),
        }
    }
}

impl std::fmt::Debug for Regex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Regex")
            .field("pattern", &self.inner.as_str())
            .field("timeout", &self.timeout)
            .finish()
    }
}
