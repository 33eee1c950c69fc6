//! Bounded-concurrency worker pools: discovery (manifest reads) and mutation
//! (delete/annotate writes), cancel-on-first-error, per-job retry/backoff.
//!
//! Jobs run on `rayon` worker threads (the same pattern the teacher's CLI
//! uses for its own parallel metadata fetch) and call back into the async
//! `RegistryClient` by blocking the worker on a handle to the orchestrator's
//! Tokio runtime. Cancellation is an ambient [`CancellationToken`] checked at
//! each job's HTTP call boundary, not a future being dropped.

use crate::error::{PurgeError, Result};
use rand::Rng;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;


/// Clamp bounds for the mutation pool's worker count (`[1, 32]`, default CPU count).
pub const MIN_MUTATION_WORKERS: usize = 1;
pub const MAX_MUTATION_WORKERS: usize = 32;

/// Multiplier applied to the discovery pool's worker count to size its queue
/// (rayon's work-stealing deque has no explicit bound, so this is only used
/// to size any caller-side buffering in front of the pool).
pub const DISCOVERY_QUEUE_FACTOR: usize = 3;

/// Clamps a user-requested mutation worker count into `[1, 32]`.
pub fn clamp_mutation_workers(requested: usize) -> usize {
    requested.clamp(MIN_MUTATION_WORKERS, MAX_MUTATION_WORKERS)
}

/// Bounded retry policy for mutation jobs: small attempt budget, exponential
/// backoff with jitter, honoring a `Retry-After` hint when the error carries one.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
        }
    }
}

fn backoff_delay(policy: RetryPolicy, attempt_no: u32, retry_after_secs: Option<u64>) -> Duration {
    if let Some(secs) = retry_after_secs {
        return Duration::from_secs(secs);
    }
    let exp = policy.base_delay.saturating_mul(1 << attempt_no.min(16));
    let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..50));
    exp + jitter
}

/// Runs `attempt` up to `policy.max_attempts` times, retrying only
/// [`PurgeError::is_retryable`] failures, bailing out immediately if
/// `cancellation` fires. The final error (retryable or not) is returned
/// as-is; [`PurgeError::PoolCancelled`] is only used by the pool wrapper
/// that observes cancellation triggered by a *different* job.
pub fn with_retry(
    cancellation: &CancellationToken,
    policy: RetryPolicy,
    mut attempt: impl FnMut() -> Result<()>,
) -> Result<()> {
    let mut attempt_no = 0;
    loop {
        if cancellation.is_cancelled() {
            return Err(PurgeError::PoolCancelled(Box::new(PurgeError::network(
                "pool cancelled before this job could run",
            ))));
        }

        match attempt() {
            Ok(()) => return Ok(()),
            Err(e) if e.is_retryable() && attempt_no + 1 < policy.max_attempts => {
                std::thread::sleep(backoff_delay(policy, attempt_no, e.retry_after_seconds()));
                attempt_no += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Outcome of running a batch of jobs through a [`Pool`]: a success count
/// plus the first error encountered (later errors are dropped, per
/// cancel-on-first-error semantics).
#[derive(Debug, Default)]
pub struct PoolOutcome {
    pub success_count: usize,
    pub first_error: Option<PurgeError>,
}

#[derive(Default)]
struct Counters {
    success: AtomicUsize,
    first_error: Mutex<Option<PurgeError>>,
}

impl Counters {
    fn record_success(&self) {
        self.success.fetch_add(1, Ordering::Relaxed);
    }

    /// Records `err` if it's the first error seen; returns whether cancellation should fire.
    fn record_error(&self, err: PurgeError) {
        let mut slot = self.first_error.lock().unwrap();
        if slot.is_none() {
            *slot = Some(err);
        }
    }

    fn into_outcome(self) -> PoolOutcome {
        PoolOutcome {
            success_count: self.success.into_inner(),
            first_error: self.first_error.into_inner().unwrap(),
        }
    }
}

/// A named rayon thread pool sharing one cancellation token and a handle to
/// the orchestrator's Tokio runtime (so jobs can `block_on` async
/// `RegistryClient` calls from a worker thread).
pub struct Pool {
    thread_pool: rayon::ThreadPool,
    cancellation: CancellationToken,
    runtime: tokio::runtime::Handle,
}

impl Pool {
    pub fn new(worker_count: usize, runtime: tokio::runtime::Handle) -> Result<Self> {
        let thread_pool = rayon::ThreadPoolBuilder::new()
            .num_threads(worker_count.max(1))
            .build()
            .map_err(|e| PurgeError::network(format!("failed to build worker pool: {e}")))?;
        Ok(Self {
            thread_pool,
            cancellation: CancellationToken::new(),
            runtime,
        })
    }

    pub fn cancellation(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    pub fn runtime(&self) -> tokio::runtime::Handle {
        self.runtime.clone()
    }

    /// Runs `f` on this pool's worker threads, blocking the calling thread
    /// until it completes. Used by `ManifestResolver` to drive its own
    /// `rayon::scope`-based recursive index expansion.
    pub fn install<R: Send>(&self, f: impl FnOnce() -> R + Send) -> R {
        self.thread_pool.install(f)
    }

    /// Opens a `rayon::scope` bound to this pool, letting jobs spawned into
    /// it recursively spawn further work (BFS/DFS index expansion) before
    /// the call returns once every spawned job has completed.
    pub fn scope<'scope, R: Send>(
        &self,
        f: impl FnOnce(&rayon::Scope<'scope>) -> R + Send,
    ) -> R {
        self.thread_pool.scope(f)
    }

    /// Runs a static batch of mutation jobs to completion: bounded
    /// concurrency, cancel-on-first-error, retry/backoff per job. Each job
    /// is `Fn` (not `FnOnce`) since retries re-invoke it; jobs must be
    /// idempotent-tolerant (a 404 on delete is success, per the client).
    pub fn run_mutation_batch<J>(&self, jobs: Vec<J>, retry: RetryPolicy) -> PoolOutcome
    where
        J: Fn(&CancellationToken) -> Result<()> + Send,
    {
        use rayon::prelude::*;

        let counters = Counters::default();
        let cancellation = &self.cancellation;

        self.thread_pool.install(|| {
            jobs.into_par_iter().for_each(|job| {
                if cancellation.is_cancelled() {
                    return;
                }
                let result = with_retry(cancellation, retry, || job(cancellation));
                match result {
                    Ok(()) => counters.record_success(),
                    Err(e) => {
                        counters.record_error(e);
                        cancellation.cancel();
                    }
                }
            });
        });

        counters.into_outcome()
    }
}
