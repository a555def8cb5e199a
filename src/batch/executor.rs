//! Batch executor: runs a job once per row through the proxy.
//!
//! Workers are futures joined inside the calling task. They share a row
//! cursor, so at most `workers` proxy calls are in flight at once. Every row
//! yields exactly one [`BatchResult`], placed at the row's input position.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use futures::future::join_all;
use futures::FutureExt;

use crate::metrics::BatchMetrics;
use crate::proxy::{ProxyInvoke, ProxyRequest};

use super::resolve::resolve_row;
use super::types::{BatchJob, BatchProgress, BatchResult, BatchRow, ExecutionPolicy};

/// Monotonic run counter. Starting a run supersedes every earlier ticket.
#[derive(Debug, Clone, Default)]
pub struct BatchGeneration {
    current: Arc<AtomicU64>,
}

impl BatchGeneration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new run, superseding any run still in flight
    pub fn begin(&self) -> BatchTicket {
        let id = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        BatchTicket {
            id,
            current: self.current.clone(),
        }
    }

    /// Supersede the current run without starting another
    pub fn cancel(&self) {
        self.current.fetch_add(1, Ordering::SeqCst);
    }

    pub fn current(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }
}

/// Handle for one run. Results of a run whose ticket is no longer current
/// are stale and should be discarded by the caller.
#[derive(Debug, Clone)]
pub struct BatchTicket {
    id: u64,
    current: Arc<AtomicU64>,
}

impl BatchTicket {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_current(&self) -> bool {
        self.current.load(Ordering::SeqCst) == self.id
    }
}

/// Generations keyed by owner (a workspace id, or any caller-chosen key)
#[derive(Debug, Default)]
pub struct BatchRegistry {
    generations: DashMap<String, BatchGeneration>,
}

impl BatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self, key: &str) -> BatchTicket {
        self.generations
            .entry(key.to_string())
            .or_default()
            .begin()
    }

    /// Supersede the run for `key`; false when nothing was ever started
    pub fn cancel(&self, key: &str) -> bool {
        match self.generations.get(key) {
            Some(generation) => {
                generation.cancel();
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, key: &str) {
        if let Some((_, generation)) = self.generations.remove(key) {
            generation.cancel();
        }
    }
}

struct RunContext<'a, P: ?Sized, F> {
    rows: &'a [BatchRow],
    job: &'a BatchJob,
    proxy: &'a P,
    ticket: &'a BatchTicket,
    pacing: Duration,
    on_progress: &'a F,
    cursor: AtomicUsize,
    done: AtomicUsize,
}

impl<'a, P, F> RunContext<'a, P, F>
where
    P: ProxyInvoke + ?Sized,
    F: Fn(BatchProgress) + Send + Sync,
{
    async fn drain(&self) -> Vec<BatchResult> {
        let total = self.rows.len();
        let mut finished = Vec::new();
        let mut first = true;

        loop {
            let index = self.cursor.fetch_add(1, Ordering::SeqCst);
            if index >= total {
                break;
            }
            let row = &self.rows[index];

            if !first && !self.pacing.is_zero() && self.ticket.is_current() {
                tokio::time::sleep(self.pacing).await;
            }
            first = false;

            let result = if self.ticket.is_current() {
                let result = run_row(index, row, self.job, self.proxy).await;
                BatchMetrics::record_row(result.status);
                result
            } else {
                BatchMetrics::record_row_cancelled();
                BatchResult::cancelled(index, row.clone())
            };
            finished.push(result);

            let done = self.done.fetch_add(1, Ordering::SeqCst) + 1;
            (self.on_progress)(BatchProgress { done, total });
        }

        finished
    }
}

/// Run `job` once per row and return one result per row, in row order.
///
/// Rows not yet started when `ticket` is superseded are recorded as
/// cancelled (`status 0`). `on_progress` is called after every row with a
/// strictly increasing `done` count.
#[tracing::instrument(
    skip_all,
    fields(
        batch.generation = ticket.id(),
        batch.rows = rows.len(),
        batch.mode = ?policy.mode,
        http.method = %job.method,
    )
)]
pub async fn run<P, F>(
    rows: Vec<BatchRow>,
    job: BatchJob,
    proxy: &P,
    policy: ExecutionPolicy,
    ticket: &BatchTicket,
    on_progress: F,
) -> Vec<BatchResult>
where
    P: ProxyInvoke + ?Sized,
    F: Fn(BatchProgress) + Send + Sync,
{
    let total = rows.len();
    let workers = policy.workers(total);
    let started = Instant::now();
    BatchMetrics::record_run_started();

    tracing::info!(
        endpoint = %job.endpoint,
        workers,
        pacing_ms = policy.pacing_ms,
        "Batch run started"
    );

    let ctx = RunContext {
        rows: &rows,
        job: &job,
        proxy,
        ticket,
        pacing: Duration::from_millis(policy.pacing_ms),
        on_progress: &on_progress,
        cursor: AtomicUsize::new(0),
        done: AtomicUsize::new(0),
    };
    let ctx = &ctx;

    let batches = join_all((0..workers).map(move |_| ctx.drain())).await;

    let mut slots: Vec<Option<BatchResult>> = (0..total).map(|_| None).collect();
    for result in batches.into_iter().flatten() {
        let index = result.index;
        slots[index] = Some(result);
    }
    let results: Vec<BatchResult> = slots
        .into_iter()
        .enumerate()
        .map(|(index, slot)| slot.unwrap_or_else(|| BatchResult::cancelled(index, rows[index].clone())))
        .collect();

    let elapsed = started.elapsed();
    BatchMetrics::record_run_finished(elapsed);

    let succeeded = results.iter().filter(|r| r.is_success()).count();
    tracing::info!(
        total,
        succeeded,
        failed = total - succeeded,
        superseded = !ticket.is_current(),
        duration_ms = elapsed.as_millis() as u64,
        "Batch run finished"
    );

    results
}

/// [`run`] with a private ticket and no progress reporting
pub async fn run_all<P>(
    rows: Vec<BatchRow>,
    job: BatchJob,
    proxy: &P,
    policy: ExecutionPolicy,
) -> Vec<BatchResult>
where
    P: ProxyInvoke + ?Sized,
{
    let ticket = BatchGeneration::new().begin();
    run(rows, job, proxy, policy, &ticket, |_| {}).await
}

/// Resolve, send and time one row. Never fails: resolution errors, transport
/// errors and panics inside the proxy all become `status 0` results.
async fn run_row<P>(index: usize, row: &BatchRow, job: &BatchJob, proxy: &P) -> BatchResult
where
    P: ProxyInvoke + ?Sized,
{
    let payload = match resolve_row(job, row) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!(batch.row = index, error = %e, "Failed to resolve row");
            return BatchResult::failed(index, row.clone(), e.to_string());
        }
    };

    let request = ProxyRequest {
        endpoint: job.endpoint.clone(),
        method: job.method,
        body: Some(payload.clone()),
        headers: job.headers.clone(),
    };

    let started = Instant::now();
    let outcome = AssertUnwindSafe(proxy.invoke(request)).catch_unwind().await;
    let duration_ms = started.elapsed().as_millis() as u64;

    match outcome {
        Ok(response) => {
            tracing::debug!(
                batch.row = index,
                http.status_code = response.status,
                duration_ms,
                "Row completed"
            );
            BatchResult::from_response(index, row.clone(), payload, response, duration_ms)
        }
        Err(_) => {
            tracing::error!(batch.row = index, "Proxy invocation panicked");
            let mut result = BatchResult::failed(index, row.clone(), "proxy invocation panicked");
            result.payload = Some(payload);
            result.duration_ms = duration_ms;
            result
        }
    }
}
