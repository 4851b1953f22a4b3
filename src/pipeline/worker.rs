//! # Pipeline Worker Pool
//!
//! Bounded job queue plus a fixed-size worker pool consuming it. This is the
//! explicit home of everything that must not block an inbound
//! acknowledgment: handlers enqueue and return; workers run each job's chain
//! and log failures instead of surfacing them. Jobs never join back to the
//! request that enqueued them.

use std::sync::Arc;

use metrics::{counter, histogram};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use super::Pipeline;
use crate::telemetry::{self, TraceContext};

/// A unit of background work produced by ingestion.
#[derive(Debug, Clone)]
pub enum PipelineJob {
    /// Full post-acknowledgment chain for one inbound message:
    /// classify, assign, dedup/create request, dispatch, synthesize context.
    ProcessTurn {
        conversation_id: Uuid,
        message_id: Uuid,
        lead_id: Option<Uuid>,
        text: String,
        /// Channel address for the customer-facing confirmation, when the
        /// channel supports outbound delivery
        reply_to: Option<String>,
    },
    /// Post-takeover fanout: fixed confirmation reply plus an operational
    /// alert, both fire-and-forget.
    TakeoverNotice {
        conversation_id: Uuid,
        reply_to: Option<String>,
    },
}

impl PipelineJob {
    fn kind(&self) -> &'static str {
        match self {
            PipelineJob::ProcessTurn { .. } => "process_turn",
            PipelineJob::TakeoverNotice { .. } => "takeover_notice",
        }
    }
}

/// Cloneable handle for enqueueing jobs.
#[derive(Clone)]
pub struct JobQueue {
    tx: mpsc::Sender<PipelineJob>,
}

impl JobQueue {
    /// Enqueue without blocking. A full queue drops the job with a warning
    /// and a counter; the caller has already decided its acknowledgment.
    pub fn enqueue(&self, job: PipelineJob) -> bool {
        let kind = job.kind();
        match self.tx.try_send(job) {
            Ok(()) => {
                counter!("pipeline_jobs_enqueued_total", "kind" => kind).increment(1);
                true
            }
            Err(err) => {
                warn!(kind, error = %err, "Pipeline queue full or closed; dropping job");
                counter!("pipeline_jobs_dropped_total", "kind" => kind).increment(1);
                false
            }
        }
    }
}

/// Running worker pool. Dropping the handles does not stop the workers; use
/// the cancellation token passed at start.
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Start `workers` consumer tasks over a queue of `queue_capacity`.
    pub fn start(
        pipeline: Arc<Pipeline>,
        workers: usize,
        queue_capacity: usize,
        shutdown: CancellationToken,
    ) -> (JobQueue, WorkerPool) {
        let (tx, rx) = mpsc::channel(queue_capacity);
        let rx = Arc::new(Mutex::new(rx));

        let handles = (0..workers.max(1))
            .map(|worker_id| {
                let pipeline = Arc::clone(&pipeline);
                let rx = Arc::clone(&rx);
                let shutdown = shutdown.clone();
                tokio::spawn(async move {
                    run_worker(worker_id, pipeline, rx, shutdown).await;
                })
            })
            .collect();

        (JobQueue { tx }, WorkerPool { handles })
    }

    /// Wait for all workers to finish after cancellation.
    pub async fn join(self) {
        for handle in self.handles {
            let _ = handle.await;
        }
    }
}

async fn run_worker(
    worker_id: usize,
    pipeline: Arc<Pipeline>,
    rx: Arc<Mutex<mpsc::Receiver<PipelineJob>>>,
    shutdown: CancellationToken,
) {
    info!(worker_id, "Pipeline worker started");

    loop {
        let job = tokio::select! {
            _ = shutdown.cancelled() => break,
            job = async {
                let mut rx = rx.lock().await;
                rx.recv().await
            } => match job {
                Some(job) => job,
                None => break,
            },
        };

        let kind = job.kind();
        let started = Instant::now();

        // Each job gets its own correlation id; failures are logged inside
        // run_job and nothing propagates to siblings
        let context = TraceContext {
            trace_id: format!("job-{}", &Uuid::new_v4().to_string()[..8]),
        };
        telemetry::with_trace_context(context, pipeline.run_job(job)).await;

        histogram!("pipeline_job_duration_ms", "kind" => kind)
            .record(started.elapsed().as_secs_f64() * 1_000.0);
        counter!("pipeline_jobs_processed_total", "kind" => kind).increment(1);
    }

    info!(worker_id, "Pipeline worker stopped");
}
