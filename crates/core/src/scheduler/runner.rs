//! Scheduler implementation: dispatch queue and worker pool.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::job::{JobError, JobRecord, JobStore};
use crate::metrics::{
    ACTIVE_WORKERS, CONVERSIONS_TOTAL, CONVERSION_DURATION, JOBS_ENQUEUED, JOBS_RECOVERED,
    JOB_TRANSITIONS,
};
use crate::normalizer::ConversionRequest;

use super::config::SchedulerConfig;
use super::executor::{JobExecutor, ProgressSink};
use super::SchedulerError;

/// Background job scheduler.
///
/// Jobs are persisted through the [`JobStore`] and dispatched to a pool
/// of workers over an in-process channel. Durability lives in the store,
/// not the channel: on [`start`](Scheduler::start) every `Waiting` job in
/// the store is re-queued, so accepted jobs survive restarts. Delivery is
/// at least once; workers skip jobs that are no longer `Waiting`.
///
/// Running jobs cannot be cancelled. Once a worker picks a job up it runs
/// to completion or failure.
pub struct Scheduler {
    store: Arc<dyn JobStore>,
    config: SchedulerConfig,
    queue_tx: mpsc::UnboundedSender<String>,
    queue_rx: StdMutex<Option<mpsc::UnboundedReceiver<String>>>,
    shutdown: Arc<Notify>,
    running: Arc<AtomicBool>,
    workers: StdMutex<Vec<JoinHandle<()>>>,
}

impl Scheduler {
    /// Creates a scheduler over the given store. Workers do not run until
    /// [`start`](Self::start) is called.
    pub fn new(store: Arc<dyn JobStore>, config: SchedulerConfig) -> Self {
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        Self {
            store,
            config,
            queue_tx,
            queue_rx: StdMutex::new(Some(queue_rx)),
            shutdown: Arc::new(Notify::new()),
            running: Arc::new(AtomicBool::new(false)),
            workers: StdMutex::new(Vec::new()),
        }
    }

    /// Persists a job and queues it for execution. The returned id can be
    /// polled through [`status`](Self::status) immediately.
    ///
    /// The job record is created before dispatch: if the process dies
    /// between the two, the next `start` re-queues it from the store.
    pub fn enqueue(&self, request: &ConversionRequest) -> Result<String, SchedulerError> {
        let record = self.store.create(request)?;

        if self.queue_tx.send(record.id.clone()).is_err() {
            // A rejected submission must not leave a record behind; the
            // next start would re-queue it and a caller retry would then
            // run the job twice.
            if let Err(e) = self.store.delete(&record.id) {
                warn!(job_id = %record.id, error = %e, "could not roll back undispatched job");
            }
            return Err(SchedulerError::Unavailable(
                "dispatch queue closed".to_string(),
            ));
        }

        JOBS_ENQUEUED.inc();
        debug!(job_id = %record.id, "job enqueued");
        Ok(record.id)
    }

    /// Fetches the current record for a job.
    pub fn status(&self, id: &str) -> Result<JobRecord, SchedulerError> {
        self.store
            .get(id)?
            .ok_or_else(|| SchedulerError::JobNotFound(id.to_string()))
    }

    /// Lists the most recent jobs, newest first.
    pub fn recent_jobs(&self, limit: u32) -> Result<Vec<JobRecord>, SchedulerError> {
        Ok(self.store.list(limit)?)
    }

    /// Starts the worker pool. Jobs left over from a previous run are
    /// re-queued first, oldest first. Idempotent while running; a stopped
    /// scheduler cannot be restarted.
    pub fn start(&self, executor: Arc<dyn JobExecutor>) -> Result<(), SchedulerError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let queue_rx = self
            .queue_rx
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| {
                SchedulerError::Unavailable("scheduler cannot be restarted".to_string())
            })?;

        let recovered = self.store.recover_interrupted()?;
        if !recovered.is_empty() {
            info!(count = recovered.len(), "re-queueing jobs from previous run");
        }
        for id in recovered {
            JOBS_RECOVERED.inc();
            let _ = self.queue_tx.send(id);
        }

        let queue = Arc::new(Mutex::new(queue_rx));
        let worker_count = self.config.workers.max(1);
        let mut workers = self.workers.lock().unwrap();
        for worker_id in 0..worker_count {
            workers.push(tokio::spawn(worker_loop(
                worker_id,
                Arc::clone(&queue),
                Arc::clone(&self.store),
                Arc::clone(&executor),
                Arc::clone(&self.shutdown),
                Arc::clone(&self.running),
            )));
        }

        info!(workers = worker_count, "scheduler started");
        Ok(())
    }

    /// Stops the worker pool, waiting for in-flight jobs to settle.
    /// Queued jobs that were not picked up stay `Waiting` in the store.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        self.shutdown.notify_waiters();

        let handles: Vec<JoinHandle<()>> = self.workers.lock().unwrap().drain(..).collect();
        for handle in handles {
            let _ = handle.await;
        }
        info!("scheduler stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

enum Next {
    Job(String),
    Idle,
    Closed,
}

async fn worker_loop(
    worker_id: usize,
    queue: Arc<Mutex<mpsc::UnboundedReceiver<String>>>,
    store: Arc<dyn JobStore>,
    executor: Arc<dyn JobExecutor>,
    shutdown: Arc<Notify>,
    running: Arc<AtomicBool>,
) {
    debug!(worker_id, "worker started");
    loop {
        if !running.load(Ordering::SeqCst) {
            break;
        }

        // One worker at a time waits on the queue; the idle tick bounds
        // how long a shutdown can go unnoticed.
        let next = {
            let mut rx = queue.lock().await;
            tokio::select! {
                id = rx.recv() => match id {
                    Some(id) => Next::Job(id),
                    None => Next::Closed,
                },
                _ = shutdown.notified() => Next::Idle,
                _ = tokio::time::sleep(Duration::from_millis(500)) => Next::Idle,
            }
        };

        match next {
            Next::Job(id) => process_job(&store, &executor, id).await,
            Next::Idle => continue,
            Next::Closed => break,
        }
    }
    debug!(worker_id, "worker stopped");
}

async fn process_job(store: &Arc<dyn JobStore>, executor: &Arc<dyn JobExecutor>, id: String) {
    let record = match store.mark_active(&id) {
        Ok(record) => record,
        Err(JobError::InvalidTransition { from, .. }) => {
            // Redelivery of a job that already ran; at-least-once dispatch
            // makes this normal.
            debug!(job_id = %id, %from, "skipping job not in waiting state");
            return;
        }
        Err(e) => {
            warn!(job_id = %id, error = %e, "could not activate job");
            return;
        }
    };

    JOB_TRANSITIONS.with_label_values(&["active"]).inc();
    ACTIVE_WORKERS.inc();
    info!(job_id = %id, file_id = %record.request.file_id, "job started");

    let start = Instant::now();
    let sink = ProgressSink::new(id.clone(), Arc::clone(store));
    let result = executor.execute(&record, sink).await;
    ACTIVE_WORKERS.dec();

    match result {
        Ok(outcome) => {
            CONVERSIONS_TOTAL
                .with_label_values(&["queued", "success"])
                .inc();
            CONVERSION_DURATION
                .with_label_values(&["queued"])
                .observe(start.elapsed().as_secs_f64());
            match store.complete(&id, &outcome) {
                Ok(_) => {
                    JOB_TRANSITIONS.with_label_values(&["completed"]).inc();
                    info!(job_id = %id, output = %outcome.file_name, "job completed");
                }
                Err(e) => error!(job_id = %id, error = %e, "failed to record completion"),
            }
        }
        Err(e) => {
            CONVERSIONS_TOTAL
                .with_label_values(&["queued", "failed"])
                .inc();
            match store.fail(&id, &e.to_string()) {
                Ok(_) => {
                    JOB_TRANSITIONS.with_label_values(&["failed"]).inc();
                    warn!(job_id = %id, error = %e, "job failed");
                }
                Err(store_err) => {
                    error!(job_id = %id, error = %store_err, "failed to record failure")
                }
            }
        }
    }
}
