//! Bounded worker pool: a fixed number of workers drain a job source
//! and stream outputs to a result sink.
//!
//! Completion order across workers is unspecified; callers correlate
//! outputs by job id. A single-worker pool degenerates to arrival
//! order. The queue carries its own synchronization, so producers and
//! workers never take an external lock around it.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::model::{Fault, Job, JobOutput, WorkerId};

/// Pool and queue sizing.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Number of workers spawned by `run`. Must be at least 1.
    pub pool_size: usize,
    /// Capacity of the job queue. Submitters suspend when it is full.
    pub queue_capacity: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            pool_size: 4,
            queue_capacity: 64,
        }
    }
}

/// Push-only handle to the job queue.
///
/// `close` is the explicit end-of-submission signal: workers drain what
/// is already queued and then exit. Submitting after `close` is
/// reported, never silently dropped.
pub struct Submitter<T> {
    tx: Option<mpsc::Sender<Job<T>>>,
}

impl<T> Submitter<T> {
    /// Queue one job. Suspends while the queue is full.
    pub async fn submit(&self, job: Job<T>) -> Result<()> {
        match &self.tx {
            Some(tx) => tx.send(job).await.map_err(|_| Error::QueueClosed),
            None => Err(Error::SubmitAfterClose),
        }
    }

    /// Signal that no more jobs will arrive.
    pub fn close(&mut self) {
        self.tx = None;
    }
}

/// Pull-only handle to the job queue, shared by every worker in the
/// pool.
pub struct JobSource<T> {
    rx: Arc<tokio::sync::Mutex<mpsc::Receiver<Job<T>>>>,
}

impl<T> Clone for JobSource<T> {
    fn clone(&self) -> Self {
        Self {
            rx: Arc::clone(&self.rx),
        }
    }
}

impl<T> JobSource<T> {
    /// Receive the next job, or `None` once the queue is closed and
    /// drained. Suspends while the queue is empty but still open.
    pub async fn recv(&self) -> Option<Job<T>> {
        self.rx.lock().await.recv().await
    }
}

/// Create the job queue: a push-only submitter and a pull-only source.
pub fn job_channel<T>(capacity: usize) -> Result<(Submitter<T>, JobSource<T>)> {
    if capacity == 0 {
        return Err(Error::Config("job queue capacity must be at least 1".into()));
    }
    let (tx, rx) = mpsc::channel(capacity);
    Ok((
        Submitter { tx: Some(tx) },
        JobSource {
            rx: Arc::new(tokio::sync::Mutex::new(rx)),
        },
    ))
}

/// The pool itself.
pub struct Dispatcher;

impl Dispatcher {
    /// Wire a full pipeline from config: job queue, result queue, and
    /// the running pool as a background task.
    ///
    /// The returned submitter is the caller's push side, the receiver
    /// its pull side; the join handle resolves when the pool has
    /// drained and exited.
    pub fn start<T, R, F, Fut>(
        config: &DispatcherConfig,
        handler: F,
    ) -> Result<(
        Submitter<T>,
        mpsc::Receiver<JobOutput<R>>,
        tokio::task::JoinHandle<Result<()>>,
    )>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(Job<T>) -> Fut + Clone + Send + 'static,
        Fut: Future<Output = R> + Send + 'static,
    {
        if config.pool_size == 0 {
            return Err(Error::Config("pool size must be at least 1".into()));
        }
        let (submitter, source) = job_channel(config.queue_capacity)?;
        let (sink, results) = mpsc::channel(config.queue_capacity);
        let pool = tokio::spawn(Self::run(config.pool_size, source, sink, handler));
        Ok((submitter, results, pool))
    }

    /// Spawn exactly `pool_size` workers over `source`, publishing each
    /// job's output to `sink` as it completes.
    ///
    /// Resolves once the source is closed and drained and every worker
    /// has exited. A panic inside `handler` is contained at that job's
    /// boundary: the job reports a [`Fault`] and its worker continues
    /// with the next job.
    pub async fn run<T, R, F, Fut>(
        pool_size: usize,
        source: JobSource<T>,
        sink: mpsc::Sender<JobOutput<R>>,
        handler: F,
    ) -> Result<()>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(Job<T>) -> Fut + Clone + Send + 'static,
        Fut: Future<Output = R> + Send + 'static,
    {
        if pool_size == 0 {
            return Err(Error::Config("pool size must be at least 1".into()));
        }

        let mut workers = JoinSet::new();
        for n in 1..=pool_size {
            let worker = WorkerId(n);
            let source = source.clone();
            let sink = sink.clone();
            let handler = handler.clone();
            workers.spawn(worker_loop(worker, source, sink, handler));
        }
        // Workers now hold the only sink handles; the caller's receiver
        // ends as soon as the last worker exits.
        drop(sink);

        while let Some(res) = workers.join_next().await {
            // worker_loop contains job faults itself; a join error here
            // means the loop task was aborted externally
            if let Err(e) = res {
                warn!(error = %e, "worker task ended abnormally");
            }
        }
        Ok(())
    }
}

async fn worker_loop<T, R, F, Fut>(
    worker: WorkerId,
    source: JobSource<T>,
    sink: mpsc::Sender<JobOutput<R>>,
    handler: F,
) where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(Job<T>) -> Fut + Send + 'static,
    Fut: Future<Output = R> + Send + 'static,
{
    debug!(worker = %worker, "worker started");

    while let Some(job) = source.recv().await {
        let job_id = job.id;

        // The handler runs on its own task so a panic is caught at this
        // job's boundary instead of taking the worker down.
        let outcome = match tokio::spawn(handler(job)).await {
            Ok(value) => Ok(value),
            Err(e) if e.is_panic() => {
                let fault = Fault::from_panic(e.into_panic());
                warn!(worker = %worker, job = %job_id, error = %fault, "job faulted");
                Err(fault)
            }
            Err(_) => Err(Fault::new("job task cancelled")),
        };

        if sink
            .send(JobOutput {
                job_id,
                worker,
                outcome,
            })
            .await
            .is_err()
        {
            debug!(worker = %worker, "result sink closed, worker exiting");
            return;
        }
    }

    debug!(worker = %worker, "job source drained, worker exiting");
}
