//! Tests for the bounded dispatcher.

use taskcoord::dispatcher::{Dispatcher, job_channel};
use taskcoord::error::Error;
use taskcoord::model::{Job, JobOutput};
use tokio::sync::mpsc;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

async fn double(job: Job<u64>) -> u64 {
    job.payload * 2
}

// ---------------------------------------------------------------------------
// Happy path: pool drains the source, streams to the sink
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn pool_of_three_processes_five_jobs() {
    init_tracing();

    let (mut submitter, source) = job_channel::<u64>(16).unwrap();
    let (sink, mut results) = mpsc::channel::<JobOutput<u64>>(16);

    let pool = tokio::spawn(Dispatcher::run(3, source, sink, double));

    for n in 1..=5 {
        submitter.submit(Job::new(n, n)).await.unwrap();
    }
    submitter.close();

    let mut values = Vec::new();
    while let Some(output) = results.recv().await {
        assert!((1..=3).contains(&output.worker.0), "worker id out of pool");
        values.push(output.outcome.unwrap());
    }
    values.sort_unstable();
    assert_eq!(values, vec![2, 4, 6, 8, 10]);

    pool.await.unwrap().unwrap();
}

#[tokio::test]
async fn single_worker_preserves_arrival_order() {
    let (mut submitter, source) = job_channel::<u64>(8).unwrap();
    let (sink, mut results) = mpsc::channel::<JobOutput<u64>>(8);

    let pool = tokio::spawn(Dispatcher::run(1, source, sink, double));

    for n in 1..=4 {
        submitter.submit(Job::new(n, n)).await.unwrap();
    }
    submitter.close();

    let mut ids = Vec::new();
    while let Some(output) = results.recv().await {
        ids.push(output.job_id.0);
    }
    assert_eq!(ids, vec![1, 2, 3, 4]);

    pool.await.unwrap().unwrap();
}

#[tokio::test]
async fn results_stream_before_submission_closes() {
    let (mut submitter, source) = job_channel::<u64>(4).unwrap();
    let (sink, mut results) = mpsc::channel::<JobOutput<u64>>(4);

    let pool = tokio::spawn(Dispatcher::run(2, source, sink, double));

    submitter.submit(Job::new(1, 10)).await.unwrap();
    let first = results.recv().await.expect("result before close");
    assert_eq!(first.outcome.unwrap(), 20);

    submitter.close();
    assert!(results.recv().await.is_none());
    pool.await.unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn start_wires_a_pipeline_from_config() {
    use taskcoord::dispatcher::DispatcherConfig;

    let config = DispatcherConfig {
        pool_size: 2,
        queue_capacity: 8,
    };
    let (mut submitter, mut results, pool) = Dispatcher::start(&config, double).unwrap();

    for n in 1..=3 {
        submitter.submit(Job::new(n, n)).await.unwrap();
    }
    submitter.close();

    let mut values = Vec::new();
    while let Some(output) = results.recv().await {
        values.push(output.outcome.unwrap());
    }
    values.sort_unstable();
    assert_eq!(values, vec![2, 4, 6]);

    pool.await.unwrap().unwrap();
}

// ---------------------------------------------------------------------------
// Fault containment
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn panicking_job_does_not_take_down_the_pool() {
    init_tracing();

    async fn double_or_panic(job: Job<u64>) -> u64 {
        if job.payload == 3 {
            panic!("bad payload");
        }
        job.payload * 2
    }

    let (mut submitter, source) = job_channel::<u64>(16).unwrap();
    let (sink, mut results) = mpsc::channel::<JobOutput<u64>>(16);

    let pool = tokio::spawn(Dispatcher::run(3, source, sink, double_or_panic));

    for n in 1..=5 {
        submitter.submit(Job::new(n, n)).await.unwrap();
    }
    submitter.close();

    let mut values = Vec::new();
    let mut faults = Vec::new();
    while let Some(output) = results.recv().await {
        match output.outcome {
            Ok(value) => values.push(value),
            Err(fault) => faults.push((output.job_id.0, fault)),
        }
    }

    values.sort_unstable();
    assert_eq!(values, vec![2, 4, 8, 10]);
    assert_eq!(faults.len(), 1);
    assert_eq!(faults[0].0, 3);
    assert!(faults[0].1.message.contains("bad payload"));

    pool.await.unwrap().unwrap();
}

// ---------------------------------------------------------------------------
// Boundaries and misuse
// ---------------------------------------------------------------------------

#[tokio::test]
async fn zero_pool_size_is_a_configuration_error() {
    let (_submitter, source) = job_channel::<u64>(4).unwrap();
    let (sink, _results) = mpsc::channel::<JobOutput<u64>>(4);

    let err = Dispatcher::run(0, source, sink, double).await.unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn zero_queue_capacity_is_a_configuration_error() {
    assert!(matches!(
        job_channel::<u64>(0),
        Err(Error::Config(_))
    ));
}

#[tokio::test]
async fn empty_closed_source_completes_without_hanging() {
    let (mut submitter, source) = job_channel::<u64>(4).unwrap();
    let (sink, mut results) = mpsc::channel::<JobOutput<u64>>(4);

    submitter.close();
    Dispatcher::run(2, source, sink, double).await.unwrap();

    assert!(results.recv().await.is_none());
}

#[tokio::test]
async fn submit_after_close_is_reported() {
    let (mut submitter, _source) = job_channel::<u64>(4).unwrap();

    submitter.close();
    let err = submitter.submit(Job::new(9, 9)).await.unwrap_err();
    assert!(matches!(err, Error::SubmitAfterClose));
}
