//! Core data model.
//!
//! A job is one discrete unit of work handed to the dispatcher. Outputs
//! carry the originating job id so callers can correlate results that
//! arrive in any order across workers.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Newtype for job identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobId(pub u64);

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies one worker in a pool.
///
/// Assigned at pool start, in `1..=pool_size`, stable for the worker's
/// lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkerId(pub usize);

impl std::fmt::Display for WorkerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One unit of work. Immutable once submitted; the dispatcher does not
/// interpret the payload.
#[derive(Debug, Clone)]
pub struct Job<T> {
    pub id: JobId,
    pub payload: T,
}

impl<T> Job<T> {
    pub fn new(id: u64, payload: T) -> Self {
        Self {
            id: JobId(id),
            payload,
        }
    }
}

/// The output of processing one job, published to the result sink as
/// soon as the job completes.
#[derive(Debug)]
pub struct JobOutput<R> {
    /// Which job this output belongs to.
    pub job_id: JobId,
    /// Which worker processed it.
    pub worker: WorkerId,
    /// The computed value, or the fault that replaced it.
    pub outcome: Result<R, Fault>,
}

impl<R> JobOutput<R> {
    /// The computed value, discarding fault detail.
    pub fn value(self) -> Option<R> {
        self.outcome.ok()
    }
}

/// A fault contained at a worker or tick boundary.
///
/// Faults never escape the unit that raised them: a job's fault travels
/// through the result sink in place of its value, a tick's fault is
/// logged, and in both cases the worker or schedule moves on.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct Fault {
    pub message: String,
}

impl Fault {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Render a caught panic payload into a fault.
    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "handler panicked".to_string()
        };
        Self { message }
    }
}
