//! Error types for taskcoord.
//!
//! Only setup mistakes and queue misuse surface here. A deadline
//! expiring is not an error (see [`crate::gate::DeadlineOutcome`]), and
//! a fault inside one job or tick is contained at that boundary (see
//! [`crate::model::Fault`]).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("job submitted after the queue was closed")]
    SubmitAfterClose,

    #[error("job queue closed: the dispatcher is no longer receiving")]
    QueueClosed,
}

pub type Result<T> = std::result::Result<T, Error>;
