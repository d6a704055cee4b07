//! Deadline-bounded waits.
//!
//! A deadline expiring is a first-class outcome here, not an error. The
//! gate never destroys the watched operation; it stops waiting and
//! hands control back. An operation that must keep running past an
//! abandoned wait should be spawned first, with its `JoinHandle` given
//! to the gate — dropping a `JoinHandle` detaches rather than aborts.

use std::future::Future;
use std::time::Duration;

use futures::FutureExt;
use futures::future::{BoxFuture, select_all};

use crate::error::{Error, Result};

/// What came out of a deadline-bounded wait. Exactly one variant is
/// produced per invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeadlineOutcome<T> {
    /// The operation finished inside the deadline. A fallible
    /// operation's own `Result` rides inside, so operation failure is
    /// never conflated with a timeout.
    Completed(T),
    /// The deadline fired first. Only the wait is abandoned.
    TimedOut,
}

impl<T> DeadlineOutcome<T> {
    /// The completed value, if any.
    pub fn completed(self) -> Option<T> {
        match self {
            Self::Completed(value) => Some(value),
            Self::TimedOut => None,
        }
    }

    pub fn timed_out(&self) -> bool {
        matches!(self, Self::TimedOut)
    }
}

/// Wait for `op`, but not longer than `timeout`.
pub async fn await_within<F>(op: F, timeout: Duration) -> DeadlineOutcome<F::Output>
where
    F: Future,
{
    match tokio::time::timeout(timeout, op).await {
        Ok(value) => DeadlineOutcome::Completed(value),
        Err(_) => DeadlineOutcome::TimedOut,
    }
}

/// Winner of a multi-way race.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectOutcome<T> {
    /// Exactly one operation won; `index` is its position in the input.
    Completed { index: usize, value: T },
    /// The deadline beat every operation.
    TimedOut,
}

/// Race every operation in `ops` against each other and the deadline.
///
/// If several operations are ready at the same instant, which one wins
/// is unspecified, but there is always exactly one winner. An empty
/// race has no possible winner and is a configuration error.
pub async fn select_first<T>(
    ops: Vec<BoxFuture<'_, T>>,
    timeout: Duration,
) -> Result<SelectOutcome<T>> {
    if ops.is_empty() {
        return Err(Error::Config(
            "select_first needs at least one operation".into(),
        ));
    }
    match tokio::time::timeout(timeout, select_all(ops)).await {
        Ok((value, index, _losers)) => Ok(SelectOutcome::Completed { index, value }),
        Err(_) => Ok(SelectOutcome::TimedOut),
    }
}

/// Poll `op` exactly once. Returns the value if it is already ready,
/// `None` otherwise; never suspends the caller.
pub fn try_now<F>(op: F) -> Option<F::Output>
where
    F: Future,
{
    op.now_or_never()
}
