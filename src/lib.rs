//! # taskcoord
//!
//! In-process concurrency coordination core: a bounded worker pool
//! draining a job queue, deadline-bounded waits, cancellable periodic
//! background work, and a contention-safe keyed counter.
//!
//! Everything here is an in-process primitive built on the host tokio
//! runtime. There is no persistence and no distribution; jobs and
//! results live exactly as long as the channels carrying them.

pub mod counter;
pub mod dispatcher;
pub mod error;
pub mod gate;
pub mod model;
pub mod periodic;
