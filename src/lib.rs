//! Latency benchmark built around a lock-free bounded SPSC queue.
//!
//! [`spsc::BoundedQueue`] is the core: one producer and one consumer
//! exchange fixed-size [`Record`]s through a power-of-two ring with
//! acquire/release cursors. Everything else is the harness around it:
//! a paced record generator ([`feed`]), a consumer that stamps and parses
//! records ([`parser`]), offline percentile statistics ([`stats`]) and the
//! run orchestration ([`harness`]).

pub mod clock;
pub mod config;
pub mod error;
pub mod feed;
pub mod harness;
pub mod parser;
pub mod record;
pub mod shutdown;
pub mod spsc;
pub mod stats;

pub use config::{Backoff, BenchConfig};
pub use error::{BenchError, ConfigError, QueueError};
pub use record::Record;
pub use spsc::{BoundedQueue, Consumer, Monitor, Producer};
