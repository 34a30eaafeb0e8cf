// Error types for queue construction, configuration and the benchmark run.
//
// Full / empty are not errors: `try_enqueue` / `try_dequeue` report them
// through their return values.

use thiserror::Error;

/// Construction-time failures of [`BoundedQueue`](crate::spsc::BoundedQueue).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
   #[error("capacity {0} is not a non-zero power of two")]
   InvalidCapacity(usize),

   #[error("could not allocate {bytes} bytes for {capacity} slots")]
   AllocationFailure { capacity: usize, bytes: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
   #[error("{name} must be in {min}..={max}, got {value}")]
   OutOfRange {
      name: &'static str,
      value: u64,
      min: u64,
      max: u64,
   },
}

/// Everything that can stop a benchmark run before it reports.
#[derive(Debug, Error)]
pub enum BenchError {
   #[error(transparent)]
   Queue(#[from] QueueError),

   #[error(transparent)]
   Config(#[from] ConfigError),

   #[error("signal setup failed: {0}")]
   Signal(#[from] nix::errno::Errno),

   #[error("failed to spawn worker thread: {0}")]
   Spawn(#[from] std::io::Error),

   #[error("{0} thread panicked")]
   WorkerPanicked(&'static str),
}
