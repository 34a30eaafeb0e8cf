// Benchmark configuration: validated run parameters and retry policies.

use crate::error::ConfigError;
use std::{thread, time::Duration};

pub const DEFAULT_MSGS_PER_SEC: u64 = 500_000;
pub const MIN_MSGS_PER_SEC: u64 = 1;
pub const MAX_MSGS_PER_SEC: u64 = 10_000_000;

pub const DEFAULT_DURATION_SECS: u64 = 5;
pub const MIN_DURATION_SECS: u64 = 1;
pub const MAX_DURATION_SECS: u64 = 3600;

pub const DEFAULT_BUFFER_POW2: u32 = 16;
pub const MIN_BUFFER_POW2: u32 = 10;
pub const MAX_BUFFER_POW2: u32 = 24;

/// Upper bound on latency samples held by the consumer (256 MiB of u64).
pub const MAX_LATENCY_SAMPLES: usize = 1 << 25;

pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(1);
/// Shortest accepted report interval.
pub const MIN_REPORT_INTERVAL: Duration = Duration::from_millis(10);

/// Pause used by [`Backoff::Sleep`].
pub const SLEEP_BACKOFF: Duration = Duration::from_micros(1);

/// What a worker does after a failed `try_enqueue` / `try_dequeue`.
///
/// Trades CPU for latency: `Spin` keeps the core hot, `Sleep` gives it back
/// to the scheduler at the cost of wake-up jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Backoff {
   Spin,
   Yield,
   Sleep,
}

impl Backoff {
   #[inline]
   pub fn pause(self) {
      match self {
         Backoff::Spin  => std::hint::spin_loop(),
         Backoff::Yield => thread::yield_now(),
         Backoff::Sleep => thread::sleep(SLEEP_BACKOFF),
      }
   }
}

/// Validated run parameters. Only [`BenchConfig::new`] and the `with_*`
/// setters can build one, so every value is inside its range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchConfig {
   msgs_per_sec: u64,
   duration: Duration,
   buffer_pow2: u32,
   producer_backoff: Backoff,
   consumer_backoff: Backoff,
   report_interval: Duration,
   max_samples: usize,
}

impl BenchConfig {
   pub fn new(msgs_per_sec: u64, duration_secs: u64, buffer_pow2: u32) -> Result<Self, ConfigError> {
      check_range("msgs_per_sec", msgs_per_sec, MIN_MSGS_PER_SEC, MAX_MSGS_PER_SEC)?;
      check_range("duration_seconds", duration_secs, MIN_DURATION_SECS, MAX_DURATION_SECS)?;
      check_range(
         "buffer_size_power_of_two",
         u64::from(buffer_pow2),
         u64::from(MIN_BUFFER_POW2),
         u64::from(MAX_BUFFER_POW2),
      )?;

      let max_samples = msgs_per_sec
         .saturating_mul(duration_secs)
         .saturating_div(2)
         .min(MAX_LATENCY_SAMPLES as u64) as usize;

      Ok(Self {
         msgs_per_sec,
         duration: Duration::from_secs(duration_secs),
         buffer_pow2,
         producer_backoff: Backoff::Sleep,
         consumer_backoff: Backoff::Yield,
         report_interval: DEFAULT_REPORT_INTERVAL,
         max_samples,
      })
   }

   pub fn with_producer_backoff(mut self, backoff: Backoff) -> Self {
      self.producer_backoff = backoff;
      self
   }

   pub fn with_consumer_backoff(mut self, backoff: Backoff) -> Self {
      self.consumer_backoff = backoff;
      self
   }

   /// Intervals shorter than [`MIN_REPORT_INTERVAL`] are raised to it.
   pub fn with_report_interval(mut self, interval: Duration) -> Self {
      self.report_interval = interval.max(MIN_REPORT_INTERVAL);
      self
   }

   pub fn with_max_samples(mut self, max_samples: usize) -> Self {
      self.max_samples = max_samples.min(MAX_LATENCY_SAMPLES);
      self
   }

   pub fn msgs_per_sec(&self) -> u64 {
      self.msgs_per_sec
   }

   pub fn duration(&self) -> Duration {
      self.duration
   }

   pub fn buffer_pow2(&self) -> u32 {
      self.buffer_pow2
   }

   pub fn producer_backoff(&self) -> Backoff {
      self.producer_backoff
   }

   pub fn consumer_backoff(&self) -> Backoff {
      self.consumer_backoff
   }

   pub fn report_interval(&self) -> Duration {
      self.report_interval
   }

   pub fn max_samples(&self) -> usize {
      self.max_samples
   }

   /// Queue capacity, `2^buffer_pow2`.
   pub fn capacity(&self) -> usize {
      1usize << self.buffer_pow2
   }

   /// Initial reservation for the latency sample vector.
   pub fn sample_reserve(&self) -> usize {
      self.max_samples / 10
   }
}

impl Default for BenchConfig {
   fn default() -> Self {
      // Defaults are inside every range.
      match Self::new(DEFAULT_MSGS_PER_SEC, DEFAULT_DURATION_SECS, DEFAULT_BUFFER_POW2) {
         Ok(config) => config,
         Err(err) => unreachable!("default configuration rejected: {err}"),
      }
   }
}

fn check_range(name: &'static str, value: u64, min: u64, max: u64) -> Result<(), ConfigError> {
   if (min..=max).contains(&value) {
      Ok(())
   } else {
      Err(ConfigError::OutOfRange { name, value, min, max })
   }
}
