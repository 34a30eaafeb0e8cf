// Synthetic feed generator and the producer loop.

use crate::{clock::Clock, config::Backoff, record::Record, shutdown::RunFlag, spsc::Producer};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::{
   thread,
   time::{Duration, Instant},
};
use tracing::debug;

pub const FEED_SEED: u64 = 12345;

/// Lag after which the pacer drops its schedule instead of bursting.
const MAX_PACER_LAG: Duration = Duration::from_millis(1);
/// Remaining wait below which the pacer spins instead of sleeping.
const SPIN_THRESHOLD: Duration = Duration::from_micros(50);

/// Deterministic record source. Sequence numbers start at 1.
#[derive(Debug)]
pub struct FeedGenerator {
   rng: StdRng,
   next_sequence: u64,
}

impl FeedGenerator {
   pub fn new(seed: u64) -> Self {
      Self { rng: StdRng::seed_from_u64(seed), next_sequence: 1 }
   }

   pub fn next_record(&mut self, send_timestamp_ns: u64) -> Record {
      let sequence = self.next_sequence;
      self.next_sequence += 1;
      Record {
         sequence,
         send_timestamp_ns,
         symbol_id: self.rng.gen_range(1..=1000),
         quantity : self.rng.gen_range(1..=1000),
         price    : self.rng.gen_range(100.0..200.0),
      }
   }
}

impl Default for FeedGenerator {
   fn default() -> Self {
      Self::new(FEED_SEED)
   }
}

/// Paces a loop to a fixed rate using absolute deadlines, so sleep
/// overshoot on one message is absorbed by the next ones.
#[derive(Debug)]
pub struct Pacer {
   period: Option<Duration>,
   next: Instant,
}

impl Pacer {
   /// `msgs_per_sec == 0` disables pacing.
   pub fn new(msgs_per_sec: u64) -> Self {
      let period = (msgs_per_sec > 0).then(|| Duration::from_nanos(1_000_000_000 / msgs_per_sec));
      Self { period, next: Instant::now() }
   }

   pub fn period(&self) -> Option<Duration> {
      self.period
   }

   /// Waits until the next emission slot.
   pub fn wait(&mut self) {
      let Some(period) = self.period else { return };
      self.next += period;

      let now = Instant::now();
      if now > self.next {
         if now - self.next > MAX_PACER_LAG {
            self.next = now;
         }
         return;
      }

      let remaining = self.next - now;
      if remaining > SPIN_THRESHOLD {
         thread::sleep(remaining - SPIN_THRESHOLD);
      }
      while Instant::now() < self.next {
         std::hint::spin_loop();
      }
   }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProducerReport {
   pub sent: u64,
   /// Failed `try_enqueue` attempts (queue full).
   pub full_retries: u64,
}

/// Producer thread body: generates, stamps and enqueues records until `run`
/// is stopped.
pub fn run_producer(
   producer: &mut Producer<Record>,
   run: &RunFlag,
   clock: &Clock,
   msgs_per_sec: u64,
   backoff: Backoff,
) -> ProducerReport {
   let mut feed = FeedGenerator::default();
   let mut pacer = Pacer::new(msgs_per_sec);
   let mut report = ProducerReport::default();

   'run: while run.is_running() {
      let record = feed.next_record(clock.now_ns());
      while !producer.try_enqueue(record) {
         // a stopped consumer must not wedge us on a full queue
         if !run.is_running() {
            break 'run;
         }
         report.full_retries += 1;
         backoff.pause();
      }
      report.sent += 1;
      pacer.wait();
   }

   debug!(sent = report.sent, full_retries = report.full_retries, "producer stopped");
   report
}
