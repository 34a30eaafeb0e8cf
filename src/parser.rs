// Consumer loop: dequeue, stamp, parse into ticks, collect latencies.

use crate::{clock::Clock, config::Backoff, record::Record, shutdown::RunFlag, spsc::Consumer};
use tracing::{debug, warn};

/// A parsed record plus its receive time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
   pub sequence: u64,
   pub send_timestamp_ns: u64,
   pub recv_timestamp_ns: u64,
   pub symbol_id: u32,
   pub quantity: u32,
   pub price: f64,
}

impl Tick {
   pub fn parse(record: &Record, recv_timestamp_ns: u64) -> Self {
      Self {
         sequence: record.sequence,
         send_timestamp_ns: record.send_timestamp_ns,
         recv_timestamp_ns,
         symbol_id: record.symbol_id,
         quantity: record.quantity,
         price: record.price,
      }
   }

   #[inline]
   pub fn latency_ns(&self) -> u64 {
      self.recv_timestamp_ns.saturating_sub(self.send_timestamp_ns)
   }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsumerReport {
   pub received: u64,
   /// Records whose sequence was not `last_sequence + 1`.
   pub sequence_gaps: u64,
   pub last_sequence: u64,
   pub latencies_ns: Vec<u64>,
}

impl ConsumerReport {
   fn observe(&mut self, tick: &Tick, max_samples: usize) {
      if tick.sequence != self.last_sequence + 1 {
         self.sequence_gaps += 1;
      }
      self.last_sequence = tick.sequence;
      self.received += 1;
      if self.latencies_ns.len() < max_samples {
         self.latencies_ns.push(tick.latency_ns());
      }
   }
}

/// Consumer thread body. Keeps at most `max_samples` latency samples;
/// `reserve` pre-sizes the sample vector.
pub fn run_consumer(
   consumer: &mut Consumer<Record>,
   run: &RunFlag,
   clock: &Clock,
   max_samples: usize,
   reserve: usize,
   backoff: Backoff,
) -> ConsumerReport {
   let mut report = ConsumerReport {
      latencies_ns: Vec::with_capacity(reserve.min(max_samples)),
      ..ConsumerReport::default()
   };

   while run.is_running() {
      let Some(record) = consumer.try_dequeue() else {
         backoff.pause();
         continue;
      };
      let tick = Tick::parse(&record, clock.now_ns());
      report.observe(&tick, max_samples);
   }

   if report.sequence_gaps > 0 {
      warn!(gaps = report.sequence_gaps, "sequence discontinuities observed");
   }
   debug!(
      received = report.received,
      samples = report.latencies_ns.len(),
      abandoned = consumer.approx_len(),
      "consumer stopped"
   );
   report
}
