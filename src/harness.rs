// Benchmark orchestration: one producer thread, one consumer thread, and a
// monitoring loop on the caller's thread.

use crate::{
   clock::Clock,
   config::BenchConfig,
   error::BenchError,
   feed::{run_producer, ProducerReport},
   parser::{run_consumer, ConsumerReport},
   record::Record,
   shutdown::RunFlag,
   spsc::BoundedQueue,
};
use std::{
   thread::{self, JoinHandle},
   time::{Duration, Instant},
};
use tracing::{info, warn};

/// Granularity at which the monitor notices a cleared run flag.
const POLL_SLICE: Duration = Duration::from_millis(10);

/// One periodic queue-depth observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthSample {
   /// 1-based index of the report interval.
   pub tick: u64,
   pub elapsed: Duration,
   pub approx_len: usize,
}

#[derive(Debug)]
pub struct RunReport {
   pub producer: ProducerReport,
   pub consumer: ConsumerReport,
   pub elapsed: Duration,
   /// The run flag was cleared externally before the duration elapsed.
   pub interrupted: bool,
}

/// Runs one benchmark.
///
/// `on_depth` is called once per report interval with the queue's
/// approximate depth. Returns after both workers have been joined; records
/// still in the queue at that point are abandoned.
pub fn run<F>(config: &BenchConfig, run: &RunFlag, mut on_depth: F) -> Result<RunReport, BenchError>
where
   F: FnMut(&DepthSample),
{
   let queue = BoundedQueue::<Record>::new(config.capacity())?;
   let monitor = queue.monitor();
   let (mut producer, mut consumer) = queue.split();
   let clock = Clock::start();

   info!(
      msgs_per_sec = config.msgs_per_sec(),
      duration_s = config.duration().as_secs(),
      capacity = config.capacity(),
      producer_backoff = ?config.producer_backoff(),
      consumer_backoff = ?config.consumer_backoff(),
      "starting run"
   );

   let producer_handle = {
      let run = run.clone();
      let (rate, backoff) = (config.msgs_per_sec(), config.producer_backoff());
      thread::Builder::new()
         .name("feed-producer".into())
         .spawn(move || run_producer(&mut producer, &run, &clock, rate, backoff))?
   };

   let consumer_handle = {
      let run = run.clone();
      let (max, reserve, backoff) = (config.max_samples(), config.sample_reserve(), config.consumer_backoff());
      thread::Builder::new()
         .name("feed-consumer".into())
         .spawn(move || run_consumer(&mut consumer, &run, &clock, max, reserve, backoff))
   };
   let consumer_handle = match consumer_handle {
      Ok(handle) => handle,
      Err(err) => {
         run.stop();
         reap(producer_handle, "producer");
         return Err(err.into());
      }
   };

   let started = Instant::now();
   let deadline = started + config.duration();
   let interval = config.report_interval();
   let mut next_report = started + interval;
   let mut tick = 0u64;
   loop {
      if Instant::now() >= deadline || !sleep_until(run, next_report.min(deadline)) {
         break;
      }
      if Instant::now() >= next_report {
         tick += 1;
         next_report += interval;
         on_depth(&DepthSample { tick, elapsed: started.elapsed(), approx_len: monitor.approx_len() });
      }
   }

   let interrupted = !run.is_running();
   if interrupted {
      warn!(elapsed_ms = started.elapsed().as_millis() as u64, "run interrupted");
   }
   run.stop();

   let producer = join(producer_handle, "producer");
   let consumer = join(consumer_handle, "consumer");
   let elapsed = started.elapsed();
   let (producer, consumer) = (producer?, consumer?);

   info!(
      sent = producer.sent,
      received = consumer.received,
      samples = consumer.latencies_ns.len(),
      full_retries = producer.full_retries,
      "run finished"
   );

   Ok(RunReport { producer, consumer, elapsed, interrupted })
}

/// Sleeps until `deadline` in short slices. Returns `false` as soon as the
/// run flag is cleared.
fn sleep_until(run: &RunFlag, deadline: Instant) -> bool {
   loop {
      if !run.is_running() {
         return false;
      }
      let now = Instant::now();
      if now >= deadline {
         return true;
      }
      thread::sleep((deadline - now).min(POLL_SLICE));
   }
}

fn join<T>(handle: JoinHandle<T>, role: &'static str) -> Result<T, BenchError> {
   handle.join().map_err(|_| BenchError::WorkerPanicked(role))
}

/// Joins a worker whose result is no longer wanted; a panic is logged, not
/// propagated.
fn reap<T>(handle: JoinHandle<T>, role: &'static str) -> Option<T> {
   match handle.join() {
      Ok(value) => Some(value),
      Err(_) => {
         warn!(role, "worker panicked during aborted start-up");
         None
      }
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn sleep_returns_early_when_stopped() {
      let run = RunFlag::new();
      run.stop();
      let start = Instant::now();
      assert!(!sleep_until(&run, Instant::now() + Duration::from_secs(5)));
      assert!(start.elapsed() < Duration::from_secs(1));
   }

   #[test]
   fn sleep_runs_full_interval() {
      let run = RunFlag::new();
      let start = Instant::now();
      assert!(sleep_until(&run, start + Duration::from_millis(30)));
      assert!(start.elapsed() >= Duration::from_millis(30));
   }

   #[test]
   fn reap_swallows_worker_panic() {
      let handle = thread::spawn(|| -> u32 { panic!("worker failed") });
      assert_eq!(reap(handle, "producer"), None);

      let handle = thread::spawn(|| 7u32);
      assert_eq!(reap(handle, "producer"), Some(7));
   }
}
