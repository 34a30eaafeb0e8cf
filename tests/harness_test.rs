// End-to-end runs of the producer / consumer harness.

use spsc_feed_bench::{
   harness::{self, DepthSample},
   shutdown::RunFlag,
   Backoff, BenchConfig, BenchError, QueueError,
};
use std::thread;
use std::time::Duration;

#[test]
fn test_short_run_delivers_in_order() {
   let config = BenchConfig::new(20_000, 1, 10)
      .unwrap()
      .with_report_interval(Duration::from_millis(250));
   let flag = RunFlag::new();
   let mut depths: Vec<DepthSample> = Vec::new();

   let report = harness::run(&config, &flag, |s| depths.push(*s)).unwrap();

   assert!(!report.interrupted);
   assert!(!flag.is_running());
   assert_eq!(depths.iter().map(|d| d.tick).collect::<Vec<_>>(), vec![1, 2, 3, 4]);
   assert!(depths.iter().all(|d| d.approx_len <= config.capacity()));

   let consumer = &report.consumer;
   assert!(consumer.received > 0);
   assert_eq!(consumer.sequence_gaps, 0);
   assert!(consumer.received <= report.producer.sent);
   assert!(report.producer.sent - consumer.received <= config.capacity() as u64);
   assert_eq!(consumer.last_sequence, consumer.received);
   assert_eq!(consumer.latencies_ns.len() as u64, consumer.received.min(config.max_samples() as u64));
}

#[test]
fn test_external_stop_interrupts_run() {
   let config = BenchConfig::new(10_000, 60, 12)
      .unwrap()
      .with_consumer_backoff(Backoff::Spin);
   let flag = RunFlag::new();
   let stopper = {
      let flag = flag.clone();
      thread::spawn(move || {
         thread::sleep(Duration::from_millis(200));
         flag.stop();
      })
   };

   let report = harness::run(&config, &flag, |_| {}).unwrap();
   stopper.join().unwrap();

   assert!(report.interrupted);
   assert!(report.elapsed < Duration::from_secs(10));
   assert_eq!(report.consumer.sequence_gaps, 0);
}

#[test]
fn test_sample_cap_is_respected() {
   let config = BenchConfig::new(50_000, 1, 10)
      .unwrap()
      .with_max_samples(100)
      .with_report_interval(Duration::from_millis(500));
   let report = harness::run(&config, &RunFlag::new(), |_| {}).unwrap();

   assert!(report.consumer.received > 100);
   assert_eq!(report.consumer.latencies_ns.len(), 100);
}

#[test]
fn test_prestopped_flag_returns_immediately() {
   let config = BenchConfig::default().with_report_interval(Duration::from_millis(100));
   let flag = RunFlag::new();
   flag.stop();
   let mut depth_calls = 0;
   let report = harness::run(&config, &flag, |_| depth_calls += 1).unwrap();

   assert!(report.interrupted);
   assert_eq!(depth_calls, 0);
   assert!(report.elapsed < config.duration());
   assert!(report.producer.sent <= 1);
}

#[test]
fn test_run_lasts_full_duration_when_interval_does_not_divide_it() {
   let config = BenchConfig::new(10_000, 2, 10)
      .unwrap()
      .with_report_interval(Duration::from_millis(1_500));
   let mut ticks = Vec::new();

   let report = harness::run(&config, &RunFlag::new(), |s| ticks.push(s.tick)).unwrap();

   assert!(!report.interrupted);
   assert!(report.elapsed >= config.duration(), "run ended after {:?}", report.elapsed);
   assert_eq!(ticks, vec![1]);
}

#[test]
fn test_run_lasts_full_duration_when_interval_exceeds_it() {
   let config = BenchConfig::new(10_000, 1, 10)
      .unwrap()
      .with_report_interval(Duration::from_secs(3));
   let mut depth_calls = 0;

   let report = harness::run(&config, &RunFlag::new(), |_| depth_calls += 1).unwrap();

   assert!(!report.interrupted);
   assert!(report.elapsed >= config.duration(), "run ended after {:?}", report.elapsed);
   assert_eq!(depth_calls, 0);
   assert!(report.producer.sent > 0);
   assert!(report.consumer.received > 0);
}

#[test]
fn test_queue_errors_convert_into_bench_errors() {
   let err = BenchError::from(QueueError::InvalidCapacity(3));
   assert!(matches!(err, BenchError::Queue(QueueError::InvalidCapacity(3))));
   assert_eq!(err.to_string(), "capacity 3 is not a non-zero power of two");
}
