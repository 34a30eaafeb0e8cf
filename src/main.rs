use anyhow::Context;
use clap::{error::ErrorKind, CommandFactory, Parser};
use spsc_feed_bench::{
   config::{DEFAULT_BUFFER_POW2, DEFAULT_DURATION_SECS, DEFAULT_MSGS_PER_SEC},
   harness, shutdown, stats, Backoff, BenchConfig,
};
use std::{
   ffi::OsString,
   io::{self, Write},
   process::ExitCode,
};
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Measures producer-to-consumer latency through a lock-free SPSC queue.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
   /// Target producer rate, 1..=10000000.
   #[arg(default_value_t = DEFAULT_MSGS_PER_SEC)]
   msgs_per_sec: u64,

   /// Run length in seconds, 1..=3600.
   #[arg(default_value_t = DEFAULT_DURATION_SECS)]
   duration_seconds: u64,

   /// Queue capacity as a power of two, 10..=24.
   #[arg(default_value_t = DEFAULT_BUFFER_POW2)]
   buffer_size_power_of_two: u32,

   /// What the producer does while the queue is full.
   #[arg(long, value_enum, default_value_t = Backoff::Sleep)]
   producer_backoff: Backoff,

   /// What the consumer does while the queue is empty.
   #[arg(long, value_enum, default_value_t = Backoff::Yield)]
   consumer_backoff: Backoff,
}

const EXIT_OK: u8 = 0;
const EXIT_FAILURE: u8 = 1;

/// Parses `args` into a validated config. On failure the message (and the
/// usage line for range errors) has already been printed and the process
/// exit status is returned.
fn parse_config<I, T>(args: I) -> Result<BenchConfig, u8>
where
   I: IntoIterator<Item = T>,
   T: Into<OsString> + Clone,
{
   let cli = match Cli::try_parse_from(args) {
      Ok(cli) => cli,
      Err(err) => {
         let _ = err.print();
         return Err(match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => EXIT_OK,
            _ => EXIT_FAILURE,
         });
      }
   };

   match BenchConfig::new(cli.msgs_per_sec, cli.duration_seconds, cli.buffer_size_power_of_two) {
      Ok(config) => Ok(config
         .with_producer_backoff(cli.producer_backoff)
         .with_consumer_backoff(cli.consumer_backoff)),
      Err(err) => {
         eprintln!("error: {err}\n\n{}", Cli::command().render_usage());
         Err(EXIT_FAILURE)
      }
   }
}

fn main() -> ExitCode {
   let config = match parse_config(std::env::args_os()) {
      Ok(config) => config,
      Err(code) => return ExitCode::from(code),
   };

   tracing_subscriber::fmt()
      .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
      .with_writer(io::stderr)
      .init();

   match run(&config) {
      Ok(()) => ExitCode::from(EXIT_OK),
      Err(err) => {
         error!("{err:#}");
         ExitCode::from(EXIT_FAILURE)
      }
   }
}

fn run(config: &BenchConfig) -> anyhow::Result<()> {
   let flag = shutdown::RunFlag::new();
   shutdown::install_interrupt_handler(flag.clone()).context("installing interrupt handler")?;

   let report = harness::run(config, &flag, |sample| {
      println!("t={}s, queue_approx={}", sample.tick, sample.approx_len);
   })
   .context("benchmark run failed")?;

   let latencies = &report.consumer.latencies_ns;
   let summary = stats::LatencySummary::from_samples(latencies);

   let mut out = io::stdout().lock();
   writeln!(out, "Finished. Collected {} samples.", latencies.len())?;
   stats::write_report(&mut out, summary.as_ref()).context("writing statistics")?;
   out.flush()?;
   Ok(())
}
