// Offline latency statistics over a finished sample set.

use std::io::{self, Write};

const RULE: &str = "================================";

/// Percentile of an ascending slice, interpolating linearly between the
/// two closest ranks (`idx = p * (n - 1)`). Returns 0.0 for an empty slice.
pub fn percentile(sorted: &[u64], p: f64) -> f64 {
   if sorted.is_empty() {
      return 0.0;
   }
   let idx = p.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
   let lo = idx.floor() as usize;
   let hi = idx.ceil() as usize;
   if lo == hi {
      return sorted[lo] as f64;
   }
   let frac = idx - lo as f64;
   sorted[lo] as f64 * (1.0 - frac) + sorted[hi] as f64 * frac
}

/// Latency distribution in nanoseconds.
#[derive(Debug, Clone, PartialEq)]
pub struct LatencySummary {
   pub samples: usize,
   pub mean_ns: f64,
   pub p50_ns: f64,
   pub p90_ns: f64,
   pub p99_ns: f64,
   pub p999_ns: f64,
}

impl LatencySummary {
   /// `None` when there are no samples.
   pub fn from_samples(samples: &[u64]) -> Option<Self> {
      if samples.is_empty() {
         return None;
      }
      let mut sorted = samples.to_vec();
      sorted.sort_unstable();

      let sum: f64 = sorted.iter().map(|&v| v as f64).sum();
      Some(Self {
         samples: sorted.len(),
         mean_ns: sum / sorted.len() as f64,
         p50_ns : percentile(&sorted, 0.50),
         p90_ns : percentile(&sorted, 0.90),
         p99_ns : percentile(&sorted, 0.99),
         p999_ns: percentile(&sorted, 0.999),
      })
   }
}

/// Writes the framed results block, latencies in microseconds.
pub fn write_report<W: Write>(out: &mut W, summary: Option<&LatencySummary>) -> io::Result<()> {
   writeln!(out)?;
   writeln!(out, "{RULE}")?;
   writeln!(out, "Latency Analysis Results")?;
   writeln!(out, "{RULE}")?;
   match summary {
      None => writeln!(out, "No latency samples collected")?,
      Some(s) => {
         writeln!(out, "Samples collected: {:>10}", s.samples)?;
         writeln!(out, "Average latency:   {:>8.2} μs", s.mean_ns / 1000.0)?;
         writeln!(out, "Median (p50):      {:>8.2} μs", s.p50_ns / 1000.0)?;
         writeln!(out, "90th percentile:   {:>8.2} μs", s.p90_ns / 1000.0)?;
         writeln!(out, "99th percentile:   {:>8.2} μs", s.p99_ns / 1000.0)?;
         writeln!(out, "99.9th percentile: {:>8.2} μs", s.p999_ns / 1000.0)?;
      }
   }
   writeln!(out, "{RULE}")
}
