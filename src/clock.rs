use std::time::Instant;

/// Monotonic nanosecond clock shared by producer and consumer.
///
/// Both sides stamp against the same origin, so `recv - sent` is a latency
/// on one clock.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
   origin: Instant,
}

impl Clock {
   pub fn start() -> Self {
      Self { origin: Instant::now() }
   }

   #[inline]
   pub fn now_ns(&self) -> u64 {
      u64::try_from(self.origin.elapsed().as_nanos()).unwrap_or(u64::MAX)
   }
}

#[cfg(test)]
mod tests {
   use super::*;
   use std::{thread, time::Duration};

   #[test]
   fn monotonic() {
      let clock = Clock::start();
      let a = clock.now_ns();
      thread::sleep(Duration::from_millis(2));
      let b = clock.now_ns();
      assert!(b >= a + 1_000_000);
   }
}
