// Cooperative shutdown: a shared run flag and a SIGINT/SIGTERM watcher.

use crate::error::BenchError;
use nix::sys::signal::{SigSet, Signal};
use std::{
   process,
   sync::{
      atomic::{AtomicBool, Ordering},
      Arc,
   },
   thread,
};
use tracing::warn;

/// Run flag checked by both worker loops between queue operations.
///
/// Only eventual visibility is needed, so all accesses are Relaxed.
#[derive(Debug, Clone)]
pub struct RunFlag(Arc<AtomicBool>);

impl RunFlag {
   pub fn new() -> Self {
      Self(Arc::new(AtomicBool::new(true)))
   }

   #[inline]
   pub fn is_running(&self) -> bool {
      self.0.load(Ordering::Relaxed)
   }

   #[inline]
   pub fn stop(&self) {
      self.0.store(false, Ordering::Relaxed);
   }
}

impl Default for RunFlag {
   fn default() -> Self {
      Self::new()
   }
}

/// Routes SIGINT / SIGTERM to `flag`.
///
/// Blocks both signals in the calling thread and spawns a watcher that
/// `sigwait`s for them. Threads spawned afterwards inherit the mask, so call
/// this before starting the workers. The first signal stops `flag`; a second
/// one exits the process with status 1.
pub fn install_interrupt_handler(flag: RunFlag) -> Result<(), BenchError> {
   let mut mask = SigSet::empty();
   mask.add(Signal::SIGINT);
   mask.add(Signal::SIGTERM);
   mask.thread_block()?;

   thread::Builder::new()
      .name("signal-watch".into())
      .spawn(move || {
         let mut seen = 0u32;
         loop {
            match mask.wait() {
               Ok(sig) => {
                  seen += 1;
                  if seen > 1 {
                     warn!(signal = %sig, "second signal, exiting");
                     process::exit(1);
                  }
                  warn!(signal = %sig, "stopping run");
                  flag.stop();
               }
               Err(err) => {
                  warn!(error = %err, "sigwait failed, interrupt handling disabled");
                  return;
               }
            }
         }
      })?;
   Ok(())
}
