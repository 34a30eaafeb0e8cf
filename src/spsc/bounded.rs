// Bounded single-producer / single-consumer ring for `Copy` elements.
//
// Two monotonically increasing u64 cursors: `write` (producer) and `read`
// (consumer). Only the slot index `cursor & mask` wraps, so
// `write - read` is always the number of occupied slots, in [0, capacity].
// Each cursor has exactly one writer, which publishes it with a Release
// store; the other side observes it with an Acquire load.

use crate::error::QueueError;
use crossbeam::utils::CachePadded;
use std::{
   alloc::{self, Layout},
   fmt,
   mem,
   ptr::NonNull,
   sync::{
      atomic::{AtomicU64, Ordering},
      Arc,
   },
};

/// Alignment of the slot array.
pub const CACHE_LINE: usize = 64;

/*──────────────────────────────────────────────────────────────────────────*/
/*  Shared ring                                                             */
/*──────────────────────────────────────────────────────────────────────────*/

struct Ring<T: Copy> {
   write : CachePadded<AtomicU64>, // advanced by the producer only
   read  : CachePadded<AtomicU64>, // advanced by the consumer only
   slots : NonNull<T>,
   layout: Layout,
   capacity: u64,
   mask    : u64,                  // capacity − 1
}

// Slots are only touched by the side that currently owns them (see the
// cursor protocol above); the cursors themselves are atomics.
unsafe impl<T: Copy + Send> Send for Ring<T> {}
unsafe impl<T: Copy + Send> Sync for Ring<T> {}

impl<T: Copy> Ring<T> {
   fn allocate(capacity: usize) -> Result<Self, QueueError> {
      if !capacity.is_power_of_two() {
         // `is_power_of_two` is false for 0 as well
         return Err(QueueError::InvalidCapacity(capacity));
      }

      let alloc_failure = QueueError::AllocationFailure {
         capacity,
         bytes: capacity.saturating_mul(mem::size_of::<T>()),
      };
      let layout = Layout::array::<T>(capacity)
         .and_then(|l| l.align_to(CACHE_LINE))
         .map_err(|_| alloc_failure.clone())?;

      let slots = if layout.size() == 0 {
         NonNull::dangling()
      } else {
         // SAFETY: `layout` has a non-zero size.
         let raw = unsafe { alloc::alloc(layout) };
         NonNull::new(raw.cast::<T>()).ok_or(alloc_failure)?
      };

      Ok(Self {
         write: CachePadded::new(AtomicU64::new(0)),
         read : CachePadded::new(AtomicU64::new(0)),
         slots,
         layout,
         capacity: capacity as u64,
         mask    : capacity as u64 - 1,
      })
   }

   #[inline]
   fn slot(&self, cursor: u64) -> *mut T {
      // SAFETY: the masked index is < capacity, inside the allocation.
      unsafe { self.slots.as_ptr().add((cursor & self.mask) as usize) }
   }

   /// # Safety
   /// Must only be called by the single producer.
   #[inline]
   unsafe fn push(&self, item: T) -> bool {
      let write = self.write.load(Ordering::Relaxed);
      let read  = self.read.load(Ordering::Acquire);
      let used  = write.wrapping_sub(read);
      debug_assert!(used <= self.capacity);

      if used == self.capacity {
         return false;
      }

      // The consumer has moved past this slot (used < capacity), and it
      // cannot read it before the Release store below.
      unsafe { self.slot(write).write(item) };
      self.write.store(write + 1, Ordering::Release);
      true
   }

   /// # Safety
   /// Must only be called by the single consumer.
   #[inline]
   unsafe fn pop(&self) -> Option<T> {
      let read  = self.read.load(Ordering::Relaxed);
      let write = self.write.load(Ordering::Acquire);

      if read == write {
         return None;
      }

      // Acquire on `write` makes the producer's slot write visible.
      let item = unsafe { self.slot(read).read() };
      self.read.store(read + 1, Ordering::Release);
      Some(item)
   }

   /// Stale snapshot of the occupancy, clamped to `[0, capacity]`.
   #[inline]
   fn approx_len(&self) -> usize {
      // Read first: the later `write` load can only be ahead of it, never
      // behind, so the difference cannot go negative. It can overshoot
      // capacity if the consumer advanced in between, hence the clamp.
      let read  = self.read.load(Ordering::Acquire);
      let write = self.write.load(Ordering::Acquire);
      write.wrapping_sub(read).min(self.capacity) as usize
   }

   #[inline]
   fn is_empty(&self) -> bool {
      let read  = self.read.load(Ordering::Acquire);
      let write = self.write.load(Ordering::Acquire);
      read == write
   }
}

impl<T: Copy> Drop for Ring<T> {
   fn drop(&mut self) {
      // `T: Copy` has no destructor; abandoned elements need no cleanup.
      if self.layout.size() != 0 {
         // SAFETY: allocated in `allocate` with this exact layout.
         unsafe { alloc::dealloc(self.slots.as_ptr().cast(), self.layout) };
      }
   }
}

/*──────────────────────────────────────────────────────────────────────────*/
/*  Public handles                                                          */
/*──────────────────────────────────────────────────────────────────────────*/

/// A fixed-capacity, lock-free SPSC queue.
///
/// The queue is built once and then [`split`](Self::split) into exactly one
/// [`Producer`] and one [`Consumer`]. Neither handle is `Clone` and both
/// operations take `&mut self`, so the single-producer / single-consumer
/// discipline holds for the queue's whole lifetime.
///
/// Element types must be `Copy`: records are moved in and out as flat bit
/// copies and never need dropping.
///
/// ```compile_fail
/// use spsc_feed_bench::spsc::BoundedQueue;
/// let _ = BoundedQueue::<String>::new(8);
/// ```
pub struct BoundedQueue<T: Copy> {
   ring: Arc<Ring<T>>,
}

impl<T: Copy + Send> BoundedQueue<T> {
   /// Allocates `capacity` slots. `capacity` must be a non-zero power of two.
   pub fn new(capacity: usize) -> Result<Self, QueueError> {
      Ok(Self { ring: Arc::new(Ring::allocate(capacity)?) })
   }

   pub fn capacity(&self) -> usize {
      self.ring.capacity as usize
   }

   pub fn approx_len(&self) -> usize {
      self.ring.approx_len()
   }

   pub fn is_empty(&self) -> bool {
      self.ring.is_empty()
   }

   /// A read-only observer that can live on any thread.
   pub fn monitor(&self) -> Monitor<T> {
      Monitor { ring: Arc::clone(&self.ring) }
   }

   pub fn split(self) -> (Producer<T>, Consumer<T>) {
      let producer = Producer { ring: Arc::clone(&self.ring) };
      let consumer = Consumer { ring: self.ring };
      (producer, consumer)
   }
}

/// Write side of a [`BoundedQueue`].
pub struct Producer<T: Copy> {
   ring: Arc<Ring<T>>,
}

impl<T: Copy + Send> Producer<T> {
   /// Copies `item` into the queue. Returns `false`, leaving the queue
   /// untouched, when all `capacity` slots are occupied.
   #[inline]
   pub fn try_enqueue(&mut self, item: T) -> bool {
      // SAFETY: `Producer` is unique and not `Clone`; `&mut self` rules out
      // concurrent calls on it.
      unsafe { self.ring.push(item) }
   }

   pub fn capacity(&self) -> usize {
      self.ring.capacity as usize
   }

   pub fn approx_len(&self) -> usize {
      self.ring.approx_len()
   }

   pub fn is_empty(&self) -> bool {
      self.ring.is_empty()
   }

   pub fn monitor(&self) -> Monitor<T> {
      Monitor { ring: Arc::clone(&self.ring) }
   }
}

/// Read side of a [`BoundedQueue`].
pub struct Consumer<T: Copy> {
   ring: Arc<Ring<T>>,
}

impl<T: Copy + Send> Consumer<T> {
   /// Copies the oldest element out of the queue, or returns `None` if no
   /// published element is available.
   #[inline]
   pub fn try_dequeue(&mut self) -> Option<T> {
      // SAFETY: `Consumer` is unique and not `Clone`; `&mut self` rules out
      // concurrent calls on it.
      unsafe { self.ring.pop() }
   }

   pub fn capacity(&self) -> usize {
      self.ring.capacity as usize
   }

   pub fn approx_len(&self) -> usize {
      self.ring.approx_len()
   }

   pub fn is_empty(&self) -> bool {
      self.ring.is_empty()
   }

   pub fn monitor(&self) -> Monitor<T> {
      Monitor { ring: Arc::clone(&self.ring) }
   }
}

/// Read-only view of queue occupancy.
///
/// Values are snapshots: producer and consumer may move between the two
/// cursor loads, so use them for progress reporting only.
pub struct Monitor<T: Copy> {
   ring: Arc<Ring<T>>,
}

impl<T: Copy + Send> Monitor<T> {
   pub fn capacity(&self) -> usize {
      self.ring.capacity as usize
   }

   pub fn approx_len(&self) -> usize {
      self.ring.approx_len()
   }

   pub fn is_empty(&self) -> bool {
      self.ring.is_empty()
   }
}

impl<T: Copy> Clone for Monitor<T> {
   fn clone(&self) -> Self {
      Self { ring: Arc::clone(&self.ring) }
   }
}

/*──────────────────────────────── Debug ───────────────────────────────────*/

impl<T: Copy> fmt::Debug for Ring<T> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_struct("Ring")
         .field("capacity", &self.capacity)
         .field("write", &self.write.load(Ordering::Relaxed))
         .field("read", &self.read.load(Ordering::Relaxed))
         .finish()
   }
}

impl<T: Copy> fmt::Debug for BoundedQueue<T> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_struct("BoundedQueue").field("ring", &self.ring).finish()
   }
}

impl<T: Copy> fmt::Debug for Producer<T> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_struct("Producer").field("ring", &self.ring).finish()
   }
}

impl<T: Copy> fmt::Debug for Consumer<T> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_struct("Consumer").field("ring", &self.ring).finish()
   }
}

impl<T: Copy> fmt::Debug for Monitor<T> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_struct("Monitor").field("ring", &self.ring).finish()
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn slots_are_cache_line_aligned() {
      let q = BoundedQueue::<u64>::new(16).unwrap();
      assert_eq!(q.ring.slots.as_ptr() as usize % CACHE_LINE, 0);
      assert_eq!(q.ring.mask, 15);
   }

   #[test]
   fn cursors_sit_on_distinct_cache_lines() {
      let q = BoundedQueue::<u64>::new(4).unwrap();
      let write = &*q.ring.write as *const AtomicU64 as usize;
      let read  = &*q.ring.read as *const AtomicU64 as usize;
      assert!(write.abs_diff(read) >= CACHE_LINE);
   }

   #[test]
   fn full_check_leaves_cursors_untouched() {
      let (mut p, _c) = BoundedQueue::<u32>::new(2).unwrap().split();
      assert!(p.try_enqueue(1));
      assert!(p.try_enqueue(2));
      assert!(!p.try_enqueue(3));
      assert_eq!(p.ring.write.load(Ordering::Relaxed), 2);
      assert_eq!(p.ring.read.load(Ordering::Relaxed), 0);
   }

   #[test]
   fn cursors_keep_counting_past_capacity() {
      let (mut p, mut c) = BoundedQueue::<u32>::new(4).unwrap().split();
      for i in 0..10 {
         assert!(p.try_enqueue(i));
         assert_eq!(c.try_dequeue(), Some(i));
      }
      assert_eq!(p.ring.write.load(Ordering::Relaxed), 10);
      assert_eq!(c.ring.read.load(Ordering::Relaxed), 10);
   }

   #[test]
   fn zero_sized_elements() {
      let (mut p, mut c) = BoundedQueue::<()>::new(2).unwrap().split();
      assert!(p.try_enqueue(()));
      assert!(p.try_enqueue(()));
      assert!(!p.try_enqueue(()));
      assert_eq!(c.try_dequeue(), Some(()));
      assert_eq!(p.approx_len(), 1);
   }

   #[test]
   fn oversized_layout_is_an_allocation_failure() {
      let cap = 1usize << (usize::BITS - 1);
      match BoundedQueue::<u64>::new(cap) {
         Err(QueueError::AllocationFailure { capacity, .. }) => assert_eq!(capacity, cap),
         other => panic!("expected AllocationFailure, got {:?}", other.map(|_| ())),
      }
   }
}
