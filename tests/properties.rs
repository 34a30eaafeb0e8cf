//! Property tests: arbitrary interleavings of enqueue / dequeue on one
//! thread, checked against a `VecDeque` model.

use proptest::prelude::*;
use spsc_feed_bench::BoundedQueue;
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy)]
enum Op {
   Enqueue,
   Dequeue,
}

fn ops() -> impl Strategy<Value = Vec<Op>> {
   prop::collection::vec(
      prop::bool::weighted(0.6).prop_map(|push| if push { Op::Enqueue } else { Op::Dequeue }),
      1..400,
   )
}

proptest! {
   #[test]
   fn occupancy_stays_within_capacity(pow in 0u32..7, ops in ops()) {
      let capacity = 1usize << pow;
      let (mut p, mut c) = BoundedQueue::<u64>::new(capacity).unwrap().split();
      let mut next = 0u64;

      for op in ops {
         match op {
            Op::Enqueue => {
               let before = p.approx_len();
               let ok = p.try_enqueue(next);
               prop_assert_eq!(ok, before < capacity);
               if ok { next += 1; }
            }
            Op::Dequeue => {
               let before = c.approx_len();
               prop_assert_eq!(c.try_dequeue().is_some(), before > 0);
            }
         }
         prop_assert!(p.approx_len() <= capacity);
      }
   }

   #[test]
   fn matches_fifo_model(pow in 0u32..7, ops in ops()) {
      let capacity = 1usize << pow;
      let (mut p, mut c) = BoundedQueue::<u64>::new(capacity).unwrap().split();
      let mut model = VecDeque::new();
      let mut next = 0u64;

      for op in ops {
         match op {
            Op::Enqueue => {
               if p.try_enqueue(next) {
                  model.push_back(next);
               } else {
                  prop_assert_eq!(model.len(), capacity);
               }
               next += 1;
            }
            Op::Dequeue => prop_assert_eq!(c.try_dequeue(), model.pop_front()),
         }
         prop_assert_eq!(c.approx_len(), model.len());
         prop_assert_eq!(c.is_empty(), model.is_empty());
      }
   }
}
