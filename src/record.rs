// Fixed-layout feed record carried through the queue.

/// One synthetic market-data record.
///
/// Layout (32 bytes, 8-byte aligned, no padding):
/// `sequence` 0..8, `send_timestamp_ns` 8..16, `symbol_id` 16..20,
/// `quantity` 20..24, `price` 24..32.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Record {
   pub sequence: u64,
   pub send_timestamp_ns: u64,
   pub symbol_id: u32,
   pub quantity: u32,
   pub price: f64,
}

const _: () = assert!(std::mem::size_of::<Record>() == 32);
const _: () = assert!(std::mem::align_of::<Record>() == 8);

#[cfg(test)]
mod tests {
   use super::*;
   use std::mem::offset_of;

   #[test]
   fn field_offsets() {
      assert_eq!(offset_of!(Record, sequence), 0);
      assert_eq!(offset_of!(Record, send_timestamp_ns), 8);
      assert_eq!(offset_of!(Record, symbol_id), 16);
      assert_eq!(offset_of!(Record, quantity), 20);
      assert_eq!(offset_of!(Record, price), 24);
   }
}
