mod bounded;

pub use bounded::{BoundedQueue, Consumer, Monitor, Producer, CACHE_LINE};
