//! Admission queue: ranking entries and the priority-ordered sequence.

mod item;
mod priority_queue;

pub use item::QueueItem;
pub use priority_queue::PriorityQueue;
