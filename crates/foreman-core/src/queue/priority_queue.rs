//! Priority-ordered admission queue with an anti-starvation boost.

use chrono::{DateTime, Utc};

use super::QueueItem;
use crate::domain::{Priority, TaskEnvelope, TaskId};
use crate::error::ForemanError;

/// Admission queue ordered by `(priority desc, enqueued_at asc)`.
///
/// Ordering invariant: after every enqueue and dequeue the sequence is
/// immediately re-sorted — higher priority first, FIFO among equal
/// priorities. Items sharing both priority and timestamp keep insertion
/// order (the sort is stable).
///
/// Anti-starvation: each dequeue boosts every remaining item's priority by
/// `boost_multiplier`, so an item skipped repeatedly converges toward the
/// front. A task at the lowest priority is returned within
/// `log(priority_ratio) / log(boost_multiplier)` dequeue cycles.
///
/// A `Vec` kept eagerly sorted is used instead of a binary heap: the
/// dequeue-time bulk boost rewrites every remaining key, and the invariant
/// asks for a fully ordered sequence after each mutation, not just a
/// well-placed head.
#[derive(Debug, Clone)]
pub struct PriorityQueue {
    items: Vec<QueueItem>,
    boost_multiplier: f64,
}

impl PriorityQueue {
    pub fn new(boost_multiplier: f64) -> Self {
        Self {
            items: Vec::new(),
            boost_multiplier,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn contains(&self, task_id: TaskId) -> bool {
        self.items.iter().any(|it| it.task_id() == task_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueueItem> {
        self.items.iter()
    }

    /// Insert an envelope at the given priority.
    pub fn enqueue(&mut self, envelope: TaskEnvelope, priority: Priority, now: DateTime<Utc>) {
        self.items.push(QueueItem::new(envelope, priority, now));
        self.resort();
    }

    /// Re-insert an already-built item (snapshot restore path).
    pub(crate) fn insert_item(&mut self, item: QueueItem) {
        self.items.push(item);
        self.resort();
    }

    /// Remove and return the highest-ranked item, then boost everything
    /// left behind.
    ///
    /// All-or-nothing: the boosts are validated before anything is removed,
    /// so a failed call leaves the queue exactly as it was.
    pub fn dequeue(&mut self) -> Result<QueueItem, ForemanError> {
        if self.items.is_empty() {
            return Err(ForemanError::EmptyQueue);
        }

        let mut boosted = Vec::with_capacity(self.items.len() - 1);
        for item in &self.items[1..] {
            boosted.push(item.priority().boosted(self.boost_multiplier)?);
        }

        let head = self.items.remove(0);
        for (item, priority) in self.items.iter_mut().zip(boosted) {
            item.set_priority(priority);
        }
        self.resort();

        Ok(head)
    }

    /// The item a `dequeue` would return, without removing or boosting.
    pub fn peek(&self) -> Result<&QueueItem, ForemanError> {
        self.items.first().ok_or(ForemanError::EmptyQueue)
    }

    /// Remove the item bound to `task_id`, if queued (cancellation path).
    pub fn remove(&mut self, task_id: TaskId) -> Option<QueueItem> {
        let pos = self.items.iter().position(|it| it.task_id() == task_id)?;
        // Vec::remove preserves the order of the rest; no resort needed.
        Some(self.items.remove(pos))
    }

    fn resort(&mut self) {
        self.items.sort_by(|a, b| {
            b.priority()
                .total_cmp(&a.priority())
                .then_with(|| a.enqueued_at().cmp(&b.enqueued_at()))
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use ulid::Ulid;

    fn envelope(tag: &str) -> TaskEnvelope {
        TaskEnvelope::new(
            TaskId::from_ulid(Ulid::new()),
            serde_json::json!({ "tag": tag }),
        )
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn tag_of(item: &QueueItem) -> String {
        item.envelope().payload()["tag"].as_str().unwrap().to_string()
    }

    #[test]
    fn dequeue_on_empty_fails_and_leaves_queue_unchanged() {
        let mut q = PriorityQueue::new(2.0);
        assert!(matches!(q.dequeue(), Err(ForemanError::EmptyQueue)));
        assert!(q.is_empty());
        assert!(matches!(q.peek(), Err(ForemanError::EmptyQueue)));
    }

    #[test]
    fn highest_priority_dequeues_first() {
        let mut q = PriorityQueue::new(2.0);
        q.enqueue(envelope("low"), Priority::new(10.0).unwrap(), at(0));
        q.enqueue(envelope("high"), Priority::new(20.0).unwrap(), at(1));

        assert_eq!(tag_of(&q.dequeue().unwrap()), "high");
        assert_eq!(tag_of(&q.dequeue().unwrap()), "low");
    }

    #[test]
    fn equal_priorities_dequeue_fifo() {
        // A (10), then B and C both at 20: B wins the tie by age.
        let mut q = PriorityQueue::new(2.0);
        q.enqueue(envelope("a"), Priority::new(10.0).unwrap(), at(0));
        q.enqueue(envelope("b"), Priority::new(20.0).unwrap(), at(1));
        q.enqueue(envelope("c"), Priority::new(20.0).unwrap(), at(2));

        assert_eq!(tag_of(&q.dequeue().unwrap()), "b");
        assert_eq!(tag_of(&q.dequeue().unwrap()), "c");
        assert_eq!(tag_of(&q.dequeue().unwrap()), "a");
    }

    #[test]
    fn same_timestamp_keeps_insertion_order() {
        let mut q = PriorityQueue::new(2.0);
        q.enqueue(envelope("first"), Priority::new(5.0).unwrap(), at(0));
        q.enqueue(envelope("second"), Priority::new(5.0).unwrap(), at(0));

        assert_eq!(tag_of(&q.dequeue().unwrap()), "first");
        assert_eq!(tag_of(&q.dequeue().unwrap()), "second");
    }

    #[test]
    fn remaining_items_are_boosted_on_dequeue() {
        let mut q = PriorityQueue::new(2.0);
        q.enqueue(envelope("a"), Priority::new(1.0).unwrap(), at(0));
        q.enqueue(envelope("b"), Priority::new(100.0).unwrap(), at(1));

        assert_eq!(tag_of(&q.dequeue().unwrap()), "b");
        // a: 1.0 -> 2.0
        assert_eq!(q.peek().unwrap().priority().value(), 2.0);
    }

    #[test]
    fn skipped_item_is_not_starved() {
        // "slow" at priority 1 against a stream of priority-64 arrivals.
        // 1 doubles past 64 within log2(64) + 1 = 7 dequeues.
        let mut q = PriorityQueue::new(2.0);
        q.enqueue(envelope("slow"), Priority::new(1.0).unwrap(), at(0));

        let mut waited = 0;
        loop {
            q.enqueue(envelope("fast"), Priority::new(64.0).unwrap(), at(waited + 1));
            let got = q.dequeue().unwrap();
            if tag_of(&got) == "slow" {
                break;
            }
            waited += 1;
            assert!(waited <= 7, "low-priority item starved for {waited} cycles");
        }
    }

    #[test]
    fn failed_boost_leaves_queue_untouched() {
        let mut q = PriorityQueue::new(2.0);
        q.enqueue(envelope("head"), Priority::new(10.0).unwrap(), at(0));
        q.enqueue(envelope("huge"), Priority::new(f64::MAX).unwrap(), at(1));

        // "huge" is the head; boosting "head" is fine. Dequeue once so the
        // remaining item is the one that overflows on the next boost.
        assert_eq!(tag_of(&q.dequeue().unwrap()), "huge");
        q.enqueue(envelope("huge2"), Priority::new(f64::MAX).unwrap(), at(2));
        q.enqueue(envelope("top"), Priority::new(f64::MAX).unwrap(), at(1));

        let len_before = q.len();
        assert!(matches!(
            q.dequeue(),
            Err(ForemanError::InvalidPriority(_))
        ));
        assert_eq!(q.len(), len_before);
    }

    #[test]
    fn remove_takes_item_out_of_rotation() {
        let mut q = PriorityQueue::new(2.0);
        q.enqueue(envelope("keep"), Priority::new(10.0).unwrap(), at(0));
        let victim = envelope("victim");
        let victim_id = victim.task_id();
        q.enqueue(victim, Priority::new(99.0).unwrap(), at(1));

        let removed = q.remove(victim_id).unwrap();
        assert_eq!(removed.task_id(), victim_id);
        assert!(!q.contains(victim_id));
        assert_eq!(tag_of(&q.dequeue().unwrap()), "keep");
        assert!(q.remove(victim_id).is_none());
    }
}
