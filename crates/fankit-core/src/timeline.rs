//! Chronologically ordered buffer with a sliding retention window
//!
//! A [`Timeline`] keeps items sorted by timestamp and evicts from the old end
//! whenever the stored time span exceeds the configured window. Eviction
//! observers see every item exactly once, in the order items leave the store,
//! which is what lets a pipe delay commands and still release them
//! downstream in causal order.

use std::collections::VecDeque;
use std::fmt;

use tracing::warn;

/// A timestamped payload.
///
/// Timestamps are simulated milliseconds of print time. Duplicates are legal;
/// items sharing a timestamp keep their insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineItem<T> {
    /// Simulated time in milliseconds.
    pub timestamp: f64,
    /// The buffered value.
    pub payload: T,
}

/// Callback invoked once per evicted item with `(timestamp, payload)`.
pub type EvictionObserver<T> = Box<dyn FnMut(f64, &T)>;

/// Time-ordered buffer with automatic low-end eviction.
pub struct Timeline<T> {
    items: VecDeque<TimelineItem<T>>,
    window_size: f64,
    observers: Vec<EvictionObserver<T>>,
}

impl<T> Timeline<T> {
    /// Create a timeline that evicts items older than `window_size`
    /// milliseconds relative to the newest item. A negative size is
    /// rejected and falls back to unbounded retention.
    pub fn new(window_size: f64) -> Self {
        let window_size = if window_size < 0.0 {
            warn!(window_size, "negative timeline window treated as unbounded");
            f64::INFINITY
        } else {
            window_size
        };
        Self {
            items: VecDeque::new(),
            window_size,
            observers: Vec::new(),
        }
    }

    /// Create a timeline that never evicts on its own; callers release items
    /// explicitly through the `evict_*` methods or [`Timeline::reset`].
    pub fn unbounded() -> Self {
        Self::new(f64::INFINITY)
    }

    /// Register an eviction observer. Observers run in registration order
    /// for every item that leaves the store.
    pub fn add_observer(&mut self, observer: EvictionObserver<T>) {
        self.observers.push(observer);
    }

    /// Insert an item, keeping ascending timestamp order.
    ///
    /// The insertion point is found by scanning backward from the newest end:
    /// forward streams are near-monotonic, so this is usually O(1). Among
    /// equal timestamps the new item lands last, preserving stream order.
    pub fn insert(&mut self, timestamp: f64, payload: T) {
        let mut index = self.items.len();
        while index > 0 && self.items[index - 1].timestamp > timestamp {
            index -= 1;
        }
        self.items.insert(index, TimelineItem { timestamp, payload });
        self.apply_window();
    }

    /// Evict every item with a timestamp strictly less than `timestamp`,
    /// oldest first.
    pub fn evict_all_older_than(&mut self, timestamp: f64) {
        while self
            .items
            .front()
            .is_some_and(|item| item.timestamp < timestamp)
        {
            self.evict_front();
        }
    }

    /// Evict every item with a timestamp strictly greater than `timestamp`,
    /// working from the newest end.
    pub fn evict_all_newer_than(&mut self, timestamp: f64) {
        while self
            .items
            .back()
            .is_some_and(|item| item.timestamp > timestamp)
        {
            if let Some(item) = self.items.pop_back() {
                self.notify(&item);
            }
        }
    }

    /// Evict everything, oldest first.
    pub fn reset(&mut self) {
        while !self.items.is_empty() {
            self.evict_front();
        }
    }

    /// Change the retention window, re-applying eviction immediately.
    /// Negative sizes are rejected and keep the previous window.
    pub fn set_window_size(&mut self, window_size: f64) {
        if window_size < 0.0 {
            warn!(window_size, "ignoring negative timeline window size");
            return;
        }
        self.window_size = window_size;
        self.apply_window();
    }

    /// The current retention window in milliseconds.
    pub fn window_size(&self) -> f64 {
        self.window_size
    }

    /// Number of buffered items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Oldest buffered item.
    pub fn first(&self) -> Option<&TimelineItem<T>> {
        self.items.front()
    }

    /// Newest buffered item.
    pub fn last(&self) -> Option<&TimelineItem<T>> {
        self.items.back()
    }

    /// Iterate buffered items oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &TimelineItem<T>> {
        self.items.iter()
    }

    fn apply_window(&mut self) {
        while let (Some(first), Some(last)) = (self.items.front(), self.items.back()) {
            if last.timestamp - first.timestamp <= self.window_size {
                break;
            }
            self.evict_front();
        }
    }

    fn evict_front(&mut self) {
        if let Some(item) = self.items.pop_front() {
            self.notify(&item);
        }
    }

    fn notify(&mut self, item: &TimelineItem<T>) {
        for observer in &mut self.observers {
            observer(item.timestamp, &item.payload);
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Timeline<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timeline")
            .field("items", &self.items)
            .field("window_size", &self.window_size)
            .field("observers", &self.observers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn timestamps<T>(timeline: &Timeline<T>) -> Vec<f64> {
        timeline.iter().map(|item| item.timestamp).collect()
    }

    #[test]
    fn keeps_ascending_order_for_out_of_order_inserts() {
        let mut timeline = Timeline::unbounded();
        timeline.insert(100.0, "b");
        timeline.insert(50.0, "a");
        timeline.insert(200.0, "c");
        assert_eq!(timestamps(&timeline), vec![50.0, 100.0, 200.0]);
    }

    #[test]
    fn equal_timestamps_keep_insertion_order() {
        let mut timeline = Timeline::unbounded();
        timeline.insert(10.0, "first");
        timeline.insert(10.0, "second");
        timeline.insert(10.0, "third");
        let payloads: Vec<&str> = timeline.iter().map(|item| item.payload).collect();
        assert_eq!(payloads, vec!["first", "second", "third"]);
    }

    #[test]
    fn window_invariant_holds_after_inserts() {
        let mut timeline = Timeline::new(100.0);
        for t in [0.0, 40.0, 90.0, 150.0, 240.0] {
            timeline.insert(t, ());
            let span = timeline.last().unwrap().timestamp - timeline.first().unwrap().timestamp;
            assert!(span <= timeline.window_size());
        }
        assert_eq!(timestamps(&timeline), vec![150.0, 240.0]);
    }

    #[test]
    fn observers_see_evicted_items_once_oldest_first() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let mut timeline = Timeline::new(50.0);
        timeline.add_observer(Box::new(move |timestamp, payload: &i32| {
            sink.borrow_mut().push((timestamp, *payload));
        }));

        timeline.insert(0.0, 1);
        timeline.insert(20.0, 2);
        timeline.insert(100.0, 3);
        assert_eq!(*seen.borrow(), vec![(0.0, 1), (20.0, 2)]);

        timeline.reset();
        assert_eq!(*seen.borrow(), vec![(0.0, 1), (20.0, 2), (100.0, 3)]);
    }

    #[test]
    fn evict_older_and_newer_are_strict() {
        let mut timeline = Timeline::unbounded();
        for t in [10.0, 20.0, 30.0, 40.0] {
            timeline.insert(t, ());
        }
        timeline.evict_all_older_than(20.0);
        assert_eq!(timestamps(&timeline), vec![20.0, 30.0, 40.0]);
        timeline.evict_all_newer_than(30.0);
        assert_eq!(timestamps(&timeline), vec![20.0, 30.0]);
    }

    #[test]
    fn negative_construction_window_falls_back_to_unbounded() {
        let mut timeline = Timeline::new(-1.0);
        assert_eq!(timeline.window_size(), f64::INFINITY);
        timeline.insert(0.0, ());
        timeline.insert(1.0e9, ());
        assert_eq!(timeline.len(), 2);
    }

    #[test]
    fn negative_window_request_is_a_no_op() {
        let mut timeline = Timeline::new(100.0);
        timeline.insert(0.0, ());
        timeline.insert(80.0, ());
        timeline.set_window_size(-5.0);
        assert_eq!(timeline.window_size(), 100.0);
        assert_eq!(timeline.len(), 2);
    }

    #[test]
    fn shrinking_window_evicts_immediately() {
        let mut timeline = Timeline::new(100.0);
        timeline.insert(0.0, ());
        timeline.insert(80.0, ());
        timeline.set_window_size(10.0);
        assert_eq!(timestamps(&timeline), vec![80.0]);
    }

    #[test]
    fn unbounded_store_never_self_evicts() {
        let mut timeline = Timeline::unbounded();
        timeline.insert(0.0, ());
        timeline.insert(1.0e9, ());
        assert_eq!(timeline.len(), 2);
    }
}
