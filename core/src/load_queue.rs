//! Priority work queue of tile addresses waiting to be loaded.
//!
//! Lower priority values are served first; ties go to the address that was
//! enqueued first. An address is pending at most once: re-submitting it can
//! only improve its priority. Priorities are fixed at submission time and only
//! change when the owner calls [`LoadQueue::reprioritize`] after the floor or
//! the viewport centre moved, which re-ranks every pending entry in one
//! O(n log n) pass.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Condvar, Mutex, PoisonError};
use std::time::Duration;

use crate::address::TileAddress;

/// Default cost of one floor of distance. Large enough that any floor mismatch
/// outranks in-plane distance on realistic grids.
pub const DEFAULT_FLOOR_WEIGHT: i64 = 1000;

/// Largest accepted floor weight. Keeps a floor mismatch ahead of any
/// in-plane distance without leaving `i64`.
pub const MAX_FLOOR_WEIGHT: i64 = 1 << 30;

/// `|floor - current_floor| * floor_weight + |x - cx| + |y - cy|`, saturating
/// at `i64::MAX`.
pub fn load_priority(
    address: TileAddress,
    current_floor: i32,
    center: (i32, i32),
    floor_weight: i64,
) -> i64 {
    let floor_distance = (i64::from(address.floor) - i64::from(current_floor)).abs();
    let dx = (i64::from(address.x) - i64::from(center.0)).abs();
    let dy = (i64::from(address.y) - i64::from(center.1)).abs();
    floor_distance
        .saturating_mul(floor_weight)
        .saturating_add(dx + dy)
}

#[derive(Default)]
struct QueueInner {
    // (priority, sequence, address); the sequence gives FIFO tie-breaking.
    ordered: BTreeSet<(i64, u64, TileAddress)>,
    pending: HashMap<TileAddress, (i64, u64)>,
    next_seq: u64,
    // Taken by a worker through `wait_dequeue` and not yet released.
    claimed: usize,
}

impl QueueInner {
    fn pop_best(&mut self) -> Option<TileAddress> {
        let (_, _, address) = self.ordered.pop_first()?;
        self.pending.remove(&address);
        Some(address)
    }
}

#[derive(Default)]
pub struct LoadQueue {
    inner: Mutex<QueueInner>,
    available: Condvar,
}

impl LoadQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Submit `address` with `priority`.
    ///
    /// If the address is already pending with a worse (higher) priority it is
    /// moved up; an equal or better existing priority is kept unchanged.
    ///
    /// # Returns
    ///
    /// * `true` if the address was inserted or its priority improved.
    pub fn enqueue(&self, address: TileAddress, priority: i64) -> bool {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(&(current, seq)) = inner.pending.get(&address) {
            if priority >= current {
                return false;
            }
            inner.ordered.remove(&(current, seq, address));
            inner.ordered.insert((priority, seq, address));
            inner.pending.insert(address, (priority, seq));
            return true;
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.ordered.insert((priority, seq, address));
        inner.pending.insert(address, (priority, seq));
        drop(inner);

        self.available.notify_one();
        true
    }

    /// Remove and return the best pending address, if any.
    pub fn dequeue_best(&self) -> Option<TileAddress> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_best()
    }

    /// Claim the best pending address for a worker, waiting up to `timeout`
    /// for work when the queue is empty. Returns `None` on timeout or when
    /// woken by [`wake_all`](Self::wake_all) with nothing to do.
    ///
    /// Every claimed address must be handed back with
    /// [`release`](Self::release) once its result is stored.
    pub fn wait_dequeue(&self, timeout: Duration) -> Option<TileAddress> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if inner.ordered.is_empty() {
            inner = self
                .available
                .wait_timeout(inner, timeout)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        let address = inner.pop_best()?;
        inner.claimed += 1;
        Some(address)
    }

    /// Mark one claimed address as finished.
    pub fn release(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.claimed = inner.claimed.saturating_sub(1);
    }

    /// Nothing pending and nothing claimed, observed atomically.
    pub fn is_drained(&self) -> bool {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.pending.is_empty() && inner.claimed == 0
    }

    /// Wake every thread blocked in [`wait_dequeue`](Self::wait_dequeue).
    pub fn wake_all(&self) {
        self.available.notify_all();
    }

    /// Recompute the priority of every pending address with `priority_fn`.
    ///
    /// Unlike [`enqueue`](Self::enqueue) this may also make entries worse; it
    /// is the explicit re-rank used when the viewport centre or floor changes.
    /// Insertion order is preserved for ties.
    pub fn reprioritize<F>(&self, priority_fn: F)
    where
        F: Fn(TileAddress) -> i64,
    {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let QueueInner {
            ordered, pending, ..
        } = &mut *inner;

        ordered.clear();
        for (address, entry) in pending.iter_mut() {
            entry.0 = priority_fn(*address);
            ordered.insert((entry.0, entry.1, *address));
        }
    }

    pub fn priority_of(&self, address: TileAddress) -> Option<i64> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pending
            .get(&address)
            .map(|(priority, _)| *priority)
    }

    pub fn contains(&self, address: TileAddress) -> bool {
        self.priority_of(address).is_some()
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pending
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    fn a(floor: i32, x: i32, y: i32) -> TileAddress {
        TileAddress::new(floor, x, y)
    }

    #[test]
    fn priority_formula() {
        assert_eq!(load_priority(a(0, 10, 10), 0, (10, 10), 1000), 0);
        assert_eq!(load_priority(a(0, 7, 14), 0, (10, 10), 1000), 7);
        assert_eq!(load_priority(a(2, 10, 10), 0, (10, 10), 1000), 2000);
        assert_eq!(load_priority(a(1, 12, 9), 3, (10, 10), 10), 23);
    }

    /// With the default weight every tile on the active floor of a 50x178
    /// grid outranks every tile one floor away.
    #[test]
    fn floor_mismatch_dominates_plane_distance() {
        let far_same_floor = load_priority(a(0, 16, 19), 0, (65, 196), DEFAULT_FLOOR_WEIGHT);
        let near_other_floor = load_priority(a(1, 65, 196), 0, (65, 196), DEFAULT_FLOOR_WEIGHT);
        assert!(far_same_floor < near_other_floor);
    }

    #[test]
    fn dequeues_in_non_decreasing_priority() {
        let q = LoadQueue::new();
        let priorities = [5, 3, 9, 1, 3, 7, 0, 2];
        for (i, p) in priorities.iter().enumerate() {
            q.enqueue(a(0, i as i32, 0), *p);
        }

        let mut served = Vec::new();
        while let Some(address) = q.dequeue_best() {
            served.push(priorities[address.x as usize]);
        }
        assert_eq!(served.len(), priorities.len());
        assert!(served.windows(2).all(|w| w[0] <= w[1]), "{served:?}");
    }

    #[test]
    fn ties_break_by_insertion_order() {
        let q = LoadQueue::new();
        q.enqueue(a(0, 3, 0), 1);
        q.enqueue(a(0, 1, 0), 1);
        q.enqueue(a(0, 2, 0), 1);
        assert_eq!(q.dequeue_best(), Some(a(0, 3, 0)));
        assert_eq!(q.dequeue_best(), Some(a(0, 1, 0)));
        assert_eq!(q.dequeue_best(), Some(a(0, 2, 0)));
        assert_eq!(q.dequeue_best(), None);
    }

    #[test]
    fn re_enqueue_keeps_single_entry_with_minimum_priority() {
        let q = LoadQueue::new();
        let t = a(1, 4, 4);

        assert!(q.enqueue(t, 50));
        assert!(!q.enqueue(t, 80));
        assert_eq!(q.priority_of(t), Some(50));
        assert!(q.enqueue(t, 20));
        assert_eq!(q.priority_of(t), Some(20));
        assert_eq!(q.len(), 1);

        assert_eq!(q.dequeue_best(), Some(t));
        assert!(q.is_empty());
        assert!(!q.contains(t));
    }

    #[test]
    fn improved_entry_overtakes_others() {
        let q = LoadQueue::new();
        q.enqueue(a(0, 0, 0), 10);
        q.enqueue(a(0, 1, 0), 20);
        q.enqueue(a(0, 1, 0), 5);
        assert_eq!(q.dequeue_best(), Some(a(0, 1, 0)));
    }

    #[test]
    fn reprioritize_follows_new_center() {
        let q = LoadQueue::new();
        for x in 0..10 {
            q.enqueue(a(0, x, 0), load_priority(a(0, x, 0), 0, (0, 0), 1000));
        }
        assert_eq!(q.priority_of(a(0, 9, 0)), Some(9));

        q.reprioritize(|t| load_priority(t, 0, (9, 0), 1000));
        assert_eq!(q.priority_of(a(0, 9, 0)), Some(0));
        assert_eq!(q.priority_of(a(0, 0, 0)), Some(9));
        assert_eq!(q.len(), 10);
        assert_eq!(q.dequeue_best(), Some(a(0, 9, 0)));
        assert_eq!(q.dequeue_best(), Some(a(0, 8, 0)));
    }

    #[test]
    fn reprioritize_after_floor_change_serves_active_floor_first() {
        let q = LoadQueue::new();
        for floor in 0..4 {
            q.enqueue(a(floor, 0, 0), load_priority(a(floor, 0, 0), 0, (0, 0), 1000));
        }
        q.reprioritize(|t| load_priority(t, 2, (0, 0), 1000));
        assert_eq!(q.dequeue_best(), Some(a(2, 0, 0)));
    }

    #[test]
    fn wait_dequeue_times_out_on_empty_queue() {
        let q = LoadQueue::new();
        let start = Instant::now();
        assert_eq!(q.wait_dequeue(Duration::from_millis(20)), None);
        assert!(start.elapsed() >= Duration::from_millis(10));
    }

    #[test]
    fn wait_dequeue_receives_work_from_another_thread() {
        let q = Arc::new(LoadQueue::new());
        let producer = {
            let q = Arc::clone(&q);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                q.enqueue(a(0, 1, 1), 0);
            })
        };

        let mut got = None;
        for _ in 0..50 {
            got = q.wait_dequeue(Duration::from_millis(100));
            if got.is_some() {
                break;
            }
        }
        producer.join().unwrap();
        assert_eq!(got, Some(a(0, 1, 1)));
    }

    #[test]
    fn claimed_work_keeps_queue_busy_until_released() {
        let q = LoadQueue::new();
        q.enqueue(a(0, 0, 0), 0);
        assert!(!q.is_drained());

        assert_eq!(q.wait_dequeue(Duration::from_millis(10)), Some(a(0, 0, 0)));
        assert!(q.is_empty());
        // Empty but still claimed.
        assert!(!q.is_drained());

        q.release();
        assert!(q.is_drained());
    }

    #[test]
    fn huge_floor_weight_saturates() {
        let w = i64::MAX / 2;
        let far = load_priority(a(3, 0, 0), 0, (0, 0), w);
        assert_eq!(far, i64::MAX);
        // Still never ahead of a tile one floor closer.
        let near = load_priority(a(1, 0, 0), 0, (0, 0), w);
        assert!(near < far);
        assert!(load_priority(a(1, 500, 500), 0, (0, 0), w) >= near);
    }
}
