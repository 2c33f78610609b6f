use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::scheduler::{
  Action, Duration, Instant, Scheduler, SchedulerRef,
};
use crate::subscription::{BoolSubscription, BoxSubscription};

struct VirtualItem {
  due: Instant,
  seq: u64,
  cancelled: Arc<AtomicBool>,
  action: Action,
}

impl PartialEq for VirtualItem {
  fn eq(&self, other: &Self) -> bool {
    self.due == other.due && self.seq == other.seq
  }
}

impl Eq for VirtualItem {}

impl PartialOrd for VirtualItem {
  fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
    Some(self.cmp(other))
  }
}

impl Ord for VirtualItem {
  fn cmp(&self, other: &Self) -> CmpOrdering {
    // Min-heap: earliest due time first, registration order for ties.
    other
      .due
      .cmp(&self.due)
      .then_with(|| other.seq.cmp(&self.seq))
  }
}

#[derive(Default)]
struct VirtualQueue {
  now: Instant,
  seq: u64,
  items: BinaryHeap<VirtualItem>,
}

/// A scheduler over an explicit virtual clock.
///
/// Nothing runs until [`run`](TestScheduler::run) or
/// [`run_to`](TestScheduler::run_to) consumes the queue; execution
/// advances `now` to each item's due time, never backwards. Ties run in
/// registration order.
///
/// `schedule` (the as-soon-as-possible form) enqueues one tick after
/// `now`, so consecutive trampolined steps — one element of an iterable
/// per step, for instance — land on distinct virtual instants and show up
/// individually timestamped in recordings.
///
/// Handles are cheap clones sharing one clock and queue; `handle()` gives
/// the `SchedulerRef` form that factories and combinators take.
#[derive(Clone, Default)]
pub struct TestScheduler {
  inner: Arc<Mutex<VirtualQueue>>,
}

impl TestScheduler {
  pub fn new() -> Self {
    Self::default()
  }

  /// This scheduler as a shared [`SchedulerRef`].
  pub fn handle(&self) -> SchedulerRef {
    Arc::new(self.clone())
  }

  /// Executes queued items in `(due, seq)` order until the queue is idle,
  /// advancing the clock to each item's due time.
  pub fn run(&self) {
    while let Some(item) = self.pop_due(None) {
      log::trace!(
        "virtual clock: running item #{} at {:?}",
        item.seq,
        item.due
      );
      (item.action)();
    }
  }

  /// Like [`run`](TestScheduler::run) but only consumes items due at or
  /// before `limit`; afterwards the clock reads exactly `limit`.
  pub fn run_to(&self, limit: Instant) {
    while let Some(item) = self.pop_due(Some(limit)) {
      (item.action)();
    }
    let mut queue = self.inner.lock().unwrap();
    if limit > queue.now {
      queue.now = limit;
    }
  }

  fn pop_due(&self, limit: Option<Instant>) -> Option<VirtualItem> {
    let mut queue = self.inner.lock().unwrap();
    loop {
      let within_limit = queue
        .items
        .peek()
        .map(|item| limit.map_or(true, |limit| item.due <= limit))?;
      if !within_limit {
        return None;
      }
      let item = queue.items.pop().unwrap();
      if item.cancelled.load(Ordering::Acquire) {
        continue;
      }
      // Time is monotonic: an overdue item runs at `now`, never before it.
      if item.due > queue.now {
        queue.now = item.due;
      }
      return Some(item);
    }
  }

  fn enqueue(&self, due: Instant, action: Action) -> BoxSubscription {
    let handle = BoolSubscription::new();
    let mut queue = self.inner.lock().unwrap();
    let due = due.max(queue.now);
    let seq = queue.seq;
    queue.seq += 1;
    queue.items.push(VirtualItem {
      due,
      seq,
      cancelled: handle.flag(),
      action,
    });
    Box::new(handle)
  }
}

impl Scheduler for TestScheduler {
  fn now(&self) -> Instant {
    self.inner.lock().unwrap().now
  }

  fn schedule(&self, action: Action) -> BoxSubscription {
    // One tick, so "as soon as possible" steps get distinct timestamps.
    let due = self.now() + Duration::from_nanos(1);
    self.enqueue(due, action)
  }

  fn schedule_after(
    &self,
    delay: Duration,
    action: Action,
  ) -> BoxSubscription {
    let due = self.now() + delay;
    self.enqueue(due, action)
  }

  fn schedule_at(&self, due: Instant, action: Action) -> BoxSubscription {
    self.enqueue(due, action)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::subscription::SubscriptionLike;

  fn recorder() -> (Arc<Mutex<Vec<(u64, u64)>>>, TestScheduler) {
    (Arc::new(Mutex::new(Vec::new())), TestScheduler::new())
  }

  #[test]
  fn run_advances_to_each_due_time() {
    let (seen, scheduler) = recorder();
    for ticks in [30u64, 10, 20] {
      let c_seen = seen.clone();
      let c_scheduler = scheduler.clone();
      scheduler.schedule_at(
        Instant::from_ticks(ticks),
        Box::new(move || {
          c_seen
            .lock()
            .unwrap()
            .push((ticks, c_scheduler.now().ticks()));
        }),
      );
    }

    scheduler.run();
    assert_eq!(
      *seen.lock().unwrap(),
      vec![(10, 10), (20, 20), (30, 30)]
    );
  }

  #[test]
  fn overdue_items_run_at_now() {
    let scheduler = TestScheduler::new();
    scheduler.run_to(Instant::from_ticks(100));

    let observed = Arc::new(Mutex::new(0));
    let c_observed = observed.clone();
    let c_scheduler = scheduler.clone();
    scheduler.schedule_at(
      Instant::from_ticks(40),
      Box::new(move || {
        *c_observed.lock().unwrap() = c_scheduler.now().ticks();
      }),
    );
    scheduler.run();

    assert_eq!(*observed.lock().unwrap(), 100);
    assert_eq!(scheduler.now().ticks(), 100);
  }

  #[test]
  fn ties_run_in_registration_order() {
    let (seen, scheduler) = recorder();
    for seq in 0..5u64 {
      let c_seen = seen.clone();
      scheduler.schedule_at(
        Instant::from_ticks(50),
        Box::new(move || c_seen.lock().unwrap().push((seq, 50))),
      );
    }
    scheduler.run();

    let order: Vec<u64> =
      seen.lock().unwrap().iter().map(|(seq, _)| *seq).collect();
    assert_eq!(order, vec![0, 1, 2, 3, 4]);
  }

  #[test]
  fn run_to_stops_at_limit_and_sets_now() {
    let (seen, scheduler) = recorder();
    for ticks in [10u64, 20, 30] {
      let c_seen = seen.clone();
      scheduler.schedule_at(
        Instant::from_ticks(ticks),
        Box::new(move || c_seen.lock().unwrap().push((ticks, ticks))),
      );
    }

    scheduler.run_to(Instant::from_ticks(25));
    assert_eq!(*seen.lock().unwrap(), vec![(10, 10), (20, 20)]);
    assert_eq!(scheduler.now().ticks(), 25);

    scheduler.run();
    assert_eq!(seen.lock().unwrap().len(), 3);
  }

  #[test]
  fn cancellation_skips_execution() {
    let scheduler = TestScheduler::new();
    let ran = Arc::new(Mutex::new(false));
    let c_ran = ran.clone();
    let mut pending = scheduler.schedule_at(
      Instant::from_ticks(10),
      Box::new(move || *c_ran.lock().unwrap() = true),
    );
    pending.unsubscribe();
    scheduler.run();
    assert!(!*ran.lock().unwrap());
  }

  #[test]
  fn immediate_schedule_costs_one_tick() {
    let scheduler = TestScheduler::new();
    scheduler.run_to(Instant::from_ticks(200));

    let observed = Arc::new(Mutex::new(0));
    let c_observed = observed.clone();
    let c_scheduler = scheduler.clone();
    scheduler.schedule(Box::new(move || {
      *c_observed.lock().unwrap() = c_scheduler.now().ticks();
    }));
    scheduler.run();

    assert_eq!(*observed.lock().unwrap(), 201);
  }

  #[test]
  fn actions_may_schedule_more_work() {
    let scheduler = TestScheduler::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let c_seen = seen.clone();
    let c_scheduler = scheduler.clone();

    scheduler.schedule_at(
      Instant::from_ticks(10),
      Box::new(move || {
        c_seen.lock().unwrap().push(10);
        let inner_seen = c_seen.clone();
        c_scheduler.schedule_after(
          Duration::from_nanos(5),
          Box::new(move || inner_seen.lock().unwrap().push(15)),
        );
      }),
    );
    scheduler.run();

    assert_eq!(*seen.lock().unwrap(), vec![10, 15]);
  }
}
