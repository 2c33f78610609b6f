use std::cell::RefCell;
use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crate::scheduler::{clock_now, Action, Duration, Instant, Scheduler};
use crate::subscription::{BoolSubscription, BoxSubscription};

struct QueuedAction {
  due: Instant,
  seq: u64,
  cancelled: Arc<AtomicBool>,
  action: Action,
}

impl PartialEq for QueuedAction {
  fn eq(&self, other: &Self) -> bool {
    self.due == other.due && self.seq == other.seq
  }
}

impl Eq for QueuedAction {}

impl PartialOrd for QueuedAction {
  fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
    Some(self.cmp(other))
  }
}

impl Ord for QueuedAction {
  fn cmp(&self, other: &Self) -> CmpOrdering {
    // Min-heap: earliest due time first, registration order for ties.
    other
      .due
      .cmp(&self.due)
      .then_with(|| other.seq.cmp(&self.seq))
  }
}

#[derive(Default)]
struct Trampoline {
  items: BinaryHeap<QueuedAction>,
  seq: u64,
}

thread_local! {
  static TRAMPOLINE: RefCell<Option<Trampoline>> = const { RefCell::new(None) };
}

/// A per-thread trampoline.
///
/// The first `schedule` call on a thread installs a queue, drains it until
/// empty, then uninstalls it. Re-entrant `schedule` calls enqueue instead
/// of recursing, which bounds stack depth for recursive emission. Actions
/// with equal due times run in registration order; a due time in the
/// future makes the draining thread sleep until it arrives.
#[derive(Clone, Copy, Default)]
pub struct CurrentThreadScheduler;

impl CurrentThreadScheduler {
  /// Runs `thunk` with the trampoline installed and drains any work it
  /// enqueued before returning its value.
  ///
  /// When the trampoline is already installed (a re-entrant call) the
  /// thunk runs directly and the outermost call keeps draining.
  pub fn run_immediate<R>(thunk: impl FnOnce() -> R) -> R {
    let installed_here = TRAMPOLINE.with(|queue| {
      let mut queue = queue.borrow_mut();
      if queue.is_none() {
        *queue = Some(Trampoline::default());
        true
      } else {
        false
      }
    });
    if !installed_here {
      return thunk();
    }

    log::trace!("current-thread trampoline installed");
    let value = thunk();
    drain();
    TRAMPOLINE.with(|queue| *queue.borrow_mut() = None);
    log::trace!("current-thread trampoline uninstalled");
    value
  }
}

fn drain() {
  loop {
    let next = TRAMPOLINE.with(|queue| {
      queue
        .borrow_mut()
        .as_mut()
        .and_then(|trampoline| trampoline.items.pop())
    });
    let Some(item) = next else {
      break;
    };
    if item.cancelled.load(Ordering::Acquire) {
      continue;
    }
    let wait = item.due.saturating_duration_since(clock_now());
    if !wait.is_zero() {
      thread::sleep(wait);
    }
    (item.action)();
  }
}

impl Scheduler for CurrentThreadScheduler {
  fn now(&self) -> Instant {
    clock_now()
  }

  fn schedule_after(
    &self,
    delay: Duration,
    action: Action,
  ) -> BoxSubscription {
    let handle = BoolSubscription::new();
    let item = QueuedAction {
      due: clock_now() + delay,
      seq: 0,
      cancelled: handle.flag(),
      action,
    };

    let installed_here = TRAMPOLINE.with(|queue| {
      let mut queue = queue.borrow_mut();
      match queue.as_mut() {
        Some(trampoline) => {
          push(trampoline, item);
          false
        }
        None => {
          let mut trampoline = Trampoline::default();
          push(&mut trampoline, item);
          *queue = Some(trampoline);
          true
        }
      }
    });

    if installed_here {
      drain();
      TRAMPOLINE.with(|queue| *queue.borrow_mut() = None);
    }
    Box::new(handle)
  }
}

fn push(trampoline: &mut Trampoline, mut item: QueuedAction) {
  item.seq = trampoline.seq;
  trampoline.seq += 1;
  trampoline.items.push(item);
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::Mutex;

  #[test]
  fn reentrant_schedules_run_in_order() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let c_order = order.clone();
    let scheduler = CurrentThreadScheduler;

    scheduler.schedule(Box::new(move || {
      c_order.lock().unwrap().push("outer");
      let inner_order = c_order.clone();
      CurrentThreadScheduler.schedule(Box::new(move || {
        inner_order.lock().unwrap().push("inner");
      }));
      c_order.lock().unwrap().push("outer-end");
    }));

    assert_eq!(
      *order.lock().unwrap(),
      vec!["outer", "outer-end", "inner"]
    );
  }

  #[test]
  fn run_immediate_drains_before_returning() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let c_seen = seen.clone();

    let value = CurrentThreadScheduler::run_immediate(|| {
      let inner = c_seen.clone();
      CurrentThreadScheduler
        .schedule(Box::new(move || inner.lock().unwrap().push(2)));
      c_seen.lock().unwrap().push(1);
      42
    });

    assert_eq!(value, 42);
    assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
  }

  #[test]
  fn cancelled_actions_are_skipped() {
    use crate::subscription::SubscriptionLike;

    let ran = Arc::new(Mutex::new(false));
    let c_ran = ran.clone();

    CurrentThreadScheduler::run_immediate(|| {
      let mut pending = CurrentThreadScheduler
        .schedule(Box::new(move || *c_ran.lock().unwrap() = true));
      pending.unsubscribe();
    });

    assert!(!*ran.lock().unwrap());
  }

  #[test]
  fn equal_due_times_run_in_registration_order() {
    let order = Arc::new(Mutex::new(Vec::new()));

    CurrentThreadScheduler::run_immediate(|| {
      for i in 0..5 {
        let c_order = order.clone();
        CurrentThreadScheduler
          .schedule(Box::new(move || c_order.lock().unwrap().push(i)));
      }
    });

    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
  }
}
