use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::notification::Notification;
use crate::observable::{BoxObserver, Observable};
use crate::observer::Observer;
use crate::scheduler::{Scheduler, SchedulerRef};
use crate::subscription::{
  CompositeSubscription, SerialSubscription, SubscriptionLike,
};

struct ObserveOnCore<Item, Err> {
  queue: Mutex<VecDeque<Notification<Item, Err>>>,
  depth: AtomicUsize,
  observer: Mutex<BoxObserver<Item, Err>>,
  lifetime: CompositeSubscription,
  drain_slot: SerialSubscription,
}

struct ObserveOnObserver<Item, Err> {
  core: Arc<ObserveOnCore<Item, Err>>,
  scheduler: SchedulerRef,
}

impl<Item, Err> ObserveOnObserver<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  fn push(&self, notification: Notification<Item, Err>) {
    self.core.queue.lock().unwrap().push_back(notification);
    // Only the producer that takes the depth from 0 to 1 wakes the
    // consumer; while the consumer runs, depth stays above zero.
    if self.core.depth.fetch_add(1, Ordering::AcqRel) == 0 {
      schedule_drain(&self.core, &self.scheduler);
    }
  }
}

fn schedule_drain<Item, Err>(
  core: &Arc<ObserveOnCore<Item, Err>>,
  scheduler: &SchedulerRef,
) where
  Item: Send + 'static,
  Err: Send + 'static,
{
  let c_core = core.clone();
  let c_scheduler = scheduler.clone();
  core.drain_slot.clear_and_set(move || {
    c_scheduler.clone().schedule(Box::new(move || {
      drain_one(&c_core, &c_scheduler);
    }))
  });
}

fn drain_one<Item, Err>(
  core: &Arc<ObserveOnCore<Item, Err>>,
  scheduler: &SchedulerRef,
) where
  Item: Send + 'static,
  Err: Send + 'static,
{
  let notification = core.queue.lock().unwrap().pop_front();
  let Some(notification) = notification else {
    return;
  };
  if notification.is_terminal() {
    // Shut the upstream down before the terminal is observed.
    core.lifetime.clone().unsubscribe();
  }
  notification.accept(&mut *core.observer.lock().unwrap());
  if core.depth.fetch_sub(1, Ordering::AcqRel) > 1 {
    schedule_drain(core, scheduler);
  }
}

impl<Item, Err> Observer<Item, Err> for ObserveOnObserver<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  fn next(&mut self, value: Item) {
    self.push(Notification::Next(value));
  }
  fn error(&mut self, err: Err) {
    self.push(Notification::Error(err));
  }
  fn complete(&mut self) {
    self.push(Notification::Completed);
  }
}

impl<Item, Err> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  /// Re-delivers every notification on `scheduler`, preserving order.
  ///
  /// The producer writes into an unbounded FIFO; a consumer action on
  /// `scheduler` forwards one notification at a time and reschedules
  /// itself while the queue is non-empty. A terminal notification closes
  /// the upstream subscription before being forwarded.
  pub fn observe_on(self, scheduler: SchedulerRef) -> Observable<Item, Err> {
    Observable::create_with_subscription(move |observer| {
      let lifetime = CompositeSubscription::new();
      let drain_slot = SerialSubscription::new();
      lifetime.add(Box::new(drain_slot.clone()));

      let core = Arc::new(ObserveOnCore {
        queue: Mutex::new(VecDeque::new()),
        depth: AtomicUsize::new(0),
        observer: Mutex::new(observer),
        lifetime: lifetime.clone(),
        drain_slot,
      });

      let upstream_slot = SerialSubscription::new();
      lifetime.add(Box::new(upstream_slot.clone()));
      let upstream = self.subscribe_observer(ObserveOnObserver {
        core,
        scheduler: scheduler.clone(),
      });
      upstream_slot.set(Box::new(upstream));

      Box::new(lifetime)
    })
  }
}
