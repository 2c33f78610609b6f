use crate::observable::{from_iter_on, Observable};
use crate::scheduler::SchedulerRef;
use crate::subscription::NoopSubscription;

/// Creates an observable that emits `value` and completes, synchronously
/// inside `subscribe`.
///
/// ```
/// use brook::prelude::*;
///
/// let seen = std::sync::Arc::new(std::sync::Mutex::new(None));
/// let c_seen = seen.clone();
/// let one: Observable<i32> = observable::of(1);
/// one.subscribe(move |v| *c_seen.lock().unwrap() = Some(v));
/// assert_eq!(*seen.lock().unwrap(), Some(1));
/// ```
pub fn of<Item, Err>(value: Item) -> Observable<Item, Err>
where
  Item: Clone + Send + Sync + 'static,
  Err: Send + 'static,
{
  Observable::create_with_subscription(move |mut observer| {
    observer.next(value.clone());
    observer.complete();
    Box::new(NoopSubscription)
  })
}

/// Like [`of`] but each notification is delivered as its own step on
/// `scheduler`, so under a virtual clock the value and the completion land
/// on consecutive instants.
///
/// The scheduler must be one that queues work.
pub fn of_on<Item, Err>(
  value: Item,
  scheduler: SchedulerRef,
) -> Observable<Item, Err>
where
  Item: Clone + Send + Sync + 'static,
  Err: Send + 'static,
{
  from_iter_on(std::iter::once(value), scheduler)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::scheduler::{Instant, Scheduler, TestScheduler};
  use std::sync::{Arc, Mutex};

  #[test]
  fn emits_value_then_completes() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let c_events = events.clone();
    let c_completed = events.clone();
    let observable: Observable<&str> = of("v");
    observable.subscribe_all(
      move |v| c_events.lock().unwrap().push(format!("next:{v}")),
      |_| {},
      move || c_completed.lock().unwrap().push("complete".into()),
    );

    assert_eq!(*events.lock().unwrap(), vec!["next:v", "complete"]);
  }

  #[test]
  fn scheduled_variant_steps_through_virtual_time() {
    let scheduler = TestScheduler::new();
    scheduler.run_to(Instant::from_ticks(200));

    let stamps = Arc::new(Mutex::new(Vec::new()));
    let c_stamps = stamps.clone();
    let c_done = stamps.clone();
    let c_scheduler = scheduler.clone();
    let d_scheduler = scheduler.clone();
    let observable: Observable<&str> = of_on("v", scheduler.handle());
    observable.subscribe_all(
      move |_| c_stamps
        .lock()
        .unwrap()
        .push(("next", c_scheduler.now().ticks())),
      |_| {},
      move || c_done
        .lock()
        .unwrap()
        .push(("complete", d_scheduler.now().ticks())),
    );
    scheduler.run();

    assert_eq!(
      *stamps.lock().unwrap(),
      vec![("next", 201), ("complete", 202)]
    );
  }
}
