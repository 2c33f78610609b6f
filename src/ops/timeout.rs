use thiserror::Error;

use crate::observable::{self, Observable};
use crate::scheduler::{Duration, SchedulerRef};
use crate::subscription::NoopSubscription;

/// No notification arrived within the allotted time.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("observable timed out after {duration:?}")]
pub struct TimeoutError {
  pub duration: Duration,
}

impl<Item, Err> Observable<Item, Err>
where
  Item: Clone + Send + Sync + 'static,
  Err: Send + 'static,
{
  /// Mirrors the source unless its first notification takes longer than
  /// `due`, in which case the sequence fails with [`TimeoutError`].
  pub fn timeout(
    self,
    due: Duration,
    scheduler: SchedulerRef,
  ) -> Observable<Item, Err>
  where
    Err: From<TimeoutError>,
  {
    let fallback = Observable::create_with_subscription(move |mut observer| {
      observer.error(Err::from(TimeoutError { duration: due }));
      Box::new(NoopSubscription)
    });
    self.timeout_or(due, fallback, scheduler)
  }

  /// Mirrors the source unless its first notification takes longer than
  /// `due`, in which case `fallback` takes over.
  ///
  /// Built as a race: the source (values wrapped in `Some`) against a
  /// timer firing `None` at `due`. Whichever side speaks first wins the
  /// race outright, so a source that produces in time means `fallback` is
  /// never subscribed.
  pub fn timeout_or(
    self,
    due: Duration,
    fallback: Observable<Item, Err>,
    scheduler: SchedulerRef,
  ) -> Observable<Item, Err> {
    let deadline: Observable<Option<Item>, Err> =
      observable::timer(due, scheduler).map(|_| None);
    self
      .map(Some)
      .amb(deadline)
      .flat_map(move |winner| match winner {
        Some(value) => observable::of(value),
        None => fallback.clone(),
      })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::scheduler::{Instant, TestScheduler};
  use std::sync::{Arc, Mutex};

  #[test]
  fn source_in_time_passes_through() {
    let scheduler = TestScheduler::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let completed = Arc::new(Mutex::new(false));
    let c_seen = seen.clone();
    let c_completed = completed.clone();

    let source: Observable<&str> =
      observable::from_iter_on(vec!["a", "b"], scheduler.handle());
    source
      .timeout_or(
        Duration::from_nanos(100),
        observable::of("late"),
        scheduler.handle(),
      )
      .subscribe_all(
        move |v| c_seen.lock().unwrap().push(v),
        |_| {},
        move || *c_completed.lock().unwrap() = true,
      );
    scheduler.run();

    assert_eq!(*seen.lock().unwrap(), vec!["a", "b"]);
    assert!(*completed.lock().unwrap());
  }

  #[test]
  fn silence_switches_to_fallback() {
    let scheduler = TestScheduler::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let c_seen = seen.clone();

    let source: Observable<&str> = observable::never();
    source
      .timeout_or(
        Duration::from_nanos(50),
        observable::of("fallback"),
        scheduler.handle(),
      )
      .subscribe(move |v| c_seen.lock().unwrap().push(v));
    scheduler.run_to(Instant::from_ticks(200));

    assert_eq!(*seen.lock().unwrap(), vec!["fallback"]);
  }

  #[test]
  fn silence_without_fallback_errors() {
    let scheduler = TestScheduler::new();
    let error = Arc::new(Mutex::new(None));
    let c_error = error.clone();

    let source: Observable<i32, TimeoutError> = observable::never();
    source
      .timeout(Duration::from_nanos(25), scheduler.handle())
      .subscribe_all(
        |_| {},
        move |e| *c_error.lock().unwrap() = Some(e),
        || {},
      );
    scheduler.run_to(Instant::from_ticks(100));

    assert_eq!(
      *error.lock().unwrap(),
      Some(TimeoutError {
        duration: Duration::from_nanos(25)
      })
    );
  }
}
