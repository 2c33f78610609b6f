use crate::observable::Observable;
use crate::scheduler::{Scheduler, SchedulerRef};
use crate::subscription::{ActionSubscription, NoopSubscription};

/// Creates an observable that produces no values and completes
/// immediately.
pub fn empty<Item, Err>() -> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  Observable::create_with_subscription(|mut observer| {
    observer.complete();
    Box::new(NoopSubscription)
  })
}

/// Like [`empty`] but the completion is delivered as a scheduled step on
/// `scheduler`.
pub fn empty_on<Item, Err>(scheduler: SchedulerRef) -> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  Observable::create_with_subscription(move |mut observer| {
    scheduler.schedule(Box::new(move || observer.complete()))
  })
}

/// Creates an observable that emits no items, just terminates with an
/// error.
pub fn throw<Item, Err>(err: Err) -> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Clone + Send + Sync + 'static,
{
  Observable::create_with_subscription(move |mut observer| {
    observer.error(err.clone());
    Box::new(NoopSubscription)
  })
}

/// Like [`throw`] but the error is delivered as a scheduled step on
/// `scheduler`.
pub fn throw_on<Item, Err>(
  err: Err,
  scheduler: SchedulerRef,
) -> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Clone + Send + Sync + 'static,
{
  Observable::create_with_subscription(move |mut observer| {
    let err = err.clone();
    scheduler.schedule(Box::new(move || observer.error(err)))
  })
}

/// Creates an observable that never emits anything.
///
/// The observer is held alive until the subscription is closed.
pub fn never<Item, Err>() -> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  Observable::create_with_subscription(|observer| {
    Box::new(ActionSubscription::new(move || drop(observer)))
  })
}
