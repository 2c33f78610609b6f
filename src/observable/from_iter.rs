use crate::observable::Observable;
use crate::scheduler::{self, SchedulerExt, SchedulerRef};

/// Converts an iterable into an observable, emitting on the current-thread
/// trampoline.
///
/// The whole sequence drains before `subscribe` returns, one trampoline
/// step per element, so downstream combinators that re-enter `subscribe`
/// (a `concat` transition, say) run between steps instead of growing the
/// stack.
///
/// ```
/// use brook::prelude::*;
///
/// let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
/// let c_seen = seen.clone();
/// let numbers: Observable<i32> = observable::from_iter(vec![1, 2, 3]);
/// numbers.subscribe(move |v| c_seen.lock().unwrap().push(v));
/// assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
/// ```
pub fn from_iter<I, Err>(iter: I) -> Observable<I::Item, Err>
where
  I: IntoIterator + Clone + Send + Sync + 'static,
  I::IntoIter: Send,
  I::Item: Send + 'static,
  Err: Send + 'static,
{
  from_iter_on(iter, scheduler::current_thread())
}

/// Converts an iterable into an observable emitting on `scheduler`.
///
/// Each element is one recursive-scheduling step: the step emits the
/// element and re-enqueues itself, and the final step emits the
/// completion. Closing the subscription between steps cancels the pending
/// step, so no further element is delivered. The scheduler must be one
/// that queues work.
pub fn from_iter_on<I, Err>(
  iter: I,
  scheduler: SchedulerRef,
) -> Observable<I::Item, Err>
where
  I: IntoIterator + Clone + Send + Sync + 'static,
  I::IntoIter: Send,
  I::Item: Send + 'static,
  Err: Send + 'static,
{
  Observable::create_with_subscription(move |mut observer| {
    let mut elements = iter.clone().into_iter();
    let subscription = scheduler.schedule_recursive(move |recursion| {
      match elements.next() {
        Some(value) => {
          observer.next(value);
          recursion.recurse();
        }
        None => observer.complete(),
      }
    });
    Box::new(subscription)
  })
}
