use crate::observable::Observable;
use crate::scheduler::{Duration, Scheduler, SchedulerRef};

/// Creates an observable that emits a single `0` at `due` time into the
/// future, then completes.
///
/// Closing the subscription before `due` cancels the pending emission.
pub fn timer<Err>(
  due: Duration,
  scheduler: SchedulerRef,
) -> Observable<usize, Err>
where
  Err: Send + 'static,
{
  Observable::create_with_subscription(move |mut observer| {
    scheduler.schedule_after(
      due,
      Box::new(move || {
        observer.next(0);
        observer.complete();
      }),
    )
  })
}
