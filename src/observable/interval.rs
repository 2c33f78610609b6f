use crate::observable::Observable;
use crate::scheduler::{Duration, SchedulerExt, SchedulerRef};

/// Creates an observable that emits 0, 1, 2, … spaced by `period`.
///
/// Emission is a recursive schedule: each tick emits the counter and
/// re-enqueues itself `period` later, so closing the subscription cancels
/// the pending tick and the sequence stops. The sequence never completes
/// on its own; bound it with `take` or `take_until`.
pub fn interval<Err>(
  period: Duration,
  scheduler: SchedulerRef,
) -> Observable<usize, Err>
where
  Err: Send + 'static,
{
  Observable::create_with_subscription(move |mut observer| {
    let mut count: usize = 0;
    let subscription =
      scheduler.schedule_recursive_after(period, move |recursion| {
        observer.next(count);
        count += 1;
        recursion.recurse_after(period);
      });
    Box::new(subscription)
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::scheduler::{Instant, Scheduler, TestScheduler};
  use std::convert::Infallible;
  use std::sync::{Arc, Mutex};

  #[test]
  fn emits_counter_at_each_period() {
    let scheduler = TestScheduler::new();
    let stamps = Arc::new(Mutex::new(Vec::new()));
    let c_stamps = stamps.clone();
    let c_scheduler = scheduler.clone();

    interval::<Infallible>(Duration::from_nanos(10), scheduler.handle())
      .subscribe(move |v| {
        c_stamps.lock().unwrap().push((v, c_scheduler.now().ticks()))
      });
    scheduler.run_to(Instant::from_ticks(35));

    assert_eq!(
      *stamps.lock().unwrap(),
      vec![(0, 10), (1, 20), (2, 30)]
    );
  }

  #[test]
  fn unsubscribing_stops_the_ticks() {
    use crate::subscription::SubscriptionLike;

    let scheduler = TestScheduler::new();
    let hits = Arc::new(Mutex::new(0));
    let c_hits = hits.clone();

    let mut subscription =
      interval::<Infallible>(Duration::from_nanos(5), scheduler.handle())
        .subscribe(move |_| *c_hits.lock().unwrap() += 1);

    scheduler.run_to(Instant::from_ticks(12));
    assert_eq!(*hits.lock().unwrap(), 2);

    subscription.unsubscribe();
    scheduler.run_to(Instant::from_ticks(100));
    assert_eq!(*hits.lock().unwrap(), 2);
  }
}
