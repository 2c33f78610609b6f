use crate::scheduler::{clock_now, Action, Duration, Instant, Scheduler};
use crate::subscription::{BoxSubscription, NoopSubscription};

/// Runs every action synchronously on the calling thread.
///
/// This is the scheduler behind the synchronous factories (`of`, `empty`,
/// `throw`): emission happens inside `subscribe`. It has no queue and no
/// clock of its own, so it cannot host delayed work — callers of delayed
/// APIs must pass a scheduler that can defer.
#[derive(Clone, Copy, Default)]
pub struct ImmediateScheduler;

impl Scheduler for ImmediateScheduler {
  fn now(&self) -> Instant {
    clock_now()
  }

  fn schedule_after(
    &self,
    delay: Duration,
    action: Action,
  ) -> BoxSubscription {
    assert!(
      delay.is_zero(),
      "ImmediateScheduler cannot run delayed work; \
       pass a scheduler with a queue (current_thread, thread_pool, or a \
       TestScheduler)"
    );
    action();
    Box::new(NoopSubscription)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::subscription::SubscriptionLike;
  use std::sync::{Arc, Mutex};

  #[test]
  fn runs_inline() {
    let ran = Arc::new(Mutex::new(false));
    let c_ran = ran.clone();
    let subscription = ImmediateScheduler
      .schedule(Box::new(move || *c_ran.lock().unwrap() = true));
    assert!(*ran.lock().unwrap());
    assert!(subscription.is_closed());
  }

  #[test]
  #[should_panic(expected = "cannot run delayed work")]
  fn rejects_delays() {
    ImmediateScheduler
      .schedule_after(Duration::from_millis(1), Box::new(|| {}));
  }
}
