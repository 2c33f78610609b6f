use futures::executor::ThreadPool;
use futures::future::RemoteHandle;
use futures::task::SpawnExt;
use futures::FutureExt;
use futures_timer::Delay;

use crate::scheduler::{clock_now, Action, Duration, Instant, Scheduler};
use crate::subscription::{BoxSubscription, SubscriptionLike};

/// Schedules actions on a `futures` thread pool.
///
/// Delayed work parks on a timer future rather than a sleeping thread, so
/// many pending delays share the pool. This is the default home for
/// `interval` and `timer`.
pub struct ThreadPoolScheduler {
  pool: ThreadPool,
}

impl ThreadPoolScheduler {
  pub fn new() -> Self {
    ThreadPoolScheduler {
      pool: ThreadPool::new().expect("failed to build scheduler thread pool"),
    }
  }
}

impl Default for ThreadPoolScheduler {
  fn default() -> Self {
    Self::new()
  }
}

impl Scheduler for ThreadPoolScheduler {
  fn now(&self) -> Instant {
    clock_now()
  }

  fn schedule_after(
    &self,
    delay: Duration,
    action: Action,
  ) -> BoxSubscription {
    log::trace!("thread pool: spawning action due in {delay:?}");
    let task = Delay::new(delay).map(move |_| action());
    let handle = self
      .pool
      .spawn_with_handle(task)
      .expect("spawn task to thread pool failed.");
    Box::new(SpawnHandle(Some(handle)))
  }
}

/// Cancellation handle for a spawned task: unsubscribing drops the remote
/// handle, which aborts the task; dropping the handle without
/// unsubscribing lets the task run to completion.
pub(crate) struct SpawnHandle(Option<RemoteHandle<()>>);

impl SubscriptionLike for SpawnHandle {
  #[inline]
  fn unsubscribe(&mut self) {
    self.0.take();
  }

  #[inline]
  fn is_closed(&self) -> bool {
    self.0.is_none()
  }

  #[inline]
  fn inner_addr(&self) -> *const () {
    (&self.0 as *const _) as *const ()
  }
}

impl Drop for SpawnHandle {
  fn drop(&mut self) {
    if let Some(handle) = self.0.take() {
      handle.forget();
    }
  }
}
