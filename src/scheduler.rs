//! Scheduling: when and where an action runs.
//!
//! Observables never spawn threads by themselves; everything that defers
//! or relocates work goes through a [`Scheduler`]. Four realizations ship
//! with the crate:
//!
//! - [`ImmediateScheduler`] — runs actions inline on the caller;
//! - [`CurrentThreadScheduler`] — a per-thread trampoline queue, giving
//!   recursive emission a bounded stack;
//! - [`ThreadPoolScheduler`] — a `futures` thread pool with real-time
//!   delays;
//! - [`TestScheduler`] — a virtual clock advanced explicitly, for
//!   deterministic tests.

use std::sync::{Arc, Mutex};
use std::time::Instant as StdInstant;

pub use std::time::Duration;

mod current_thread;
mod immediate;
mod test_scheduler;
mod thread_pool;

pub use current_thread::CurrentThreadScheduler;
pub use immediate::ImmediateScheduler;
pub use test_scheduler::TestScheduler;
pub use thread_pool::ThreadPoolScheduler;

use crate::subscription::{BoxSubscription, SerialSubscription};

/// Monotonic logical time, measured in ticks.
///
/// One tick corresponds to one nanosecond when a scheduler maps logical
/// time onto the real clock; under the virtual [`TestScheduler`] a tick is
/// just a step of the simulated clock. Adding a [`Duration`] never
/// decreases an instant (the addition saturates instead of wrapping).
#[derive(
  Clone, Copy, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord,
)]
pub struct Instant(u64);

impl Instant {
  pub const ZERO: Instant = Instant(0);

  #[inline]
  pub const fn from_ticks(ticks: u64) -> Self {
    Instant(ticks)
  }

  #[inline]
  pub const fn ticks(self) -> u64 {
    self.0
  }

  /// Duration elapsed since `earlier`, zero when `earlier` is later.
  pub fn saturating_duration_since(self, earlier: Instant) -> Duration {
    Duration::from_nanos(self.0.saturating_sub(earlier.0))
  }
}

impl std::ops::Add<Duration> for Instant {
  type Output = Instant;

  fn add(self, duration: Duration) -> Instant {
    let ticks = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
    Instant(self.0.saturating_add(ticks))
  }
}

/// A unit of work handed to a scheduler.
pub type Action = Box<dyn FnOnce() + Send>;

/// Shared handle to a scheduler.
pub type SchedulerRef = Arc<dyn Scheduler>;

/// Orders actions in logical or real time.
///
/// Every scheduling method returns a subscription that cancels the pending
/// action; an action already running completes.
pub trait Scheduler: Send + Sync {
  /// The scheduler's view of the current time.
  fn now(&self) -> Instant;

  /// Runs `action` once `delay` has elapsed.
  fn schedule_after(&self, delay: Duration, action: Action)
    -> BoxSubscription;

  /// Runs `action` as soon as possible.
  fn schedule(&self, action: Action) -> BoxSubscription {
    self.schedule_after(Duration::ZERO, action)
  }

  /// Runs `action` at the absolute instant `due`; a `due` in the past
  /// runs as soon as possible.
  fn schedule_at(&self, due: Instant, action: Action) -> BoxSubscription {
    self.schedule_after(due.saturating_duration_since(self.now()), action)
  }
}

lazy_static! {
  static ref CLOCK_EPOCH: StdInstant = StdInstant::now();
  static ref IMMEDIATE: SchedulerRef = Arc::new(ImmediateScheduler);
  static ref CURRENT_THREAD: SchedulerRef =
    Arc::new(CurrentThreadScheduler);
  static ref THREAD_POOL: SchedulerRef = Arc::new(ThreadPoolScheduler::new());
}

/// Logical reading of the process-wide monotonic clock, shared by the
/// real-time schedulers so their `now` values are comparable.
pub(crate) fn clock_now() -> Instant {
  let elapsed = CLOCK_EPOCH.elapsed();
  Instant::from_ticks(u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX))
}

/// Shared [`ImmediateScheduler`] instance.
pub fn immediate() -> SchedulerRef {
  IMMEDIATE.clone()
}

/// Shared [`CurrentThreadScheduler`] instance.
pub fn current_thread() -> SchedulerRef {
  CURRENT_THREAD.clone()
}

/// Shared [`ThreadPoolScheduler`] instance, built lazily on first use.
pub fn thread_pool() -> SchedulerRef {
  THREAD_POOL.clone()
}

type RecursiveBody = dyn FnMut(&Recursion) + Send;

/// Handle passed to a recursively scheduled body; calling
/// [`recurse`](Recursion::recurse) re-enqueues the body for another step.
pub struct Recursion {
  scheduler: SchedulerRef,
  slot: SerialSubscription,
  body: Arc<Mutex<RecursiveBody>>,
}

impl Clone for Recursion {
  fn clone(&self) -> Self {
    Recursion {
      scheduler: self.scheduler.clone(),
      slot: self.slot.clone(),
      body: self.body.clone(),
    }
  }
}

impl Recursion {
  /// Re-enqueues the body to run as soon as possible.
  pub fn recurse(&self) {
    self.enqueue(None);
  }

  /// Re-enqueues the body to run after `delay`.
  pub fn recurse_after(&self, delay: Duration) {
    self.enqueue(Some(delay));
  }

  fn enqueue(&self, delay: Option<Duration>) {
    let ctx = self.clone();
    let scheduler = self.scheduler.clone();
    self.slot.clear_and_set(move || {
      let action: Action = Box::new(move || {
        let body = ctx.body.clone();
        let mut body = body.lock().unwrap();
        (*body)(&ctx);
      });
      match delay {
        Some(delay) => scheduler.schedule_after(delay, action),
        None => scheduler.schedule(action),
      }
    });
  }
}

/// Recursive scheduling, the mechanism iterable emission is built on.
///
/// Each step runs the body once; the body decides whether to continue by
/// calling [`Recursion::recurse`] (or `recurse_after`). Closing the
/// returned subscription cancels the pending step, so cancellation takes
/// effect between steps without the body polling a flag.
///
/// The scheduler must be one that queues work (current-thread, thread
/// pool, or virtual): on the immediate scheduler a recursing body would
/// re-enter itself.
pub trait SchedulerExt {
  fn schedule_recursive(
    &self,
    body: impl FnMut(&Recursion) + Send + 'static,
  ) -> SerialSubscription;

  fn schedule_recursive_after(
    &self,
    delay: Duration,
    body: impl FnMut(&Recursion) + Send + 'static,
  ) -> SerialSubscription;
}

impl SchedulerExt for SchedulerRef {
  fn schedule_recursive(
    &self,
    body: impl FnMut(&Recursion) + Send + 'static,
  ) -> SerialSubscription {
    recursive_start(self.clone(), None, body)
  }

  fn schedule_recursive_after(
    &self,
    delay: Duration,
    body: impl FnMut(&Recursion) + Send + 'static,
  ) -> SerialSubscription {
    recursive_start(self.clone(), Some(delay), body)
  }
}

fn recursive_start(
  scheduler: SchedulerRef,
  delay: Option<Duration>,
  body: impl FnMut(&Recursion) + Send + 'static,
) -> SerialSubscription {
  let ctx = Recursion {
    scheduler,
    slot: SerialSubscription::new(),
    body: Arc::new(Mutex::new(body)),
  };
  ctx.enqueue(delay);
  ctx.slot
}
