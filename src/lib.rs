//! Push-based reactive sequences.
//!
//! An [`Observable`](observable::Observable) is a lazy push source of
//! notifications: values, then at most one terminal (`complete` or
//! `error`). Subscribing returns a
//! [`SerialSubscription`](subscription::SerialSubscription) handle;
//! closing it is the only flow-control signal that travels against the
//! push direction.
//!
//! Emission is driven by a [`Scheduler`](scheduler::Scheduler): inline
//! (immediate), through a per-thread trampoline (current-thread), on a
//! thread pool, or under a deterministic virtual clock
//! ([`TestScheduler`](scheduler::TestScheduler)) that the test harness in
//! [`testing`] builds on.
//!
//! ```
//! use brook::prelude::*;
//!
//! let sum = std::sync::Arc::new(std::sync::Mutex::new(0));
//! let c_sum = sum.clone();
//! let numbers: Observable<i32> = observable::from_iter(1..=4);
//! numbers
//!   .filter(|v| v % 2 == 0)
//!   .map(|v| v * 10)
//!   .subscribe(move |v| *c_sum.lock().unwrap() += v);
//! assert_eq!(*sum.lock().unwrap(), 60);
//! ```

#[macro_use]
extern crate lazy_static;

pub mod notification;
pub mod observable;
pub mod observer;
pub mod ops;
pub mod scheduler;
pub mod subscriber;
pub mod subscription;
pub mod testing;

pub mod prelude {
  pub use crate::notification::Notification;
  pub use crate::observable;
  pub use crate::observable::{BoxObserver, Observable};
  pub use crate::observer::{Observer, SynchronizedObserver};
  pub use crate::ops::{BlockingError, BlockingIter, TimeoutError};
  pub use crate::scheduler;
  pub use crate::scheduler::{
    Action, CurrentThreadScheduler, Duration, ImmediateScheduler, Instant,
    Recursion, Scheduler, SchedulerExt, SchedulerRef, TestScheduler,
    ThreadPoolScheduler,
  };
  pub use crate::subscriber::Subscriber;
  pub use crate::subscription::{
    ActionSubscription, BoolSubscription, BoxSubscription,
    CompositeSubscription, NoopSubscription, SerialSubscription,
    SubscriptionLike,
  };
  pub use crate::testing::{
    HotObservable, Recorded, SubscriptionRecord, TestObserver,
  };
}
