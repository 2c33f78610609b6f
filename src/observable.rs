//! Observable construction and the subscription plumbing every operator
//! shares.

use std::convert::Infallible;
use std::fmt::Debug;
use std::sync::Arc;

mod from_iter;
mod interval;
mod of;
mod timer;
mod trivial;

pub use from_iter::{from_iter, from_iter_on};
pub use interval::interval;
pub use of::{of, of_on};
pub use timer::timer;
pub use trivial::{empty, empty_on, never, throw, throw_on};

use crate::observer::{CallbackObserver, Observer};
use crate::scheduler::CurrentThreadScheduler;
use crate::subscriber::Subscriber;
use crate::subscription::{
  ActionSubscription, BoxSubscription, SerialSubscription,
};

/// Observer trait object the subscribe delegates receive.
pub type BoxObserver<Item, Err> = Box<dyn Observer<Item, Err> + Send>;

type SubscribeFn<Item, Err> =
  dyn Fn(BoxObserver<Item, Err>) -> BoxSubscription + Send + Sync;

/// A lazy push source of notifications.
///
/// An `Observable` is a value wrapping a subscribe function; cloning is
/// cheap and clones share it, so the same observable can be subscribed any
/// number of times and each subscriber gets its own run (for cold
/// sources) or its own registration (for hot ones).
///
/// Every subscription is routed through a [`Subscriber`] wrapper, which
/// enforces the protocol — at most one terminal notification, nothing
/// after it — and closes the upstream subscription on the first terminal.
/// Subscribing happens inside the current-thread trampoline, so a source
/// that emits synchronously drains completely before `subscribe` returns.
pub struct Observable<Item, Err = Infallible> {
  source: Arc<SubscribeFn<Item, Err>>,
}

impl<Item, Err> Clone for Observable<Item, Err> {
  fn clone(&self) -> Self {
    Observable {
      source: self.source.clone(),
    }
  }
}

impl<Item, Err> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  /// The canonical factory: `delegate` is invoked per subscription with a
  /// protocol-enforcing observer and returns the subscription that tears
  /// the source down.
  pub fn create_with_subscription<F>(delegate: F) -> Self
  where
    F: Fn(BoxObserver<Item, Err>) -> BoxSubscription + Send + Sync + 'static,
  {
    Observable {
      source: Arc::new(delegate),
    }
  }

  /// Like [`create_with_subscription`](Observable::create_with_subscription)
  /// but the delegate returns a plain teardown thunk, run exactly once on
  /// the first close.
  pub fn create<F, T>(delegate: F) -> Self
  where
    F: Fn(BoxObserver<Item, Err>) -> T + Send + Sync + 'static,
    T: FnOnce() + Send + 'static,
  {
    Observable::create_with_subscription(move |observer| {
      let teardown = delegate(observer);
      Box::new(ActionSubscription::new(teardown))
    })
  }

  /// Subscribes `observer`, returning the handle that cancels the
  /// subscription.
  ///
  /// The observer is wrapped in a [`Subscriber`]; the returned serial slot
  /// is the same one the wrapper closes when the source terminates, so the
  /// handle observes both external and automatic unsubscription.
  pub fn subscribe_observer<O>(&self, observer: O) -> SerialSubscription
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    let upstream = SerialSubscription::new();
    let subscriber = Subscriber::new(observer, upstream.clone());
    let source = self.source.clone();
    let slot = upstream.clone();
    CurrentThreadScheduler::run_immediate(move || {
      let subscription = (source)(Box::new(subscriber));
      // A terminal delivered during the delegate has already closed the
      // slot; setting then closes the subscription right here.
      slot.set(subscription);
    });
    upstream
  }

  /// Subscribes with a value callback; completion is ignored and an error
  /// panics on the delivering thread (the unhandled-error default).
  pub fn subscribe<N>(&self, next: N) -> SerialSubscription
  where
    N: FnMut(Item) + Send + 'static,
    Err: Debug,
  {
    self.subscribe_all(
      next,
      |err| panic!("unhandled error in observable: {err:?}"),
      || {},
    )
  }

  /// Subscribes with callbacks for all three notification kinds.
  pub fn subscribe_all<N, E, C>(
    &self,
    next: N,
    error: E,
    complete: C,
  ) -> SerialSubscription
  where
    N: FnMut(Item) + Send + 'static,
    E: FnMut(Err) + Send + 'static,
    C: FnMut() + Send + 'static,
  {
    self.subscribe_observer(CallbackObserver {
      next,
      error,
      complete,
    })
  }

  /// Applies `f` to this observable and returns the result.
  ///
  /// Binds the receiver once so a composition referring to it several
  /// times shares one upstream instance.
  pub fn pipe<F, R>(self, f: F) -> R
  where
    F: FnOnce(Self) -> R,
  {
    f(self)
  }
}
