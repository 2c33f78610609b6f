use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::observer::Observer;
use crate::subscription::{SerialSubscription, SubscriptionLike};

/// The contract-enforcing observer every subscription goes through.
///
/// A `Subscriber` wraps the observer handed to `subscribe` and guarantees,
/// no matter what the raw producer does:
///
/// - at most one terminal notification is forwarded;
/// - nothing is forwarded after a terminal;
/// - the first terminal closes the upstream subscription slot, so a source
///   that keeps producing is cancelled rather than silenced one value at a
///   time.
///
/// The upstream slot is the same [`SerialSubscription`] returned to the
/// caller of `subscribe`, which is how an external `unsubscribe` and the
/// internal auto-detach share one lifetime.
pub struct Subscriber<O> {
  observer: O,
  stopped: Arc<AtomicBool>,
  upstream: SerialSubscription,
}

impl<O> Subscriber<O> {
  pub fn new(observer: O, upstream: SerialSubscription) -> Self {
    Subscriber {
      observer,
      stopped: Arc::new(AtomicBool::new(false)),
      upstream,
    }
  }

  pub fn is_stopped(&self) -> bool {
    self.stopped.load(Ordering::Acquire)
  }
}

impl<Item, Err, O> Observer<Item, Err> for Subscriber<O>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) {
    if !self.stopped.load(Ordering::Acquire) {
      self.observer.next(value);
    }
  }

  fn error(&mut self, err: Err) {
    if !self.stopped.swap(true, Ordering::AcqRel) {
      self.observer.error(err);
      self.upstream.clone().unsubscribe();
    }
  }

  fn complete(&mut self) {
    if !self.stopped.swap(true, Ordering::AcqRel) {
      self.observer.complete();
      self.upstream.clone().unsubscribe();
    }
  }
}

impl<O> SubscriptionLike for Subscriber<O> {
  fn unsubscribe(&mut self) {
    self.stopped.store(true, Ordering::Release);
    self.upstream.clone().unsubscribe();
  }

  fn is_closed(&self) -> bool {
    self.is_stopped()
  }

  fn inner_addr(&self) -> *const () {
    Arc::as_ptr(&self.stopped) as *const ()
  }
}
