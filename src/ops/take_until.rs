use std::marker::PhantomData;

use crate::observable::Observable;
use crate::observer::{Observer, SynchronizedObserver};
use crate::subscription::{CompositeSubscription, SerialSubscription};

struct StopNotifierObserver<O, Item> {
  downstream: SynchronizedObserver<O>,
  _marker: PhantomData<fn() -> Item>,
}

impl<Item, Err, NotifyItem, O> Observer<NotifyItem, Err>
  for StopNotifierObserver<O, Item>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, _: NotifyItem) {
    // Any value from the notifier ends the sequence; the conformance
    // wrapper downstream then closes both subscriptions.
    self.downstream.clone().complete();
  }

  fn error(&mut self, err: Err) {
    self.downstream.clone().error(err);
  }

  fn complete(&mut self) {
    // A notifier that completes without a value detaches silently and the
    // source keeps going.
  }
}

impl<Item, Err> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  /// Mirrors the source until `notifier` produces its first value, at
  /// which point the sequence completes and both subscriptions close.
  ///
  /// An error from `notifier` propagates; its silent completion only
  /// detaches the notifier.
  pub fn take_until<NotifyItem>(
    self,
    notifier: Observable<NotifyItem, Err>,
  ) -> Observable<Item, Err>
  where
    NotifyItem: Send + 'static,
  {
    Observable::create_with_subscription(move |observer| {
      let downstream = SynchronizedObserver::new(observer);
      let lifetime = CompositeSubscription::new();

      let notifier_slot = SerialSubscription::new();
      lifetime.add(Box::new(notifier_slot.clone()));
      let notifier_subscription =
        notifier.subscribe_observer(StopNotifierObserver {
          downstream: downstream.clone(),
          _marker: PhantomData,
        });
      notifier_slot.set(Box::new(notifier_subscription));

      let source_slot = SerialSubscription::new();
      lifetime.add(Box::new(source_slot.clone()));
      let source_subscription = self.subscribe_observer(downstream);
      source_slot.set(Box::new(source_subscription));

      Box::new(lifetime)
    })
  }
}

#[cfg(test)]
mod tests {
  use crate::observable::{self, Observable};
  use std::sync::{Arc, Mutex};

  #[test]
  fn notifier_value_completes_the_sequence() {
    let seen = Arc::new(Mutex::new(0));
    let completed = Arc::new(Mutex::new(false));
    let c_seen = seen.clone();
    let c_completed = completed.clone();

    // The notifier speaks first, so nothing from the source is seen.
    let source: Observable<i32> = observable::from_iter(0..100);
    let notifier: Observable<&str> = observable::of("stop");
    source.take_until(notifier).subscribe_all(
      move |_| *c_seen.lock().unwrap() += 1,
      |_| {},
      move || *c_completed.lock().unwrap() = true,
    );

    assert_eq!(*seen.lock().unwrap(), 0);
    assert!(*completed.lock().unwrap());
  }

  #[test]
  fn silent_notifier_detaches_and_source_continues() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let completed = Arc::new(Mutex::new(false));
    let c_seen = seen.clone();
    let c_completed = completed.clone();

    let source: Observable<i32> = observable::from_iter(vec![1, 2, 3]);
    let notifier: Observable<&str> = observable::empty();
    source.take_until(notifier).subscribe_all(
      move |v| c_seen.lock().unwrap().push(v),
      |_| {},
      move || *c_completed.lock().unwrap() = true,
    );

    assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
    assert!(*completed.lock().unwrap());
  }

  #[test]
  fn notifier_error_propagates() {
    let errored = Arc::new(Mutex::new(false));
    let c_errored = errored.clone();

    let source: Observable<i32, &str> = observable::from_iter(vec![1]);
    let notifier: Observable<(), &str> = observable::throw("boom");
    source.take_until(notifier).subscribe_all(
      |_| {},
      move |_| *c_errored.lock().unwrap() = true,
      || {},
    );

    assert!(*errored.lock().unwrap());
  }
}
