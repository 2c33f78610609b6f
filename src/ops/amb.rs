use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::observable::Observable;
use crate::observer::{Observer, SynchronizedObserver};
use crate::subscription::{CompositeSubscription, SerialSubscription};

const UNDECIDED: usize = 0;

struct AmbShared<O, Item, Err> {
  downstream: SynchronizedObserver<O>,
  winner: AtomicUsize,
  lifetime: CompositeSubscription,
  _marker: PhantomData<fn() -> (Item, Err)>,
}

struct AmbObserver<O, Item, Err> {
  shared: Arc<AmbShared<O, Item, Err>>,
  side: usize,
  rival_slot: SerialSubscription,
}

impl<O, Item, Err> AmbObserver<O, Item, Err> {
  // True when this side already won or wins right now; winning removes
  // the rival from the composite, which closes its subscription.
  fn claims(&self) -> bool {
    match self.shared.winner.compare_exchange(
      UNDECIDED,
      self.side,
      Ordering::AcqRel,
      Ordering::Acquire,
    ) {
      Ok(_) => {
        self.shared.lifetime.remove(&self.rival_slot);
        true
      }
      Err(decided) => decided == self.side,
    }
  }
}

impl<Item, Err, O> Observer<Item, Err> for AmbObserver<O, Item, Err>
where
  O: Observer<Item, Err> + Send + 'static,
  Item: Send + 'static,
  Err: Send + 'static,
{
  fn next(&mut self, value: Item) {
    if self.claims() {
      self.shared.downstream.clone().next(value);
    }
  }

  fn error(&mut self, err: Err) {
    if self.claims() {
      self.shared.downstream.clone().error(err);
    }
  }

  fn complete(&mut self) {
    if self.claims() {
      self.shared.downstream.clone().complete();
    }
  }
}

impl<Item, Err> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  /// Mirrors whichever of the two observables produces a notification
  /// first; the loser is unsubscribed the moment the winner is decided.
  pub fn amb(self, other: Observable<Item, Err>) -> Observable<Item, Err> {
    Observable::create_with_subscription(move |observer| {
      let lifetime = CompositeSubscription::new();
      let shared = Arc::new(AmbShared {
        downstream: SynchronizedObserver::new(observer),
        winner: AtomicUsize::new(UNDECIDED),
        lifetime: lifetime.clone(),
        _marker: PhantomData,
      });

      let left_slot = SerialSubscription::new();
      let right_slot = SerialSubscription::new();
      lifetime.add(Box::new(left_slot.clone()));
      lifetime.add(Box::new(right_slot.clone()));

      let left = self.subscribe_observer(AmbObserver {
        shared: shared.clone(),
        side: 1,
        rival_slot: right_slot.clone(),
      });
      left_slot.set(Box::new(left));

      let right = other.subscribe_observer(AmbObserver {
        shared,
        side: 2,
        rival_slot: left_slot,
      });
      right_slot.set(Box::new(right));

      Box::new(lifetime)
    })
  }
}

#[cfg(test)]
mod tests {
  use crate::observable::{self, Observable};
  use std::sync::{Arc, Mutex};

  #[test]
  fn first_to_speak_wins() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let c_seen = seen.clone();

    let fast: Observable<&str> = observable::from_iter(vec!["a1", "a2"]);
    let slow: Observable<&str> = observable::from_iter(vec!["b1"]);
    fast.amb(slow).subscribe(move |v| c_seen.lock().unwrap().push(v));

    assert_eq!(*seen.lock().unwrap(), vec!["a1", "a2"]);
  }

  #[test]
  fn winning_with_an_error_propagates_it() {
    let errored = Arc::new(Mutex::new(false));
    let seen = Arc::new(Mutex::new(0));
    let c_errored = errored.clone();
    let c_seen = seen.clone();

    let failing: Observable<i32, &str> = observable::throw("boom");
    let healthy: Observable<i32, &str> = observable::from_iter(vec![1]);
    failing.amb(healthy).subscribe_all(
      move |_| *c_seen.lock().unwrap() += 1,
      move |_| *c_errored.lock().unwrap() = true,
      || {},
    );

    assert!(*errored.lock().unwrap());
    assert_eq!(*seen.lock().unwrap(), 0);
  }
}
