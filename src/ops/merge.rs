use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::observable::Observable;
use crate::observer::{Observer, SynchronizedObserver};
use crate::subscription::{
  CompositeSubscription, SerialSubscription, SubscriptionLike,
};

// One merge in flight: the composite owns the generator subscription and
// one serial child per live inner; `active` counts the generator plus the
// live inners and reaches zero exactly once.
struct MergeShared<O, Item, Err> {
  downstream: SynchronizedObserver<O>,
  lifetime: CompositeSubscription,
  active: AtomicUsize,
  _marker: PhantomData<fn() -> (Item, Err)>,
}

impl<O, Item, Err> MergeShared<O, Item, Err>
where
  O: Observer<Item, Err>,
{
  fn retire(&self, own_slot: &SerialSubscription) {
    self.lifetime.remove(own_slot);
    if self.active.fetch_sub(1, Ordering::AcqRel) == 1 {
      self.downstream.clone().complete();
    }
  }

  fn fail(&self, err: Err) {
    self.lifetime.clone().unsubscribe();
    self.downstream.clone().error(err);
  }
}

struct MergeOuterObserver<O, Item, Err> {
  shared: Arc<MergeShared<O, Item, Err>>,
  own_slot: SerialSubscription,
}

impl<Item, Err, O> Observer<Observable<Item, Err>, Err>
  for MergeOuterObserver<O, Item, Err>
where
  O: Observer<Item, Err> + Send + 'static,
  Item: Send + 'static,
  Err: Send + 'static,
{
  fn next(&mut self, inner: Observable<Item, Err>) {
    self.shared.active.fetch_add(1, Ordering::AcqRel);
    let child = SerialSubscription::new();
    self.shared.lifetime.add(Box::new(child.clone()));
    let subscription = inner.subscribe_observer(MergeInnerObserver {
      shared: self.shared.clone(),
      own_slot: child.clone(),
    });
    child.set(Box::new(subscription));
  }

  fn error(&mut self, err: Err) {
    self.shared.fail(err);
  }

  fn complete(&mut self) {
    self.shared.retire(&self.own_slot);
  }
}

struct MergeInnerObserver<O, Item, Err> {
  shared: Arc<MergeShared<O, Item, Err>>,
  own_slot: SerialSubscription,
}

impl<Item, Err, O> Observer<Item, Err> for MergeInnerObserver<O, Item, Err>
where
  O: Observer<Item, Err> + Send + 'static,
  Item: Send + 'static,
  Err: Send + 'static,
{
  fn next(&mut self, value: Item) {
    self.shared.downstream.clone().next(value);
  }

  fn error(&mut self, err: Err) {
    self.shared.fail(err);
  }

  fn complete(&mut self) {
    self.shared.retire(&self.own_slot);
  }
}

impl<Item, Err> Observable<Observable<Item, Err>, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  /// Flattens an observable of observables, interleaving inner values in
  /// the order their producers fire.
  ///
  /// The downstream observer is synchronized, so deliveries from the
  /// generator and every inner are mutually exclusive. Completion happens
  /// when the generator and all inners have completed; any error closes
  /// everything and propagates.
  pub fn merge_all(self) -> Observable<Item, Err> {
    Observable::create_with_subscription(move |observer| {
      let lifetime = CompositeSubscription::new();
      let shared = Arc::new(MergeShared {
        downstream: SynchronizedObserver::new(observer),
        lifetime: lifetime.clone(),
        active: AtomicUsize::new(1),
        _marker: PhantomData,
      });

      let generator_slot = SerialSubscription::new();
      lifetime.add(Box::new(generator_slot.clone()));
      let subscription = self.subscribe_observer(MergeOuterObserver {
        shared,
        own_slot: generator_slot.clone(),
      });
      generator_slot.set(Box::new(subscription));

      Box::new(lifetime)
    })
  }
}

impl<Item, Err> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  /// Maps each value to an observable and merges the results.
  pub fn flat_map<U, F>(self, f: F) -> Observable<U, Err>
  where
    U: Send + 'static,
    F: Fn(Item) -> Observable<U, Err> + Send + Sync + 'static,
  {
    self.map(f).merge_all()
  }
}

#[cfg(test)]
mod tests {
  use crate::observable::{self, Observable};
  use std::sync::{Arc, Mutex};

  #[test]
  fn flattens_inner_values() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let completed = Arc::new(Mutex::new(false));
    let c_seen = seen.clone();
    let c_completed = completed.clone();

    let source: Observable<i32> = observable::from_iter(vec![1, 2]);
    source
      .flat_map(|v| observable::from_iter(vec![v * 10, v * 10 + 1]))
      .subscribe_all(
        move |v| c_seen.lock().unwrap().push(v),
        |_| {},
        move || *c_completed.lock().unwrap() = true,
      );

    let mut values = seen.lock().unwrap().clone();
    values.sort_unstable();
    assert_eq!(values, vec![10, 11, 20, 21]);
    assert!(*completed.lock().unwrap());
  }

  #[test]
  fn completes_only_after_generator_and_inners() {
    let completed = Arc::new(Mutex::new(false));
    let c_completed = completed.clone();

    let source: Observable<i32> = observable::from_iter(vec![1]);
    source
      .flat_map(|_| observable::from_iter(vec![1, 2, 3]))
      .subscribe_all(
        |_| {},
        |_| {},
        move || *c_completed.lock().unwrap() = true,
      );

    assert!(*completed.lock().unwrap());
  }

  #[test]
  fn inner_error_closes_everything() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let errored = Arc::new(Mutex::new(false));
    let c_seen = seen.clone();
    let c_errored = errored.clone();

    let source: Observable<i32, &str> = observable::from_iter(vec![1, 2]);
    source
      .flat_map(|v| {
        if v == 1 {
          observable::throw("inner failed")
        } else {
          observable::from_iter(vec![v])
        }
      })
      .subscribe_all(
        move |v| c_seen.lock().unwrap().push(v),
        move |_| *c_errored.lock().unwrap() = true,
        || {},
      );

    assert!(*errored.lock().unwrap());
  }

  #[test]
  fn empty_generator_completes() {
    let completed = Arc::new(Mutex::new(false));
    let c_completed = completed.clone();

    let source: Observable<Observable<i32>> =
      observable::from_iter(Vec::<Observable<i32>>::new());
    source.merge_all().subscribe_all(
      |_| {},
      |_| {},
      move || *c_completed.lock().unwrap() = true,
    );

    assert!(*completed.lock().unwrap());
  }
}
