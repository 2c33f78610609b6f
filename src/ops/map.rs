use std::sync::Arc;

use crate::observable::Observable;
use crate::observer::Observer;

struct MapObserver<O, F> {
  observer: O,
  f: Arc<F>,
}

impl<Item, Err, U, O, F> Observer<Item, Err> for MapObserver<O, F>
where
  O: Observer<U, Err>,
  F: Fn(Item) -> U,
{
  fn next(&mut self, value: Item) {
    let mapped = (self.f)(value);
    self.observer.next(mapped);
  }
  fn error(&mut self, err: Err) {
    self.observer.error(err);
  }
  fn complete(&mut self) {
    self.observer.complete();
  }
}

struct TryMapObserver<O, F> {
  observer: O,
  f: Arc<F>,
}

impl<Item, Err, U, O, F> Observer<Item, Err> for TryMapObserver<O, F>
where
  O: Observer<U, Err>,
  F: Fn(Item) -> Result<U, Err>,
{
  fn next(&mut self, value: Item) {
    match (self.f)(value) {
      Ok(mapped) => self.observer.next(mapped),
      Err(err) => self.observer.error(err),
    }
  }
  fn error(&mut self, err: Err) {
    self.observer.error(err);
  }
  fn complete(&mut self) {
    self.observer.complete();
  }
}

impl<Item, Err> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  /// Emits `f` applied to each source value.
  ///
  /// ```
  /// use brook::prelude::*;
  ///
  /// let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
  /// let c_seen = seen.clone();
  /// let numbers: Observable<i32> = observable::from_iter(1..=3);
  /// numbers.map(|v| v * 10).subscribe(move |v| {
  ///   c_seen.lock().unwrap().push(v)
  /// });
  /// assert_eq!(*seen.lock().unwrap(), vec![10, 20, 30]);
  /// ```
  pub fn map<U, F>(self, f: F) -> Observable<U, Err>
  where
    U: Send + 'static,
    F: Fn(Item) -> U + Send + Sync + 'static,
  {
    let f = Arc::new(f);
    Observable::create_with_subscription(move |observer| {
      Box::new(self.subscribe_observer(MapObserver {
        observer,
        f: f.clone(),
      }))
    })
  }

  /// Emits `f` applied to each source value; an `Err` from `f` terminates
  /// the sequence with that error (and the conformance wrapper cancels the
  /// upstream subscription).
  pub fn try_map<U, F>(self, f: F) -> Observable<U, Err>
  where
    U: Send + 'static,
    F: Fn(Item) -> Result<U, Err> + Send + Sync + 'static,
  {
    let f = Arc::new(f);
    Observable::create_with_subscription(move |observer| {
      Box::new(self.subscribe_observer(TryMapObserver {
        observer,
        f: f.clone(),
      }))
    })
  }
}
