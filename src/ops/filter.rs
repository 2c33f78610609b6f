use std::sync::Arc;

use crate::observable::Observable;
use crate::observer::Observer;

struct FilterObserver<O, F> {
  observer: O,
  predicate: Arc<F>,
}

impl<Item, Err, O, F> Observer<Item, Err> for FilterObserver<O, F>
where
  O: Observer<Item, Err>,
  F: Fn(&Item) -> bool,
{
  fn next(&mut self, value: Item) {
    if (self.predicate)(&value) {
      self.observer.next(value);
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
  /// Emits only the source values for which `predicate` returns true.
  pub fn filter<F>(self, predicate: F) -> Observable<Item, Err>
  where
    F: Fn(&Item) -> bool + Send + Sync + 'static,
  {
    let predicate = Arc::new(predicate);
    Observable::create_with_subscription(move |observer| {
      Box::new(self.subscribe_observer(FilterObserver {
        observer,
        predicate: predicate.clone(),
      }))
    })
  }
}

#[cfg(test)]
mod tests {
  use crate::observable::{self, Observable};
  use std::sync::{Arc, Mutex};

  #[test]
  fn keeps_matching_values() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let completed = Arc::new(Mutex::new(false));
    let c_seen = seen.clone();
    let c_completed = completed.clone();

    let source: Observable<i32> = observable::from_iter(0..10);
    source.filter(|v| v % 3 == 0).subscribe_all(
      move |v| c_seen.lock().unwrap().push(v),
      |_| {},
      move || *c_completed.lock().unwrap() = true,
    );

    assert_eq!(*seen.lock().unwrap(), vec![0, 3, 6, 9]);
    assert!(*completed.lock().unwrap());
  }
}
