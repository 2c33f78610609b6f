use std::sync::Arc;

use crate::observable::Observable;
use crate::observer::Observer;

struct FilterMapObserver<O, F> {
  observer: O,
  f: Arc<F>,
}

impl<Item, Err, U, O, F> Observer<Item, Err> for FilterMapObserver<O, F>
where
  O: Observer<U, Err>,
  F: Fn(Item) -> Option<U>,
{
  fn next(&mut self, value: Item) {
    if let Some(mapped) = (self.f)(value) {
      self.observer.next(mapped);
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
  /// Emits `f(value)` for the values where `f` returns `Some`.
  ///
  /// This is the partial-function transformation: filter and map in one
  /// step. A downcasting closure gives the select-by-runtime-type variant
  /// for `Box<dyn Any>` streams.
  pub fn filter_map<U, F>(self, f: F) -> Observable<U, Err>
  where
    U: Send + 'static,
    F: Fn(Item) -> Option<U> + Send + Sync + 'static,
  {
    let f = Arc::new(f);
    Observable::create_with_subscription(move |observer| {
      Box::new(self.subscribe_observer(FilterMapObserver {
        observer,
        f: f.clone(),
      }))
    })
  }
}
