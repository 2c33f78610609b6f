use std::sync::Arc;

use crate::observable::Observable;
use crate::observer::Observer;

struct TapObserver<O, F> {
  observer: O,
  action: Arc<F>,
}

impl<Item, Err, O, F> Observer<Item, Err> for TapObserver<O, F>
where
  O: Observer<Item, Err>,
  F: Fn(&Item),
{
  fn next(&mut self, value: Item) {
    (self.action)(&value);
    self.observer.next(value);
  }
  fn error(&mut self, err: Err) {
    // The action is for values only; errors pass through untouched.
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
  /// Applies `action` to each value for its side effect, then emits the
  /// original value unchanged.
  pub fn tap<F>(self, action: F) -> Observable<Item, Err>
  where
    F: Fn(&Item) + Send + Sync + 'static,
  {
    let action = Arc::new(action);
    Observable::create_with_subscription(move |observer| {
      Box::new(self.subscribe_observer(TapObserver {
        observer,
        action: action.clone(),
      }))
    })
  }
}
