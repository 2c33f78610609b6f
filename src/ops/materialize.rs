use crate::notification::Notification;
use crate::observable::Observable;
use crate::observer::Observer;

struct MaterializeObserver<O> {
  observer: O,
}

impl<Item, Err, O> Observer<Item, Err> for MaterializeObserver<O>
where
  O: Observer<Notification<Item, Err>, Err>,
{
  fn next(&mut self, value: Item) {
    self.observer.next(Notification::Next(value));
  }

  fn error(&mut self, err: Err) {
    self.observer.next(Notification::Error(err));
    self.observer.complete();
  }

  fn complete(&mut self) {
    self.observer.next(Notification::Completed);
    self.observer.complete();
  }
}

struct DematerializeObserver<O> {
  observer: O,
}

impl<Item, Err, O> Observer<Notification<Item, Err>, Err>
  for DematerializeObserver<O>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, notification: Notification<Item, Err>) {
    // Anything after a replayed terminal is dropped by the conformance
    // wrapper downstream.
    notification.accept(&mut self.observer);
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
  /// Reifies every notification as a value: `Next(v)` for values, then a
  /// final `Error(e)` or `Completed` value followed by an ordinary
  /// completion.
  pub fn materialize(self) -> Observable<Notification<Item, Err>, Err> {
    Observable::create_with_subscription(move |observer| {
      Box::new(self.subscribe_observer(MaterializeObserver { observer }))
    })
  }
}

impl<Item, Err> Observable<Notification<Item, Err>, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  /// Replays reified notifications as real observer calls, undoing
  /// [`materialize`](Observable::materialize).
  pub fn dematerialize(self) -> Observable<Item, Err> {
    Observable::create_with_subscription(move |observer| {
      Box::new(self.subscribe_observer(DematerializeObserver { observer }))
    })
  }
}
