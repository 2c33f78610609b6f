use crate::observable::Observable;
use crate::observer::Observer;
use crate::subscription::NoopSubscription;

struct TakeObserver<O> {
  observer: O,
  remaining: usize,
}

impl<Item, Err, O> Observer<Item, Err> for TakeObserver<O>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) {
    if self.remaining == 0 {
      return;
    }
    self.remaining -= 1;
    self.observer.next(value);
    if self.remaining == 0 {
      // The completion rides on the notification that reached the count;
      // the conformance wrapper then cancels the upstream subscription.
      self.observer.complete();
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
  /// Emits only the first `count` values, then completes.
  ///
  /// `take(0)` completes without subscribing upstream at all.
  pub fn take(self, count: usize) -> Observable<Item, Err> {
    Observable::create_with_subscription(move |mut observer| {
      if count == 0 {
        observer.complete();
        return Box::new(NoopSubscription);
      }
      Box::new(self.subscribe_observer(TakeObserver {
        observer,
        remaining: count,
      }))
    })
  }
}
