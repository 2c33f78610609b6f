use crate::observable::Observable;
use crate::observer::SynchronizedObserver;

impl<Item, Err> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  /// Serializes deliveries to the downstream observer under one mutex.
  ///
  /// Useful when a hand-written source emits from several threads at once;
  /// the multi-upstream combinators already synchronize on their own.
  pub fn synchronize(self) -> Observable<Item, Err> {
    Observable::create_with_subscription(move |observer| {
      Box::new(self.subscribe_observer(SynchronizedObserver::new(observer)))
    })
  }
}
