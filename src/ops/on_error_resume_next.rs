use crate::observable::Observable;
use crate::observer::{Observer, SynchronizedObserver};
use crate::subscription::{BoxSubscription, SerialSubscription};

struct ResumeObserver<O, Item, Err> {
  downstream: SynchronizedObserver<O>,
  fallback: Observable<Item, Err>,
  slot: SerialSubscription,
}

impl<Item, Err, O> Observer<Item, Err> for ResumeObserver<O, Item, Err>
where
  O: Observer<Item, Err> + Send + 'static,
  Item: Send + 'static,
  Err: Send + 'static,
{
  fn next(&mut self, value: Item) {
    self.downstream.next(value);
  }

  fn error(&mut self, _err: Err) {
    // Swap the serial slot over to the fallback; the error itself is
    // swallowed.
    let stage = SerialSubscription::new();
    let installed = self
      .slot
      .clear_and_set(|| Box::new(stage.clone()) as BoxSubscription);
    if installed {
      let subscription =
        self.fallback.subscribe_observer(self.downstream.clone());
      stage.set(Box::new(subscription));
    }
  }

  fn complete(&mut self) {
    self.downstream.complete();
  }
}

impl<Item, Err> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  /// Continues with `fallback` when this observable errors.
  ///
  /// Values emitted before the error flow through unchanged; a completion
  /// never subscribes `fallback`.
  pub fn on_error_resume_next(
    self,
    fallback: Observable<Item, Err>,
  ) -> Observable<Item, Err> {
    Observable::create_with_subscription(move |observer| {
      let downstream = SynchronizedObserver::new(observer);
      let slot = SerialSubscription::new();

      let stage = SerialSubscription::new();
      slot.set(Box::new(stage.clone()));
      let subscription = self.subscribe_observer(ResumeObserver {
        downstream,
        fallback: fallback.clone(),
        slot: slot.clone(),
      });
      stage.set(Box::new(subscription));

      Box::new(slot)
    })
  }
}
