use crate::observable::Observable;
use crate::observer::{Observer, SynchronizedObserver};
use crate::subscription::{BoxSubscription, SerialSubscription};

struct ConcatObserver<O, Item, Err> {
  downstream: SynchronizedObserver<O>,
  next_source: Observable<Item, Err>,
  slot: SerialSubscription,
}

impl<Item, Err, O> Observer<Item, Err> for ConcatObserver<O, Item, Err>
where
  O: Observer<Item, Err> + Send + 'static,
  Item: Send + 'static,
  Err: Send + 'static,
{
  fn next(&mut self, value: Item) {
    self.downstream.next(value);
  }

  fn error(&mut self, err: Err) {
    // The second source is never subscribed.
    self.downstream.error(err);
  }

  fn complete(&mut self) {
    // Transition the serial slot to the second source. Installing a stage
    // slot first and subscribing into it afterwards keeps a synchronous
    // completion of the second source from being displaced.
    let stage = SerialSubscription::new();
    let installed = self
      .slot
      .clear_and_set(|| Box::new(stage.clone()) as BoxSubscription);
    if installed {
      let subscription =
        self.next_source.subscribe_observer(self.downstream.clone());
      stage.set(Box::new(subscription));
    }
  }
}

impl<Item, Err> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  /// Emits everything from this observable, then everything from `next`.
  ///
  /// `next` is subscribed only when this observable completes; an error
  /// here propagates downstream and `next` is never touched. Closing the
  /// returned subscription closes whichever of the two is live.
  pub fn concat(self, next: Observable<Item, Err>) -> Observable<Item, Err> {
    Observable::create_with_subscription(move |observer| {
      let downstream = SynchronizedObserver::new(observer);
      let slot = SerialSubscription::new();

      let stage = SerialSubscription::new();
      slot.set(Box::new(stage.clone()));
      let subscription = self.subscribe_observer(ConcatObserver {
        downstream,
        next_source: next.clone(),
        slot: slot.clone(),
      });
      stage.set(Box::new(subscription));

      Box::new(slot)
    })
  }
}
