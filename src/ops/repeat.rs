use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::observable::Observable;
use crate::observer::{Observer, SynchronizedObserver};
use crate::subscription::{BoxSubscription, SerialSubscription};

struct RepeatObserver<O, Item, Err> {
  downstream: SynchronizedObserver<O>,
  source: Observable<Item, Err>,
  slot: SerialSubscription,
  // None repeats forever; Some(n) counts completed runs still owed.
  remaining: Option<Arc<AtomicUsize>>,
}

impl<Item, Err, O> Observer<Item, Err> for RepeatObserver<O, Item, Err>
where
  O: Observer<Item, Err> + Send + 'static,
  Item: Send + 'static,
  Err: Send + 'static,
{
  fn next(&mut self, value: Item) {
    self.downstream.next(value);
  }

  fn error(&mut self, err: Err) {
    self.downstream.error(err);
  }

  fn complete(&mut self) {
    if let Some(remaining) = &self.remaining {
      if remaining.fetch_sub(1, Ordering::AcqRel) <= 1 {
        self.downstream.complete();
        return;
      }
    }
    subscribe_run(
      &self.source,
      self.downstream.clone(),
      &self.slot,
      self.remaining.clone(),
    );
  }
}

fn subscribe_run<Item, Err, O>(
  source: &Observable<Item, Err>,
  downstream: SynchronizedObserver<O>,
  slot: &SerialSubscription,
  remaining: Option<Arc<AtomicUsize>>,
) where
  O: Observer<Item, Err> + Send + 'static,
  Item: Send + 'static,
  Err: Send + 'static,
{
  let stage = SerialSubscription::new();
  let installed =
    slot.clear_and_set(|| Box::new(stage.clone()) as BoxSubscription);
  if !installed {
    // The outer subscription was closed; the cycle ends here.
    return;
  }
  let subscription = source.subscribe_observer(RepeatObserver {
    downstream,
    source: source.clone(),
    slot: slot.clone(),
    remaining,
  });
  stage.set(Box::new(subscription));
}

impl<Item, Err> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  /// Resubscribes every time the source completes, indefinitely.
  ///
  /// Errors are not caught; the only exits are an error or closing the
  /// subscription (which a downstream `take` does on its own completion).
  pub fn repeat(self) -> Observable<Item, Err> {
    self.repeat_runs(None)
  }

  /// Replays the source `count` full runs, then completes.
  pub fn repeat_n(self, count: usize) -> Observable<Item, Err> {
    self.repeat_runs(Some(count))
  }

  fn repeat_runs(self, count: Option<usize>) -> Observable<Item, Err> {
    Observable::create_with_subscription(move |mut observer| {
      if count == Some(0) {
        observer.complete();
        return Box::new(crate::subscription::NoopSubscription);
      }
      let downstream = SynchronizedObserver::new(observer);
      let slot = SerialSubscription::new();
      let remaining = count.map(|n| Arc::new(AtomicUsize::new(n)));
      subscribe_run(&self, downstream, &slot, remaining);
      Box::new(slot)
    })
  }
}
