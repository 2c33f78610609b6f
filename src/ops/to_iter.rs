use std::sync::mpsc::{sync_channel, Receiver, SyncSender};

use crate::notification::Notification;
use crate::observable::Observable;
use crate::observer::Observer;
use crate::subscription::{SerialSubscription, SubscriptionLike};

// Producers block once this many notifications are waiting to be pulled.
const QUEUE_CAPACITY: usize = 1024;

struct QueueObserver<Item, Err> {
  queue: SyncSender<Notification<Item, Err>>,
}

impl<Item, Err> QueueObserver<Item, Err> {
  fn push(&mut self, notification: Notification<Item, Err>) {
    // A dropped iterator just means nobody is pulling any more.
    let _ = self.queue.send(notification);
  }
}

impl<Item, Err> Observer<Item, Err> for QueueObserver<Item, Err> {
  fn next(&mut self, value: Item) {
    self.push(Notification::Next(value));
  }
  fn error(&mut self, err: Err) {
    self.push(Notification::Error(err));
  }
  fn complete(&mut self) {
    self.push(Notification::Completed);
  }
}

/// Lazy blocking pull over a pushed sequence.
///
/// Each `next` dequeues one notification, blocking until the producer
/// delivers one. A terminal notification closes the subscription; so does
/// dropping the iterator early.
pub struct BlockingIter<Item, Err> {
  queue: Receiver<Notification<Item, Err>>,
  subscription: SerialSubscription,
  done: bool,
}

impl<Item, Err> Iterator for BlockingIter<Item, Err> {
  type Item = Result<Item, Err>;

  fn next(&mut self) -> Option<Result<Item, Err>> {
    if self.done {
      return None;
    }
    match self.queue.recv() {
      Ok(Notification::Next(value)) => Some(Ok(value)),
      Ok(Notification::Error(err)) => {
        self.finish();
        Some(Err(err))
      }
      // A disconnected producer without a terminal ends the pull too.
      Ok(Notification::Completed) | Err(_) => {
        self.finish();
        None
      }
    }
  }
}

impl<Item, Err> BlockingIter<Item, Err> {
  fn finish(&mut self) {
    self.done = true;
    self.subscription.clone().unsubscribe();
  }
}

impl<Item, Err> Drop for BlockingIter<Item, Err> {
  fn drop(&mut self) {
    self.subscription.clone().unsubscribe();
  }
}

impl<Item, Err> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  /// Materializes the sequence into a bounded blocking queue and returns
  /// a pull iterator over it.
  ///
  /// The queue holds up to 1024 undelivered notifications; past that the
  /// producer blocks until the consumer catches up. A synchronous source
  /// longer than the buffer therefore needs its consumer on another
  /// thread (or a scheduler of its own).
  pub fn into_blocking_iter(self) -> BlockingIter<Item, Err> {
    let (queue, pull) = sync_channel(QUEUE_CAPACITY);
    let subscription = self.subscribe_observer(QueueObserver { queue });
    BlockingIter {
      queue: pull,
      subscription,
      done: false,
    }
  }
}

impl<Item, Err> IntoIterator for Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  type Item = Result<Item, Err>;
  type IntoIter = BlockingIter<Item, Err>;

  fn into_iter(self) -> BlockingIter<Item, Err> {
    self.into_blocking_iter()
  }
}

#[cfg(test)]
mod tests {
  use crate::observable::{self, Observable};
  use crate::scheduler;

  #[test]
  fn pulls_values_in_order() {
    let source: Observable<i32> = observable::from_iter(vec![1, 2, 3]);
    let values: Vec<i32> = source
      .into_blocking_iter()
      .map(|result| result.unwrap())
      .collect();
    assert_eq!(values, vec![1, 2, 3]);
  }

  #[test]
  fn error_is_the_last_item() {
    let source: Observable<i32, &str> =
      observable::from_iter(vec![1]).concat(observable::throw("boom"));
    let pulled: Vec<Result<i32, &str>> = source.into_iter().collect();
    assert_eq!(pulled, vec![Ok(1), Err("boom")]);
  }

  #[test]
  fn works_across_threads() {
    let source: Observable<usize> = observable::interval(
      scheduler::Duration::from_millis(5),
      scheduler::thread_pool(),
    )
    .take(3);
    let values: Vec<usize> = source
      .into_blocking_iter()
      .map(|result| result.unwrap())
      .collect();
    assert_eq!(values, vec![0, 1, 2]);
  }

  #[test]
  fn dropping_the_iterator_unsubscribes() {
    let source: Observable<usize> = observable::interval(
      scheduler::Duration::from_millis(1),
      scheduler::thread_pool(),
    );
    let mut iter = source.into_blocking_iter();
    assert_eq!(iter.next().map(|r| r.unwrap()), Some(0));
    drop(iter);
    // Nothing left to observe the stream; the subscription died with the
    // iterator, which is what this test exercises by not hanging.
  }
}
