use std::sync::mpsc::{channel, Sender};

use thiserror::Error;

use crate::observable::Observable;
use crate::observer::Observer;
use crate::subscription::SubscriptionLike;

/// Why a blocking pull produced no value.
#[derive(Debug, PartialEq, Eq, Error)]
pub enum BlockingError<E> {
  /// The sequence completed without emitting anything.
  #[error("sequence contains no elements")]
  Empty,
  /// The sequence terminated with an error before emitting.
  #[error("sequence terminated with an error")]
  Source(E),
}

struct FirstObserver<Item, Err> {
  latch: Option<Sender<Result<Item, BlockingError<Err>>>>,
}

impl<Item, Err> FirstObserver<Item, Err> {
  fn resolve(&mut self, result: Result<Item, BlockingError<Err>>) {
    if let Some(latch) = self.latch.take() {
      // The consumer may have stopped waiting; nothing to do then.
      let _ = latch.send(result);
    }
  }
}

impl<Item, Err> Observer<Item, Err> for FirstObserver<Item, Err> {
  fn next(&mut self, value: Item) {
    self.resolve(Ok(value));
  }

  fn error(&mut self, err: Err) {
    self.resolve(Err(BlockingError::Source(err)));
  }

  fn complete(&mut self) {
    self.resolve(Err(BlockingError::Empty));
  }
}

impl<Item, Err> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  /// Blocks the calling thread until the first notification arrives:
  /// the first value, the source's error, or
  /// [`BlockingError::Empty`] for a valueless completion.
  ///
  /// The subscription is closed as soon as the latch fills, cancelling
  /// whatever the source had left.
  pub fn first(self) -> Result<Item, BlockingError<Err>> {
    let (latch, result) = channel();
    let mut subscription =
      self.subscribe_observer(FirstObserver { latch: Some(latch) });
    let outcome = result
      .recv()
      // The producer dropped without a notification; treat it as empty.
      .unwrap_or(Err(BlockingError::Empty));
    subscription.unsubscribe();
    outcome
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::observable;
  use crate::scheduler;

  #[test]
  fn returns_the_first_value() {
    let source: Observable<i32> = observable::from_iter(vec![5, 6, 7]);
    assert_eq!(source.first(), Ok(5));
  }

  #[test]
  fn empty_sequence_is_an_error() {
    let source: Observable<i32> = observable::empty();
    assert_eq!(source.first(), Err(BlockingError::Empty));
  }

  #[test]
  fn source_error_is_rethrown() {
    let source: Observable<i32, &str> = observable::throw("boom");
    assert_eq!(source.first(), Err(BlockingError::Source("boom")));
  }

  #[test]
  fn waits_for_asynchronous_sources() {
    let source: Observable<usize> = observable::timer(
      scheduler::Duration::from_millis(20),
      scheduler::thread_pool(),
    );
    assert_eq!(source.first(), Ok(0));
  }
}
