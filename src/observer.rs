use std::sync::{Arc, Mutex};

/// A consumer of the values delivered by an Observable, one method per
/// kind of notification: `next`, `error`, and `complete`.
///
/// `Item` is the type of the elements being emitted, `Err` the type of the
/// error that may propagate. After `error` or `complete` a well-behaved
/// producer delivers nothing further; the [`Subscriber`](crate::subscriber)
/// wrapper enforces this even for producers that keep pushing.
pub trait Observer<Item, Err> {
  fn next(&mut self, value: Item);

  fn error(&mut self, err: Err);

  fn complete(&mut self);
}

impl<Item, Err, O> Observer<Item, Err> for Box<O>
where
  O: Observer<Item, Err> + ?Sized,
{
  #[inline]
  fn next(&mut self, value: Item) {
    (**self).next(value)
  }
  #[inline]
  fn error(&mut self, err: Err) {
    (**self).error(err)
  }
  #[inline]
  fn complete(&mut self) {
    (**self).complete()
  }
}

/// Observer assembled from three callbacks.
///
/// `subscribe`-style helpers on `Observable` build these; the error
/// callback of the single-closure form panics, which is the library's
/// rendering of "an unhandled error surfaces on the delivering thread".
pub struct CallbackObserver<N, E, C> {
  pub next: N,
  pub error: E,
  pub complete: C,
}

impl<Item, Err, N, E, C> Observer<Item, Err> for CallbackObserver<N, E, C>
where
  N: FnMut(Item),
  E: FnMut(Err),
  C: FnMut(),
{
  fn next(&mut self, value: Item) {
    (self.next)(value)
  }
  fn error(&mut self, err: Err) {
    (self.error)(err)
  }
  fn complete(&mut self) {
    (self.complete)()
  }
}

/// Serializes `next`/`error`/`complete` under one mutex.
///
/// Cloning yields another handle to the same observer, so combinators that
/// subscribe several upstreams (`merge_all`, `amb`, `take_until`) hand each
/// upstream a clone and get mutual exclusion across all of them.
pub struct SynchronizedObserver<O> {
  inner: Arc<Mutex<O>>,
}

impl<O> SynchronizedObserver<O> {
  pub fn new(observer: O) -> Self {
    SynchronizedObserver {
      inner: Arc::new(Mutex::new(observer)),
    }
  }
}

impl<O> Clone for SynchronizedObserver<O> {
  fn clone(&self) -> Self {
    SynchronizedObserver {
      inner: self.inner.clone(),
    }
  }
}

impl<Item, Err, O> Observer<Item, Err> for SynchronizedObserver<O>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) {
    self.inner.lock().unwrap().next(value)
  }
  fn error(&mut self, err: Err) {
    self.inner.lock().unwrap().error(err)
  }
  fn complete(&mut self) {
    self.inner.lock().unwrap().complete()
  }
}
