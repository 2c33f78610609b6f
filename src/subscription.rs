use std::mem::replace;
use std::ptr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Handle returned from `Observable::subscribe*` that allows deregistering
/// a stream before it has finished delivering all events.
///
/// Closing is idempotent, thread-safe, and total: once a container
/// subscription has been closed, any subscription placed into it afterwards
/// is closed immediately.
pub trait SubscriptionLike {
  fn unsubscribe(&mut self);

  fn is_closed(&self) -> bool;

  /// Stable address identifying the shared state behind this handle.
  ///
  /// Clones of the same handle report the same address, which is what
  /// [`CompositeSubscription::remove`] matches on.
  fn inner_addr(&self) -> *const ();
}

pub type BoxSubscription = Box<dyn SubscriptionLike + Send>;

impl<S: SubscriptionLike + ?Sized> SubscriptionLike for Box<S> {
  #[inline]
  fn unsubscribe(&mut self) {
    (**self).unsubscribe()
  }
  #[inline]
  fn is_closed(&self) -> bool {
    (**self).is_closed()
  }
  #[inline]
  fn inner_addr(&self) -> *const () {
    (**self).inner_addr()
  }
}

/// A subscription with nothing to release.
#[derive(Clone, Copy, Default)]
pub struct NoopSubscription;

impl SubscriptionLike for NoopSubscription {
  #[inline]
  fn unsubscribe(&mut self) {}
  #[inline]
  fn is_closed(&self) -> bool {
    true
  }
  #[inline]
  fn inner_addr(&self) -> *const () {
    ptr::null()
  }
}

/// A shared closed flag; unsubscribing raises it.
///
/// Schedulers hand these out for queued actions: execution checks the flag
/// and skips the action when it was cancelled in the meantime.
#[derive(Clone, Default)]
pub struct BoolSubscription(Arc<AtomicBool>);

impl BoolSubscription {
  pub fn new() -> Self {
    Self::default()
  }

  pub(crate) fn flag(&self) -> Arc<AtomicBool> {
    self.0.clone()
  }
}

impl SubscriptionLike for BoolSubscription {
  #[inline]
  fn unsubscribe(&mut self) {
    self.0.store(true, Ordering::Release);
  }
  #[inline]
  fn is_closed(&self) -> bool {
    self.0.load(Ordering::Acquire)
  }
  #[inline]
  fn inner_addr(&self) -> *const () {
    Arc::as_ptr(&self.0) as *const ()
  }
}

/// Invokes a teardown action exactly once, on the first close.
#[derive(Clone)]
pub struct ActionSubscription(
  Arc<Mutex<Option<Box<dyn FnOnce() + Send>>>>,
);

impl ActionSubscription {
  pub fn new(action: impl FnOnce() + Send + 'static) -> Self {
    ActionSubscription(Arc::new(Mutex::new(Some(Box::new(action)))))
  }
}

impl SubscriptionLike for ActionSubscription {
  fn unsubscribe(&mut self) {
    let action = self.0.lock().unwrap().take();
    if let Some(action) = action {
      action();
    }
  }

  fn is_closed(&self) -> bool {
    self.0.lock().unwrap().is_none()
  }

  #[inline]
  fn inner_addr(&self) -> *const () {
    Arc::as_ptr(&self.0) as *const ()
  }
}

#[derive(Default)]
struct SerialState {
  closed: bool,
  inner: Option<BoxSubscription>,
}

/// Holds at most one inner subscription.
///
/// Replacing the inner closes the previous one; closing the container
/// closes the inner and every subscription set afterwards. This is the
/// "current child" slot the sequential combinators (`concat`, `repeat`,
/// `on_error_resume_next`) transition through.
#[derive(Clone, Default)]
pub struct SerialSubscription(Arc<Mutex<SerialState>>);

impl SerialSubscription {
  pub fn new() -> Self {
    Self::default()
  }

  /// Installs `subscription`, closing whatever was held before. When the
  /// container is already closed the argument is closed instead.
  pub fn set(&self, mut subscription: BoxSubscription) {
    let mut state = self.0.lock().unwrap();
    if state.closed {
      drop(state);
      subscription.unsubscribe();
      return;
    }
    let previous = replace(&mut state.inner, Some(subscription));
    drop(state);
    if let Some(mut previous) = previous {
      previous.unsubscribe();
    }
  }

  /// Drops the current inner, then installs the subscription produced by
  /// `make` — unless the container is already closed, in which case `make`
  /// is not invoked. Returns whether an installation happened.
  ///
  /// `make` runs with the container lock released, so it may subscribe,
  /// schedule, or even close this same container without deadlocking. If
  /// the container is closed while `make` runs, its product is closed
  /// before returning.
  pub fn clear_and_set(
    &self,
    make: impl FnOnce() -> BoxSubscription,
  ) -> bool {
    let previous = {
      let mut state = self.0.lock().unwrap();
      if state.closed {
        return false;
      }
      state.inner.take()
    };
    if let Some(mut previous) = previous {
      previous.unsubscribe();
    }

    let mut fresh = make();
    let mut state = self.0.lock().unwrap();
    if state.closed {
      drop(state);
      fresh.unsubscribe();
      return false;
    }
    // A concurrent set may have slipped in; it loses to the newer one.
    let stale = replace(&mut state.inner, Some(fresh));
    drop(state);
    if let Some(mut stale) = stale {
      stale.unsubscribe();
    }
    true
  }
}

impl SubscriptionLike for SerialSubscription {
  fn unsubscribe(&mut self) {
    let inner = {
      let mut state = self.0.lock().unwrap();
      if state.closed {
        return;
      }
      state.closed = true;
      state.inner.take()
    };
    if let Some(mut inner) = inner {
      inner.unsubscribe();
    }
  }

  fn is_closed(&self) -> bool {
    self.0.lock().unwrap().closed
  }

  #[inline]
  fn inner_addr(&self) -> *const () {
    Arc::as_ptr(&self.0) as *const ()
  }
}

#[derive(Default)]
struct CompositeState {
  closed: bool,
  children: Vec<BoxSubscription>,
}

/// A set of concurrent child subscriptions closed as one.
///
/// `add` on a closed composite closes the argument; `remove` closes the
/// child it takes out. The fan-out combinators (`merge_all`, `amb`,
/// `take_until`) use one composite as the lifetime of the whole operation.
#[derive(Clone, Default)]
pub struct CompositeSubscription(Arc<Mutex<CompositeState>>);

impl CompositeSubscription {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn add(&self, mut subscription: BoxSubscription) {
    {
      let mut state = self.0.lock().unwrap();
      if !state.closed {
        state.children.push(subscription);
        return;
      }
    }
    subscription.unsubscribe();
  }

  /// Takes the child with the same identity out of the set and closes it.
  pub fn remove(&self, subscription: &dyn SubscriptionLike) {
    let addr = subscription.inner_addr();
    let child = {
      let mut state = self.0.lock().unwrap();
      state
        .children
        .iter()
        .position(|child| child.inner_addr() == addr)
        .map(|index| state.children.swap_remove(index))
    };
    if let Some(mut child) = child {
      child.unsubscribe();
    }
  }

  pub fn len(&self) -> usize {
    self.0.lock().unwrap().children.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

impl SubscriptionLike for CompositeSubscription {
  fn unsubscribe(&mut self) {
    let children = {
      let mut state = self.0.lock().unwrap();
      if state.closed {
        return;
      }
      state.closed = true;
      std::mem::take(&mut state.children)
    };
    for mut child in children {
      child.unsubscribe();
    }
  }

  fn is_closed(&self) -> bool {
    self.0.lock().unwrap().closed
  }

  #[inline]
  fn inner_addr(&self) -> *const () {
    Arc::as_ptr(&self.0) as *const ()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn counter() -> (ActionSubscription, Arc<AtomicBool>) {
    let fired = Arc::new(AtomicBool::new(false));
    let c_fired = fired.clone();
    let subscription =
      ActionSubscription::new(move || c_fired.store(true, Ordering::SeqCst));
    (subscription, fired)
  }

  #[test]
  fn action_runs_exactly_once() {
    let fired = Arc::new(Mutex::new(0));
    let c_fired = fired.clone();
    let mut subscription =
      ActionSubscription::new(move || *c_fired.lock().unwrap() += 1);
    assert!(!subscription.is_closed());
    subscription.unsubscribe();
    subscription.unsubscribe();
    assert!(subscription.is_closed());
    assert_eq!(*fired.lock().unwrap(), 1);
  }

  #[test]
  fn serial_replace_closes_previous() {
    let slot = SerialSubscription::new();
    let (first, first_fired) = counter();
    let (second, second_fired) = counter();

    slot.set(Box::new(first));
    slot.set(Box::new(second));
    assert!(first_fired.load(Ordering::SeqCst));
    assert!(!second_fired.load(Ordering::SeqCst));

    slot.clone().unsubscribe();
    assert!(second_fired.load(Ordering::SeqCst));
  }

  #[test]
  fn serial_set_after_close_closes_argument() {
    let mut slot = SerialSubscription::new();
    slot.unsubscribe();

    let (late, late_fired) = counter();
    slot.set(Box::new(late));
    assert!(late_fired.load(Ordering::SeqCst));
  }

  #[test]
  fn serial_clear_and_set_skips_when_closed() {
    let mut slot = SerialSubscription::new();
    slot.unsubscribe();

    let invoked = Arc::new(AtomicBool::new(false));
    let c_invoked = invoked.clone();
    let installed = slot.clear_and_set(move || {
      c_invoked.store(true, Ordering::SeqCst);
      Box::new(NoopSubscription)
    });
    assert!(!installed);
    assert!(!invoked.load(Ordering::SeqCst));
  }

  #[test]
  fn serial_close_from_within_thunk_rejects_product() {
    let slot = SerialSubscription::new();
    let c_slot = slot.clone();
    let (inner, inner_fired) = counter();
    let installed = slot.clear_and_set(move || {
      // Reentrant close while the thunk is running must not deadlock.
      c_slot.clone().unsubscribe();
      Box::new(inner)
    });
    assert!(!installed);
    assert!(inner_fired.load(Ordering::SeqCst));
    assert!(slot.is_closed());
  }

  #[test]
  fn composite_add_after_close_closes_argument() {
    let mut composite = CompositeSubscription::new();
    composite.unsubscribe();

    let (late, late_fired) = counter();
    composite.add(Box::new(late));
    assert!(late_fired.load(Ordering::SeqCst));
    assert!(composite.is_empty());
  }

  #[test]
  fn composite_close_closes_all_children() {
    let mut composite = CompositeSubscription::new();
    let (a, a_fired) = counter();
    let (b, b_fired) = counter();
    composite.add(Box::new(a));
    composite.add(Box::new(b));
    assert_eq!(composite.len(), 2);

    composite.unsubscribe();
    assert!(a_fired.load(Ordering::SeqCst));
    assert!(b_fired.load(Ordering::SeqCst));
    assert!(composite.is_empty());
  }

  #[test]
  fn composite_remove_closes_removed_child() {
    let composite = CompositeSubscription::new();
    let (kept, kept_fired) = counter();
    let target = SerialSubscription::new();
    let (inner, inner_fired) = counter();
    target.set(Box::new(inner));

    composite.add(Box::new(kept));
    composite.add(Box::new(target.clone()));
    composite.remove(&target);

    assert!(inner_fired.load(Ordering::SeqCst));
    assert!(!kept_fired.load(Ordering::SeqCst));
    assert_eq!(composite.len(), 1);
  }

  #[test]
  fn clones_share_identity() {
    let slot = SerialSubscription::new();
    let clone = slot.clone();
    assert_eq!(slot.inner_addr(), clone.inner_addr());
    assert_ne!(
      slot.inner_addr(),
      SerialSubscription::new().inner_addr()
    );
  }
}
