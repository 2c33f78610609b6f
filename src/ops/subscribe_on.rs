use std::sync::{Arc, Mutex};

use crate::observable::Observable;
use crate::scheduler::{Scheduler, SchedulerRef};
use crate::subscription::{
  BoxSubscription, SerialSubscription, SubscriptionLike,
};

/// Defers closing an inner subscription to a scheduler, so teardown runs
/// where the subscription was made and never inline with the closer.
struct ScheduledSubscription {
  scheduler: SchedulerRef,
  inner: Arc<Mutex<Option<BoxSubscription>>>,
}

impl SubscriptionLike for ScheduledSubscription {
  fn unsubscribe(&mut self) {
    let inner = self.inner.clone();
    self.scheduler.schedule(Box::new(move || {
      if let Some(mut subscription) = inner.lock().unwrap().take() {
        subscription.unsubscribe();
      }
    }));
  }

  fn is_closed(&self) -> bool {
    self.inner.lock().unwrap().is_none()
  }

  fn inner_addr(&self) -> *const () {
    Arc::as_ptr(&self.inner) as *const ()
  }
}

impl<Item, Err> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  /// Performs the subscription itself on `scheduler`.
  ///
  /// Closing the returned handle also goes through `scheduler`, never
  /// inline, so an unsubscribe can never overtake the subscribe it
  /// cancels.
  pub fn subscribe_on(self, scheduler: SchedulerRef) -> Observable<Item, Err> {
    Observable::create_with_subscription(move |observer| {
      let slot = SerialSubscription::new();

      let pending = SerialSubscription::new();
      slot.set(Box::new(pending.clone()));

      let source = self.clone();
      let c_slot = slot.clone();
      let c_scheduler = scheduler.clone();
      let scheduled = scheduler.schedule(Box::new(move || {
        let target = SerialSubscription::new();
        let installed = c_slot.clear_and_set(|| {
          Box::new(ScheduledSubscription {
            scheduler: c_scheduler.clone(),
            inner: Arc::new(Mutex::new(Some(
              Box::new(target.clone()) as BoxSubscription
            ))),
          })
        });
        if installed {
          let subscription = source.subscribe_observer(observer);
          target.set(Box::new(subscription));
        }
      }));
      pending.set(scheduled);

      Box::new(slot)
    })
  }
}
