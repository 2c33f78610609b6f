//! Deterministic testing on the virtual clock.
//!
//! The harness follows a fixed convention: the observable under test is
//! built at tick 100, subscribed at tick 200, and the subscription is
//! closed at tick 1000 (unless a scenario says otherwise). Notifications
//! are recorded with the virtual instant they were delivered at, and hot
//! observables additionally record every subscription window, so tests can
//! assert both *what* was seen and *when* sources were live.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::notification::Notification;
use crate::observable::{BoxObserver, Observable};
use crate::observer::Observer;
use crate::scheduler::{Instant, Scheduler, TestScheduler};
use crate::subscription::{
  ActionSubscription, SerialSubscription, SubscriptionLike,
};

/// Tick at which `start` evaluates the observable factory.
pub const CREATED_AT: u64 = 100;
/// Tick at which `start` subscribes the test observer.
pub const SUBSCRIBED_AT: u64 = 200;
/// Tick at which `start` closes the subscription.
pub const DISPOSED_AT: u64 = 1000;

/// A notification paired with the virtual instant it was delivered at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Recorded<Item, Err> {
  pub time: Instant,
  pub value: Notification<Item, Err>,
}

impl<Item, Err> Recorded<Item, Err> {
  pub fn new(time: Instant, value: Notification<Item, Err>) -> Self {
    Recorded { time, value }
  }

  /// A value delivered at `ticks`.
  pub fn next(ticks: u64, value: Item) -> Self {
    Recorded::new(Instant::from_ticks(ticks), Notification::Next(value))
  }

  /// A completion delivered at `ticks`.
  pub fn completed(ticks: u64) -> Self {
    Recorded::new(Instant::from_ticks(ticks), Notification::Completed)
  }

  /// An error delivered at `ticks`.
  pub fn error(ticks: u64, err: Err) -> Self {
    Recorded::new(Instant::from_ticks(ticks), Notification::Error(err))
  }
}

/// The interval a subscriber was attached to a hot observable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubscriptionRecord {
  pub subscribed: Instant,
  pub unsubscribed: Option<Instant>,
}

impl SubscriptionRecord {
  /// A window closed at `until` ticks.
  pub fn new(from: u64, until: u64) -> Self {
    SubscriptionRecord {
      subscribed: Instant::from_ticks(from),
      unsubscribed: Some(Instant::from_ticks(until)),
    }
  }

  /// A window still open when the test ended.
  pub fn pending(from: u64) -> Self {
    SubscriptionRecord {
      subscribed: Instant::from_ticks(from),
      unsubscribed: None,
    }
  }
}

/// Observer that timestamps everything it sees with the virtual `now`.
pub struct TestObserver<Item, Err> {
  scheduler: TestScheduler,
  messages: Arc<Mutex<Vec<Recorded<Item, Err>>>>,
}

impl<Item, Err> Clone for TestObserver<Item, Err> {
  fn clone(&self) -> Self {
    TestObserver {
      scheduler: self.scheduler.clone(),
      messages: self.messages.clone(),
    }
  }
}

impl<Item, Err> TestObserver<Item, Err> {
  pub fn new(scheduler: TestScheduler) -> Self {
    TestObserver {
      scheduler,
      messages: Arc::new(Mutex::new(Vec::new())),
    }
  }

  fn record(&self, value: Notification<Item, Err>) {
    let time = self.scheduler.now();
    self.messages.lock().unwrap().push(Recorded { time, value });
  }
}

impl<Item, Err> TestObserver<Item, Err>
where
  Item: Clone,
  Err: Clone,
{
  /// Everything recorded so far, in delivery order.
  pub fn messages(&self) -> Vec<Recorded<Item, Err>> {
    self.messages.lock().unwrap().clone()
  }
}

impl<Item, Err> Observer<Item, Err> for TestObserver<Item, Err> {
  fn next(&mut self, value: Item) {
    self.record(Notification::Next(value));
  }
  fn error(&mut self, err: Err) {
    self.record(Notification::Error(err));
  }
  fn complete(&mut self) {
    self.record(Notification::Completed);
  }
}

struct HotState<Item, Err> {
  subscribers: BTreeMap<u64, BoxObserver<Item, Err>>,
  windows: Vec<(u64, SubscriptionRecord)>,
  next_id: u64,
}

struct HotCore<Item, Err> {
  scheduler: TestScheduler,
  state: Mutex<HotState<Item, Err>>,
}

impl<Item, Err> HotCore<Item, Err> {
  fn register(&self, observer: BoxObserver<Item, Err>) -> u64 {
    let mut state = self.state.lock().unwrap();
    let id = state.next_id;
    state.next_id += 1;
    state.subscribers.insert(id, observer);
    let record = SubscriptionRecord {
      subscribed: self.scheduler.now(),
      unsubscribed: None,
    };
    state.windows.push((id, record));
    id
  }

  fn unregister(&self, id: u64) {
    let mut state = self.state.lock().unwrap();
    state.subscribers.remove(&id);
    let now = self.scheduler.now();
    if let Some((_, record)) =
      state.windows.iter_mut().find(|(window_id, _)| *window_id == id)
    {
      if record.unsubscribed.is_none() {
        record.unsubscribed = Some(now);
      }
    }
  }

  fn closed(&self, id: u64) -> bool {
    let state = self.state.lock().unwrap();
    state
      .windows
      .iter()
      .find(|(window_id, _)| *window_id == id)
      .map_or(true, |(_, record)| record.unsubscribed.is_some())
  }
}

impl<Item, Err> HotCore<Item, Err>
where
  Item: Clone,
  Err: Clone,
{
  fn broadcast(&self, notification: &Notification<Item, Err>) {
    log::trace!(
      "hot observable: broadcasting at {:?}",
      self.scheduler.now()
    );
    let ids: Vec<u64> = {
      let state = self.state.lock().unwrap();
      state.subscribers.keys().copied().collect()
    };
    for id in ids {
      // The observer leaves the registry while it is being invoked, so a
      // reentrant unsubscribe (the conformance wrapper reacting to a
      // terminal) cannot deadlock on the registry lock.
      let observer = self.state.lock().unwrap().subscribers.remove(&id);
      let Some(mut observer) = observer else {
        continue;
      };
      notification.clone().accept(&mut observer);
      if !self.closed(id) {
        self
          .state
          .lock()
          .unwrap()
          .subscribers
          .insert(id, observer);
      }
    }
  }
}

/// A source that emits per the virtual clock regardless of subscribers.
///
/// All notifications are scheduled at their absolute instants when the hot
/// observable is created; a subscriber only sees the ones delivered while
/// it is attached. Subscription windows are recorded for assertions.
pub struct HotObservable<Item, Err> {
  core: Arc<HotCore<Item, Err>>,
}

impl<Item, Err> HotObservable<Item, Err>
where
  Item: Clone + Send + Sync + 'static,
  Err: Clone + Send + Sync + 'static,
{
  /// The observable view of this source. Every call shares the same
  /// underlying subscriber registry.
  pub fn observable(&self) -> Observable<Item, Err> {
    let core = self.core.clone();
    Observable::create_with_subscription(move |observer| {
      let id = core.register(observer);
      let c_core = core.clone();
      Box::new(ActionSubscription::new(move || c_core.unregister(id)))
    })
  }

  /// Subscription windows in the order subscribers attached.
  pub fn subscriptions(&self) -> Vec<SubscriptionRecord> {
    let state = self.core.state.lock().unwrap();
    state.windows.iter().map(|(_, record)| *record).collect()
  }
}

impl TestScheduler {
  /// Builds a hot observable that replays `notifications` at their
  /// recorded instants.
  pub fn create_hot_observable<Item, Err>(
    &self,
    notifications: Vec<Recorded<Item, Err>>,
  ) -> HotObservable<Item, Err>
  where
    Item: Clone + Send + Sync + 'static,
    Err: Clone + Send + Sync + 'static,
  {
    let core = Arc::new(HotCore {
      scheduler: self.clone(),
      state: Mutex::new(HotState {
        subscribers: BTreeMap::new(),
        windows: Vec::new(),
        next_id: 0,
      }),
    });
    for recorded in notifications {
      let c_core = core.clone();
      let value = recorded.value;
      self.schedule_at(
        recorded.time,
        Box::new(move || c_core.broadcast(&value)),
      );
    }
    HotObservable { core }
  }

  /// Runs `factory` through the standard harness: the observable is built
  /// at tick 100, subscribed at tick 200 with a recording observer, and
  /// disposed at tick 1000; the clock then runs until idle.
  pub fn start<Item, Err, F>(&self, factory: F) -> TestObserver<Item, Err>
  where
    Item: Send + 'static,
    Err: Send + 'static,
    F: FnOnce() -> Observable<Item, Err> + Send + 'static,
  {
    self.start_at(factory, Instant::from_ticks(DISPOSED_AT))
  }

  /// [`start`](TestScheduler::start) with a custom dispose instant.
  pub fn start_at<Item, Err, F>(
    &self,
    factory: F,
    unsubscribe_at: Instant,
  ) -> TestObserver<Item, Err>
  where
    Item: Send + 'static,
    Err: Send + 'static,
    F: FnOnce() -> Observable<Item, Err> + Send + 'static,
  {
    let observer = TestObserver::new(self.clone());
    let source: Arc<Mutex<Option<Observable<Item, Err>>>> =
      Arc::new(Mutex::new(None));
    let subscription = SerialSubscription::new();

    let c_source = source.clone();
    self.schedule_at(
      Instant::from_ticks(CREATED_AT),
      Box::new(move || {
        *c_source.lock().unwrap() = Some(factory());
      }),
    );

    let c_observer = observer.clone();
    let c_subscription = subscription.clone();
    let c_source = source.clone();
    self.schedule_at(
      Instant::from_ticks(SUBSCRIBED_AT),
      Box::new(move || {
        let observable = c_source
          .lock()
          .unwrap()
          .take()
          .expect("observable factory was not evaluated");
        c_subscription
          .set(Box::new(observable.subscribe_observer(c_observer)));
      }),
    );

    self.schedule_at(
      unsubscribe_at,
      Box::new(move || subscription.clone().unsubscribe()),
    );

    self.run();
    observer
  }
}
