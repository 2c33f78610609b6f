use crate::observer::Observer;

/// A reified observer call.
///
/// Each value an observer can receive has a `Notification` counterpart,
/// which lets sequences be treated as plain values: `materialize` turns a
/// stream of items into a stream of notifications, `dematerialize` plays
/// them back, and the virtual-time harness records them with timestamps.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notification<Item, Err> {
  Next(Item),
  Completed,
  Error(Err),
}

impl<Item, Err> Notification<Item, Err> {
  /// Dispatches this notification to the matching observer method.
  pub fn accept<O>(self, observer: &mut O)
  where
    O: Observer<Item, Err> + ?Sized,
  {
    match self {
      Notification::Next(value) => observer.next(value),
      Notification::Completed => observer.complete(),
      Notification::Error(err) => observer.error(err),
    }
  }

  /// Whether this notification ends the sequence.
  pub fn is_terminal(&self) -> bool {
    !matches!(self, Notification::Next(_))
  }
}
