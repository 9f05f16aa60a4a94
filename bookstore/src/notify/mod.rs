use chrono::{DateTime, Utc};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

/// Signal that the data behind a locator changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub locator: String,
    pub at: DateTime<Utc>,
}

/// Receiving end of an observer registration. Dropping it unregisters the
/// observer before the next registration or delivery.
#[derive(Debug)]
pub struct Subscription {
    locator: String,
    event_rx: mpsc::Receiver<ChangeEvent>,
    _alive: Arc<()>,
}

impl Subscription {
    /// The locator this subscription watches.
    pub fn locator(&self) -> &str {
        &self.locator
    }

    /// Next queued event, if any, without blocking.
    pub fn try_recv(&self) -> Option<ChangeEvent> {
        self.event_rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<ChangeEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }

    /// All events queued so far.
    pub fn drain(&self) -> Vec<ChangeEvent> {
        self.event_rx.try_iter().collect()
    }
}

struct Observer {
    locator: String,
    event_tx: mpsc::Sender<ChangeEvent>,
    alive: Weak<()>,
}

impl Observer {
    fn is_live(&self) -> bool {
        self.alive.strong_count() > 0
    }
}

/// In-process registry of observers keyed by locator.
///
/// Delivery is synchronous: by the time `notify_change` returns, the event is
/// queued on every matching subscription.
#[derive(Default)]
pub struct ChangeNotifier {
    observers: Mutex<Vec<Observer>>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, locator: &str) -> Subscription {
        let (event_tx, event_rx) = mpsc::channel();
        let alive = Arc::new(());
        let mut observers = self.live_observers();
        observers.push(Observer {
            locator: locator.to_string(),
            event_tx,
            alive: Arc::downgrade(&alive),
        });
        log::trace!("Observer registered for {locator} ({} live)", observers.len());
        Subscription {
            locator: locator.to_string(),
            event_rx,
            _alive: alive,
        }
    }

    /// Deliver a change event for `locator` to every overlapping observer.
    /// Returns the number of observers reached.
    pub fn notify_change(&self, locator: &str) -> usize {
        let event = ChangeEvent {
            locator: locator.to_string(),
            at: Utc::now(),
        };
        let mut observers = self.live_observers();
        let mut delivered = 0;
        observers.retain(|observer| {
            if !locators_overlap(&observer.locator, locator) {
                return true;
            }
            match observer.event_tx.send(event.clone()) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                // Receiver dropped
                Err(_) => false,
            }
        });
        log::debug!("Change on {locator} delivered to {delivered} observer(s)");
        delivered
    }

    /// Number of live registrations.
    pub fn observer_count(&self) -> usize {
        self.live_observers().len()
    }

    /// Lock the registry with registrations of dropped subscriptions removed.
    fn live_observers(&self) -> MutexGuard<'_, Vec<Observer>> {
        let mut observers = self.observers.lock().unwrap_or_else(PoisonError::into_inner);
        observers.retain(Observer::is_live);
        observers
    }
}

/// Two locators overlap when one equals the other or is a whole-segment
/// prefix of it.
fn locators_overlap(a: &str, b: &str) -> bool {
    fn is_descendant(parent: &str, child: &str) -> bool {
        child
            .strip_prefix(parent)
            .map_or(false, |rest| rest.is_empty() || rest.starts_with('/'))
    }
    is_descendant(a, b) || is_descendant(b, a)
}
