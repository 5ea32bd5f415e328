//! Publish/subscribe of note store events.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Something observable happened inside the note store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEvent {
    /// The committed collection changed; `count` is its new size.
    NotesChanged { count: usize },
    /// Loading started (`true`) or finished (`false`).
    LoadingChanged(bool),
}

/// Handle returned by [`Subscribers::subscribe`]; pass it back to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionToken(u64);

type Handler = Arc<dyn Fn(&StoreEvent) + Send + Sync>;

/// Registered event handlers, invoked in registration order.
///
/// Handlers are called without any internal lock held, so a handler may
/// subscribe, unsubscribe (itself included) or read the store.
#[derive(Default)]
pub struct Subscribers {
    handlers: Mutex<Vec<(SubscriptionToken, Handler)>>,
    next_id: AtomicU64,
}

impl Subscribers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, handler: F) -> SubscriptionToken
    where
        F: Fn(&StoreEvent) + Send + Sync + 'static,
    {
        let token = SubscriptionToken(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().push((token, Arc::new(handler)));
        token
    }

    /// Removes the handler behind `token`. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, token: SubscriptionToken) -> bool {
        let mut handlers = self.lock();
        let before = handlers.len();
        handlers.retain(|(t, _)| *t != token);
        handlers.len() != before
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Delivers `event` to every handler registered at the time of the call.
    ///
    /// A handler unsubscribed by an earlier handler during the same delivery
    /// is skipped.
    pub fn notify(&self, event: StoreEvent) {
        let snapshot: Vec<(SubscriptionToken, Handler)> = self.lock().clone();
        for (token, handler) in snapshot {
            if self.is_registered(token) {
                handler(&event);
            }
        }
    }

    fn is_registered(&self, token: SubscriptionToken) -> bool {
        self.lock().iter().any(|(t, _)| *t == token)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(SubscriptionToken, Handler)>> {
        self.handlers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for Subscribers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscribers")
            .field("count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::OnceLock;

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&str) -> Box<dyn Fn(&StoreEvent) + Send + Sync>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let log_for_factory = Arc::clone(&log);
        let make = move |name: &str| -> Box<dyn Fn(&StoreEvent) + Send + Sync> {
            let log = Arc::clone(&log_for_factory);
            let name = name.to_string();
            Box::new(move |event: &StoreEvent| {
                log.lock().unwrap().push(format!("{name}:{event:?}"));
            })
        };
        (log, make)
    }

    #[test]
    fn test_handlers_run_in_registration_order() {
        let subs = Subscribers::new();
        let (log, make) = recorder();
        subs.subscribe(make("a"));
        subs.subscribe(make("b"));

        subs.notify(StoreEvent::LoadingChanged(true));

        assert_eq!(
            *log.lock().unwrap(),
            vec!["a:LoadingChanged(true)", "b:LoadingChanged(true)"]
        );
    }

    #[test]
    fn test_unsubscribe_is_idempotent() {
        let subs = Subscribers::new();
        let (log, make) = recorder();
        let token = subs.subscribe(make("a"));

        assert!(subs.unsubscribe(token));
        assert!(!subs.unsubscribe(token));
        subs.notify(StoreEvent::NotesChanged { count: 1 });

        assert!(log.lock().unwrap().is_empty());
        assert!(subs.is_empty());
    }

    #[test]
    fn test_handler_can_unsubscribe_itself() {
        let subs = Arc::new(Subscribers::new());
        let calls = Arc::new(AtomicU64::new(0));
        let own_token: Arc<OnceLock<SubscriptionToken>> = Arc::new(OnceLock::new());

        let token = {
            let subs_in_handler = Arc::clone(&subs);
            let calls = Arc::clone(&calls);
            let own_token = Arc::clone(&own_token);
            subs.subscribe(move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                if let Some(token) = own_token.get() {
                    subs_in_handler.unsubscribe(*token);
                }
            })
        };
        own_token.set(token).unwrap();

        subs.notify(StoreEvent::NotesChanged { count: 0 });
        subs.notify(StoreEvent::NotesChanged { count: 0 });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(subs.is_empty());
    }

    #[test]
    fn test_handler_removed_mid_delivery_is_skipped() {
        let subs = Arc::new(Subscribers::new());
        let (log, make) = recorder();
        let victim: Arc<OnceLock<SubscriptionToken>> = Arc::new(OnceLock::new());

        {
            let subs_in_handler = Arc::clone(&subs);
            let victim = Arc::clone(&victim);
            subs.subscribe(move |_| {
                if let Some(token) = victim.get() {
                    subs_in_handler.unsubscribe(*token);
                }
            });
        }
        victim.set(subs.subscribe(make("victim"))).unwrap();
        subs.subscribe(make("survivor"));

        subs.notify(StoreEvent::LoadingChanged(false));

        assert_eq!(*log.lock().unwrap(), vec!["survivor:LoadingChanged(false)"]);
    }
}
