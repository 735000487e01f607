use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use super::types::Account;

/// Callback invoked with the new account (or `None` after sign-out)
pub type AccountObserver = Arc<dyn Fn(Option<Account>) + Send + Sync>;

type ObserverMap = Mutex<BTreeMap<u64, AccountObserver>>;

/// Registry of account-change observers shared by oracle implementations.
///
/// Remembers the last announced account: observers only fire when its id
/// changes, and a new observer is called once with it on registration.
#[derive(Default)]
pub struct AccountObservers {
    observers: Arc<ObserverMap>,
    next_id: AtomicU64,
    current_account: Mutex<Option<Account>>,
    // Held for a whole announcement so observers see changes in the order
    // `current_account` records them
    notify: Mutex<()>,
}

impl AccountObservers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, observer: AccountObserver) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut observers) = self.observers.lock() {
            observers.insert(id, observer);
        }
        tracing::trace!(observer_id = id, "Account observer registered");

        let current = self.current_account();
        if let Some(observer) = self
            .observers
            .lock()
            .ok()
            .and_then(|observers| observers.get(&id).cloned())
        {
            observer(current);
        }

        Subscription {
            id,
            observers: Arc::downgrade(&self.observers),
        }
    }

    /// Last announced account
    pub fn current_account(&self) -> Option<Account> {
        self.current_account
            .lock()
            .ok()
            .and_then(|current| current.clone())
    }

    /// Record `account` and notify observers if its id differs from the last
    /// one announced. Returns whether a notification was sent.
    ///
    /// Observers must not call `announce` themselves.
    pub fn announce(&self, account: Option<&Account>) -> bool {
        let _notifying = self.notify.lock().unwrap_or_else(|e| e.into_inner());
        {
            let Ok(mut current) = self.current_account.lock() else {
                return false;
            };
            let changed = current.as_ref().map(|a| &a.id) != account.map(|a| &a.id);
            *current = account.cloned();
            if !changed {
                return false;
            }
        }

        // Clone the callbacks out so observers may (un)subscribe while being notified
        let observers: Vec<AccountObserver> = match self.observers.lock() {
            Ok(observers) => observers.values().cloned().collect(),
            Err(_) => return false,
        };
        tracing::debug!(
            observers = observers.len(),
            signed_in = account.is_some(),
            "Announcing account change"
        );
        for observer in observers {
            observer(account.cloned());
        }
        true
    }

    pub fn len(&self) -> usize {
        self.observers.lock().map(|o| o.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Handle returned by `on_account_changed`; the observer is removed when the
/// handle is dropped or `unsubscribe` is called.
#[must_use = "dropping the subscription unregisters the observer"]
pub struct Subscription {
    id: u64,
    observers: Weak<ObserverMap>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        // Drop does the work
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(observers) = self.observers.upgrade() {
            if let Ok(mut observers) = observers.lock() {
                observers.remove(&self.id);
                tracing::trace!(observer_id = self.id, "Account observer removed");
            }
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
