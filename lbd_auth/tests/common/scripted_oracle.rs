//! In-process oracle whose answers are queued by the test

use async_trait::async_trait;
use lbd_auth::{
    Account, AccountObserver, AccountObservers, IdentityOracle, OracleError, PendingCredential,
    ProviderIdentity, Subscription,
};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Pauses a scripted sign-in until the test releases it
pub struct Gate {
    pub entered: Notify,
    pub release: Notify,
}

#[derive(Default)]
pub struct ScriptedOracle {
    sign_ins: Mutex<HashMap<ProviderIdentity, VecDeque<Result<Account, OracleError>>>>,
    links: Mutex<VecDeque<Result<Account, OracleError>>>,
    lookup: Mutex<Option<Result<Vec<String>, OracleError>>>,
    gates: Mutex<HashMap<ProviderIdentity, Arc<Gate>>>,
    calls: Mutex<Vec<String>>,
    pub observers: AccountObservers,
}

impl ScriptedOracle {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_sign_in(&self, provider: ProviderIdentity, result: Result<Account, OracleError>) {
        self.sign_ins
            .lock()
            .unwrap()
            .entry(provider)
            .or_default()
            .push_back(result);
    }

    pub fn push_link(&self, result: Result<Account, OracleError>) {
        self.links.lock().unwrap().push_back(result);
    }

    pub fn set_lookup(&self, result: Result<Vec<String>, OracleError>) {
        *self.lookup.lock().unwrap() = Some(result);
    }

    /// Block the next sign-ins with `provider` until `gate.release` is notified
    pub fn gate(&self, provider: ProviderIdentity) -> Arc<Gate> {
        let gate = Arc::new(Gate {
            entered: Notify::new(),
            release: Notify::new(),
        });
        self.gates.lock().unwrap().insert(provider, gate.clone());
        gate
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl IdentityOracle for ScriptedOracle {
    async fn sign_in(&self, provider: ProviderIdentity) -> Result<Account, OracleError> {
        self.record(format!("sign_in:{provider}"));

        let gate = self.gates.lock().unwrap().get(&provider).cloned();
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }

        let next = self
            .sign_ins
            .lock()
            .unwrap()
            .get_mut(&provider)
            .and_then(VecDeque::pop_front);
        let result = next.unwrap_or_else(|| Err(OracleError::UnknownProvider(provider.to_string())));
        if let Ok(account) = &result {
            self.observers.announce(Some(account));
        }
        result
    }

    async fn sign_out(&self) -> Result<(), OracleError> {
        self.record("sign_out".to_string());
        self.observers.announce(None);
        Ok(())
    }

    fn on_account_changed(&self, observer: AccountObserver) -> Subscription {
        self.observers.subscribe(observer)
    }

    async fn verify_and_link_credential(
        &self,
        account: &Account,
        credential: PendingCredential,
    ) -> Result<Account, OracleError> {
        self.record(format!("link:{}", credential.provider));
        let next = self.links.lock().unwrap().pop_front();
        match next {
            Some(result) => result,
            None => {
                let mut linked = account.clone();
                linked.providers.push(credential.provider);
                Ok(linked)
            }
        }
    }

    async fn lookup_providers_for_email(&self, email: &str) -> Result<Vec<String>, OracleError> {
        self.record(format!("lookup:{email}"));
        self.lookup
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Err(OracleError::Network("lookup unavailable".to_string())))
    }
}
