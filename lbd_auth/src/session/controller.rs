use async_trait::async_trait;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;

use crate::coordination::{ConflictResolver, LinkOutcome, LinkingError};
use crate::oracle::{Account, CollisionSignal, IdentityOracle, OracleError, ProviderIdentity, Subscription};

/// Confirmation shown before a pending credential is merged
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkingPrompt {
    pub existing_provider: ProviderIdentity,
    pub email: String,
}

/// Observable state of the controller
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub account: Option<Account>,
    /// A sign-in is in flight
    pub loading: bool,
    pub error: Option<String>,
    /// Signed in, but the new credential could not be linked
    pub warning: Option<String>,
    pub linking_prompt: Option<LinkingPrompt>,
    /// At least one account notification has been received
    pub initialized: bool,
}

/// Presentation hook asked before merging; `false` cancels the sign-in.
#[async_trait]
pub trait ConfirmLinking: Send + Sync {
    async fn confirm(&self, prompt: &LinkingPrompt) -> bool;
}

#[derive(Default)]
struct ControllerState {
    snapshot: SessionSnapshot,
    in_flight: usize,
    signing_in: usize,
    /// Latest account notification received while an operation was in flight
    held: Option<Option<Account>>,
}

struct Shared {
    state: Mutex<ControllerState>,
    tx: watch::Sender<SessionSnapshot>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Apply `f` and publish the resulting snapshot
    fn update<R>(&self, f: impl FnOnce(&mut ControllerState) -> R) -> R {
        let mut state = self.lock();
        let result = f(&mut state);
        self.tx.send_replace(state.snapshot.clone());
        result
    }

    fn on_account_changed(&self, account: Option<Account>) {
        self.update(|state| {
            state.snapshot.initialized = true;
            if state.in_flight > 0 {
                tracing::debug!(
                    signed_in = account.is_some(),
                    "Holding account notification until the operation settles"
                );
                state.held = Some(account);
            } else {
                state.snapshot.account = account;
            }
        });
    }

    fn begin(&self, signing_in: bool) {
        self.update(|state| {
            state.in_flight += 1;
            if signing_in {
                state.signing_in += 1;
            }
            state.snapshot.loading = state.signing_in > 0;
            state.snapshot.error = None;
            state.snapshot.warning = None;
        });
    }

    /// Finish an operation. `Ok(account)` supersedes held notifications; a
    /// failure leaves the account alone apart from replaying what was held.
    fn settle(&self, signing_in: bool, result: Result<(Option<Account>, Option<String>), String>) {
        self.update(|state| {
            state.in_flight = state.in_flight.saturating_sub(1);
            if signing_in {
                state.signing_in = state.signing_in.saturating_sub(1);
            }
            state.snapshot.loading = state.signing_in > 0;

            match result {
                Ok((account, warning)) => {
                    state.snapshot.account = account;
                    state.snapshot.error = None;
                    state.snapshot.warning = warning;
                    state.held = None;
                }
                Err(message) => {
                    state.snapshot.error = Some(message);
                    if state.in_flight == 0 {
                        if let Some(account) = state.held.take() {
                            state.snapshot.account = account;
                        }
                    }
                }
            }
        });
    }
}

/// Holds the signed-in account and drives sign-in, collision resolution and
/// sign-out on behalf of the UI.
pub struct AuthSessionController {
    oracle: Arc<dyn IdentityOracle>,
    resolver: ConflictResolver,
    confirm: Option<Arc<dyn ConfirmLinking>>,
    shared: Arc<Shared>,
    subscription: Mutex<Option<Subscription>>,
}

impl AuthSessionController {
    pub fn new(oracle: Arc<dyn IdentityOracle>) -> Self {
        let (tx, _rx) = watch::channel(SessionSnapshot::default());
        Self {
            resolver: ConflictResolver::new(oracle.clone()),
            oracle,
            confirm: None,
            shared: Arc::new(Shared {
                state: Mutex::new(ControllerState::default()),
                tx,
            }),
            subscription: Mutex::new(None),
        }
    }

    pub fn with_resolver(mut self, resolver: ConflictResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_confirmation(mut self, confirm: Arc<dyn ConfirmLinking>) -> Self {
        self.confirm = Some(confirm);
        self
    }

    /// Start following the oracle's account notifications. Calling it again
    /// is a no-op.
    pub fn attach(&self) {
        let mut subscription = self.subscription.lock().unwrap_or_else(|e| e.into_inner());
        if subscription.is_some() {
            return;
        }
        let shared = Arc::downgrade(&self.shared);
        *subscription = Some(self.oracle.on_account_changed(Arc::new(
            move |account: Option<Account>| {
                if let Some(shared) = shared.upgrade() {
                    shared.on_account_changed(account);
                }
            },
        )));
        tracing::debug!("Session controller attached");
    }

    /// Stop following account notifications
    pub fn detach(&self) {
        let mut subscription = self.subscription.lock().unwrap_or_else(|e| e.into_inner());
        *subscription = None;
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.shared.lock().snapshot.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.shared.tx.subscribe()
    }

    /// Sign in with `provider`, resolving a provider collision if one occurs.
    #[tracing::instrument(skip(self), fields(provider = %provider))]
    pub async fn sign_in(&self, provider: ProviderIdentity) -> Result<Account, LinkingError> {
        self.shared.begin(true);

        let result = match self.oracle.sign_in(provider).await {
            Ok(account) => Ok(LinkOutcome::Resolved(account)),
            Err(OracleError::ProviderConflict(signal)) => self.reconcile(&signal).await,
            Err(e) => Err(LinkingError::from(e)),
        };

        match result {
            Ok(outcome) => {
                let warning = outcome.warning().map(str::to_string);
                let account = outcome.into_account();
                tracing::info!(account_id = %account.id, merged = warning.is_none(), "Sign-in settled");
                self.shared
                    .settle(true, Ok((Some(account.clone()), warning)));
                Ok(account)
            }
            Err(e) => {
                tracing::info!(error = %e, "Sign-in failed");
                self.shared.settle(true, Err(e.to_string()));
                Err(e)
            }
        }
    }

    async fn reconcile(&self, signal: &CollisionSignal) -> Result<LinkOutcome, LinkingError> {
        let plan = self.resolver.plan(signal).await?;

        if let Some(confirm) = &self.confirm {
            let prompt = LinkingPrompt {
                existing_provider: plan.existing_provider,
                email: plan.email.clone(),
            };
            self.shared
                .update(|state| state.snapshot.linking_prompt = Some(prompt.clone()));
            let confirmed = confirm.confirm(&prompt).await;
            self.shared
                .update(|state| state.snapshot.linking_prompt = None);

            if !confirmed {
                tracing::info!("Account linking declined");
                return Err(LinkingError::UserCancelled);
            }
        }

        self.resolver.execute(plan).await
    }

    pub async fn sign_out(&self) -> Result<(), LinkingError> {
        self.shared.begin(false);
        match self.oracle.sign_out().await {
            Ok(()) => {
                self.shared.settle(false, Ok((None, None)));
                tracing::info!("Signed out");
                Ok(())
            }
            Err(e) => {
                let error = LinkingError::from(e);
                self.shared.settle(false, Err(error.to_string()));
                Err(error)
            }
        }
    }
}
