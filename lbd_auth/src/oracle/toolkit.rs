use async_trait::async_trait;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::env;
use std::sync::{Arc, Mutex};

use super::adapter::{IdentityOracle, ProviderPrompt};
use super::config::{LBD_AUTH_REQUEST_URI, LBD_IDENTITY_TOOLKIT_URL};
use super::errors::OracleError;
use super::observer::{AccountObserver, AccountObservers, Subscription};
use super::types::{
    Account, CollisionSignal, CollisionTokenResponse, PendingCredential, ProviderIdentity,
};

/// [`IdentityOracle`] backed by the identity toolkit REST API.
///
/// The interactive part of sign-in is delegated to a [`ProviderPrompt`]; the
/// credential it yields is exchanged with `accounts:signInWithIdp`.
pub struct IdentityToolkitOracle {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    request_uri: String,
    prompt: Arc<dyn ProviderPrompt>,
    session: Mutex<Option<ActiveSession>>,
    observers: AccountObservers,
}

#[derive(Clone)]
struct ActiveSession {
    account: Account,
    id_token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInWithIdpRequest<'a> {
    post_body: &'a str,
    request_uri: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    id_token: Option<&'a str>,
    return_idp_credential: bool,
    return_secure_token: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInWithIdpResponse {
    local_id: Option<String>,
    email: Option<String>,
    display_name: Option<String>,
    photo_url: Option<String>,
    id_token: Option<String>,
    #[serde(default)]
    need_confirmation: bool,
    #[serde(default)]
    verified_provider: Vec<String>,
    error_message: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LookupRequest<'a> {
    id_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    email: Option<String>,
    display_name: Option<String>,
    photo_url: Option<String>,
    #[serde(default)]
    provider_user_info: Vec<ProviderUserInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProviderUserInfo {
    provider_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateAuthUriRequest<'a> {
    identifier: &'a str,
    continue_uri: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateAuthUriResponse {
    #[serde(default)]
    signin_methods: Vec<String>,
    #[serde(default)]
    all_providers: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ToolkitErrorBody {
    error: ToolkitErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ToolkitErrorDetail {
    message: String,
}

impl From<LookupUser> for Account {
    fn from(user: LookupUser) -> Self {
        Self {
            id: user.local_id,
            display_name: user.display_name,
            email: user.email,
            photo_url: user.photo_url,
            providers: user
                .provider_user_info
                .into_iter()
                .map(|info| info.provider_id)
                .collect(),
        }
    }
}

impl IdentityToolkitOracle {
    pub fn new(api_key: impl Into<String>, prompt: Arc<dyn ProviderPrompt>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: LBD_IDENTITY_TOOLKIT_URL.clone(),
            api_key: api_key.into(),
            request_uri: LBD_AUTH_REQUEST_URI.clone(),
            prompt,
            session: Mutex::new(None),
            observers: AccountObservers::new(),
        }
    }

    /// Build from `LBD_IDENTITY_API_KEY`
    pub fn from_env(prompt: Arc<dyn ProviderPrompt>) -> Result<Self, OracleError> {
        let api_key = env::var("LBD_IDENTITY_API_KEY")
            .map_err(|_| OracleError::Config("LBD_IDENTITY_API_KEY must be set".to_string()))?;
        Ok(Self::new(api_key, prompt))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_request_uri(mut self, request_uri: impl Into<String>) -> Self {
        self.request_uri = request_uri.into();
        self
    }

    /// Account of the active session, if any
    pub fn current_account(&self) -> Option<Account> {
        self.active_session().map(|session| session.account)
    }

    fn active_session(&self) -> Option<ActiveSession> {
        self.session.lock().ok().and_then(|session| session.clone())
    }

    fn replace_session(&self, next: Option<ActiveSession>) {
        let account = next.as_ref().map(|s| s.account.clone());
        if let Ok(mut session) = self.session.lock() {
            *session = next;
        }
        self.observers.announce(account.as_ref());
    }

    fn endpoint(&self, method: &str) -> Result<url::Url, OracleError> {
        url::Url::parse_with_params(
            &format!("{}/accounts:{}", self.base_url, method),
            &[("key", self.api_key.as_str())],
        )
        .map_err(|e| OracleError::Config(format!("Invalid identity toolkit URL: {e}")))
    }

    async fn call<B, R>(&self, method: &str, body: &B) -> Result<R, OracleError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.endpoint(method)?;
        tracing::debug!(method, "Calling identity toolkit");

        let response = self.client.post(url).json(body).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(match serde_json::from_str::<ToolkitErrorBody>(&text) {
                Ok(body) => OracleError::from_toolkit_code(&body.error.message),
                Err(_) => OracleError::Provider {
                    code: status.as_u16().to_string(),
                    message: text,
                },
            });
        }

        Ok(serde_json::from_str(&text)?)
    }

    async fn sign_in_with_idp(
        &self,
        post_body: &str,
        id_token: Option<&str>,
    ) -> Result<SignInWithIdpResponse, OracleError> {
        let request = SignInWithIdpRequest {
            post_body,
            request_uri: &self.request_uri,
            id_token,
            return_idp_credential: true,
            return_secure_token: true,
        };
        let response: SignInWithIdpResponse = self.call("signInWithIdp", &request).await?;
        match &response.error_message {
            Some(code) => Err(OracleError::from_toolkit_code(code)),
            None => Ok(response),
        }
    }

    async fn lookup_account(&self, id_token: &str) -> Result<Account, OracleError> {
        let response: LookupResponse = self.call("lookup", &LookupRequest { id_token }).await?;
        response
            .users
            .into_iter()
            .next()
            .map(Account::from)
            .ok_or_else(|| OracleError::InvalidResponse("accounts:lookup returned no user".into()))
    }
}

#[async_trait]
impl IdentityOracle for IdentityToolkitOracle {
    #[tracing::instrument(skip(self), fields(provider = %provider))]
    async fn sign_in(&self, provider: ProviderIdentity) -> Result<Account, OracleError> {
        let credential = self.prompt.request_credential(provider).await?;
        let pending = PendingCredential::from(credential);

        let response = self.sign_in_with_idp(&pending.post_body, None).await?;

        if response.need_confirmation {
            tracing::info!(
                verified_providers = ?response.verified_provider,
                "Sign-in collided with an existing account"
            );
            let signal = CollisionSignal {
                attempted_provider: Some(provider),
                email: response.email.clone(),
                token_response: CollisionTokenResponse {
                    email: response.email,
                    verified_providers: response.verified_provider,
                },
                pending_credential: Some(pending),
                ..Default::default()
            };
            return Err(OracleError::ProviderConflict(Box::new(signal)));
        }

        let id_token = response
            .id_token
            .ok_or_else(|| OracleError::InvalidResponse("signInWithIdp returned no idToken".into()))?;

        let account = match self.lookup_account(&id_token).await {
            Ok(account) => account,
            Err(e) => {
                // Fall back to what signInWithIdp told us
                tracing::warn!(error = %e, "Account lookup failed after sign-in");
                Account {
                    id: response.local_id.ok_or_else(|| {
                        OracleError::InvalidResponse("signInWithIdp returned no localId".into())
                    })?,
                    display_name: response.display_name,
                    email: response.email,
                    photo_url: response.photo_url,
                    providers: vec![provider.as_str().to_string()],
                }
            }
        };

        self.replace_session(Some(ActiveSession {
            account: account.clone(),
            id_token,
        }));
        tracing::info!(account_id = %account.id, "Signed in");
        Ok(account)
    }

    async fn sign_out(&self) -> Result<(), OracleError> {
        self.replace_session(None);
        Ok(())
    }

    fn on_account_changed(&self, observer: AccountObserver) -> Subscription {
        self.observers.subscribe(observer)
    }

    #[tracing::instrument(skip(self, account, credential), fields(account_id = %account.id, provider = %credential.provider))]
    async fn verify_and_link_credential(
        &self,
        account: &Account,
        credential: PendingCredential,
    ) -> Result<Account, OracleError> {
        let session = self
            .active_session()
            .filter(|session| session.account.id == account.id)
            .ok_or_else(|| OracleError::Session("account is not the active session".into()))?;

        let response = self
            .sign_in_with_idp(&credential.post_body, Some(&session.id_token))
            .await?;
        let id_token = response.id_token.unwrap_or(session.id_token);
        let linked = self.lookup_account(&id_token).await?;

        self.replace_session(Some(ActiveSession {
            account: linked.clone(),
            id_token,
        }));
        tracing::info!(providers = ?linked.providers, "Credential linked");
        Ok(linked)
    }

    async fn lookup_providers_for_email(&self, email: &str) -> Result<Vec<String>, OracleError> {
        let request = CreateAuthUriRequest {
            identifier: email,
            continue_uri: &self.request_uri,
        };
        let response: CreateAuthUriResponse = self.call("createAuthUri", &request).await?;
        if response.signin_methods.is_empty() {
            Ok(response.all_providers)
        } else {
            Ok(response.signin_methods)
        }
    }
}
