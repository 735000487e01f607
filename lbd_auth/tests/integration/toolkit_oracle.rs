use crate::common::*;
use async_trait::async_trait;
use lbd_auth::{
    AuthSessionController, ConflictResolver, IdentityOracle, IdentityToolkitOracle,
    LinkingState, OracleError, ProviderCredential, ProviderIdentity, ProviderPrompt,
};
use std::sync::Arc;

use ProviderIdentity::{GitHub, Google};

/// Hands out a fixed token per provider, as a completed popup would
struct AutoPrompt;

#[async_trait]
impl ProviderPrompt for AutoPrompt {
    async fn request_credential(
        &self,
        provider: ProviderIdentity,
    ) -> Result<ProviderCredential, OracleError> {
        Ok(ProviderCredential {
            provider,
            id_token: Some(format!("idp-{}", provider.display_name())),
            access_token: None,
        })
    }
}

async fn oracle() -> (Arc<IdentityToolkitOracle>, MockToolkit) {
    let mock = MockToolkit::start().await;
    let oracle = IdentityToolkitOracle::new("test-key", Arc::new(AutoPrompt))
        .with_base_url(&mock.base_url)
        .with_request_uri("http://localhost:5000");
    (Arc::new(oracle), mock)
}

#[tokio::test]
async fn test_sign_in_looks_up_account() {
    let (oracle, mock) = oracle().await;

    let account = oracle.sign_in(Google).await.unwrap();

    assert_eq!(account.id, "uid-google");
    assert_eq!(account.providers, vec!["google.com"]);
    assert_eq!(oracle.current_account(), Some(account));
    assert_eq!(mock.calls(), vec!["signInWithIdp", "lookup"]);
}

#[tokio::test]
async fn test_need_confirmation_becomes_provider_conflict() {
    let (oracle, _mock) = oracle().await;

    let err = oracle.sign_in(GitHub).await.unwrap_err();
    let OracleError::ProviderConflict(signal) = err else {
        panic!("Expected ProviderConflict, got {err:?}");
    };

    assert_eq!(signal.email.as_deref(), Some(EMAIL));
    assert_eq!(signal.attempted_provider, Some(GitHub));
    assert_eq!(signal.token_response.verified_providers, vec!["google.com"]);
    let pending = signal.pending_credential.unwrap();
    assert_eq!(pending.provider, "github.com");
    assert!(pending.post_body.contains("id_token=idp-GitHub"));
    assert!(oracle.current_account().is_none());
}

#[tokio::test]
async fn test_lookup_providers_for_email() {
    let (oracle, mock) = oracle().await;
    mock.state.lock().unwrap().signin_methods = vec!["github.com".to_string()];

    let providers = oracle.lookup_providers_for_email(EMAIL).await.unwrap();
    assert_eq!(providers, vec!["github.com"]);
}

#[tokio::test]
async fn test_collision_resolves_and_links_end_to_end() {
    let (oracle, mock) = oracle().await;
    let resolver = ConflictResolver::new(oracle.clone());

    let OracleError::ProviderConflict(signal) = oracle.sign_in(GitHub).await.unwrap_err() else {
        panic!("Expected ProviderConflict");
    };
    let outcome = resolver.resolve(&signal).await.unwrap();

    assert_eq!(outcome.state(), LinkingState::Resolved);
    assert_eq!(outcome.account().providers, vec!["google.com", "github.com"]);
    assert_eq!(
        mock.calls(),
        vec![
            "signInWithIdp",
            "createAuthUri",
            "signInWithIdp",
            "lookup",
            "signInWithIdp",
            "lookup"
        ]
    );

    // Linked now, so GitHub signs straight in
    let account = oracle.sign_in(GitHub).await.unwrap();
    assert!(account.is_linked_to(GitHub));
}

#[tokio::test]
async fn test_already_linked_code_resolves_through_controller() {
    let (oracle, mock) = oracle().await;
    mock.state.lock().unwrap().link_error = Some("FEDERATED_USER_ID_ALREADY_LINKED".to_string());

    let controller = AuthSessionController::new(oracle.clone());
    controller.attach();
    let account = controller.sign_in(GitHub).await.unwrap();

    assert_eq!(account.id, "uid-google");
    let snapshot = controller.snapshot();
    assert_eq!(snapshot.account, Some(account));
    assert!(snapshot.warning.is_none());
    assert!(snapshot.error.is_none());
}

#[tokio::test]
async fn test_link_failure_surfaces_as_warning() {
    let (oracle, mock) = oracle().await;
    mock.state.lock().unwrap().link_error = Some("INVALID_IDP_RESPONSE : bad token".to_string());

    let controller = AuthSessionController::new(oracle.clone());
    let account = controller.sign_in(GitHub).await.unwrap();

    assert_eq!(account.providers, vec!["google.com"]);
    let warning = controller.snapshot().warning.unwrap();
    assert!(warning.contains("your GitHub account could not be linked"));
    assert!(warning.contains("INVALID_IDP_RESPONSE"));
}

#[tokio::test]
async fn test_invalid_api_key_is_a_provider_error() {
    let mock = MockToolkit::start().await;
    let oracle = IdentityToolkitOracle::new("wrong-key", Arc::new(AutoPrompt))
        .with_base_url(&mock.base_url);

    let err = oracle.sign_in(Google).await.unwrap_err();
    assert!(matches!(err, OracleError::Provider { ref code, .. } if code == "API_KEY_INVALID"));
}

#[tokio::test]
async fn test_sign_out_clears_session() {
    let (oracle, _mock) = oracle().await;
    oracle.sign_in(Google).await.unwrap();

    oracle.sign_out().await.unwrap();
    oracle.sign_out().await.unwrap();
    assert!(oracle.current_account().is_none());
}
