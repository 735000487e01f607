use crate::common::*;
use lbd_auth::{
    CollisionMetadata, CollisionSignal, ConflictResolver, LinkOutcome, LinkingError,
    LinkingState, OracleError, ProviderIdentity, ProviderSource,
};
use proptest::prelude::*;

use ProviderIdentity::{GitHub, Google};

#[tokio::test]
async fn test_no_hints_and_no_lookup_signs_in_with_default_and_links() {
    let oracle = ScriptedOracle::new();
    oracle.push_sign_in(Google, Ok(account("uid-1", &[Google])));
    let resolver = ConflictResolver::new(oracle.clone()).with_default_provider(Google);

    let outcome = resolver.resolve(&github_collision()).await.unwrap();

    assert_eq!(outcome.state(), LinkingState::Resolved);
    assert_eq!(outcome.account().id, "uid-1");
    assert!(outcome.account().is_linked_to(GitHub));
    assert_eq!(
        oracle.calls(),
        vec!["lookup:u@x.com", "sign_in:google.com", "link:github.com"]
    );
}

#[tokio::test]
async fn test_already_linked_resolves_with_reauthenticated_account() {
    let oracle = ScriptedOracle::new();
    oracle.push_sign_in(GitHub, Ok(account("uid-2", &[GitHub])));
    oracle.push_link(Err(OracleError::AlreadyLinked(
        "FEDERATED_USER_ID_ALREADY_LINKED".to_string(),
    )));
    let resolver = ConflictResolver::new(oracle.clone());

    let signal = CollisionSignal::new(EMAIL)
        .with_hints(["github.com"])
        .with_credential(credential(Google));
    let outcome = resolver.resolve(&signal).await.unwrap();

    assert_eq!(outcome, LinkOutcome::Resolved(account("uid-2", &[GitHub])));
    assert_eq!(oracle.count("lookup"), 0);
}

#[tokio::test]
async fn test_missing_email_asks_for_existing_provider() {
    let oracle = ScriptedOracle::new();
    let resolver = ConflictResolver::new(oracle.clone());

    let signal = CollisionSignal {
        pending_credential: Some(credential(GitHub)),
        hints: vec!["google.com".to_string()],
        ..Default::default()
    };
    let err = resolver.resolve(&signal).await.unwrap_err();

    assert_eq!(err, LinkingError::MissingEmail);
    assert!(err.to_string().contains("existing provider"));
    assert!(oracle.calls().is_empty());
}

#[tokio::test]
async fn test_without_pending_credential_link_is_never_called() {
    let oracle = ScriptedOracle::new();
    oracle.push_sign_in(Google, Ok(account("uid-3", &[Google])));
    let resolver = ConflictResolver::new(oracle.clone());

    let signal = CollisionSignal::new(EMAIL).with_hints(["google.com"]);
    let outcome = resolver.resolve(&signal).await.unwrap();

    assert_eq!(outcome.state(), LinkingState::Resolved);
    assert_eq!(oracle.count("link"), 0);
}

#[tokio::test]
async fn test_repeated_resolve_is_idempotent() {
    let oracle = ScriptedOracle::new();
    oracle.push_sign_in(Google, Ok(account("uid-4", &[Google])));
    oracle.push_sign_in(Google, Ok(account("uid-4", &[Google, GitHub])));
    oracle.push_link(Err(OracleError::AlreadyLinked("CREDENTIAL_ALREADY_IN_USE".into())));
    oracle.push_link(Err(OracleError::AlreadyLinked("CREDENTIAL_ALREADY_IN_USE".into())));
    let resolver = ConflictResolver::new(oracle.clone());

    let signal = github_collision().with_hints(["google.com"]);
    let first = resolver.resolve(&signal).await.unwrap();
    let second = resolver.resolve(&signal).await.unwrap();

    assert_eq!(first.state(), LinkingState::Resolved);
    assert_eq!(second.state(), LinkingState::Resolved);
    assert_eq!(first.account().id, second.account().id);
    assert_eq!(oracle.count("link"), 2);
}

#[tokio::test]
async fn test_merge_failure_keeps_session_with_warning() {
    let oracle = ScriptedOracle::new();
    oracle.push_sign_in(Google, Ok(account("uid-5", &[Google])));
    oracle.push_link(Err(OracleError::Network("connection reset".into())));
    let resolver = ConflictResolver::new(oracle.clone());

    let outcome = resolver
        .resolve(&github_collision().with_hints(["Google"]))
        .await
        .unwrap();

    assert_eq!(outcome.state(), LinkingState::ResolvedWithoutMerge);
    assert_eq!(outcome.account().id, "uid-5");
    let warning = outcome.warning().unwrap();
    assert!(warning.starts_with("Signed in with Google, but your GitHub account could not be linked"));
    assert!(warning.contains("connection reset"));
}

#[tokio::test]
async fn test_reauthentication_failures_map_to_linking_errors() {
    let oracle = ScriptedOracle::new();
    oracle.push_sign_in(Google, Err(OracleError::UserCancelled));
    oracle.push_sign_in(Google, Err(OracleError::PopupBlocked));
    oracle.push_sign_in(
        Google,
        Err(OracleError::Provider {
            code: "INTERNAL".into(),
            message: "INTERNAL : boom".into(),
        }),
    );
    let resolver = ConflictResolver::new(oracle.clone());
    let signal = github_collision().with_hints(["google.com"]);

    assert_eq!(
        resolver.resolve(&signal).await.unwrap_err(),
        LinkingError::UserCancelled
    );
    assert_eq!(
        resolver.resolve(&signal).await.unwrap_err(),
        LinkingError::PopupBlocked
    );
    assert!(matches!(
        resolver.resolve(&signal).await.unwrap_err(),
        LinkingError::Unrecoverable { .. }
    ));
    assert_eq!(oracle.count("link"), 0);
}

#[tokio::test]
async fn test_email_from_metadata_and_lookup_provider() {
    let oracle = ScriptedOracle::new();
    oracle.set_lookup(Ok(vec!["github.com".into(), "google.com".into()]));
    let resolver = ConflictResolver::new(oracle.clone());

    let signal = CollisionSignal {
        metadata: CollisionMetadata {
            email: Some("meta@x.com".into()),
            ..Default::default()
        },
        ..Default::default()
    };
    let plan = resolver.plan(&signal).await.unwrap();

    assert_eq!(plan.email, "meta@x.com");
    assert_eq!(plan.existing_provider, GitHub);
    assert_eq!(plan.provider_source, ProviderSource::Lookup);
    assert_eq!(oracle.calls(), vec!["lookup:meta@x.com"]);
}

fn run<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

proptest! {
    /// Without hints, lookup results or verified providers the guess is always the default
    #[test]
    fn test_default_guess_is_deterministic(
        email in "[a-z0-9._%+-]{1,32}@[a-z0-9-]{1,32}\\.[a-z]{2,6}",
        github_default in proptest::bool::ANY,
    ) {
        let default = if github_default { GitHub } else { Google };
        let (first, second) = run(async {
            let resolver = ConflictResolver::new(ScriptedOracle::new()).with_default_provider(default);
            let signal = CollisionSignal::new(email.clone());
            let first = resolver.plan(&signal).await.unwrap();
            let second = resolver.plan(&signal).await.unwrap();
            (first, second)
        });

        prop_assert_eq!(first.existing_provider, default);
        prop_assert_eq!(second.existing_provider, default);
        prop_assert_eq!(first.provider_source, ProviderSource::Default);
        prop_assert_eq!(first.email, second.email);
    }

    /// A non-empty top-level email is never reported missing
    #[test]
    fn test_top_level_email_is_never_missing(
        email in "[a-z0-9]{1,16}@[a-z]{1,16}\\.com",
        padding in " {0,3}",
        meta in proptest::option::of("[a-z]{1,8}@x\\.com"),
    ) {
        let result = run(async {
            let resolver = ConflictResolver::new(ScriptedOracle::new());
            let mut signal = CollisionSignal::new(format!("{padding}{email}{padding}"));
            signal.metadata.email = meta.clone();
            resolver.plan(&signal).await
        });

        let plan = result.unwrap();
        prop_assert_eq!(plan.email, email);
    }
}
