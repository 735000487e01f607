use crate::common::*;
use lbd_auth::{AuthSessionController, LinkingError, OracleError, ProviderIdentity};

use ProviderIdentity::{GitHub, Google};

#[tokio::test]
async fn test_stale_notification_does_not_overwrite_resolved_account() {
    let oracle = ScriptedOracle::new();
    oracle.push_sign_in(
        GitHub,
        Err(OracleError::ProviderConflict(Box::new(
            github_collision().with_hints(["google.com"]),
        ))),
    );
    oracle.push_sign_in(Google, Ok(account("uid-final", &[Google])));
    let gate = oracle.gate(Google);

    let controller = AuthSessionController::new(oracle.clone());
    controller.attach();

    let (result, ()) = tokio::join!(controller.sign_in(GitHub), async {
        gate.entered.notified().await;
        // A superseded session snapshot arrives while re-authentication is in flight
        oracle
            .observers
            .announce(Some(&account("uid-stale", &[GitHub])));
        assert!(controller.snapshot().loading);
        gate.release.notify_one();
    });

    let account = result.unwrap();
    assert_eq!(account.id, "uid-final");
    assert!(account.is_linked_to(GitHub));

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.account, Some(account));
    assert!(!snapshot.loading);
    assert!(snapshot.error.is_none());
}

#[tokio::test]
async fn test_notification_held_during_failed_sign_in_is_applied() {
    let oracle = ScriptedOracle::new();
    oracle.push_sign_in(Google, Err(OracleError::UserCancelled));
    let gate = oracle.gate(Google);

    let controller = AuthSessionController::new(oracle.clone());
    controller.attach();

    let (result, ()) = tokio::join!(controller.sign_in(Google), async {
        gate.entered.notified().await;
        oracle
            .observers
            .announce(Some(&account("uid-other-tab", &[Google])));
        gate.release.notify_one();
    });

    assert_eq!(result.unwrap_err(), LinkingError::UserCancelled);
    let snapshot = controller.snapshot();
    assert_eq!(snapshot.account.map(|a| a.id), Some("uid-other-tab".to_string()));
    assert_eq!(
        snapshot.error.as_deref(),
        Some("Sign-in was cancelled. Please try again.")
    );
}

#[tokio::test]
async fn test_rapid_double_sign_in_last_completion_wins() {
    let oracle = ScriptedOracle::new();
    oracle.push_sign_in(Google, Ok(account("uid-g", &[Google])));
    oracle.push_sign_in(GitHub, Err(OracleError::PopupBlocked));
    let gate = oracle.gate(Google);

    let controller = AuthSessionController::new(oracle.clone());
    controller.attach();

    let (first, second, ()) = tokio::join!(
        controller.sign_in(Google),
        controller.sign_in(GitHub),
        async {
            gate.entered.notified().await;
            gate.release.notify_one();
        }
    );

    assert_eq!(second.unwrap_err(), LinkingError::PopupBlocked);
    assert_eq!(first.unwrap().id, "uid-g");

    let snapshot = controller.snapshot();
    assert!(!snapshot.loading);
    assert_eq!(snapshot.account.map(|a| a.id), Some("uid-g".to_string()));
    assert!(snapshot.error.is_none());
}

#[tokio::test]
async fn test_rapid_double_sign_in_failure_completing_last() {
    let oracle = ScriptedOracle::new();
    oracle.push_sign_in(Google, Ok(account("uid-g", &[Google])));
    oracle.push_sign_in(GitHub, Err(OracleError::PopupBlocked));
    let gate = oracle.gate(GitHub);

    let controller = AuthSessionController::new(oracle.clone());
    controller.attach();

    let (first, second, ()) = tokio::join!(
        controller.sign_in(GitHub),
        controller.sign_in(Google),
        async {
            gate.entered.notified().await;
            gate.release.notify_one();
        }
    );

    assert!(first.is_err());
    assert!(second.is_ok());

    let snapshot = controller.snapshot();
    assert!(!snapshot.loading);
    assert_eq!(snapshot.account.map(|a| a.id), Some("uid-g".to_string()));
    assert_eq!(
        snapshot.error.as_deref(),
        Some("Popup was blocked. Please allow popups and try again.")
    );
}

#[tokio::test]
async fn test_sign_out_is_idempotent() {
    let oracle = ScriptedOracle::new();
    oracle.push_sign_in(Google, Ok(account("uid-1", &[Google])));
    let controller = AuthSessionController::new(oracle.clone());
    controller.attach();

    controller.sign_in(Google).await.unwrap();
    controller.sign_out().await.unwrap();
    controller.sign_out().await.unwrap();

    let snapshot = controller.snapshot();
    assert!(snapshot.account.is_none());
    assert!(snapshot.error.is_none());
    assert!(snapshot.initialized);
    assert_eq!(oracle.count("sign_out"), 2);
}

#[tokio::test]
async fn test_detached_controller_ignores_notifications() {
    let oracle = ScriptedOracle::new();
    let controller = AuthSessionController::new(oracle.clone());
    controller.attach();
    controller.detach();

    oracle.observers.announce(Some(&account("uid-1", &[Google])));
    assert!(controller.snapshot().account.is_none());
}
