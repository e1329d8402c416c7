//! Sign-up, sign-in, sign-out and user checks against the in-memory backend.

mod support;

use std::sync::Arc;
use std::time::Duration;

use booking_client::domain::{
    AuthChange, AuthEvent, AuthState, ErrorCode, ProfileUpdate, RemoteSignOut, Session,
};
use rstest::rstest;
use support::{Harness, fixture_timestamp};

#[rstest]
#[tokio::test]
async fn sign_up_creates_profile_visible_to_check_user() {
    let harness = Harness::start().await;

    let profile = harness
        .sync
        .sign_up("a@b.com", "Secret123", "Ana")
        .await
        .expect("sign-up succeeds");

    assert!(harness.sync.check_user().await);
    let cached = harness.sync.profile().expect("profile cached");
    assert_eq!(cached.name, "Ana");
    assert_eq!(cached.email, "a@b.com");
    assert_eq!(cached.created_at, fixture_timestamp());
    assert_eq!(cached, profile);
}

#[rstest]
#[tokio::test]
async fn sign_up_without_profile_leaves_backend_signed_out() {
    let harness = Harness::start().await;
    harness.backend.fail_profile_upserts(true);

    let error = harness
        .sync
        .sign_up("a@b.com", "Secret123", "Ana")
        .await
        .expect_err("profile insert fails");

    assert_eq!(error.code(), ErrorCode::ProfileCreation);
    assert!(harness.backend.current_session().await.is_none());
    assert_eq!(harness.sync.state(), AuthState::Anonymous);
    assert!(!harness.sync.check_user().await);
}

#[rstest]
#[tokio::test]
async fn duplicate_sign_up_is_an_auth_error() {
    let harness = Harness::signed_up("a@b.com", "Ana").await;
    harness.sync.sign_out().await;

    let error = harness
        .sync
        .sign_up("A@B.com", "Secret123", "Ana Again")
        .await
        .expect_err("email taken");

    assert_eq!(error.code(), ErrorCode::Auth);
    assert_eq!(error.message(), "User already registered");
}

#[rstest]
#[tokio::test]
async fn sign_in_restores_profile() {
    let harness = Harness::signed_up("a@b.com", "Ana").await;
    harness.sync.sign_out().await;
    assert!(harness.sync.profile().is_none());

    harness
        .sync
        .sign_in("a@b.com", "secret123")
        .await
        .expect("sign-in succeeds");

    assert_eq!(harness.sync.profile().map(|p| p.name), Some("Ana".to_owned()));
}

#[rstest]
#[tokio::test]
async fn sign_out_clears_state_when_backend_succeeds() {
    let harness = Harness::signed_up("a@b.com", "Ana").await;

    let outcome = harness.sync.sign_out().await;

    assert_eq!(outcome, RemoteSignOut::Confirmed);
    assert_eq!(harness.sync.state(), AuthState::Anonymous);
    assert!(harness.backend.current_session().await.is_none());
}

#[rstest]
#[tokio::test]
async fn sign_out_clears_state_when_backend_fails() {
    let harness = Harness::signed_up("a@b.com", "Ana").await;
    harness.backend.fail_sign_out(true);

    let outcome = harness.sync.sign_out().await;

    assert!(outcome.is_pending());
    assert_eq!(harness.sync.state(), AuthState::Anonymous);
    assert!(harness.sync.profile().is_none());
    assert!(harness.backend.current_session().await.is_some());
    assert!(!harness.sync.check_user().await);

    harness.backend.fail_sign_out(false);
    assert_eq!(
        harness.sync.retry_remote_sign_out().await,
        RemoteSignOut::Confirmed
    );
    assert!(harness.backend.current_session().await.is_none());
}

#[rstest]
#[tokio::test]
async fn check_user_stays_false_without_session() {
    let harness = Harness::start().await;

    for _ in 0..3 {
        assert!(!harness.sync.check_user().await);
    }
    assert_eq!(harness.sync.state(), AuthState::Anonymous);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn sign_out_wins_over_in_flight_profile_fetch() {
    let harness = Harness::signed_up("a@b.com", "Ana").await;
    harness.sync.sign_out().await;
    harness.backend.delay_profile_reads(Duration::from_millis(50));

    let sync = Arc::clone(&harness.sync);
    let pending = tokio::spawn(async move { sync.sign_in("a@b.com", "secret123").await });
    tokio::time::sleep(Duration::from_millis(10)).await;
    harness.sync.sign_out().await;

    pending
        .await
        .expect("sign-in task joins")
        .expect("sign-in call succeeds");
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(harness.sync.state(), AuthState::Anonymous);
    assert!(harness.sync.profile().is_none());
}

#[rstest]
#[tokio::test]
async fn token_refresh_keeps_profile() {
    let harness = Harness::signed_up("a@b.com", "Ana").await;
    let session = harness.backend.current_session().await.expect("session");

    harness.backend.fail_profile_reads(true);
    harness
        .backend
        .emit(AuthChange::new(AuthEvent::TokenRefreshed, Some(session)));
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(harness.sync.profile().map(|p| p.name), Some("Ana".to_owned()));
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn token_refresh_during_profile_write_keeps_new_session() {
    let harness = Harness::signed_up("a@b.com", "Ana").await;
    let user_id = harness.sync.session().expect("session").user_id().clone();
    harness.backend.delay_profile_writes(Duration::from_millis(200));

    let sync = Arc::clone(&harness.sync);
    let pending = tokio::spawn(async move {
        sync.update_profile(ProfileUpdate::default().address("Rua Augusta 1"))
            .await
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    let renewed = Session::new(user_id, None, "renewed-access", "renewed-refresh", None);
    harness
        .backend
        .emit(AuthChange::new(AuthEvent::TokenRefreshed, Some(renewed)));
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(
        harness.sync.session().map(|s| s.access_token().to_owned()),
        Some("renewed-access".to_owned())
    );

    pending
        .await
        .expect("update task joins")
        .expect("update succeeds");

    assert_eq!(
        harness.sync.session().map(|s| s.access_token().to_owned()),
        Some("renewed-access".to_owned())
    );
    assert_eq!(
        harness.sync.profile().and_then(|p| p.address),
        Some("Rua Augusta 1".to_owned())
    );
}

#[rstest]
#[tokio::test]
async fn shutdown_stops_listening() {
    let harness = Harness::start().await;

    harness.sync.shutdown();
    tokio::time::timeout(Duration::from_secs(1), async {
        while harness.sync.is_listening() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("listener stops");
}
