use std::time::Duration;

use gproxy_provider_core::credential::GeminiCliCredential;
use gproxy_provider_core::{
    AcquireError, Credential, CredentialPool, CredentialState, Event, EventHub, OperationalEvent,
    UnavailableReason,
};
use tokio::time::timeout;

fn test_credential() -> Credential {
    Credential::GeminiCli(GeminiCliCredential {
        access_token: "at".to_string(),
        refresh_token: "rt".to_string(),
        expires_at: 0,
        project_id: "proj".to_string(),
        client_id: "cid".to_string(),
        client_secret: "secret".to_string(),
        user_email: None,
    })
}

#[tokio::test]
async fn unavailable_recovers_via_queue() {
    let hub = EventHub::new(16);
    let mut rx = hub.subscribe();
    let pool = CredentialPool::new(hub.clone());

    pool.insert("test", 1, test_credential()).await;

    pool.mark_unavailable(1, Duration::from_millis(50), UnavailableReason::RateLimit)
        .await;

    let ev = timeout(Duration::from_millis(200), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(
        ev,
        Event::Operational(OperationalEvent::UnavailableStart(_))
    ));

    let ev = timeout(Duration::from_millis(500), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(
        ev,
        Event::Operational(OperationalEvent::UnavailableEnd(_))
    ));

    let state = pool.state(1).await.unwrap();
    assert!(matches!(state, CredentialState::Active));
}

#[tokio::test]
async fn stale_queue_entry_does_not_recover_early() {
    let hub = EventHub::new(32);
    let pool = CredentialPool::new(hub);

    pool.insert("test", 1, test_credential()).await;

    pool.mark_unavailable(1, Duration::from_millis(80), UnavailableReason::Timeout)
        .await;
    pool.mark_unavailable(1, Duration::from_millis(200), UnavailableReason::Timeout)
        .await;

    tokio::time::sleep(Duration::from_millis(120)).await;
    let state = pool.state(1).await.unwrap();
    assert!(matches!(state, CredentialState::Unavailable { .. }));

    tokio::time::sleep(Duration::from_millis(150)).await;
    let state = pool.state(1).await.unwrap();
    assert!(matches!(state, CredentialState::Active));
}

#[tokio::test]
async fn acquire_for_model_reports_all_in_cooldown_with_earliest_reset() {
    let hub = EventHub::new(16);
    let pool = CredentialPool::new(hub);

    pool.insert("test", 1, test_credential()).await;
    pool.insert("test", 2, test_credential()).await;

    let cooldown1 = pool.mark_capacity_limited(1, "model-a", None).await;
    let cooldown2 = pool
        .mark_capacity_limited(2, "model-a", Some(Duration::from_secs(2)))
        .await;
    assert!(cooldown1 > Duration::from_secs(0));
    assert_eq!(cooldown2, Duration::from_secs(2));

    let err = pool.acquire_for_model("test", "model-a").await.unwrap_err();
    match err {
        AcquireError::AllInCooldown { retry_after_ms } => {
            // Credential 2's explicit 2s hint is the nearer of the two.
            assert!(retry_after_ms <= 2_000);
            assert!(retry_after_ms > 0);
        }
        other => panic!("expected AllInCooldown, got {other:?}"),
    }

    // A different model is unaffected by the cooldowns above.
    let (id, _) = pool.acquire_for_model("test", "model-b").await.unwrap();
    assert!(id == 1 || id == 2);
}
