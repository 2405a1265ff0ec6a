mod common;

use common::{audit, setup_store};
use storekeep::domain::{DomainError, VersionToken, Versioned};
use storekeep::models::product;
use storekeep::persistence::{CancelSignal, TrackedModel};

async fn seed_product(store: &storekeep::persistence::EntityStore) -> product::Model {
    store
        .add(
            &audit("seeder"),
            &CancelSignal::never(),
            product::Model::draft("SKU-1", "Widget", 1000),
        )
        .await
        .expect("seed product")
}

#[tokio::test]
async fn test_insert_assigns_id_and_version() {
    let store = setup_store().await;
    let created = seed_product(&store).await;

    assert!(created.id > 0);
    assert!(!created.version_token().is_empty());
}

#[tokio::test]
async fn test_update_issues_new_token() {
    let store = setup_store().await;
    let v0 = seed_product(&store).await;

    let mut changed = v0.clone();
    changed.price_cents = 1200;
    let v1 = store
        .update(
            &audit("alice"),
            &CancelSignal::never(),
            &changed,
            Some(&v0.version_token()),
        )
        .await
        .unwrap();

    assert_eq!(v1.price_cents, 1200);
    assert_ne!(v1.version_token(), v0.version_token());

    let stored = store
        .fetch::<product::Model>(&CancelSignal::never(), v0.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.version_token(), v1.version_token());
}

#[tokio::test]
async fn test_two_users_editing_the_same_record() {
    let store = setup_store().await;
    let seeded = seed_product(&store).await;

    // Both users load version v0
    let user_a = store
        .fetch::<product::Model>(&CancelSignal::never(), seeded.id)
        .await
        .unwrap()
        .unwrap();
    let user_b = store
        .fetch::<product::Model>(&CancelSignal::never(), seeded.id)
        .await
        .unwrap()
        .unwrap();
    let v0 = user_a.version_token();

    // A commits first: v0 -> v1
    let mut edit_a = user_a.clone();
    edit_a.name = "Widget (A)".into();
    let v1 = store
        .update(&audit("alice"), &CancelSignal::never(), &edit_a, Some(&v0))
        .await
        .unwrap();

    // B still holds v0 and is rejected by the conditional write
    let mut edit_b = user_b.clone();
    edit_b.name = "Widget (B)".into();
    let err = store
        .update(&audit("bob"), &CancelSignal::never(), &edit_b, Some(&v0))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Conflict { .. }), "{:?}", err);
    assert!(err.user_message().contains("changed by someone else"));

    // A's change is what the store holds
    let current = store
        .fetch::<product::Model>(&CancelSignal::never(), seeded.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(current.name, "Widget (A)");

    // B refetches and retries on v1 -> v2
    let mut edit_b = current.clone();
    edit_b.name = "Widget (B)".into();
    let v2 = store
        .update(
            &audit("bob"),
            &CancelSignal::never(),
            &edit_b,
            Some(&v1.version_token()),
        )
        .await
        .unwrap();

    assert_eq!(v2.name, "Widget (B)");
    assert_ne!(v2.version_token(), v1.version_token());
    assert_ne!(v2.version_token(), v0);
}

#[tokio::test]
async fn test_concurrent_updates_with_same_token() {
    let store = setup_store().await;
    let v0 = seed_product(&store).await;
    let token = v0.version_token();

    let mut first = v0.clone();
    first.price_cents = 1;
    let mut second = v0.clone();
    second.price_cents = 2;

    let (audit_a, audit_b) = (audit("alice"), audit("bob"));
    let never = CancelSignal::never();
    let (a, b) = tokio::join!(
        store.update(&audit_a, &never, &first, Some(&token)),
        store.update(&audit_b, &never, &second, Some(&token)),
    );

    let outcomes = [a, b];
    let successes = outcomes.iter().filter(|r| r.is_ok()).count();
    let conflicts = outcomes
        .iter()
        .filter(|r| matches!(r, Err(DomainError::Conflict { .. })))
        .count();
    assert_eq!(successes, 1);
    assert_eq!(conflicts, 1);

    let winner = outcomes.iter().find_map(|r| r.as_ref().ok()).unwrap();
    let stored = store
        .fetch::<product::Model>(&CancelSignal::never(), v0.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.price_cents, winner.price_cents);
}

#[tokio::test]
async fn test_repeating_an_update_is_a_conflict() {
    let store = setup_store().await;
    let v0 = seed_product(&store).await;

    let mut changed = v0.clone();
    changed.price_cents = 1500;
    let expected = v0.version_token();

    store
        .update(&audit("alice"), &CancelSignal::never(), &changed, Some(&expected))
        .await
        .unwrap();

    let err = store
        .update(&audit("alice"), &CancelSignal::never(), &changed, Some(&expected))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Conflict { .. }));
}

#[tokio::test]
async fn test_early_check_rejects_stale_expectation() {
    let store = setup_store().await;
    let v0 = seed_product(&store).await;
    let stale = VersionToken::from_hex("00112233").unwrap();

    let err = store
        .update(&audit("alice"), &CancelSignal::never(), &v0, Some(&stale))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Conflict { .. }));

    // Nothing was written
    let stored = store
        .fetch::<product::Model>(&CancelSignal::never(), v0.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.version_token(), v0.version_token());
    assert!(stored.modified_at.is_none());
}

#[tokio::test]
async fn test_empty_or_missing_token_is_validation() {
    let store = setup_store().await;
    let v0 = seed_product(&store).await;
    let empty = VersionToken::from_hex("").unwrap();

    let err = store
        .update(&audit("alice"), &CancelSignal::never(), &v0, Some(&empty))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));

    let err = store
        .update(&audit("alice"), &CancelSignal::never(), &v0, None)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));

    let stored = store
        .fetch::<product::Model>(&CancelSignal::never(), v0.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.version(), v0.version());
}

#[tokio::test]
async fn test_plain_update_cannot_touch_managed_columns() {
    let store = setup_store().await;
    let v0 = seed_product(&store).await;

    let mut tampered = v0.clone();
    tampered.name = "Renamed".into();
    tampered.created_by = Some("mallory".into());
    tampered.is_deleted = false;
    tampered.row_version = vec![0; 16];

    // The tampered token no longer matches what the caller expects
    let err = store
        .update(
            &audit("alice"),
            &CancelSignal::never(),
            &tampered,
            Some(&v0.version_token()),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Conflict { .. }));

    // With a consistent token only the user columns are written
    let mut tampered = v0.clone();
    tampered.name = "Renamed".into();
    tampered.created_by = Some("mallory".into());
    let saved = store
        .update(
            &audit("alice"),
            &CancelSignal::never(),
            &tampered,
            Some(&v0.version_token()),
        )
        .await
        .unwrap();
    assert_eq!(saved.name, "Renamed");
    assert_eq!(saved.created_by.as_deref(), Some("seeder"));
}
