mod common;

use common::{audit_with, setup_store, test_clock};
use storekeep::domain::{Auditable, Versioned};
use storekeep::models::product;
use storekeep::persistence::CancelSignal;

#[tokio::test]
async fn test_created_stamps_are_set_once() {
    let store = setup_store().await;
    let clock = test_clock();
    let never = CancelSignal::never();

    let v0 = store
        .add(
            &audit_with("alice", &clock),
            &never,
            product::Model::draft("SKU-1", "Widget", 100),
        )
        .await
        .unwrap();
    let created = v0.created().expect("creation stamp");
    assert_eq!(created.by, "alice");
    assert!(v0.modified().is_none());

    let mut edit = v0.clone();
    edit.price_cents = 200;
    let v1 = store
        .update(
            &audit_with("bob", &clock),
            &never,
            &edit,
            Some(&v0.version_token()),
        )
        .await
        .unwrap();

    assert_eq!(v1.created(), Some(created.clone()));
    let first_edit = v1.modified().expect("modification stamp");
    assert_eq!(first_edit.by, "bob");
    assert!(first_edit.at > created.at);

    let mut edit = v1.clone();
    edit.price_cents = 300;
    let v2 = store
        .update(
            &audit_with("carol", &clock),
            &never,
            &edit,
            Some(&v1.version_token()),
        )
        .await
        .unwrap();

    assert_eq!(v2.created(), Some(created));
    let second_edit = v2.modified().unwrap();
    assert_eq!(second_edit.by, "carol");
    assert!(second_edit.at > first_edit.at);
}

#[tokio::test]
async fn test_soft_delete_stamps_modification() {
    let store = setup_store().await;
    let clock = test_clock();
    let never = CancelSignal::never();

    let v0 = store
        .add(
            &audit_with("alice", &clock),
            &never,
            product::Model::draft("SKU-1", "Widget", 100),
        )
        .await
        .unwrap();

    store
        .delete(&audit_with("dave", &clock), &never, &v0)
        .await
        .unwrap();

    let archived = store
        .fetch_including_deleted::<product::Model>(&CancelSignal::never(), v0.id)
        .await
        .unwrap()
        .unwrap();
    let modified = archived.modified().unwrap();
    assert_eq!(modified.by, "dave");
    assert_eq!(archived.deleted_at, Some(modified.at));
    assert_eq!(archived.created(), v0.created());
}

#[tokio::test]
async fn test_caller_supplied_stamps_are_overwritten() {
    let store = setup_store().await;
    let clock = test_clock();

    let forged = chrono::Utc::now() - chrono::Duration::days(365);
    let mut draft = product::Model::draft("SKU-1", "Widget", 100);
    draft.created_at = Some(forged);
    draft.created_by = Some("mallory".into());
    draft.modified_at = Some(forged);
    draft.modified_by = Some("mallory".into());
    draft.deleted_at = Some(forged);
    draft.deleted_by = Some("mallory".into());

    let saved = store
        .add(&audit_with("alice", &clock), &CancelSignal::never(), draft)
        .await
        .unwrap();
    assert_eq!(saved.created_by.as_deref(), Some("alice"));
    assert_ne!(saved.created_at, Some(forged));
    assert!(saved.modified_at.is_none());
    assert!(saved.modified_by.is_none());
    assert!(!saved.is_deleted);
    assert!(saved.deleted_at.is_none());
    assert!(saved.deleted_by.is_none());

    let stored = store
        .fetch::<product::Model>(&CancelSignal::never(), saved.id)
        .await
        .unwrap()
        .expect("new product is visible");
    assert!(stored.modified_by.is_none());
    assert!(stored.deleted_by.is_none());
}
