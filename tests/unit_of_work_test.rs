mod common;

use common::{audit, setup_store};
use sea_orm::Condition;
use storekeep::domain::{DomainError, Versioned};
use storekeep::models::{invoice, product};
use storekeep::persistence::CancelSignal;

#[tokio::test]
async fn test_batch_is_stamped_and_written_together() {
    let store = setup_store().await;

    let mut uow = store.begin(audit("alice")).await.unwrap();
    let lamp = uow
        .add(product::Model::draft("LAMP-1", "Lamp", 100))
        .unwrap();
    let bill = uow
        .add(invoice::Model::draft("INV-1", "ACME", 100))
        .unwrap();
    assert_eq!(uow.pending(), 2);

    assert_eq!(uow.save_changes().await.unwrap(), 2);
    assert_eq!(uow.save_changes().await.unwrap(), 0);

    let lamp = uow.entity(&lamp).unwrap();
    let bill = uow.entity(&bill).unwrap();
    assert_eq!(lamp.created_at, bill.created_at);
    assert!(!lamp.version_token().is_empty());

    // Reads inside the unit of work see its own writes
    assert!(uow.fetch::<product::Model>(lamp.id).await.unwrap().is_some());
    uow.commit().await.unwrap();

    assert!(
        store
            .fetch::<invoice::Model>(&CancelSignal::never(), bill.id)
            .await
            .unwrap()
            .is_some()
    );
}

#[tokio::test]
async fn test_one_rejected_write_aborts_the_batch() {
    let store = setup_store().await;
    let never = CancelSignal::never();

    let v0 = store
        .add(&audit("alice"), &never, product::Model::draft("SKU-1", "Widget", 100))
        .await
        .unwrap();
    let mut edit = v0.clone();
    edit.name = "Widget v1".into();
    store
        .update(&audit("alice"), &never, &edit, Some(&v0.version_token()))
        .await
        .unwrap();

    {
        let mut uow = store.begin(audit("bob")).await.unwrap();
        uow.add(product::Model::draft("SKU-2", "Gadget", 100)).unwrap();

        // Passes the in-memory check, fails at the store
        let mut stale = v0.clone();
        stale.name = "Widget (bob)".into();
        uow.update(&stale, Some(&v0.version_token())).unwrap();

        let err = uow.save_changes().await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict { .. }));
        uow.rollback().await.unwrap();
    }

    let all = store
        .find_including_deleted::<product::Model>(&CancelSignal::never(), Condition::all())
        .await
        .unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].name, "Widget v1");
}

#[tokio::test]
async fn test_commit_requires_saved_changes() {
    let store = setup_store().await;

    let mut uow = store.begin(audit("alice")).await.unwrap();
    uow.add(product::Model::draft("SKU-1", "Widget", 100)).unwrap();

    let err = uow.commit().await.unwrap_err();
    assert!(matches!(err, DomainError::Internal(_)));

    let all = store
        .find_including_deleted::<product::Model>(&CancelSignal::never(), Condition::all())
        .await
        .unwrap();
    assert!(all.is_empty());
}

#[tokio::test]
async fn test_queueing_checks_run_immediately() {
    let store = setup_store().await;
    let never = CancelSignal::never();

    let saved = store
        .add(&audit("alice"), &never, product::Model::draft("SKU-1", "Widget", 100))
        .await
        .unwrap();

    let mut uow = store.begin(audit("alice")).await.unwrap();

    let err = uow.update(&saved, None).unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));

    let mut deleted = saved.clone();
    deleted.is_deleted = true;
    let err = uow.delete(&deleted).unwrap_err();
    assert!(matches!(err, DomainError::NotFound { .. }));

    assert_eq!(uow.pending(), 0);
    uow.rollback().await.unwrap();
}
