mod common;

use atelier_storage::RemoteAssetStore;
use atelier_sync::BackupManager;
use common::Harness;

#[tokio::test]
async fn backup_copies_every_referenced_asset() {
    let h = Harness::new();
    let order = h.seeded_order("ORD-1", &["a.png", "b.png"]).await;
    let manager = BackupManager::new(h.store.clone(), h.cfg.clone());

    let report = manager
        .backup(order.id, &order.order_number, &order.configuration)
        .await;

    assert!(report.success());
    assert_eq!(report.copied_count, 2);
    assert_eq!(report.failed_count, 0);
    assert!(h
        .store
        .exists(&common::folder_key(order.id, "a.png"))
        .await
        .unwrap());
    assert!(h
        .store
        .exists(&common::folder_key(order.id, "b.png"))
        .await
        .unwrap());

    // The copy carries provenance metadata.
    let meta = h
        .store
        .metadata_of(&common::folder_key(order.id, "a.png"))
        .await
        .unwrap();
    assert_eq!(meta.get("original_key").unwrap(), "uploads/a.png");
    assert_eq!(meta.get("order_id").unwrap(), &order.id.to_string());
}

#[tokio::test]
async fn rerun_after_success_writes_nothing() {
    let h = Harness::new();
    let order = h.seeded_order("ORD-1", &["a.png", "b.png"]).await;
    let manager = BackupManager::new(h.store.clone(), h.cfg.clone());

    let first = manager
        .backup(order.id, &order.order_number, &order.configuration)
        .await;
    assert_eq!(first.copied_count, 2);
    let puts_after_first = h.store.put_calls();

    let second = manager
        .backup(order.id, &order.order_number, &order.configuration)
        .await;
    assert!(second.success());
    assert_eq!(second.copied_count, 0);
    assert_eq!(second.skipped_count, 2);
    assert_eq!(h.store.put_calls(), puts_after_first);
}

#[tokio::test]
async fn one_failing_asset_does_not_abort_the_batch() {
    let h = Harness::new();
    let order = h.seeded_order("ORD-1", &["a.png", "b.png", "c.png"]).await;
    h.store.fail_put(&common::folder_key(order.id, "b.png")).await;
    let manager = BackupManager::new(h.store.clone(), h.cfg.clone());

    let report = manager
        .backup(order.id, &order.order_number, &order.configuration)
        .await;

    assert!(!report.success());
    assert_eq!(report.copied_count, 2);
    assert_eq!(report.failed_count, 1);
    assert!(h
        .store
        .exists(&common::folder_key(order.id, "a.png"))
        .await
        .unwrap());
    assert!(h
        .store
        .exists(&common::folder_key(order.id, "c.png"))
        .await
        .unwrap());

    // A rerun after the fault clears converges without re-copying the rest.
    h.store.seed(&common::folder_key(order.id, "b.png"), "x").await;
    let rerun = manager
        .backup(order.id, &order.order_number, &order.configuration)
        .await;
    assert!(rerun.success());
    assert_eq!(rerun.skipped_count, 3);
}

#[tokio::test]
async fn hung_source_fetch_is_that_items_failure_only() {
    let h = common::StallingHarness::new();
    let order = common::order("ORD-1", common::snapshot(&["a.png", "b.png"], &[]));
    h.orders.insert(order.clone()).await;
    h.store.inner().seed(&common::source_key("a.png"), "x").await;
    h.store.inner().seed(&common::source_key("b.png"), "x").await;
    h.store.stall_key(&common::source_key("a.png")).await;

    let manager = BackupManager::new(h.store.clone(), h.cfg.clone());
    let report = tokio::time::timeout(
        std::time::Duration::from_secs(5),
        manager.backup(order.id, &order.order_number, &order.configuration),
    )
    .await
    .expect("run must finish despite the hung fetch");

    assert!(!report.success());
    assert_eq!(report.copied_count, 1);
    assert_eq!(report.failed_count, 1);
    let failed = report.details.iter().find(|d| !d.success).unwrap();
    assert!(failed.note.contains("timed out"));
    assert!(h
        .store
        .exists(&common::folder_key(order.id, "b.png"))
        .await
        .unwrap());
}

#[tokio::test]
async fn missing_source_is_reported_per_item() {
    let h = Harness::new();
    // Referenced but never uploaded.
    let order = common::order("ORD-1", common::snapshot(&["ghost.png"], &[]));
    h.orders.insert(order.clone()).await;
    let manager = BackupManager::new(h.store.clone(), h.cfg.clone());

    let report = manager
        .backup(order.id, &order.order_number, &order.configuration)
        .await;

    assert_eq!(report.failed_count, 1);
    assert!(report.details[0].note.contains("no longer exists"));
}
