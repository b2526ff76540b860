//! End-to-end engine flow against on-disk storage

use std::sync::Arc;

use waitlist_server::db::DbService;
use waitlist_server::db::models::RestaurantCreate;
use waitlist_server::db::repository::RestaurantRepository;
use waitlist_server::waitlist::{
    LogNotifier, NoShowTrigger, PartyStatus, QueueService, ReinsertionPolicy, WaitlistManager,
};
use shared::waitlist::CheckInRequest;

async fn registry_with_restaurant(tolerance_minutes: u32) -> (RestaurantRepository, String) {
    let db = DbService::new_in_memory().await.unwrap();
    let repo = RestaurantRepository::new(db.db);
    let restaurant = repo
        .create(RestaurantCreate {
            name: "Mesa Flow".to_string(),
            tolerance_minutes: Some(tolerance_minutes),
            reinsertion_policy: Some(ReinsertionPolicy::Last),
            max_queue_size: None,
        })
        .await
        .unwrap();
    let key = restaurant.key().unwrap();
    (repo, key)
}

fn check_in_payload(name: &str) -> CheckInRequest {
    CheckInRequest {
        name: name.to_string(),
        phone: "+34 600 123 456".to_string(),
        party_size: 2,
    }
}

#[tokio::test]
async fn test_full_queue_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("waitlist.redb");

    let (repo, rest) = registry_with_restaurant(2).await;
    let manager = Arc::new(WaitlistManager::new(&db_path, Arc::new(LogNotifier)).unwrap());
    let service = QueueService::new(manager.clone(), repo);

    // three parties queue up
    let a = service.check_in(&rest, check_in_payload("Ana")).await.unwrap();
    let b = service.check_in(&rest, check_in_payload("Bruno")).await.unwrap();
    let c = service.check_in(&rest, check_in_payload("Carla")).await.unwrap();
    assert_eq!(
        (a.queue_position, b.queue_position, c.queue_position),
        (Some(1), Some(2), Some(3))
    );

    // head is called, promoted, arrives
    let called = service.call_next(&rest).await.unwrap();
    assert_eq!(called.id, a.id);
    service.mark_ready(&a.id).await.unwrap();
    let seated = service.confirm_arrival(&a.id).await.unwrap();
    assert_eq!(seated.status, PartyStatus::Seated);

    // snapshot after compaction: Bruno and Carla at 1,2
    let snapshot = service.queue_snapshot(&rest).await.unwrap();
    assert_eq!(snapshot.waiting.len(), 2);
    assert_eq!(snapshot.waiting[0].id, b.id);
    assert_eq!(snapshot.waiting[0].queue_position, Some(1));
    assert_eq!(snapshot.waiting[1].queue_position, Some(2));
    assert!(snapshot.called.is_empty());

    // next party no-shows and rejoins at the tail
    let called = service.call_next(&rest).await.unwrap();
    assert_eq!(called.id, b.id);
    service
        .mark_no_show(&b.id, NoShowTrigger::Staff)
        .await
        .unwrap();
    let back = service.reinsert(&b.id, None).await.unwrap();
    assert_eq!(back.queue_position, Some(2));

    let snapshot = service.queue_snapshot(&rest).await.unwrap();
    let order: Vec<&str> = snapshot.waiting.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(order, vec![c.id.as_str(), b.id.as_str()]);
}

#[tokio::test]
async fn test_deadline_survives_restart() {
    // 容忍截止时间是数据，不是进程内定时器：重启后的清扫照样兑现
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("waitlist.redb");

    let (repo, rest) = registry_with_restaurant(1).await;

    let party_id = {
        let manager = Arc::new(WaitlistManager::new(&db_path, Arc::new(LogNotifier)).unwrap());
        let service = QueueService::new(manager.clone(), repo.clone());
        let a = service.check_in(&rest, check_in_payload("Ana")).await.unwrap();
        service.call_next(&rest).await.unwrap();

        // backdate the call stamp past 1min + 30s grace
        let storage = manager.storage();
        let mut party = storage.get_party(&a.id).unwrap().unwrap();
        party.notified_at = Some(party.notified_at.unwrap() - 91_000);
        let txn = storage.begin_write().unwrap();
        storage.store_party(&txn, &party).unwrap();
        txn.commit().unwrap();
        a.id
        // manager and service drop here, releasing the database file
    };

    // "restart": fresh manager over the same file
    let manager = Arc::new(WaitlistManager::new(&db_path, Arc::new(LogNotifier)).unwrap());
    let service = QueueService::new(manager.clone(), repo);

    let report = service.run_sweep().await.unwrap();
    assert_eq!(report.scanned, 1);
    assert_eq!(report.expired, 1);
    assert_eq!(
        manager.get_party(&party_id).unwrap().status,
        PartyStatus::NoShow
    );
}

#[tokio::test]
async fn test_epoch_changes_across_restart() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("waitlist.redb");

    let first_epoch = {
        let manager = WaitlistManager::new(&db_path, Arc::new(LogNotifier)).unwrap();
        manager.epoch().to_string()
    };
    let manager = WaitlistManager::new(&db_path, Arc::new(LogNotifier)).unwrap();
    // 客户端靠 epoch 变化检测重启并全量重新同步
    assert_ne!(manager.epoch(), first_epoch);
}
