//! Position allocation and compaction through the public operations

use super::*;

#[tokio::test]
async fn test_check_in_assigns_fifo_positions() {
    let manager = create_test_manager();

    let a = check_in(&manager, REST, "Ana").await;
    let b = check_in(&manager, REST, "Bruno").await;
    let c = check_in(&manager, REST, "Carla").await;

    assert_eq!(a.queue_position, Some(1));
    assert_eq!(b.queue_position, Some(2));
    assert_eq!(c.queue_position, Some(3));
    assert_contiguous(&manager, REST);
}

#[tokio::test]
async fn test_call_next_compacts_and_new_check_in_takes_tail() {
    // 3 parties at 1,2,3; call removes the head; remaining become 1,2;
    // a new check-in lands at 3
    let manager = create_test_manager();

    let a = check_in(&manager, REST, "Ana").await;
    check_in(&manager, REST, "Bruno").await;
    check_in(&manager, REST, "Carla").await;

    let called = manager.call_next(REST, &test_policy()).await.unwrap();
    assert_eq!(called.id, a.id);
    assert_eq!(
        waiting_positions(&manager, REST)
            .iter()
            .map(|(p, _)| *p)
            .collect::<Vec<_>>(),
        vec![1, 2]
    );

    let d = check_in(&manager, REST, "Diego").await;
    assert_eq!(d.queue_position, Some(3));
    assert_contiguous(&manager, REST);
}

#[tokio::test]
async fn test_leave_from_middle_compacts() {
    let manager = create_test_manager();

    check_in(&manager, REST, "Ana").await;
    let b = check_in(&manager, REST, "Bruno").await;
    let c = check_in(&manager, REST, "Carla").await;

    manager.leave(&b.id).await.unwrap();

    assert_contiguous(&manager, REST);
    let carla = manager.get_party(&c.id).unwrap();
    assert_eq!(carla.queue_position, Some(2));
}

#[tokio::test]
async fn test_contiguity_survives_mixed_operations() {
    let manager = create_test_manager();
    let policy = test_policy();

    let mut ids = Vec::new();
    for i in 0..6 {
        ids.push(check_in(&manager, REST, &format!("Party {i}")).await.id);
    }

    manager.leave(&ids[2]).await.unwrap();
    let called = manager.call_next(REST, &policy).await.unwrap();
    manager
        .mark_no_show(&called.id, NoShowTrigger::Staff)
        .await
        .unwrap();
    manager.reinsert(&called.id, &policy, None).await.unwrap();
    manager.leave(&ids[5]).await.unwrap();

    assert_contiguous(&manager, REST);
}

#[tokio::test]
async fn test_round_trip_reinsert_last() {
    // CheckIn → CallNext → MarkNoShow → Reinsert(LAST) leaves the party
    // waiting at currentMax+1, others only compacted by the earlier removal
    let manager = create_test_manager();
    let policy = test_policy();

    let a = check_in(&manager, REST, "Ana").await;
    let b = check_in(&manager, REST, "Bruno").await;
    let c = check_in(&manager, REST, "Carla").await;

    let called = manager.call_next(REST, &policy).await.unwrap();
    assert_eq!(called.id, a.id);
    manager
        .mark_no_show(&a.id, NoShowTrigger::Staff)
        .await
        .unwrap();

    let back = manager.reinsert(&a.id, &policy, None).await.unwrap();
    assert_eq!(back.status, PartyStatus::Waiting);
    assert_eq!(back.queue_position, Some(3));
    assert!(back.notified_at.is_none());
    assert!(back.removed_at.is_none());

    let entries = waiting_positions(&manager, REST);
    assert_eq!(
        entries,
        vec![(1, b.id.clone()), (2, c.id.clone()), (3, a.id.clone())]
    );
}

#[tokio::test]
async fn test_reinsert_first_pushes_queue_back() {
    let manager = create_test_manager();
    let policy = test_policy();

    let a = check_in(&manager, REST, "Ana").await;
    let b = check_in(&manager, REST, "Bruno").await;

    let called = manager.call_next(REST, &policy).await.unwrap();
    assert_eq!(called.id, a.id);
    manager
        .mark_no_show(&a.id, NoShowTrigger::Staff)
        .await
        .unwrap();

    let back = manager
        .reinsert(&a.id, &policy, Some(ReinsertionPolicy::First))
        .await
        .unwrap();
    assert_eq!(back.queue_position, Some(1));

    let entries = waiting_positions(&manager, REST);
    assert_eq!(entries, vec![(1, a.id.clone()), (2, b.id.clone())]);
    assert_contiguous(&manager, REST);
}

#[tokio::test]
async fn test_queue_full_rejects_check_in() {
    let manager = create_test_manager();
    let policy = capped_policy(2);

    for name in ["Ana", "Bruno"] {
        manager
            .check_in(
                REST,
                name.to_string(),
                "+34 600 111 222".to_string(),
                2,
                &policy,
            )
            .await
            .unwrap();
    }

    let err = manager
        .check_in(
            REST,
            "Carla".to_string(),
            "+34 600 111 222".to_string(),
            2,
            &policy,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, WaitlistError::QueueFull { capacity: 2, .. }));
}

#[tokio::test]
async fn test_capacity_counts_called_parties() {
    // cap covers WAITING + NEXT/READY: calling the head frees no slot
    let manager = create_test_manager();
    let policy = capped_policy(2);

    manager
        .check_in(REST, "Ana".into(), "+34 600 111 222".into(), 2, &policy)
        .await
        .unwrap();
    manager
        .check_in(REST, "Bruno".into(), "+34 600 111 222".into(), 2, &policy)
        .await
        .unwrap();
    manager.call_next(REST, &policy).await.unwrap();

    let err = manager
        .check_in(REST, "Carla".into(), "+34 600 111 222".into(), 2, &policy)
        .await
        .unwrap_err();
    assert!(matches!(err, WaitlistError::QueueFull { .. }));
}

#[tokio::test]
async fn test_call_next_on_empty_queue() {
    let manager = create_test_manager();
    let err = manager.call_next(REST, &test_policy()).await.unwrap_err();
    assert!(matches!(err, WaitlistError::EmptyQueue(_)));
}

#[tokio::test]
async fn test_restaurants_are_isolated() {
    let manager = create_test_manager();

    check_in(&manager, "rest-a", "Ana").await;
    let b1 = check_in(&manager, "rest-b", "Bruno").await;

    // 两家餐厅的位置互不影响
    assert_eq!(b1.queue_position, Some(1));
    manager.call_next("rest-a", &test_policy()).await.unwrap();
    assert_eq!(
        waiting_positions(&manager, "rest-b"),
        vec![(1, b1.id.clone())]
    );
}
