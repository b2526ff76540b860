//! Races the engine must win: concurrent claims, concurrent check-ins,
//! staff-vs-sweep contention

use super::*;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_at_most_one_claim() {
    // N concurrent call-next with a single waiting party: exactly one
    // wins, the rest observe an empty queue
    let manager = Arc::new(create_test_manager());
    check_in(&manager, REST, "Only").await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let m = manager.clone();
        handles.push(tokio::spawn(async move {
            m.call_next(REST, &test_policy()).await
        }));
    }

    let mut claimed = 0;
    let mut empty = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => claimed += 1,
            Err(WaitlistError::EmptyQueue(_)) => empty += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(claimed, 1);
    assert_eq!(empty, 7);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_check_ins_stay_contiguous() {
    let manager = Arc::new(create_test_manager());

    let mut handles = Vec::new();
    for i in 0..10 {
        let m = manager.clone();
        handles.push(tokio::spawn(async move {
            m.check_in(
                REST,
                format!("Party {i}"),
                "+34 600 111 222".to_string(),
                2,
                &test_policy(),
            )
            .await
            .unwrap()
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let entries = waiting_positions(&manager, REST);
    assert_eq!(entries.len(), 10);
    assert_contiguous(&manager, REST);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_staff_and_sweep_contend_for_one_party() {
    // ConfirmArrival 与 MarkNoShow 争同一行：恰好一方成功，
    // 输家拿到的错误是良性冲突
    let manager = Arc::new(create_test_manager());
    let a = check_in(&manager, REST, "Ana").await;
    manager.call_next(REST, &test_policy()).await.unwrap();

    let m1 = manager.clone();
    let id1 = a.id.clone();
    let staff = tokio::spawn(async move { m1.confirm_arrival(&id1).await });
    let m2 = manager.clone();
    let id2 = a.id.clone();
    let sweep =
        tokio::spawn(async move { m2.mark_no_show(&id2, NoShowTrigger::Sweep).await });

    let results = [staff.await.unwrap(), sweep.await.unwrap()];
    let wins = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(wins, 1);
    for result in &results {
        if let Err(e) = result {
            assert!(e.is_benign_conflict(), "loser must see a benign conflict: {e}");
        }
    }

    let final_status = manager.get_party(&a.id).unwrap().status;
    assert!(matches!(
        final_status,
        PartyStatus::Seated | PartyStatus::NoShow
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_restaurants_proceed_in_parallel() {
    // 不同餐厅的操作互不阻塞也互不污染
    let manager = Arc::new(create_test_manager());

    let mut handles = Vec::new();
    for r in 0..4 {
        let m = manager.clone();
        handles.push(tokio::spawn(async move {
            let rest = format!("rest-{r}");
            for i in 0..5 {
                m.check_in(
                    &rest,
                    format!("Party {i}"),
                    "+34 600 111 222".to_string(),
                    2,
                    &test_policy(),
                )
                .await
                .unwrap();
            }
            m.call_next(&rest, &test_policy()).await.unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    for r in 0..4 {
        let rest = format!("rest-{r}");
        assert_eq!(waiting_positions(&manager, &rest).len(), 4);
        assert_contiguous(&manager, &rest);
        assert_eq!(manager.storage().called_ids(&rest).unwrap().len(), 1);
    }
}
