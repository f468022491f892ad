//! Integration tests for core-async on native platforms.
//!
//! These tests verify that the async abstraction works correctly with Tokio.

use core_async::{sync, task, time, CancellationToken};
use std::sync::Arc;

#[core_async::test]
async fn test_task_spawn() {
    let handle = task::spawn(async { 42 });
    let result = handle.await.unwrap();
    assert_eq!(result, 42);
}

#[core_async::test]
async fn test_sleep() {
    let start = time::Instant::now();
    time::sleep(time::Duration::from_millis(50)).await;
    let elapsed = start.elapsed();
    assert!(elapsed >= time::Duration::from_millis(50));
    assert!(elapsed < time::Duration::from_millis(150)); // Allow some slack
}

#[core_async::test(start_paused)]
async fn test_paused_clock_advances_instantly() {
    let start = time::Instant::now();
    time::sleep(time::Duration::from_secs(10)).await;
    assert_eq!(start.elapsed(), time::Duration::from_secs(10));
}

#[core_async::test(start_paused)]
async fn test_timeout_failure() {
    let result = time::timeout(time::Duration::from_millis(2000), async {
        time::sleep(time::Duration::from_millis(5000)).await;
        42
    })
    .await;

    assert!(result.is_err());
}

#[core_async::test(start_paused)]
async fn test_sleep_until_deadline() {
    let start = time::Instant::now();
    let deadline = start + time::millis(10_000);
    time::sleep_until(deadline).await;
    assert_eq!(time::Instant::now(), deadline);
}

#[core_async::test(start_paused)]
async fn test_select_prefers_cancellation() {
    let token = CancellationToken::new();
    let canceller = token.clone();

    task::spawn(async move {
        time::sleep(time::Duration::from_millis(30)).await;
        canceller.cancel();
    });

    let start = time::Instant::now();
    let cancelled = core_async::select! {
        biased;
        _ = token.cancelled() => true,
        _ = time::sleep(time::Duration::from_secs(10)) => false,
    };

    assert!(cancelled);
    assert_eq!(start.elapsed(), time::Duration::from_millis(30));
}

#[core_async::test]
async fn test_cancellation_token_clones_share_state() {
    let token = CancellationToken::new();
    let child = token.child_token();
    let clone = token.clone();

    assert!(!clone.is_cancelled());
    token.cancel();
    assert!(clone.is_cancelled());
    assert!(child.is_cancelled());
    // Already cancelled: resolves immediately.
    clone.cancelled().await;
}

#[core_async::test]
async fn test_broadcast_channel() {
    let (tx, mut rx1) = sync::broadcast::channel(10);
    let mut rx2 = tx.subscribe();

    task::spawn(async move {
        for i in 0..5 {
            tx.send(i).unwrap();
        }
    });

    let mut values1 = vec![];
    let mut values2 = vec![];

    for _ in 0..5 {
        values1.push(rx1.recv().await.unwrap());
        values2.push(rx2.recv().await.unwrap());
    }

    assert_eq!(values1, vec![0, 1, 2, 3, 4]);
    assert_eq!(values2, vec![0, 1, 2, 3, 4]);
}

#[core_async::test]
async fn test_broadcast_receiver_count_tracks_drops() {
    let (tx, _) = sync::broadcast::channel::<u8>(4);
    let rx = tx.subscribe();
    assert_eq!(tx.receiver_count(), 1);
    drop(rx);
    assert_eq!(tx.receiver_count(), 0);
}

#[core_async::test(start_paused)]
async fn test_watch_wait_for() {
    let (tx, mut rx) = sync::watch::channel(3usize);

    task::spawn(async move {
        for remaining in (0..3).rev() {
            time::sleep(time::Duration::from_millis(10)).await;
            tx.send_replace(remaining);
        }
        // Keep the sender alive until the waiter observed zero.
        time::sleep(time::Duration::from_secs(1)).await;
    });

    let value = *rx.wait_for(|count| *count == 0).await.unwrap();
    assert_eq!(value, 0);
}

#[core_async::test]
async fn test_concurrent_task_execution() {
    let counter = Arc::new(sync::Mutex::new(0));
    let mut handles = vec![];

    for _ in 0..10 {
        let counter_clone = counter.clone();
        let handle = task::spawn(async move {
            let mut guard = counter_clone.lock().await;
            *guard += 1;
        });
        handles.push(handle);
    }

    for handle in handles {
        handle.await.unwrap();
    }

    let final_count = *counter.lock().await;
    assert_eq!(final_count, 10);
}

#[core_async::test]
async fn test_abort_stops_task() {
    let handle = task::spawn(async {
        time::sleep(time::Duration::from_secs(60)).await;
    });
    handle.abort();
    assert!(handle.await.unwrap_err().is_cancelled());
}

#[test]
fn test_in_runtime_detection() {
    assert!(!core_async::runtime::in_runtime());
    core_async::runtime::block_on(async {
        assert!(core_async::runtime::in_runtime());
    });
}

#[core_async::test]
async fn test_time_utilities() {
    assert!(time::now_millis() > 0);
    assert_eq!(time::millis(250), time::Duration::from_millis(250));
}
