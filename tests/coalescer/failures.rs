use std::time::Duration;

use serde_json::json;

use super::fakes::RecordingStore;
use tintward::error::{QueueError, StoreError};
use tintward::store::{CoalescerConfig, WriteCoalescer};

#[tokio::test(start_paused = true)]
async fn failed_batch_rejects_only_its_own_entries() {
    let store = RecordingStore::new();
    store.fail_next_sets(1);
    let coalescer = WriteCoalescer::new(store.clone(), CoalescerConfig::default());

    let writes: Vec<_> = (0..7)
        .map(|i| coalescer.write(format!("k{i}"), json!(i)))
        .collect();
    let mut outcomes = Vec::new();
    for write in writes {
        outcomes.push(write.await);
    }

    let expected = QueueError::Store(StoreError::Write("injected write failure".into()));
    for outcome in &outcomes[..5] {
        assert_eq!(outcome, &Err(expected.clone()));
    }
    for outcome in &outcomes[5..] {
        assert_eq!(outcome, &Ok(()));
    }

    // Failed entries are not re-queued.
    assert!(store.value("k0").is_none());
    assert_eq!(store.value("k6"), Some(json!(6)));
    assert_eq!(store.set_calls().len(), 2);

    let stats = coalescer.stats().await.unwrap();
    assert_eq!(stats.failed_flushes, 1);
    assert_eq!(stats.flushes, 1);
}

#[tokio::test(start_paused = true)]
async fn clear_queue_rejects_pending_writes_and_disarms_timer() {
    let store = RecordingStore::new();
    let coalescer = WriteCoalescer::new(store.clone(), CoalescerConfig::default());

    // Opens a throttle window so the next writes have to wait.
    coalescer.write("first", json!(1)).await.unwrap();

    let pending = [
        coalescer.write("second", json!(2)),
        coalescer.write("third", json!(3)),
    ];
    assert_eq!(coalescer.clear_queue().await, Ok(2));
    for write in pending {
        assert_eq!(write.await, Err(QueueError::Cleared));
    }

    let stats = coalescer.stats().await.unwrap();
    assert_eq!(stats.queued, 0);
    assert!(!stats.timer_armed);
    assert_eq!(stats.cleared, 2);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(store.set_calls().len(), 1);
    assert!(store.value("second").is_none());
}

#[tokio::test(start_paused = true)]
async fn clear_does_not_touch_a_flush_in_flight() {
    let store = RecordingStore::new();
    store.set_latency(Duration::from_millis(500));
    let coalescer = WriteCoalescer::new(store.clone(), CoalescerConfig::default());

    let in_flight = coalescer.write("a", json!(1));
    tokio::time::sleep(Duration::from_millis(100)).await;

    // The acknowledgement waits for the flush that was already running.
    assert_eq!(coalescer.clear_queue().await, Ok(0));
    assert_eq!(store.value("a"), Some(json!(1)));
    assert_eq!(in_flight.await, Ok(()));
    assert_eq!(coalescer.stats().await.unwrap().cleared, 0);
}

#[tokio::test(start_paused = true)]
async fn writes_after_a_clear_still_flush() {
    let store = RecordingStore::new();
    let coalescer = WriteCoalescer::new(store.clone(), CoalescerConfig::default());

    coalescer.write("a", json!(1)).await.unwrap();
    let dropped = coalescer.write("b", json!(2));
    coalescer.clear_queue();
    assert_eq!(dropped.await, Err(QueueError::Cleared));

    coalescer.write("c", json!(3)).await.unwrap();
    assert_eq!(store.value("c"), Some(json!(3)));
    assert!(store.value("b").is_none());
}

#[tokio::test(start_paused = true)]
async fn dropped_outcome_does_not_cancel_the_write() {
    let store = RecordingStore::new();
    let coalescer = WriteCoalescer::new(store.clone(), CoalescerConfig::default());

    drop(coalescer.write("fire-and-forget", json!(true)));
    coalescer.write("awaited", json!(true)).await.unwrap();

    assert_eq!(store.value("fire-and-forget"), Some(json!(true)));
}
