use std::time::Duration;

use serde_json::json;
use tokio::time::Instant;

use super::Harness;
use super::fakes::RecordingStore;
use tintward::controller::TabEvent;
use tintward::messaging::PageRequest;
use tintward::settings::ColorScheme;
use tintward::store::StoreMap;

fn pushed_scheme(request: &PageRequest) -> Option<ColorScheme> {
    match request {
        PageRequest::UpdateColorScheme { settings } => Some(settings.color_scheme),
        PageRequest::UpdateProtectionSettings { .. } | PageRequest::ResetSettings => None,
    }
}

#[tokio::test(start_paused = true)]
async fn loading_tab_gets_settings_after_the_ready_delay() {
    let mut entries = StoreMap::new();
    entries.insert("domain_news.example".into(), json!({"colorScheme": "sepia"}));
    let mut harness = Harness::with_store(RecordingStore::with_entries(entries));
    let started = Instant::now();

    let task = harness
        .controller
        .handle_tab_event(TabEvent::Loading {
            tab_id: 1,
            url: "https://news.example/today".into(),
        })
        .await
        .expect("delivery task is started");
    task.await.unwrap();

    assert!(started.elapsed() >= Duration::from_millis(50));
    let sent = harness.transport.sent_to(1);
    assert_eq!(sent.len(), 1);
    assert_eq!(pushed_scheme(&sent[0]), Some(ColorScheme::Sepia));
    assert_eq!(
        harness.controller.active_tab(1).unwrap().domain.as_deref(),
        Some("news.example")
    );
}

#[tokio::test(start_paused = true)]
async fn new_tab_waits_for_a_real_url() {
    let mut harness = Harness::new();
    harness
        .tabs
        .open_after(7, "https://docs.example/", Duration::from_millis(350));
    let started = Instant::now();

    let task = harness
        .controller
        .handle_tab_event(TabEvent::Created { tab_id: 7 })
        .await
        .expect("polling task is started");
    task.await.unwrap();

    assert!(started.elapsed() >= Duration::from_millis(350));
    assert_eq!(harness.transport.sent_to(7).len(), 1);
    assert!(harness.transport.injections(7) >= 1);

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(harness.store.writes_to("domain_docs.example"), 1);
}

#[tokio::test(start_paused = true)]
async fn new_tab_that_never_loads_is_given_up_on() {
    let mut harness = Harness::new();
    harness
        .tabs
        .open_after(8, "https://slow.example/", Duration::from_secs(60));
    let started = Instant::now();

    let task = harness
        .controller
        .handle_tab_event(TabEvent::Created { tab_id: 8 })
        .await
        .unwrap();
    task.await.unwrap();

    let waited = started.elapsed();
    assert!(waited >= Duration::from_millis(9_900));
    assert!(waited <= Duration::from_secs(10));
    assert!(harness.transport.sent().is_empty());
}

#[tokio::test(start_paused = true)]
async fn new_tab_unknown_to_the_directory_is_still_polled() {
    let mut harness = Harness::new();

    let task = harness
        .controller
        .handle_tab_event(TabEvent::Created { tab_id: 9 })
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(250)).await;
    harness.tabs.open(9, "https://late.example/");
    task.await.unwrap();

    assert_eq!(harness.transport.sent_to(9).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn new_tab_closed_while_waiting_is_given_up_at_the_timeout() {
    let mut harness = Harness::new();
    harness
        .tabs
        .open_after(10, "https://gone.example/", Duration::from_secs(5));
    let started = Instant::now();

    let task = harness
        .controller
        .handle_tab_event(TabEvent::Created { tab_id: 10 })
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(250)).await;
    harness.tabs.close(10);
    task.await.unwrap();

    assert!(started.elapsed() >= Duration::from_millis(9_900));
    assert!(harness.transport.sent().is_empty());
}

#[tokio::test(start_paused = true)]
async fn browser_pages_are_left_alone() {
    let mut harness = Harness::new();
    harness.tabs.open(3, "chrome://newtab/");

    let task = harness
        .controller
        .handle_tab_event(TabEvent::Created { tab_id: 3 })
        .await
        .unwrap();
    task.await.unwrap();

    assert!(harness
        .controller
        .handle_tab_event(TabEvent::Loading {
            tab_id: 3,
            url: "edge://settings".into(),
        })
        .await
        .is_none());
    assert!(harness.transport.sent().is_empty());
    assert!(harness.store.set_calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn unreachable_page_is_retried_then_dropped() {
    let mut harness = Harness::new();
    harness.transport.unreachable(5);

    let task = harness
        .controller
        .handle_tab_event(TabEvent::Loading {
            tab_id: 5,
            url: "https://flaky.example/".into(),
        })
        .await
        .unwrap();
    task.await.unwrap();

    assert_eq!(harness.transport.sent_to(5).len(), 3);
    assert_eq!(harness.transport.injections(5), 2);
    // The tab is still tracked; only delivery failed.
    assert!(harness.controller.active_tab(5).is_some());
}

#[tokio::test(start_paused = true)]
async fn closing_a_tab_forgets_it() {
    let mut harness = Harness::new();
    drop(
        harness
            .controller
            .handle_tab_event(TabEvent::Loading {
                tab_id: 6,
                url: "https://example.com/".into(),
            })
            .await,
    );
    assert!(harness.controller.active_tab(6).is_some());

    harness
        .controller
        .handle_tab_event(TabEvent::Removed { tab_id: 6 })
        .await;
    assert!(harness.controller.active_tab(6).is_none());
}
