#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use tintward::error::{DeliveryError, StoreError};
use tintward::messaging::{MessageResponse, PageRequest, PageTransport, TabDirectory, TabId, TabInfo};
use tintward::store::{KeyValueStore, StoreMap};

// ── Store ────────────────────────────────────────────────────────

/// One physical `set` call as seen by the store.
#[derive(Debug, Clone)]
pub struct SetCall {
    pub at: Instant,
    pub keys: Vec<String>,
    pub ok: bool,
}

/// In-memory store that records every call and can be told to fail.
#[derive(Default)]
pub struct RecordingStore {
    entries: Mutex<StoreMap>,
    sets: Mutex<Vec<SetCall>>,
    gets: AtomicUsize,
    fail_next_sets: AtomicUsize,
    fail_reads: Mutex<bool>,
    set_latency: Mutex<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl RecordingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_entries(entries: StoreMap) -> Arc<Self> {
        let store = Self::default();
        *store.entries.lock().unwrap() = entries;
        Arc::new(store)
    }

    pub fn fail_next_sets(&self, count: usize) {
        self.fail_next_sets.store(count, Ordering::SeqCst);
    }

    pub fn fail_reads(&self) {
        *self.fail_reads.lock().unwrap() = true;
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.set_latency.lock().unwrap() = latency;
    }

    pub fn set_calls(&self) -> Vec<SetCall> {
        self.sets.lock().unwrap().clone()
    }

    pub fn get_calls(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn value(&self, key: &str) -> Option<serde_json::Value> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    pub fn writes_to(&self, key: &str) -> usize {
        self.set_calls()
            .iter()
            .filter(|call| call.ok && call.keys.iter().any(|k| k == key))
            .count()
    }
}

#[async_trait]
impl KeyValueStore for RecordingStore {
    fn name(&self) -> &str {
        "recording"
    }

    async fn get(&self, keys: &[&str]) -> Result<StoreMap, StoreError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if *self.fail_reads.lock().unwrap() {
            return Err(StoreError::Read("injected read failure".into()));
        }
        let entries = self.entries.lock().unwrap();
        Ok(keys
            .iter()
            .filter_map(|key| entries.get(*key).map(|v| ((*key).to_string(), v.clone())))
            .collect())
    }

    async fn set(&self, entries: StoreMap) -> Result<(), StoreError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let at = Instant::now();
        let latency = *self.set_latency.lock().unwrap();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let fail = self
            .fail_next_sets
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        self.sets.lock().unwrap().push(SetCall {
            at,
            keys: entries.keys().cloned().collect(),
            ok: !fail,
        });
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if fail {
            return Err(StoreError::Write("injected write failure".into()));
        }
        self.entries.lock().unwrap().extend(entries);
        Ok(())
    }

    async fn remove(&self, keys: &[&str]) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap();
        for key in keys {
            entries.remove(*key);
        }
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.entries.lock().unwrap().clear();
        Ok(())
    }

    async fn snapshot(&self) -> Result<StoreMap, StoreError> {
        Ok(self.entries.lock().unwrap().clone())
    }
}

// ── Pages ────────────────────────────────────────────────────────

/// Page transport whose tabs answer, stay silent, or reject on demand.
#[derive(Default)]
pub struct FakeTransport {
    sent: Mutex<Vec<(TabId, PageRequest)>>,
    injections: Mutex<Vec<TabId>>,
    unreachable: Mutex<HashSet<TabId>>,
    rejecting: Mutex<HashSet<TabId>>,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn unreachable(&self, tab_id: TabId) {
        self.unreachable.lock().unwrap().insert(tab_id);
    }

    pub fn rejecting(&self, tab_id: TabId) {
        self.rejecting.lock().unwrap().insert(tab_id);
    }

    pub fn sent(&self) -> Vec<(TabId, PageRequest)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, tab_id: TabId) -> Vec<PageRequest> {
        self.sent()
            .into_iter()
            .filter(|(id, _)| *id == tab_id)
            .map(|(_, request)| request)
            .collect()
    }

    pub fn injections(&self, tab_id: TabId) -> usize {
        self.injections
            .lock()
            .unwrap()
            .iter()
            .filter(|id| **id == tab_id)
            .count()
    }
}

#[async_trait]
impl PageTransport for FakeTransport {
    async fn send(
        &self,
        tab_id: TabId,
        request: &PageRequest,
    ) -> Result<MessageResponse, DeliveryError> {
        self.sent.lock().unwrap().push((tab_id, request.clone()));
        if self.unreachable.lock().unwrap().contains(&tab_id) {
            return Err(DeliveryError::NotReady { tab_id });
        }
        if self.rejecting.lock().unwrap().contains(&tab_id) {
            return Ok(MessageResponse::failure("page refused update"));
        }
        Ok(MessageResponse::ok())
    }

    async fn inject(&self, tab_id: TabId) -> Result<(), DeliveryError> {
        self.injections.lock().unwrap().push(tab_id);
        Ok(())
    }
}

struct FakeTab {
    url: String,
    ready_at: Instant,
}

/// Tab directory where a tab shows `about:blank` until its URL is "loaded".
#[derive(Default)]
pub struct FakeTabs {
    tabs: Mutex<HashMap<TabId, FakeTab>>,
}

impl FakeTabs {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn open(&self, tab_id: TabId, url: &str) {
        self.open_after(tab_id, url, Duration::ZERO);
    }

    /// The tab reports `url` only once `delay` has passed.
    pub fn open_after(&self, tab_id: TabId, url: &str, delay: Duration) {
        self.tabs.lock().unwrap().insert(
            tab_id,
            FakeTab {
                url: url.to_string(),
                ready_at: Instant::now() + delay,
            },
        );
    }

    pub fn close(&self, tab_id: TabId) {
        self.tabs.lock().unwrap().remove(&tab_id);
    }
}

#[async_trait]
impl TabDirectory for FakeTabs {
    async fn get(&self, tab_id: TabId) -> Option<TabInfo> {
        let tabs = self.tabs.lock().unwrap();
        let tab = tabs.get(&tab_id)?;
        let url = if Instant::now() >= tab.ready_at {
            tab.url.clone()
        } else {
            "about:blank".to_string()
        };
        Some(TabInfo {
            id: tab_id,
            url: Some(url),
        })
    }

    async fn list(&self) -> Vec<TabInfo> {
        let ids: Vec<TabId> = {
            let mut ids: Vec<_> = self.tabs.lock().unwrap().keys().copied().collect();
            ids.sort_unstable();
            ids
        };
        let mut listed = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(tab) = self.get(id).await {
                listed.push(tab);
            }
        }
        listed
    }
}
