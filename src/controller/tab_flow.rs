use crate::error::DeliveryError;
use crate::messaging::{Deliverer, PageRequest, TabDirectory, TabId, TabInfo};
use crate::resolver::SettingsResolver;
use crate::settings::{Settings, domain_from_url, is_restricted_url};
use crate::store::PendingWrite;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Timing knobs for pushing settings into freshly created or loading tabs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TabTiming {
    pub ready_delay: Duration,
    pub poll_interval: Duration,
    pub ready_timeout: Duration,
}

impl Default for TabTiming {
    fn default() -> Self {
        Self {
            ready_delay: Duration::from_millis(50),
            poll_interval: Duration::from_millis(100),
            ready_timeout: Duration::from_secs(10),
        }
    }
}

/// The slow half of tab handling: waiting on the browser and delivering to
/// pages. Runs on spawned tasks so the controller loop never blocks on it.
#[derive(Clone)]
pub(crate) struct TabFlow {
    resolver: SettingsResolver,
    deliverer: Deliverer,
    tabs: Arc<dyn TabDirectory>,
    timing: TabTiming,
}

impl TabFlow {
    pub(crate) fn new(
        resolver: SettingsResolver,
        deliverer: Deliverer,
        tabs: Arc<dyn TabDirectory>,
        timing: TabTiming,
    ) -> Self {
        Self {
            resolver,
            deliverer,
            tabs,
            timing,
        }
    }

    /// Wait for a new tab to get a real URL, then resolve and apply.
    pub(crate) async fn apply_to_new_tab(self, tab_id: TabId) {
        let Some(url) = self.wait_for_url(tab_id).await else {
            tracing::debug!(tab_id, "New tab never reached a page URL");
            return;
        };
        if is_restricted_url(&url) {
            return;
        }
        let Some(domain) = domain_from_url(&url) else {
            return;
        };

        match self.resolver.resolve_for_domain(&domain).await {
            Ok(resolution) => {
                watch_seed_write(resolution.domain, resolution.seed_write);
                self.deliverer.ensure_injected(tab_id).await;
                if let Err(e) = self.push_settings(tab_id, resolution.settings).await {
                    tracing::warn!(tab_id, domain, "Failed to apply settings to new tab: {e}");
                }
            }
            Err(e) => tracing::warn!(tab_id, domain, "Failed to resolve settings for new tab: {e}"),
        }
    }

    /// Give the page a moment to install its listener, then push.
    pub(crate) async fn apply_after_load(self, tab_id: TabId, settings: Settings) {
        tokio::time::sleep(self.timing.ready_delay).await;
        if let Err(e) = self.push_settings(tab_id, settings).await {
            tracing::warn!(tab_id, "Failed to apply settings after navigation: {e}");
        }
    }

    async fn push_settings(&self, tab_id: TabId, settings: Settings) -> Result<(), DeliveryError> {
        self.deliverer
            .deliver(tab_id, &PageRequest::UpdateColorScheme { settings })
            .await
            .map(|_| ())
    }

    /// Poll until the tab shows a real page. A failed lookup counts as "not
    /// yet": the directory may learn about a new tab after its creation
    /// event, so only the timeout ends the wait.
    async fn wait_for_url(&self, tab_id: TabId) -> Option<String> {
        let deadline = Instant::now() + self.timing.ready_timeout;
        loop {
            if let Some(TabInfo { url: Some(url), .. }) = self.tabs.get(tab_id).await {
                if !url.is_empty() && !url.starts_with("about:blank") {
                    return Some(url);
                }
            }
            if Instant::now() + self.timing.poll_interval > deadline {
                return None;
            }
            tokio::time::sleep(self.timing.poll_interval).await;
        }
    }
}

/// Log the outcome of a first-seen domain's seed write without blocking the
/// caller on the throttle window.
pub(crate) fn watch_seed_write(domain: String, seed_write: Option<PendingWrite>) {
    let Some(pending) = seed_write else {
        return;
    };
    tokio::spawn(async move {
        match pending.await {
            Ok(()) => tracing::debug!(domain, "Seeded domain settings"),
            Err(e) => tracing::warn!(domain, "Failed to seed domain settings: {e}"),
        }
    });
}
