//! Operations the settings popup performs: saving, locking, and pushing
//! settings to every open tab.
//!
//! All persistence goes through the shared [`WriteCoalescer`].

use crate::error::{DeliveryError, QueueError, ResolveError, StoreError};
use crate::messaging::{Deliverer, PageRequest, TabDirectory, TabId, TabInfo};
use crate::settings::{
    ColorScheme, ProtectionSettings, SanitizeProfile, Settings, domain_from_url,
    is_restricted_url, validate_hostname,
};
use crate::store::{KeyValueStore, PendingWrite, WriteCoalescer, keys};
use futures_util::future::{join_all, try_join_all};
use serde::Serialize;
use serde_json::{Value, json};
use std::fmt;
use std::sync::Arc;

/// Per-target outcome of a multi-tab operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    pub succeeded: usize,
    pub failed: usize,
    /// Browser-internal or URL-less tabs that were not attempted.
    pub skipped: usize,
}

impl ApplyReport {
    pub fn attempted(&self) -> usize {
        self.succeeded + self.failed
    }
}

impl fmt::Display for ApplyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.failed == 0 {
            write!(f, "applied to {} tabs successfully", self.succeeded)?;
            if self.skipped > 0 {
                write!(f, " ({} internal pages skipped)", self.skipped)?;
            }
            Ok(())
        } else {
            write!(
                f,
                "applied to {} tabs, failed on {} ({} skipped)",
                self.succeeded, self.failed, self.skipped
            )
        }
    }
}

/// Cloneable handle for popup-side operations.
#[derive(Clone)]
pub struct Preferences {
    store: Arc<dyn KeyValueStore>,
    coalescer: WriteCoalescer,
    deliverer: Deliverer,
    tabs: Arc<dyn TabDirectory>,
}

impl Preferences {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        coalescer: WriteCoalescer,
        deliverer: Deliverer,
        tabs: Arc<dyn TabDirectory>,
    ) -> Self {
        Self {
            store,
            coalescer,
            deliverer,
            tabs,
        }
    }

    /// Defaults written when the extension is first installed.
    pub async fn on_installed(&self) -> Result<(), QueueError> {
        self.write_all(vec![
            (keys::COLOR_SCHEME.into(), json!(ColorScheme::Default.as_ref())),
            (keys::BRIGHTNESS_LEVEL.into(), json!(100)),
        ])
        .await
    }

    /// Apply `settings` to every open tab and remember them per domain.
    ///
    /// With `lock` set, the settings also become the global default. Nothing
    /// is stored when there is no tab to apply to.
    pub async fn apply_settings(
        &self,
        settings: &Settings,
        lock: bool,
    ) -> Result<ApplyReport, QueueError> {
        let settings = settings.sanitized(SanitizeProfile::Popup);
        let (targets, skipped) = self.targets().await;
        if targets.is_empty() {
            tracing::info!(skipped, "No valid tabs to apply settings to");
            return Ok(ApplyReport {
                skipped,
                ..ApplyReport::default()
            });
        }
        self.coalescer.write(keys::LOCK_SETTINGS, json!(lock)).await?;

        let request = PageRequest::UpdateColorScheme {
            settings: settings.clone(),
        };
        let outcomes = self.push_all(&targets, &request).await;

        let mut report = ApplyReport {
            skipped,
            ..ApplyReport::default()
        };
        let mut writes = Vec::new();
        for (tab, outcome) in targets.iter().zip(outcomes) {
            match outcome {
                Ok(()) => {
                    report.succeeded += 1;
                    if let Some(domain) = tab.url.as_deref().and_then(domain_from_url) {
                        writes.push(
                            self.coalescer
                                .write(keys::domain_key(&domain), settings.to_value()),
                        );
                    }
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(tab_id = tab.id, "Error applying settings: {e}");
                }
            }
        }
        if lock {
            writes.push(
                self.coalescer
                    .write(keys::GLOBAL_SETTINGS, settings.to_value()),
            );
        }
        settle(writes).await?;

        tracing::info!(%report, lock, "Applied settings");
        Ok(report)
    }

    /// Turn lock mode on or off, storing `scheme` as the locked scheme.
    ///
    /// Locking also pushes the scheme to every open tab.
    pub async fn set_lock(
        &self,
        enabled: bool,
        scheme: &Settings,
    ) -> Result<Option<ApplyReport>, QueueError> {
        let scheme = scheme.sanitized(SanitizeProfile::Popup);
        self.write_all(vec![
            (keys::LOCK_SETTINGS.into(), json!(enabled)),
            (keys::CURRENT_SCHEME.into(), scheme.to_value()),
        ])
        .await?;
        tracing::info!(enabled, scheme = %scheme.color_scheme, "Lock mode updated");

        if enabled {
            self.apply_to_all_tabs(&scheme).await.map(Some)
        } else {
            Ok(None)
        }
    }

    /// Push `settings` to every open tab; if any tab took them, they become
    /// the global settings for tabs opened later.
    pub async fn apply_to_all_tabs(&self, settings: &Settings) -> Result<ApplyReport, QueueError> {
        let settings = settings.sanitized(SanitizeProfile::Popup);
        let (targets, skipped) = self.targets().await;
        let request = PageRequest::UpdateColorScheme {
            settings: settings.clone(),
        };
        let report = tally(self.push_all(&targets, &request).await, skipped);

        if report.succeeded > 0 {
            self.coalescer
                .write(keys::GLOBAL_SETTINGS, settings.to_value())
                .await?;
        }
        Ok(report)
    }

    /// Store protection settings and push them to every open tab.
    pub async fn save_protection(
        &self,
        protection: &ProtectionSettings,
    ) -> Result<ApplyReport, QueueError> {
        let protection = protection.sanitized();
        self.write_all(vec![
            (keys::PROTECTION_SETTINGS.into(), protection.to_value()),
            (
                keys::GLOBAL_PROTECTION_ENABLED.into(),
                json!(protection.protection_enabled),
            ),
        ])
        .await?;

        let (targets, skipped) = self.targets().await;
        let request = PageRequest::UpdateProtectionSettings {
            settings: protection,
        };
        let report = tally(self.push_all(&targets, &request).await, skipped);
        tracing::info!(%report, enabled = protection.protection_enabled, "Protection settings saved");
        Ok(report)
    }

    /// Apply settings to one tab and, once the page accepted them, remember
    /// them under `tab_<id>`.
    pub async fn save_tab_settings(
        &self,
        tab_id: TabId,
        settings: &Settings,
    ) -> crate::Result<Settings> {
        let settings = settings.sanitized(SanitizeProfile::Popup);
        let request = PageRequest::UpdateColorScheme {
            settings: settings.clone(),
        };
        self.push(tab_id, &request).await?;
        self.coalescer
            .write(keys::tab_key(tab_id), settings.to_value())
            .await?;
        Ok(settings)
    }

    /// Explicitly customize one domain.
    pub async fn set_domain_settings(
        &self,
        domain: &str,
        settings: &Settings,
    ) -> crate::Result<Settings> {
        let domain = validate_hostname(domain)
            .ok_or_else(|| ResolveError::InvalidDomain(domain.to_string()))?;
        let settings = settings.sanitized(SanitizeProfile::Popup);
        self.coalescer
            .write(keys::domain_key(domain), settings.to_value())
            .await?;
        Ok(settings)
    }

    pub async fn set_global_settings(&self, settings: &Settings) -> Result<Settings, QueueError> {
        let settings = settings.sanitized(SanitizeProfile::Popup);
        self.coalescer
            .write(keys::GLOBAL_SETTINGS, settings.to_value())
            .await?;
        Ok(settings)
    }

    /// Forget every per-tab override and tell each page to drop its styling.
    pub async fn reset_tab_settings(&self) -> Result<ApplyReport, StoreError> {
        let stored = self.store.snapshot().await?;
        let tab_keys: Vec<&str> = stored
            .keys()
            .map(String::as_str)
            .filter(|key| keys::is_tab_key(key))
            .collect();
        if !tab_keys.is_empty() {
            self.store.remove(&tab_keys).await?;
        }

        let (targets, skipped) = self.targets().await;
        let report = tally(
            self.push_all(&targets, &PageRequest::ResetSettings).await,
            skipped,
        );
        tracing::info!(
            succeeded = report.succeeded,
            failed = report.failed,
            removed = tab_keys.len(),
            "Tab settings reset"
        );
        Ok(report)
    }

    /// Drop pending writes and wipe the store.
    ///
    /// The store is only cleared once the coalescer has acknowledged the
    /// clear, so a batch that was already being written cannot land after it.
    pub async fn reset(&self) -> crate::Result<()> {
        self.coalescer.clear_queue().await?;
        self.store.clear().await?;
        tracing::info!(store = self.store.name(), "Store reset");
        Ok(())
    }

    /// Enqueue every entry before awaiting any, so they can share a batch.
    async fn write_all(&self, entries: Vec<(String, Value)>) -> Result<(), QueueError> {
        let writes = entries
            .into_iter()
            .map(|(key, value)| self.coalescer.write(key, value))
            .collect();
        settle(writes).await
    }

    /// Tabs worth pushing to, plus how many were skipped.
    async fn targets(&self) -> (Vec<TabInfo>, usize) {
        let (targets, skipped): (Vec<_>, Vec<_>) = self
            .tabs
            .list()
            .await
            .into_iter()
            .partition(|tab| tab.url.as_deref().is_some_and(|url| !is_restricted_url(url)));
        (targets, skipped.len())
    }

    async fn push_all(
        &self,
        targets: &[TabInfo],
        request: &PageRequest,
    ) -> Vec<Result<(), DeliveryError>> {
        join_all(targets.iter().map(|tab| self.push(tab.id, request))).await
    }

    async fn push(&self, tab_id: TabId, request: &PageRequest) -> Result<(), DeliveryError> {
        self.deliverer.ensure_injected(tab_id).await;
        self.deliverer.deliver(tab_id, request).await.map(|_| ())
    }
}

fn tally(outcomes: Vec<Result<(), DeliveryError>>, skipped: usize) -> ApplyReport {
    outcomes.into_iter().fold(
        ApplyReport {
            skipped,
            ..ApplyReport::default()
        },
        |mut report, outcome| {
            match outcome {
                Ok(()) => report.succeeded += 1,
                Err(_) => report.failed += 1,
            }
            report
        },
    )
}

async fn settle(writes: Vec<PendingWrite>) -> Result<(), QueueError> {
    try_join_all(writes).await.map(|_| ())
}
