use super::keys;
use super::traits::{KeyValueStore, StoreMap};
use crate::error::StoreError;
use crate::settings::{
    ProtectionSettings, SanitizeProfile, Settings, sanitize, sanitize_protection, truthy,
};
use serde_json::Value;

/// The slice of persisted state that decides one domain's settings.
///
/// Every settings value is sanitized on the way in; a key counts as present
/// only when its stored value is truthy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersistedState {
    pub lock_settings: bool,
    pub current_scheme: Option<Settings>,
    pub global_settings: Option<Settings>,
    pub protection_settings: Option<ProtectionSettings>,
    pub domain_settings: Option<Settings>,
}

impl PersistedState {
    /// Read everything needed for `domain` in a single store call.
    pub async fn load(
        store: &dyn KeyValueStore,
        domain: &str,
        profile: SanitizeProfile,
    ) -> Result<Self, StoreError> {
        let domain_key = keys::domain_key(domain);
        let entries = store
            .get(&[
                keys::LOCK_SETTINGS,
                keys::CURRENT_SCHEME,
                keys::GLOBAL_SETTINGS,
                keys::PROTECTION_SETTINGS,
                domain_key.as_str(),
            ])
            .await?;
        Ok(Self::from_entries(domain, &entries, profile))
    }

    pub fn from_entries(domain: &str, entries: &StoreMap, profile: SanitizeProfile) -> Self {
        let settings = |key: &str| present(entries, key).map(|raw| sanitize(raw, profile));

        Self {
            lock_settings: present(entries, keys::LOCK_SETTINGS).is_some(),
            current_scheme: settings(keys::CURRENT_SCHEME),
            global_settings: settings(keys::GLOBAL_SETTINGS),
            protection_settings: present(entries, keys::PROTECTION_SETTINGS)
                .map(sanitize_protection),
            domain_settings: settings(&keys::domain_key(domain)),
        }
    }
}

fn present<'a>(entries: &'a StoreMap, key: &str) -> Option<&'a Value> {
    entries.get(key).filter(|value| truthy(value))
}
