//! Key layout of the shared store.

use crate::messaging::TabId;

pub const LOCK_SETTINGS: &str = "lockSettings";
pub const CURRENT_SCHEME: &str = "currentScheme";
pub const GLOBAL_SETTINGS: &str = "globalSettings";
pub const PROTECTION_SETTINGS: &str = "protectionSettings";
pub const GLOBAL_PROTECTION_ENABLED: &str = "globalProtectionEnabled";
pub const COLOR_SCHEME: &str = "colorScheme";
pub const BRIGHTNESS_LEVEL: &str = "brightnessLevel";

const DOMAIN_PREFIX: &str = "domain_";
const TAB_PREFIX: &str = "tab_";

pub fn domain_key(hostname: &str) -> String {
    format!("{DOMAIN_PREFIX}{hostname}")
}

/// Per-tab overrides saved from the popup. UI-only, never resolved.
pub fn tab_key(tab_id: TabId) -> String {
    format!("{TAB_PREFIX}{tab_id}")
}

pub fn is_tab_key(key: &str) -> bool {
    key.starts_with(TAB_PREFIX)
}

/// Hostname part of a `domain_*` key.
pub fn domain_of_key(key: &str) -> Option<&str> {
    key.strip_prefix(DOMAIN_PREFIX)
}
