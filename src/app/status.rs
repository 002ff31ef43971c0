use serde_json::Value;
use tintward::Config;
use tintward::settings::{SanitizeProfile, sanitize, sanitize_protection, truthy};
use tintward::store::{CoalescerStats, StoreMap, keys};

fn scheme_of(raw: Option<&Value>) -> String {
    raw.map_or_else(
        || "(unset)".to_string(),
        |value| sanitize(value, SanitizeProfile::Page).color_scheme.to_string(),
    )
}

pub fn render_status(config: &Config, entries: &StoreMap, stats: &CoalescerStats) -> String {
    let locked = entries.get(keys::LOCK_SETTINGS).is_some_and(truthy);
    let mut lines = vec![
        "◆ Tintward".to_string(),
        String::new(),
        format!("  Version     {}", env!("CARGO_PKG_VERSION")),
        format!("  Config      {}", config.config_path.display()),
        format!("  Store       {}", config.store_path().display()),
        format!(
            "  Throttle    {}ms, batches of {}",
            config.storage.throttle_ms, config.storage.max_batch_size
        ),
        String::new(),
        format!("  Lock        {}", if locked { "on" } else { "off" }),
        format!(
            "  Locked      {}",
            scheme_of(entries.get(keys::CURRENT_SCHEME))
        ),
        format!(
            "  Global      {}",
            scheme_of(entries.get(keys::GLOBAL_SETTINGS))
        ),
    ];

    match entries.get(keys::PROTECTION_SETTINGS).map(sanitize_protection) {
        Some(protection) => lines.push(format!(
            "  Protection  {} (transition {:.1}s, overlay {:.1}s)",
            if protection.protection_enabled {
                "on"
            } else {
                "off"
            },
            protection.transition_speed,
            protection.overlay_duration
        )),
        None => lines.push("  Protection  (unset)".to_string()),
    }

    let mut domains: Vec<_> = entries
        .iter()
        .filter_map(|(key, value)| keys::domain_of_key(key).map(|domain| (domain, value)))
        .collect();
    domains.sort_by(|a, b| a.0.cmp(b.0));

    lines.push(String::new());
    lines.push(format!("  Domains     {}", domains.len()));
    for (domain, value) in domains {
        lines.push(format!("    {domain:<28} {}", scheme_of(Some(value))));
    }

    lines.push(String::new());
    lines.push(format!(
        "  Queue       {} pending, {} flushed, {} failed, {} cleared",
        stats.queued, stats.flushes, stats.failed_flushes, stats.cleared
    ));

    lines.join("\n")
}
