use serde_json::{Value, json};

use super::fakes::RecordingStore;
use tintward::resolver::SettingsResolver;
use tintward::settings::{ColorScheme, SanitizeProfile, Settings};
use tintward::store::{CoalescerConfig, StoreMap, WriteCoalescer};

async fn resolve_with(pairs: &[(&str, Value)], domain: &str) -> Settings {
    let entries: StoreMap = pairs
        .iter()
        .map(|(key, value)| ((*key).to_string(), value.clone()))
        .collect();
    let store = RecordingStore::with_entries(entries);
    let coalescer = WriteCoalescer::new(store.clone(), CoalescerConfig::default());
    SettingsResolver::new(store, coalescer)
        .resolve_for_domain(domain)
        .await
        .expect("resolution succeeds")
        .settings
}

#[tokio::test(start_paused = true)]
async fn lock_without_a_stored_scheme_falls_through_to_domain() {
    let settings = resolve_with(
        &[
            ("lockSettings", json!(true)),
            ("domain_example.com", json!({"colorScheme": "sepia"})),
        ],
        "example.com",
    )
    .await;
    assert_eq!(settings.color_scheme, ColorScheme::Sepia);
}

#[tokio::test(start_paused = true)]
async fn disabled_lock_ignores_the_stored_scheme() {
    let settings = resolve_with(
        &[
            ("lockSettings", json!(false)),
            ("currentScheme", json!({"colorScheme": "highContrast"})),
            ("globalSettings", json!({"colorScheme": "greyscale"})),
        ],
        "example.com",
    )
    .await;
    assert_eq!(settings.color_scheme, ColorScheme::Greyscale);
}

#[tokio::test(start_paused = true)]
async fn protection_overlay_replaces_only_its_three_fields() {
    let settings = resolve_with(
        &[
            (
                "domain_example.com",
                json!({
                    "colorScheme": "custom",
                    "brightnessLevel": 120,
                    "textSize": 150,
                    "textColor": "#112233",
                    "backgroundColor": "#FFEEDD",
                    "transitionSpeed": 0.5,
                    "protectionEnabled": false
                }),
            ),
            (
                "protectionSettings",
                json!({"protectionEnabled": true, "transitionSpeed": 1.5, "overlayDuration": 0.8}),
            ),
        ],
        "example.com",
    )
    .await;

    assert_eq!(
        settings,
        Settings {
            color_scheme: ColorScheme::Custom,
            brightness_level: 120,
            text_size: 150,
            text_color: "#112233".into(),
            background_color: "#FFEEDD".into(),
            transition_speed: 1.5,
            overlay_duration: 0.8,
            protection_enabled: true,
        }
    );
}

#[tokio::test(start_paused = true)]
async fn stored_junk_is_sanitized_before_use() {
    let settings = resolve_with(
        &[(
            "globalSettings",
            json!({
                "colorScheme": "ultraviolet",
                "brightnessLevel": "999",
                "textSize": 10,
                "textColor": "blue",
                "overlayDuration": 30
            }),
        )],
        "example.com",
    )
    .await;

    assert_eq!(settings.color_scheme, ColorScheme::Default);
    assert_eq!(settings.brightness_level, 150);
    assert_eq!(settings.text_size, 50);
    assert_eq!(settings.text_color, "");
    assert!((settings.overlay_duration - 2.0).abs() < f64::EPSILON);
    assert_eq!(settings, settings.sanitized(SanitizeProfile::Page));
}
