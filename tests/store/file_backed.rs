use std::sync::Arc;

use serde_json::json;
use tempfile::TempDir;

use tintward::Config;
use tintward::resolver::SettingsResolver;
use tintward::settings::ColorScheme;
use tintward::store::{JsonFileStore, KeyValueStore, WriteCoalescer};

#[tokio::test]
async fn seeded_domain_survives_a_restart() {
    let tmp = TempDir::new().unwrap();
    let config = Config::load_or_init_in(tmp.path()).unwrap();

    {
        let store = Arc::new(JsonFileStore::open(config.store_path()).await.unwrap());
        let mut global = tintward::store::StoreMap::new();
        global.insert("globalSettings".into(), json!({"colorScheme": "greyscale"}));
        store.set(global).await.unwrap();

        let coalescer = WriteCoalescer::new(store.clone(), config.storage.coalescer_config());
        let resolution = SettingsResolver::new(store, coalescer)
            .resolve_for_domain("example.com")
            .await
            .unwrap();
        resolution.seed_write.unwrap().await.unwrap();
    }

    let reopened: Arc<dyn KeyValueStore> =
        Arc::new(JsonFileStore::open(config.store_path()).await.unwrap());
    let stored = reopened.get(&["domain_example.com"]).await.unwrap();
    assert_eq!(stored["domain_example.com"]["colorScheme"], json!("greyscale"));

    // Changing the global settings no longer affects the remembered domain.
    let mut global = tintward::store::StoreMap::new();
    global.insert("globalSettings".into(), json!({"colorScheme": "sepia"}));
    reopened.set(global).await.unwrap();

    let coalescer = WriteCoalescer::new(reopened.clone(), config.storage.coalescer_config());
    let resolution = SettingsResolver::new(reopened, coalescer)
        .resolve_for_domain("example.com")
        .await
        .unwrap();
    assert_eq!(resolution.settings.color_scheme, ColorScheme::Greyscale);
    assert!(resolution.seed_write.is_none());
}

#[tokio::test]
async fn reset_through_the_file_store_empties_the_file() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("store.json");
    let store = JsonFileStore::open(&path).await.unwrap();

    let mut entries = tintward::store::StoreMap::new();
    entries.insert("lockSettings".into(), json!(true));
    store.set(entries).await.unwrap();
    store.clear().await.unwrap();

    let body = std::fs::read_to_string(&path).unwrap();
    assert_eq!(serde_json::from_str::<serde_json::Value>(&body).unwrap(), json!({}));
}
