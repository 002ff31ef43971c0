use crate::cli::commands::{Cli, Commands};
use anyhow::{Context, Result, bail};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::app::status::render_status;
use tintward::Config;
use tintward::controller::{ApplyReport, Controller, ControllerDeps};
use tintward::messaging::HeadlessHost;
use tintward::settings::{SanitizeProfile, Settings, domain_from_url, sanitize, sanitize_protection};
use tintward::store::{JsonFileStore, KeyValueStore, keys};

async fn open_store(config: &Config) -> Result<Arc<dyn KeyValueStore>> {
    let path = config.store_path();
    let store = JsonFileStore::open(&path)
        .await
        .with_context(|| format!("Failed to open store at {}", path.display()))?
        .with_write_limit(Duration::from_millis(config.storage.write_rate_limit_ms));
    Ok(Arc::new(store))
}

/// The scheme stored for lock mode, or the defaults when none was saved.
async fn stored_scheme(store: &dyn KeyValueStore) -> Result<Settings> {
    let entries = store.get(&[keys::CURRENT_SCHEME]).await?;
    Ok(entries
        .get(keys::CURRENT_SCHEME)
        .map(|raw| sanitize(raw, SanitizeProfile::Popup))
        .unwrap_or_default())
}

fn describe(report: ApplyReport) -> String {
    if report.attempted() == 0 {
        "no open tabs to update".to_string()
    } else {
        report.to_string()
    }
}

#[allow(clippy::too_many_lines)]
pub async fn dispatch(cli: Cli, config: Config) -> Result<()> {
    let store = open_store(&config).await?;
    let host = Arc::new(HeadlessHost);
    let controller = Controller::new(
        &config,
        ControllerDeps {
            store: Arc::clone(&store),
            transport: host.clone(),
            tabs: host,
        },
    );
    let preferences = controller.preferences().clone();

    match cli.command {
        Commands::Init => {
            preferences.on_installed().await?;
            println!(
                "Wrote first-install defaults to {}",
                config.store_path().display()
            );
        }

        Commands::Resolve { target } => {
            let domain = domain_from_url(&target).unwrap_or(target);
            let resolution = controller.resolver().resolve_for_domain(&domain).await?;
            println!("{}", serde_json::to_string_pretty(&resolution.settings)?);
            if let Some(seed) = resolution.seed_write {
                seed.await
                    .with_context(|| format!("Failed to remember settings for {domain}"))?;
                info!(domain = %resolution.domain, "Seeded domain settings");
            }
        }

        Commands::Lock { settings } => {
            let scheme = settings.to_settings();
            let report = preferences.set_lock(true, &scheme).await?;
            println!("Lock mode enabled with scheme {}", scheme.color_scheme);
            if let Some(report) = report {
                println!("{}", describe(report));
            }
        }

        Commands::Unlock => {
            let scheme = stored_scheme(store.as_ref()).await?;
            preferences.set_lock(false, &scheme).await?;
            println!("Lock mode disabled");
        }

        Commands::SetDomain { domain, settings } => {
            let saved = preferences
                .set_domain_settings(&domain, &settings.to_settings())
                .await?;
            println!("{domain}: {}", serde_json::to_string_pretty(&saved)?);
        }

        Commands::SetGlobal { settings } => {
            let saved = preferences
                .set_global_settings(&settings.to_settings())
                .await?;
            println!("global: {}", serde_json::to_string_pretty(&saved)?);
        }

        Commands::Protection {
            off,
            transition_speed,
            overlay_duration,
        } => {
            let protection = sanitize_protection(&json!({
                "protectionEnabled": !off,
                "transitionSpeed": transition_speed,
                "overlayDuration": overlay_duration,
            }));
            let report = preferences.save_protection(&protection).await?;
            println!(
                "Protection {} (transition {:.1}s, overlay {:.1}s); {}",
                if protection.protection_enabled {
                    "enabled"
                } else {
                    "disabled"
                },
                protection.transition_speed,
                protection.overlay_duration,
                describe(report)
            );
        }

        Commands::Apply { lock, settings } => {
            let report = preferences
                .apply_settings(&settings.to_settings(), lock)
                .await?;
            if report.attempted() == 0 {
                bail!("No valid tabs to apply settings to");
            }
            println!("{report}");
        }

        Commands::ResetTabs => {
            let report = preferences.reset_tab_settings().await?;
            if report.failed == 0 {
                println!("All {} tabs reset successfully", report.succeeded);
            } else {
                println!(
                    "Reset: {} succeeded, {} failed",
                    report.succeeded, report.failed
                );
            }
        }

        Commands::Show { json } => {
            let entries = store.snapshot().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                let stats = controller.coalescer().stats().await?;
                println!("{}", render_status(&config, &entries, &stats));
            }
        }

        Commands::Reset { yes } => {
            if !yes {
                bail!(
                    "Refusing to wipe {} without --yes",
                    config.store_path().display()
                );
            }
            preferences.reset().await?;
            println!("Store cleared");
        }
    }

    Ok(())
}
