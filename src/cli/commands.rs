use clap::{Args, Parser, Subcommand};
use serde_json::{Map, Value, json};
use tintward::settings::{SanitizeProfile, Settings, sanitize};

/// `Tintward` - per-domain page display settings with a throttled store.
#[derive(Parser, Debug)]
#[command(name = "tintward")]
#[command(author = "theonlyhennygod")]
#[command(version = "0.1.0")]
#[command(about = "Resolve and manage per-domain page display settings.", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write first-install defaults to the store
    Init,

    /// Print the effective settings for a URL or hostname
    Resolve {
        /// Page URL or bare hostname
        target: String,
    },

    /// Force one scheme across every domain
    Lock {
        #[command(flatten)]
        settings: SettingsArgs,
    },

    /// Leave lock mode; domains go back to their own settings
    Unlock,

    /// Customize a single domain
    SetDomain {
        /// Hostname, e.g. example.com
        domain: String,

        #[command(flatten)]
        settings: SettingsArgs,
    },

    /// Set the fallback used by domains without their own entry
    SetGlobal {
        #[command(flatten)]
        settings: SettingsArgs,
    },

    /// Configure the fade overlay applied on scheme changes
    Protection {
        /// Turn the overlay off instead of on
        #[arg(long)]
        off: bool,

        /// Transition speed in seconds (max 2.0)
        #[arg(long)]
        transition_speed: Option<f64>,

        /// Overlay duration in seconds (max 2.0)
        #[arg(long)]
        overlay_duration: Option<f64>,
    },

    /// Push settings to every open tab and remember them per domain
    Apply {
        /// Also turn lock mode on and make these the global settings
        #[arg(long)]
        lock: bool,

        #[command(flatten)]
        settings: SettingsArgs,
    },

    /// Forget per-tab overrides and reset every open page
    ResetTabs,

    /// Show stored settings and configuration
    Show {
        /// Dump the raw store as JSON
        #[arg(long)]
        json: bool,
    },

    /// Discard pending writes and wipe the store
    Reset {
        /// Confirm the wipe
        #[arg(long)]
        yes: bool,
    },
}

/// Settings as typed on the command line. Values are passed through the
/// same sanitization as any other input, so out-of-range numbers clamp.
#[derive(Args, Debug, Clone, Default)]
pub struct SettingsArgs {
    /// default, greyscale, sepia, highContrast, darkMode or custom
    #[arg(long, default_value = "default")]
    pub scheme: String,

    /// Brightness percentage (50-150)
    #[arg(long)]
    pub brightness: Option<String>,

    /// Text size percentage (80-200)
    #[arg(long)]
    pub text_size: Option<String>,

    /// Text color as #RRGGBB (custom scheme)
    #[arg(long)]
    pub text_color: Option<String>,

    /// Background color as #RRGGBB (custom scheme)
    #[arg(long)]
    pub background_color: Option<String>,
}

impl SettingsArgs {
    pub fn to_settings(&self) -> Settings {
        let mut raw = Map::new();
        raw.insert("colorScheme".into(), json!(self.scheme));
        let optional = [
            ("brightnessLevel", &self.brightness),
            ("textSize", &self.text_size),
            ("textColor", &self.text_color),
            ("backgroundColor", &self.background_color),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                raw.insert(key.into(), json!(value));
            }
        }
        sanitize(&Value::Object(raw), SanitizeProfile::Popup)
    }
}
