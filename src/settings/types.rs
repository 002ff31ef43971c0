use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use strum::{AsRefStr, Display, EnumIter, EnumString};

pub const DEFAULT_BRIGHTNESS: u16 = 100;
pub const DEFAULT_TEXT_SIZE: u16 = 100;
/// Seconds.
pub const DEFAULT_TRANSITION_SPEED: f64 = 0.3;
/// Seconds.
pub const DEFAULT_OVERLAY_DURATION: f64 = 0.3;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    AsRefStr,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum ColorScheme {
    #[default]
    Default,
    Greyscale,
    Sepia,
    HighContrast,
    DarkMode,
    Custom,
}

/// A fully sanitized set of page adjustments.
///
/// Only [`sanitize`](super::sanitize) and [`Settings::default`] produce values
/// of this type outside tests; every instance that reaches the store or a page
/// has passed through the clamping rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub color_scheme: ColorScheme,
    pub brightness_level: u16,
    pub text_size: u16,
    /// `#RRGGBB` or empty.
    pub text_color: String,
    /// `#RRGGBB` or empty.
    pub background_color: String,
    pub transition_speed: f64,
    pub overlay_duration: f64,
    pub protection_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            color_scheme: ColorScheme::Default,
            brightness_level: DEFAULT_BRIGHTNESS,
            text_size: DEFAULT_TEXT_SIZE,
            text_color: String::new(),
            background_color: String::new(),
            transition_speed: DEFAULT_TRANSITION_SPEED,
            overlay_duration: DEFAULT_OVERLAY_DURATION,
            protection_enabled: false,
        }
    }
}

impl Settings {
    /// Wire representation as stored under `domain_*`, `globalSettings`, etc.
    pub fn to_value(&self) -> Value {
        json!({
            "colorScheme": self.color_scheme.as_ref(),
            "brightnessLevel": self.brightness_level,
            "textSize": self.text_size,
            "textColor": self.text_color,
            "backgroundColor": self.background_color,
            "transitionSpeed": self.transition_speed,
            "overlayDuration": self.overlay_duration,
            "protectionEnabled": self.protection_enabled,
        })
    }

    /// Replace the three protection fields, leaving everything else intact.
    pub fn with_protection(mut self, protection: &ProtectionSettings) -> Self {
        self.protection_enabled = protection.protection_enabled;
        self.transition_speed = protection.transition_speed;
        self.overlay_duration = protection.overlay_duration;
        self
    }
}

/// Timed fade overlay configuration, stored under `protectionSettings`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtectionSettings {
    pub protection_enabled: bool,
    pub transition_speed: f64,
    pub overlay_duration: f64,
}

impl Default for ProtectionSettings {
    fn default() -> Self {
        Self {
            protection_enabled: false,
            transition_speed: DEFAULT_TRANSITION_SPEED,
            overlay_duration: DEFAULT_OVERLAY_DURATION,
        }
    }
}

impl ProtectionSettings {
    pub fn to_value(&self) -> Value {
        json!({
            "protectionEnabled": self.protection_enabled,
            "transitionSpeed": self.transition_speed,
            "overlayDuration": self.overlay_duration,
        })
    }
}
