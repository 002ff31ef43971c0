use crate::settings::{ColorScheme, ProtectionSettings, Settings};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Browser-assigned tab identifier.
pub type TabId = u32;

/// Requests handled by the controller, tagged by `action` on the wire.
///
/// Scheme and brightness payloads stay untyped until the controller
/// sanitizes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ControllerRequest {
    #[serde(rename_all = "camelCase")]
    SetColorScheme { tab_id: TabId, color_scheme: Value },
    GetColorScheme,
    #[serde(rename_all = "camelCase")]
    SetBrightness {
        tab_id: TabId,
        brightness_level: Value,
    },
    GetSettings,
    #[serde(rename_all = "camelCase")]
    NavigationOccurred {
        domain: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
    },
}

/// Requests the controller sends to a page-side applier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum PageRequest {
    UpdateColorScheme { settings: Settings },
    UpdateProtectionSettings { settings: ProtectionSettings },
    /// Drop whatever the page applied and show it unstyled.
    ResetSettings,
}

impl PageRequest {
    pub fn action(&self) -> &'static str {
        match self {
            Self::UpdateColorScheme { .. } => "updateColorScheme",
            Self::UpdateProtectionSettings { .. } => "updateProtectionSettings",
            Self::ResetSettings => "resetSettings",
        }
    }
}

/// Reply shape shared by both directions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Settings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_scheme: Option<ColorScheme>,
    /// `"success"` or `"error"` on acknowledgements of stored writes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl MessageResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    pub fn failure(error: impl ToString) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
            ..Self::default()
        }
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn with_color_scheme(mut self, color_scheme: ColorScheme) -> Self {
        self.color_scheme = Some(color_scheme);
        self
    }

    /// Acknowledgement for a stored write, carrying `status` alongside `success`.
    pub fn write_ack<E: ToString>(outcome: Result<(), E>) -> Self {
        match outcome {
            Ok(()) => Self {
                status: Some("success".into()),
                ..Self::ok()
            },
            Err(e) => Self {
                status: Some("error".into()),
                ..Self::failure(e)
            },
        }
    }
}
