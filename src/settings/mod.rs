pub mod hostname;
pub mod sanitize;
pub mod types;

pub use hostname::{domain_from_url, is_restricted_url, validate_hostname};
pub use sanitize::{
    SanitizeProfile, brightness_from, color_scheme_from, is_hex_color, sanitize, sanitize_protection,
    truthy,
};
pub use types::{ColorScheme, ProtectionSettings, Settings};
