//! The one place raw settings become [`Settings`].
//!
//! Stored values come from an untyped key-value store and from page or popup
//! input, so every field is parsed leniently: numbers may arrive as JSON
//! numbers or numeric strings, and anything unusable falls back to the
//! field's default. Nothing here returns an error.

use super::types::{
    ColorScheme, DEFAULT_BRIGHTNESS, DEFAULT_OVERLAY_DURATION, DEFAULT_TEXT_SIZE,
    DEFAULT_TRANSITION_SPEED, ProtectionSettings, Settings,
};
use serde_json::Value;
use std::ops::RangeInclusive;
use std::str::FromStr;

pub const BRIGHTNESS_RANGE: RangeInclusive<u16> = 50..=150;
/// Longest transition or overlay fade accepted, in seconds.
pub const MAX_DURATION_SECS: f64 = 2.0;

/// Which caller's text-size bounds apply.
///
/// The page applier accepts text down to 50%; the popup form never offers
/// less than 80%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SanitizeProfile {
    #[default]
    Page,
    Popup,
}

impl SanitizeProfile {
    pub const fn text_size_range(self) -> RangeInclusive<u16> {
        match self {
            Self::Page => 50..=200,
            Self::Popup => 80..=200,
        }
    }
}

/// Sanitize an arbitrary JSON value into [`Settings`].
///
/// Non-object input yields the defaults.
pub fn sanitize(raw: &Value, profile: SanitizeProfile) -> Settings {
    let field = |name: &str| raw.get(name);

    Settings {
        color_scheme: color_scheme_from(field("colorScheme")),
        brightness_level: brightness_from(field("brightnessLevel")),
        text_size: clamp_int(
            field("textSize"),
            DEFAULT_TEXT_SIZE,
            profile.text_size_range(),
        ),
        text_color: hex_color(field("textColor")),
        background_color: hex_color(field("backgroundColor")),
        transition_speed: duration_secs(field("transitionSpeed"), DEFAULT_TRANSITION_SPEED),
        overlay_duration: duration_secs(field("overlayDuration"), DEFAULT_OVERLAY_DURATION),
        protection_enabled: field("protectionEnabled").is_some_and(truthy),
    }
}

pub fn sanitize_protection(raw: &Value) -> ProtectionSettings {
    ProtectionSettings {
        protection_enabled: raw.get("protectionEnabled").is_some_and(truthy),
        transition_speed: duration_secs(raw.get("transitionSpeed"), DEFAULT_TRANSITION_SPEED),
        overlay_duration: duration_secs(raw.get("overlayDuration"), DEFAULT_OVERLAY_DURATION),
    }
}

/// Single-field variant used by per-tab scheme updates.
pub fn color_scheme_from(value: Option<&Value>) -> ColorScheme {
    value
        .and_then(Value::as_str)
        .and_then(|s| ColorScheme::from_str(s).ok())
        .unwrap_or_default()
}

/// Single-field variant used by per-tab brightness updates.
pub fn brightness_from(value: Option<&Value>) -> u16 {
    clamp_int(value, DEFAULT_BRIGHTNESS, BRIGHTNESS_RANGE)
}

impl Settings {
    /// Run an already-typed value back through [`sanitize`].
    pub fn sanitized(&self, profile: SanitizeProfile) -> Self {
        sanitize(&self.to_value(), profile)
    }
}

impl ProtectionSettings {
    pub fn sanitized(&self) -> Self {
        sanitize_protection(&self.to_value())
    }
}

/// JS-style truthiness for loosely typed flags.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// `#` followed by exactly six hex digits, any case.
pub fn is_hex_color(candidate: &str) -> bool {
    candidate
        .strip_prefix('#')
        .is_some_and(|digits| digits.len() == 6 && digits.chars().all(|c| c.is_ascii_hexdigit()))
}

fn hex_color(value: Option<&Value>) -> String {
    value
        .and_then(Value::as_str)
        .filter(|s| is_hex_color(s))
        .map(str::to_string)
        .unwrap_or_default()
}

/// Zero and unparseable input both mean "use the default".
fn clamp_int(value: Option<&Value>, default: u16, range: RangeInclusive<u16>) -> u16 {
    let parsed = value.and_then(parse_leading_int).filter(|n| *n != 0);
    let n = parsed.unwrap_or(i64::from(default));
    let clamped = n.clamp(i64::from(*range.start()), i64::from(*range.end()));
    u16::try_from(clamped).unwrap_or(default)
}

fn duration_secs(value: Option<&Value>, default: f64) -> f64 {
    value
        .and_then(parse_leading_float)
        .filter(|f| f.is_finite() && *f > 0.0)
        .map_or(default, |f| f.min(MAX_DURATION_SECS))
}

#[allow(clippy::cast_possible_truncation)]
fn parse_leading_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim_start();
            let sign_len = usize::from(s.starts_with(['-', '+']));
            let digits = s[sign_len..]
                .bytes()
                .take_while(u8::is_ascii_digit)
                .count();
            if digits == 0 {
                return None;
            }
            // Out-of-range digit runs saturate so clamping still applies.
            Some(
                s[..sign_len + digits]
                    .parse()
                    .unwrap_or(if s.starts_with('-') { i64::MIN } else { i64::MAX }),
            )
        }
        _ => None,
    }
}

fn parse_leading_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let s = s.trim_start();
            let len = float_prefix_len(s.as_bytes());
            if len == 0 {
                return None;
            }
            s[..len].parse().ok()
        }
        _ => None,
    }
}

/// Length of the longest `[+-]digits[.digits][(e|E)[+-]digits]` prefix.
///
/// An exponent marker without digits after it is not part of the number,
/// so "2em" reads as 2.
fn float_prefix_len(bytes: &[u8]) -> usize {
    let digits_from = |start: usize| {
        bytes
            .get(start..)
            .map_or(0, |rest| rest.iter().take_while(|b| b.is_ascii_digit()).count())
    };

    let mut end = usize::from(matches!(bytes.first(), Some(b'-' | b'+')));
    let int_digits = digits_from(end);
    end += int_digits;

    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_digits = digits_from(end + 1);
        if int_digits + frac_digits > 0 {
            end += 1 + frac_digits;
        }
    }
    if int_digits + frac_digits == 0 {
        return 0;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let sign = usize::from(matches!(bytes.get(end + 1), Some(b'-' | b'+')));
        let exp_digits = digits_from(end + 1 + sign);
        if exp_digits > 0 {
            end += 1 + sign + exp_digits;
        }
    }
    end
}
