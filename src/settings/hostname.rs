use url::Url;

/// URL prefixes that belong to the browser itself and never get adjusted.
const RESTRICTED_PREFIXES: &[&str] = &["chrome://", "edge://", "about:"];

/// Returns the hostname unchanged when it only uses `[A-Za-z0-9-_.]`.
///
/// Hostnames become part of store keys (`domain_<host>`), so anything else is
/// refused rather than escaped.
pub fn validate_hostname(hostname: &str) -> Option<&str> {
    let valid = !hostname.is_empty()
        && hostname
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    valid.then_some(hostname)
}

/// Hostname of `url`, or `None` when it has none or fails validation.
pub fn domain_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    validate_hostname(host).map(str::to_string)
}

/// Browser-internal pages (`chrome://`, `edge://`, `about:`) are skipped.
pub fn is_restricted_url(url: &str) -> bool {
    RESTRICTED_PREFIXES
        .iter()
        .any(|prefix| url.starts_with(prefix))
}
