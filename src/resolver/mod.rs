//! Which settings apply to a domain, and whether to remember them.
//!
//! Precedence, first match wins: an active lock with a stored scheme, the
//! domain's own entry, the global settings, the built-in defaults. Stored
//! protection fields are then laid over whichever base was chosen.

use crate::error::ResolveError;
use crate::settings::{SanitizeProfile, Settings, validate_hostname};
use crate::store::{KeyValueStore, PendingWrite, PersistedState, WriteCoalescer, keys};
use std::sync::Arc;

/// Effective settings plus the persistence decision for one domain.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub settings: Settings,
    /// True when the domain has no entry yet and no lock is active.
    pub should_persist: bool,
}

/// Pure precedence policy over already-loaded state.
pub fn resolve(state: &PersistedState, profile: SanitizeProfile) -> Resolution {
    let base = match (&state.current_scheme, state.lock_settings) {
        (Some(locked), true) => locked.clone(),
        _ => state
            .domain_settings
            .as_ref()
            .or(state.global_settings.as_ref())
            .cloned()
            .unwrap_or_default(),
    };

    let effective = match &state.protection_settings {
        Some(protection) => base.with_protection(protection),
        None => base,
    };

    Resolution {
        settings: effective.sanitized(profile),
        should_persist: state.domain_settings.is_none() && !state.lock_settings,
    }
}

/// Result of [`SettingsResolver::resolve_for_domain`].
#[must_use]
pub struct DomainResolution {
    pub domain: String,
    pub settings: Settings,
    /// Present when a first-seen domain was seeded with `settings`.
    pub seed_write: Option<PendingWrite>,
}

/// Store-backed resolver. Cheap to clone.
#[derive(Clone)]
pub struct SettingsResolver {
    store: Arc<dyn KeyValueStore>,
    coalescer: WriteCoalescer,
}

impl SettingsResolver {
    pub fn new(store: Arc<dyn KeyValueStore>, coalescer: WriteCoalescer) -> Self {
        Self { store, coalescer }
    }

    /// Resolve `domain` against the current store contents.
    ///
    /// An invalid hostname fails before the store is touched. A first-seen
    /// domain is seeded through the coalescer; the returned
    /// [`DomainResolution::seed_write`] reports that write's outcome.
    pub async fn resolve_for_domain(&self, domain: &str) -> Result<DomainResolution, ResolveError> {
        let domain = validate_hostname(domain)
            .ok_or_else(|| ResolveError::InvalidDomain(domain.to_string()))?;

        let state =
            PersistedState::load(self.store.as_ref(), domain, SanitizeProfile::Page).await?;
        let Resolution {
            settings,
            should_persist,
        } = resolve(&state, SanitizeProfile::Page);

        let seed_write = should_persist.then(|| {
            tracing::debug!(domain, scheme = %settings.color_scheme, "Seeding first-seen domain");
            self.coalescer
                .write(keys::domain_key(domain), settings.to_value())
        });

        Ok(DomainResolution {
            domain: domain.to_string(),
            settings,
            seed_write,
        })
    }
}
