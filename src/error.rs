use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for `Tintward`.
///
/// Each subsystem defines its own error variant. Library callers can match on
/// these to decide recovery strategy; CLI glue continues to use
/// `anyhow::Result` for ad-hoc context chains.
#[derive(Debug, Error)]
pub enum TintError {
    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Persistent store ────────────────────────────────────────────────
    #[error("store: {0}")]
    Store(#[from] StoreError),

    // ── Write queue ─────────────────────────────────────────────────────
    #[error("write queue: {0}")]
    Queue(#[from] QueueError),

    // ── Settings resolution ─────────────────────────────────────────────
    #[error("resolve: {0}")]
    Resolve(#[from] ResolveError),

    // ── Page delivery ───────────────────────────────────────────────────
    #[error("delivery: {0}")]
    Delivery(#[from] DeliveryError),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Store errors ────────────────────────────────────────────────────────────

/// Failure reported by a persistent key-value store.
///
/// `Clone` so a single failed flush can be reported to every caller whose
/// write was part of that batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("read failed: {0}")]
    Read(String),

    #[error("write failed: {0}")]
    Write(String),

    #[error("write rate limit exceeded (retry in {retry_after_ms}ms)")]
    RateLimited { retry_after_ms: u64 },

    #[error("serialization: {0}")]
    Serialization(String),
}

// ─── Write queue errors ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// The batch this write was part of failed in the store.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The write was still queued when `clear_queue` ran.
    #[error("queue cleared")]
    Cleared,

    /// The coalescer worker is gone; nothing will flush this write.
    #[error("write queue closed")]
    Closed,
}

// ─── Resolution errors ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("invalid domain: {0:?}")]
    InvalidDomain(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

// ─── Delivery errors ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// No page-side listener answered; the script is probably not injected yet.
    #[error("tab {tab_id} has no listener")]
    NotReady { tab_id: u32 },

    #[error("tab {tab_id} did not answer within {timeout_ms}ms")]
    Timeout { tab_id: u32, timeout_ms: u64 },

    /// The page answered but reported a failure of its own.
    #[error("tab {tab_id} rejected update: {message}")]
    Rejected { tab_id: u32, message: String },

    #[error("tab {tab_id} injection failed: {message}")]
    Injection { tab_id: u32, message: String },

    #[error("transport: {0}")]
    Transport(String),
}

impl DeliveryError {
    /// Whether another attempt (after re-injecting the listener) can help.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NotReady { .. } | Self::Timeout { .. } | Self::Transport(_)
        )
    }
}

// ─── Convenience re-exports ─────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, TintError>;
