use super::protocol::{MessageResponse, PageRequest, TabId};
use super::traits::PageTransport;
use crate::error::DeliveryError;
use std::sync::Arc;
use std::time::Duration;

/// Attempts made when pre-injecting a page listener.
const INJECT_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryPolicy {
    /// Deadline for a single send.
    pub timeout: Duration,
    /// Total attempts per delivery, including the first.
    pub max_retries: u32,
    /// Delay before attempt `n + 1` is `base_backoff * n`.
    pub base_backoff: Duration,
}

impl Default for DeliveryPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(5000),
            max_retries: 3,
            base_backoff: Duration::from_millis(100),
        }
    }
}

/// Page delivery with a bounded wait per send, retries with linear backoff,
/// and listener re-injection between attempts.
#[derive(Clone)]
pub struct Deliverer {
    transport: Arc<dyn PageTransport>,
    policy: DeliveryPolicy,
}

impl Deliverer {
    pub fn new(transport: Arc<dyn PageTransport>, policy: DeliveryPolicy) -> Self {
        Self { transport, policy }
    }

    /// Deliver `request` to `tab_id`, retrying transport-level failures.
    ///
    /// A page that answers `success: false` is reported immediately as
    /// [`DeliveryError::Rejected`].
    pub async fn deliver(
        &self,
        tab_id: TabId,
        request: &PageRequest,
    ) -> Result<MessageResponse, DeliveryError> {
        let attempts = self.policy.max_retries.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            match self.send_once(tab_id, request).await {
                Ok(response) => {
                    if attempt > 1 {
                        tracing::info!(tab_id, attempt, "Page delivery recovered after retries");
                    }
                    return Ok(response);
                }
                Err(e) if !e.is_retryable() => {
                    tracing::warn!(tab_id, action = request.action(), "Page rejected update: {e}");
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!(
                        tab_id,
                        attempt,
                        max_retries = attempts,
                        action = request.action(),
                        "Page delivery failed: {e}"
                    );
                    last_error = Some(e);
                    if attempt < attempts {
                        if let Err(inject_err) = self.transport.inject(tab_id).await {
                            tracing::debug!(tab_id, "Listener re-injection failed: {inject_err}");
                        }
                        tokio::time::sleep(self.policy.base_backoff * attempt).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            DeliveryError::Transport(format!("no delivery attempt made for tab {tab_id}"))
        }))
    }

    /// Install the page listener, retrying a few times before giving up.
    ///
    /// Failure is not fatal: the tab may already have a listener.
    pub async fn ensure_injected(&self, tab_id: TabId) -> bool {
        for attempt in 1..=INJECT_ATTEMPTS {
            match self.transport.inject(tab_id).await {
                Ok(()) => return true,
                Err(e) => {
                    if attempt == INJECT_ATTEMPTS {
                        tracing::warn!(tab_id, "Failed to inject page listener: {e}");
                    } else {
                        tokio::time::sleep(self.policy.base_backoff).await;
                    }
                }
            }
        }
        false
    }

    async fn send_once(
        &self,
        tab_id: TabId,
        request: &PageRequest,
    ) -> Result<MessageResponse, DeliveryError> {
        #[allow(clippy::cast_possible_truncation)]
        let timeout_ms = self.policy.timeout.as_millis() as u64;
        let response = tokio::time::timeout(self.policy.timeout, self.transport.send(tab_id, request))
            .await
            .map_err(|_| DeliveryError::Timeout { tab_id, timeout_ms })??;

        if response.success {
            Ok(response)
        } else {
            Err(DeliveryError::Rejected {
                tab_id,
                message: response
                    .error
                    .unwrap_or_else(|| "unknown error".to_string()),
            })
        }
    }
}
