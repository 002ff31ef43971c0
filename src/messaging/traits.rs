use super::protocol::{MessageResponse, PageRequest, TabId};
use crate::error::DeliveryError;
use async_trait::async_trait;

/// Channel from the controller to page-side listeners.
#[async_trait]
pub trait PageTransport: Send + Sync {
    /// Send one request to the listener in `tab_id`.
    ///
    /// Implementations report a missing listener as
    /// [`DeliveryError::NotReady`]; the page's own `success: false` answers
    /// come back as `Ok`.
    async fn send(
        &self,
        tab_id: TabId,
        request: &PageRequest,
    ) -> Result<MessageResponse, DeliveryError>;

    /// (Re)install the page-side listener in `tab_id`.
    async fn inject(&self, tab_id: TabId) -> Result<(), DeliveryError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabInfo {
    pub id: TabId,
    /// `None` while the tab is still being created.
    pub url: Option<String>,
}

/// Read-only view of the browser's tabs.
#[async_trait]
pub trait TabDirectory: Send + Sync {
    async fn get(&self, tab_id: TabId) -> Option<TabInfo>;

    /// Tabs of the current window.
    async fn list(&self) -> Vec<TabInfo>;
}
