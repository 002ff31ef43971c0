use super::protocol::{MessageResponse, PageRequest, TabId};
use super::traits::{PageTransport, TabDirectory, TabInfo};
use crate::error::DeliveryError;
use async_trait::async_trait;

/// Host with no browser attached: no tabs, no page listeners.
///
/// Lets the store-side operations run from the command line; anything that
/// targets a page fails the way a missing listener would.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeadlessHost;

#[async_trait]
impl TabDirectory for HeadlessHost {
    async fn get(&self, _tab_id: TabId) -> Option<TabInfo> {
        None
    }

    async fn list(&self) -> Vec<TabInfo> {
        Vec::new()
    }
}

#[async_trait]
impl PageTransport for HeadlessHost {
    async fn send(
        &self,
        tab_id: TabId,
        _request: &PageRequest,
    ) -> Result<MessageResponse, DeliveryError> {
        Err(DeliveryError::NotReady { tab_id })
    }

    async fn inject(&self, tab_id: TabId) -> Result<(), DeliveryError> {
        Err(DeliveryError::Injection {
            tab_id,
            message: "no browser attached".into(),
        })
    }
}
