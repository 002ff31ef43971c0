//! The extension-controller process: one instance per run, owning the
//! active-tab map and every handle into storage and the pages.
//!
//! Events are handled one at a time on [`Controller::run`]. Store reads run
//! inline on the loop. Anything that waits on a page or on the write
//! throttle is spawned, so a slow tab never holds up the next event.

pub mod actions;
pub mod tab_flow;

pub use actions::{ApplyReport, Preferences};
pub use tab_flow::TabTiming;

use crate::config::Config;
use crate::messaging::{
    ControllerRequest, Deliverer, MessageResponse, PageTransport, TabDirectory, TabId,
};
use crate::resolver::SettingsResolver;
use crate::settings::{
    ColorScheme, Settings, brightness_from, color_scheme_from, domain_from_url, is_restricted_url,
};
use crate::store::{KeyValueStore, PendingWrite, WriteCoalescer, keys};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tab_flow::{TabFlow, watch_seed_write};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// External collaborators the controller is wired to.
pub struct ControllerDeps {
    pub store: Arc<dyn KeyValueStore>,
    pub transport: Arc<dyn PageTransport>,
    pub tabs: Arc<dyn TabDirectory>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TabEvent {
    Created { tab_id: TabId },
    /// A tab started loading `url`.
    Loading { tab_id: TabId, url: String },
    Removed { tab_id: TabId },
}

#[derive(Debug)]
pub enum ControllerEvent {
    Tab(TabEvent),
    Message {
        request: ControllerRequest,
        /// Tab the message came from, if any.
        sender: Option<TabId>,
        reply: oneshot::Sender<MessageResponse>,
    },
}

/// What the controller last applied to a tab.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TabState {
    pub domain: Option<String>,
    pub settings: Settings,
}

/// A message reply, possibly still waiting on a stored write.
#[must_use]
pub enum Reply {
    Ready(MessageResponse),
    AfterWrite(PendingWrite),
}

impl Reply {
    pub async fn into_response(self) -> MessageResponse {
        match self {
            Self::Ready(response) => response,
            Self::AfterWrite(pending) => MessageResponse::write_ack(pending.await),
        }
    }
}

pub struct Controller {
    coalescer: WriteCoalescer,
    resolver: SettingsResolver,
    flow: TabFlow,
    preferences: Preferences,
    active_tabs: HashMap<TabId, TabState>,
}

impl Controller {
    /// Build the controller and start its write-coalescing worker.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(config: &Config, deps: ControllerDeps) -> Self {
        let ControllerDeps {
            store,
            transport,
            tabs,
        } = deps;

        let coalescer = WriteCoalescer::new(Arc::clone(&store), config.storage.coalescer_config());
        let resolver = SettingsResolver::new(Arc::clone(&store), coalescer.clone());
        let deliverer = Deliverer::new(transport, config.delivery.policy());
        let flow = TabFlow::new(
            resolver.clone(),
            deliverer.clone(),
            Arc::clone(&tabs),
            config.delivery.tab_timing(),
        );
        let preferences = Preferences::new(store, coalescer.clone(), deliverer, tabs);

        Self {
            coalescer,
            resolver,
            flow,
            preferences,
            active_tabs: HashMap::new(),
        }
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    pub fn resolver(&self) -> &SettingsResolver {
        &self.resolver
    }

    pub fn coalescer(&self) -> &WriteCoalescer {
        &self.coalescer
    }

    pub fn active_tab(&self, tab_id: TabId) -> Option<&TabState> {
        self.active_tabs.get(&tab_id)
    }

    /// React to a tab lifecycle event. Returns the spawned delivery task,
    /// if one was started.
    pub async fn handle_tab_event(&mut self, event: TabEvent) -> Option<JoinHandle<()>> {
        match event {
            TabEvent::Created { tab_id } => {
                Some(tokio::spawn(self.flow.clone().apply_to_new_tab(tab_id)))
            }
            TabEvent::Loading { tab_id, url } => {
                if is_restricted_url(&url) {
                    return None;
                }
                let domain = domain_from_url(&url)?;
                match self.resolver.resolve_for_domain(&domain).await {
                    Ok(resolution) => {
                        self.active_tabs.insert(
                            tab_id,
                            TabState {
                                domain: Some(resolution.domain.clone()),
                                settings: resolution.settings.clone(),
                            },
                        );
                        watch_seed_write(resolution.domain, resolution.seed_write);
                        Some(tokio::spawn(
                            self.flow
                                .clone()
                                .apply_after_load(tab_id, resolution.settings),
                        ))
                    }
                    Err(e) => {
                        tracing::warn!(tab_id, domain, "Failed to resolve settings on load: {e}");
                        None
                    }
                }
            }
            TabEvent::Removed { tab_id } => {
                if self.active_tabs.remove(&tab_id).is_some() {
                    tracing::debug!(tab_id, "Forgot closed tab");
                }
                None
            }
        }
    }

    pub async fn handle_message(
        &mut self,
        request: ControllerRequest,
        sender: Option<TabId>,
    ) -> Reply {
        match request {
            ControllerRequest::SetColorScheme {
                tab_id,
                color_scheme,
            } => {
                let scheme = color_scheme_from(Some(&color_scheme));
                self.active_tabs
                    .entry(tab_id)
                    .or_default()
                    .settings
                    .color_scheme = scheme;
                Reply::AfterWrite(
                    self.coalescer
                        .write(keys::COLOR_SCHEME, json!(scheme.as_ref())),
                )
            }
            ControllerRequest::GetColorScheme => {
                let scheme = self
                    .sender_state(sender)
                    .map_or(ColorScheme::Default, |state| state.settings.color_scheme);
                Reply::Ready(MessageResponse::ok().with_color_scheme(scheme))
            }
            ControllerRequest::SetBrightness {
                tab_id,
                brightness_level,
            } => {
                let level = brightness_from(Some(&brightness_level));
                self.active_tabs
                    .entry(tab_id)
                    .or_default()
                    .settings
                    .brightness_level = level;
                Reply::AfterWrite(self.coalescer.write(keys::BRIGHTNESS_LEVEL, json!(level)))
            }
            ControllerRequest::GetSettings => {
                let settings = self
                    .sender_state(sender)
                    .map(|state| state.settings.clone())
                    .unwrap_or_default();
                Reply::Ready(MessageResponse::ok().with_settings(settings))
            }
            ControllerRequest::NavigationOccurred { domain, .. } => {
                Reply::Ready(self.navigation(&domain, sender).await)
            }
        }
    }

    async fn navigation(&mut self, domain: &str, sender: Option<TabId>) -> MessageResponse {
        match self.resolver.resolve_for_domain(domain).await {
            Ok(resolution) => {
                if let Some(tab_id) = sender {
                    self.active_tabs.insert(
                        tab_id,
                        TabState {
                            domain: Some(resolution.domain.clone()),
                            settings: resolution.settings.clone(),
                        },
                    );
                }
                watch_seed_write(resolution.domain, resolution.seed_write);
                MessageResponse::ok().with_settings(resolution.settings)
            }
            Err(e) => {
                tracing::warn!(domain, "Navigation handling failed: {e}");
                MessageResponse::failure(e)
            }
        }
    }

    fn sender_state(&self, sender: Option<TabId>) -> Option<&TabState> {
        sender.and_then(|tab_id| self.active_tabs.get(&tab_id))
    }

    /// Drive the controller until every [`ControllerHandle`] is dropped.
    pub async fn run(mut self, mut events: mpsc::Receiver<ControllerEvent>) {
        while let Some(event) = events.recv().await {
            match event {
                ControllerEvent::Tab(event) => {
                    // Delivery tasks report their own failures.
                    drop(self.handle_tab_event(event).await);
                }
                ControllerEvent::Message {
                    request,
                    sender,
                    reply,
                } => match self.handle_message(request, sender).await {
                    Reply::Ready(response) => {
                        let _ = reply.send(response);
                    }
                    pending @ Reply::AfterWrite(_) => {
                        tokio::spawn(async move {
                            let _ = reply.send(pending.into_response().await);
                        });
                    }
                },
            }
        }
        tracing::info!(tabs = self.active_tabs.len(), "Controller stopped");
    }

    /// Move the controller onto its own task and hand back a sender for it.
    pub fn spawn(self) -> (ControllerHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let task = tokio::spawn(self.run(rx));
        (ControllerHandle { events: tx }, task)
    }
}

/// Cloneable sender side of a running [`Controller`].
#[derive(Clone)]
pub struct ControllerHandle {
    events: mpsc::Sender<ControllerEvent>,
}

impl ControllerHandle {
    /// Returns `false` if the controller has stopped.
    pub async fn tab_event(&self, event: TabEvent) -> bool {
        self.events.send(ControllerEvent::Tab(event)).await.is_ok()
    }

    pub async fn request(
        &self,
        request: ControllerRequest,
        sender: Option<TabId>,
    ) -> MessageResponse {
        let (reply, response) = oneshot::channel();
        let event = ControllerEvent::Message {
            request,
            sender,
            reply,
        };
        if self.events.send(event).await.is_err() {
            return MessageResponse::failure("controller stopped");
        }
        response
            .await
            .unwrap_or_else(|_| MessageResponse::failure("controller dropped the reply"))
    }
}
