use crate::autoscale::{AutoscaleClient, ScalingRequest};
use crate::manager::NotificationManager;
use anyhow::Result;
use async_trait::async_trait;
use cloudguard_common::types::{ActionKind, AlertEvent};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Executes one kind of side effect for a lifecycle event.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn execute(&self, event: &AlertEvent) -> Result<()>;
}

/// Delivers the event to the notification routes serving `kind`.
pub struct ChannelActionHandler {
    kind: ActionKind,
    notifier: Arc<NotificationManager>,
}

impl ChannelActionHandler {
    pub fn new(kind: ActionKind, notifier: Arc<NotificationManager>) -> Self {
        Self { kind, notifier }
    }
}

#[async_trait]
impl ActionHandler for ChannelActionHandler {
    async fn execute(&self, event: &AlertEvent) -> Result<()> {
        self.notifier.deliver(self.kind, event).await.map(|_| ())
    }
}

/// Builds a scaling request scoped to the alert's resource and metric.
pub struct AutoScaleHandler {
    client: Arc<dyn AutoscaleClient>,
}

impl AutoScaleHandler {
    pub fn new(client: Arc<dyn AutoscaleClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ActionHandler for AutoScaleHandler {
    async fn execute(&self, event: &AlertEvent) -> Result<()> {
        let request = ScalingRequest::for_alert(&event.alert, event.timestamp);
        self.client.submit_scaling_policy(&request).await
    }
}

/// Maps action tags to handlers and runs each on its own task.
///
/// Nothing here holds engine state: callers hand over an owned event and
/// return immediately. A failing or panicking handler is logged and never
/// affects the other actions of the same dispatch.
#[derive(Default)]
pub struct ActionDispatcher {
    handlers: HashMap<ActionKind, Arc<dyn ActionHandler>>,
    notifier: Option<Arc<NotificationManager>>,
}

impl ActionDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wires `notify`, `escalate` and `page` to channel deliveries and uses
    /// the manager for lifecycle broadcasts.
    pub fn with_notifier(mut self, notifier: Arc<NotificationManager>) -> Self {
        for kind in [ActionKind::Notify, ActionKind::Escalate, ActionKind::Page] {
            self.handlers.insert(
                kind,
                Arc::new(ChannelActionHandler::new(kind, notifier.clone())),
            );
        }
        self.notifier = Some(notifier);
        self
    }

    pub fn with_autoscaler(mut self, client: Arc<dyn AutoscaleClient>) -> Self {
        self.handlers
            .insert(ActionKind::AutoScale, Arc::new(AutoScaleHandler::new(client)));
        self
    }

    pub fn register(&mut self, kind: ActionKind, handler: Arc<dyn ActionHandler>) {
        self.handlers.insert(kind, handler);
    }

    pub fn has_handler(&self, kind: ActionKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Starts one task per action. The returned handles may be awaited or
    /// dropped; dropping them does not cancel the work.
    pub fn dispatch(&self, actions: &[ActionKind], event: &AlertEvent) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::with_capacity(actions.len());
        for &kind in actions {
            let Some(handler) = self.handlers.get(&kind).cloned() else {
                tracing::debug!(action = %kind, alert_id = %event.alert.id, "No handler registered for action");
                continue;
            };
            let event = event.clone();
            let task = async move {
                if let Err(e) = handler.execute(&event).await {
                    tracing::warn!(
                        action = %kind,
                        alert_id = %event.alert.id,
                        rule_id = %event.alert.rule_id,
                        error = %e,
                        "Action failed"
                    );
                }
            };
            if let Some(handle) = spawn(task) {
                handles.push(handle);
            }
        }
        handles
    }

    /// Broadcasts a lifecycle event to subscribers without waiting.
    pub fn publish(&self, event: &AlertEvent) -> Option<JoinHandle<()>> {
        let notifier = self.notifier.clone()?;
        let event = event.clone();
        spawn(async move {
            notifier.publish(&event).await;
        })
    }
}

fn spawn<F>(task: F) -> Option<JoinHandle<()>>
where
    F: Future<Output = ()> + Send + 'static,
{
    match Handle::try_current() {
        Ok(handle) => Some(handle.spawn(task)),
        Err(_) => {
            tracing::warn!("No async runtime available, dropping dispatched work");
            None
        }
    }
}
