//! Notification delivery and action dispatch for alert lifecycle events.
//!
//! Lifecycle events are routed to one or more [`NotificationChannel`]
//! implementations based on severity and on the action kinds each route
//! serves. The [`dispatcher::ActionDispatcher`] maps a rule's action tags to
//! handlers (channel deliveries, autoscaler requests) and runs each of them
//! on its own task so that slow or failing collaborators never hold up the
//! caller.

pub mod autoscale;
pub mod channels;
pub mod dispatcher;
pub mod error;
pub mod manager;
pub mod plugin;
pub mod routing;
pub mod utils;

#[cfg(test)]
mod tests;

use anyhow::Result;
use async_trait::async_trait;
use cloudguard_common::types::AlertEvent;

/// A notification delivery channel that forwards alert lifecycle events to
/// an external subscriber (webhook, dashboard log stream, ...).
///
/// Implementations are created by the corresponding [`plugin::ChannelPlugin`]
/// and registered in the notification manager's routing table.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Delivers the event through this channel.
    ///
    /// # Errors
    ///
    /// Returns an error if delivery fails after retries (if applicable).
    async fn send(&self, event: &AlertEvent) -> Result<()>;

    /// Returns the channel type name (e.g., `"webhook"`, `"log"`).
    fn channel_type(&self) -> &str;

    /// Returns the configured instance name of this channel.
    fn instance_id(&self) -> &str;
}
