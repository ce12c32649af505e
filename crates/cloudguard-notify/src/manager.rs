use crate::routing::ChannelRoute;
use crate::NotificationChannel;
use anyhow::Result;
use chrono::{DateTime, NaiveTime, Utc};
use cloudguard_common::clock::{Clock, SystemClock};
use cloudguard_common::types::{ActionKind, AlertEvent};
use std::sync::Arc;

/// A daily time range during which action-driven deliveries are held back.
pub struct SilenceWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
    /// Free-form label (e.g. `"daily"`) carried into suppression logs.
    /// Every window recurs daily regardless of its value.
    pub recurrence: Option<String>,
}

impl SilenceWindow {
    /// Both bounds are inclusive. A window whose end is before its start
    /// wraps past midnight.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        let t = now.time();
        let wraps = self.end < self.start;
        match (t >= self.start, t <= self.end) {
            (after_start, before_end) if wraps => after_start || before_end,
            (after_start, before_end) => after_start && before_end,
        }
    }
}

/// Fans alert lifecycle events out to the configured channels.
pub struct NotificationManager {
    channels: Vec<Box<dyn NotificationChannel>>,
    routes: Vec<ChannelRoute>,
    silence_windows: Vec<SilenceWindow>,
    clock: Arc<dyn Clock>,
}

impl NotificationManager {
    pub fn new(
        channels: Vec<Box<dyn NotificationChannel>>,
        routes: Vec<ChannelRoute>,
        silence_windows: Vec<SilenceWindow>,
    ) -> Self {
        Self {
            channels,
            routes,
            silence_windows,
            clock: Arc::new(SystemClock),
        }
    }

    /// Silence windows are checked against this clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Broadcasts a lifecycle event to every route whose severity filter
    /// passes. Failures are logged per channel.
    pub async fn publish(&self, event: &AlertEvent) {
        let targets: Vec<usize> = self
            .routes
            .iter()
            .filter(|r| r.should_send(event.severity()))
            .map(|r| r.channel_index)
            .collect();
        self.send_to_channels(&targets, event).await;
    }

    /// Delivers an event on behalf of an action (`notify`, `escalate`,
    /// `page`) to the routes serving that action. Returns how many channels
    /// accepted it.
    ///
    /// # Errors
    ///
    /// Returns an error when at least one channel was targeted and none of
    /// them accepted the event.
    pub async fn deliver(&self, kind: ActionKind, event: &AlertEvent) -> Result<usize> {
        let now = self.clock.now();
        if let Some(window) = self.silence_windows.iter().find(|w| w.is_active(now)) {
            tracing::info!(
                action = %kind,
                rule_id = %event.alert.rule_id,
                window = window.recurrence.as_deref().unwrap_or("daily"),
                "Notification suppressed (silence window active)"
            );
            return Ok(0);
        }

        let targets: Vec<usize> = self
            .routes
            .iter()
            .filter(|r| r.serves(kind) && r.should_send(event.severity()))
            .map(|r| r.channel_index)
            .collect();

        if targets.is_empty() {
            tracing::debug!(action = %kind, "No channel routed for action");
            return Ok(0);
        }

        let delivered = self.send_to_channels(&targets, event).await;
        if delivered == 0 {
            anyhow::bail!("all {} channels failed for action {kind}", targets.len());
        }
        Ok(delivered)
    }

    async fn send_to_channels(&self, targets: &[usize], event: &AlertEvent) -> usize {
        let mut delivered = 0;
        for &index in targets {
            let Some(channel) = self.channels.get(index) else {
                tracing::warn!(channel_index = index, "Route points at a missing channel");
                continue;
            };
            match channel.send(event).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::error!(
                        channel = channel.instance_id(),
                        channel_type = channel.channel_type(),
                        error = %e,
                        "Failed to send notification"
                    );
                }
            }
        }
        delivered
    }

    pub fn channels(&self) -> &[Box<dyn NotificationChannel>] {
        &self.channels
    }
}
