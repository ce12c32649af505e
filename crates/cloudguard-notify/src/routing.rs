use cloudguard_common::types::{ActionKind, Severity};

/// Binds a channel to the events it should receive.
///
/// Every route gets lifecycle broadcasts at or above `min_severity`; only
/// routes listing an action kind receive deliveries for that action.
pub struct ChannelRoute {
    pub min_severity: Severity,
    pub channel_index: usize,
    pub actions: Vec<ActionKind>,
}

impl ChannelRoute {
    pub fn should_send(&self, event_severity: Severity) -> bool {
        event_severity >= self.min_severity
    }

    pub fn serves(&self, kind: ActionKind) -> bool {
        self.actions.contains(&kind)
    }
}
