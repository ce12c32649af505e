use crate::autoscale::{AutoscaleClient, ScaleDirection, ScalingRequest};
use crate::channels::webhook::WebhookChannel;
use crate::dispatcher::{ActionDispatcher, ActionHandler};
use crate::error::NotifyError;
use crate::manager::{NotificationManager, SilenceWindow};
use crate::plugin::ChannelRegistry;
use crate::routing::ChannelRoute;
use crate::NotificationChannel;
use async_trait::async_trait;
use cloudguard_common::clock::ManualClock;
use chrono::{NaiveTime, Utc};
use cloudguard_common::types::{
    ActionKind, Alert, AlertEvent, AlertEventKind, AlertStatus, Severity,
};
use std::sync::{Arc, Mutex};

fn make_event(severity: Severity, value: f64, threshold: f64) -> AlertEvent {
    let now = Utc::now();
    AlertEvent::new(
        AlertEventKind::Triggered,
        Alert {
            id: "1001".into(),
            rule_id: "cpu-high".into(),
            rule_name: "CPU high".into(),
            resource_id: "web-01".into(),
            metric: "cpu".into(),
            observed_value: value,
            threshold,
            severity,
            triggered_at: now,
            acknowledged_at: None,
            resolved_at: None,
            status: AlertStatus::Active,
            message: "cpu above 80.0 on web-01".into(),
        },
        now,
    )
}

struct RecordingChannel {
    name: String,
    fail: bool,
    seen: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl NotificationChannel for RecordingChannel {
    async fn send(&self, event: &AlertEvent) -> anyhow::Result<()> {
        if self.fail {
            anyhow::bail!("{} is down", self.name);
        }
        self.seen
            .lock()
            .unwrap()
            .push(format!("{}:{}", self.name, event.kind));
        Ok(())
    }

    fn channel_type(&self) -> &str {
        "recording"
    }

    fn instance_id(&self) -> &str {
        &self.name
    }
}

fn recording(name: &str, fail: bool, seen: &Arc<Mutex<Vec<String>>>) -> Box<dyn NotificationChannel> {
    Box::new(RecordingChannel {
        name: name.to_string(),
        fail,
        seen: seen.clone(),
    })
}

fn at(hour: u32, minute: u32) -> chrono::DateTime<Utc> {
    chrono::NaiveDate::from_ymd_opt(2024, 3, 10)
        .and_then(|d| d.and_hms_opt(hour, minute, 0))
        .unwrap()
        .and_utc()
}

fn window(start: (u32, u32), end: (u32, u32)) -> SilenceWindow {
    SilenceWindow {
        start: NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
        end: NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap(),
        recurrence: Some("daily".into()),
    }
}

#[test]
fn maintenance_window_same_day() {
    let maintenance = window((2, 0), (4, 0));
    for (hour, minute, expected) in [(1, 59, false), (2, 0, true), (3, 15, true), (4, 0, true), (4, 1, false)] {
        assert_eq!(maintenance.is_active(at(hour, minute)), expected, "{hour:02}:{minute:02}");
    }
}

#[test]
fn maintenance_window_wrapping_midnight() {
    let overnight = window((22, 30), (1, 0));
    for (hour, minute, expected) in [(22, 29, false), (23, 45, true), (0, 0, true), (1, 0, true), (12, 0, false)] {
        assert_eq!(overnight.is_active(at(hour, minute)), expected, "{hour:02}:{minute:02}");
    }
}

#[test]
fn routing_severity_filter() {
    let route_high = ChannelRoute {
        min_severity: Severity::High,
        channel_index: 0,
        actions: vec![ActionKind::Page],
    };
    let route_low = ChannelRoute {
        min_severity: Severity::Low,
        channel_index: 1,
        actions: vec![],
    };

    assert!(!route_high.should_send(Severity::Medium));
    assert!(route_high.should_send(Severity::High));
    assert!(route_high.should_send(Severity::Critical));
    assert!(route_high.serves(ActionKind::Page));
    assert!(!route_high.serves(ActionKind::Notify));

    assert!(route_low.should_send(Severity::Low));
    assert!(!route_low.serves(ActionKind::Page));
}

// ── Channel registry ──

#[test]
fn builtin_registry_lists_webhook_and_log() {
    let registry = ChannelRegistry::with_builtin();
    assert_eq!(registry.plugin_names(), ["log", "webhook"]);
    assert!(ChannelRegistry::new().plugin_names().is_empty());
}

#[test]
fn unregistered_channel_type_is_rejected() {
    let registry = ChannelRegistry::with_builtin();
    let config = serde_json::json!({});
    let result = registry.create_channel("pagerduty", "pd", &config);
    assert!(matches!(result, Err(NotifyError::UnknownChannelType(ref t)) if t == "pagerduty"));
}

#[test]
fn webhook_plugin_validates_config() {
    let registry = ChannelRegistry::with_builtin();

    let valid = serde_json::json!({ "urls": ["https://hooks.example.com/alerts"] });
    assert!(registry.create_channel("webhook", "ops", &valid).is_ok());

    let via_recipients = serde_json::json!({ "recipients": ["https://hooks.example.com/ops"] });
    assert!(registry.create_channel("webhook", "ops", &via_recipients).is_ok());

    let missing = serde_json::json!({});
    assert!(registry.create_channel("webhook", "ops", &missing).is_err());

    let empty = serde_json::json!({ "urls": [] });
    assert!(registry.create_channel("webhook", "ops", &empty).is_err());

    let bad_scheme = serde_json::json!({ "urls": ["ftp://example.com"] });
    let err = registry
        .create_channel("webhook", "ops", &bad_scheme)
        .err()
        .expect("ftp url should be rejected");
    assert!(err.to_string().contains("ftp://example.com"));
}

#[test]
fn log_plugin_accepts_null_config() {
    let registry = ChannelRegistry::with_builtin();
    let channel = registry
        .create_channel("log", "dashboard", &serde_json::Value::Null)
        .expect("log channel without config");
    assert_eq!(channel.channel_type(), "log");
    assert_eq!(channel.instance_id(), "dashboard");
}

#[test]
fn plugin_redacts_secrets() {
    let registry = ChannelRegistry::with_builtin();
    let plugin = registry.get_plugin("webhook").unwrap();
    let redacted = plugin.redact_config(&serde_json::json!({
        "urls": ["https://hooks.example.com"],
        "token": "s3cr3t"
    }));
    assert_eq!(redacted["token"], "***");
}

#[test]
fn webhook_template_substitutes_fields() {
    let channel = WebhookChannel::new(
        "ops",
        vec!["https://hooks.example.com".into()],
        Some("{{event}} {{resource_id}} {{metric}}={{value}} > {{threshold}} [{{severity}}]".into()),
    );
    let body = channel.render_body(&make_event(Severity::High, 85.0, 80.0));
    assert_eq!(body, "triggered web-01 cpu=85.00 > 80.00 [high]");
}

#[test]
fn webhook_default_body_is_json() {
    let channel = WebhookChannel::new("ops", vec![], None);
    let body = channel.render_body(&make_event(Severity::High, 85.0, 80.0));
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["event"], "triggered");
    assert_eq!(json["status"], "active");
    assert_eq!(json["severity"], "high");
    assert_eq!(json["resource_id"], "web-01");
}

// ── Manager tests ──

#[tokio::test]
async fn publish_respects_severity_routes() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let manager = NotificationManager::new(
        vec![recording("dash", false, &seen), recording("oncall", false, &seen)],
        vec![
            ChannelRoute {
                min_severity: Severity::Low,
                channel_index: 0,
                actions: vec![],
            },
            ChannelRoute {
                min_severity: Severity::Critical,
                channel_index: 1,
                actions: vec![ActionKind::Page],
            },
        ],
        vec![],
    );

    manager.publish(&make_event(Severity::Medium, 85.0, 80.0)).await;
    assert_eq!(*seen.lock().unwrap(), vec!["dash:triggered".to_string()]);
}

#[tokio::test]
async fn deliver_only_reaches_routes_serving_the_action() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let manager = NotificationManager::new(
        vec![recording("email", false, &seen), recording("pager", false, &seen)],
        vec![
            ChannelRoute {
                min_severity: Severity::Low,
                channel_index: 0,
                actions: vec![ActionKind::Notify],
            },
            ChannelRoute {
                min_severity: Severity::Low,
                channel_index: 1,
                actions: vec![ActionKind::Page],
            },
        ],
        vec![],
    );

    let delivered = manager
        .deliver(ActionKind::Page, &make_event(Severity::High, 85.0, 80.0))
        .await
        .unwrap();
    assert_eq!(delivered, 1);
    assert_eq!(*seen.lock().unwrap(), vec!["pager:triggered".to_string()]);
}

#[tokio::test]
async fn deliver_errors_when_every_target_fails() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let manager = NotificationManager::new(
        vec![recording("email", true, &seen)],
        vec![ChannelRoute {
            min_severity: Severity::Low,
            channel_index: 0,
            actions: vec![ActionKind::Notify],
        }],
        vec![],
    );

    let result = manager
        .deliver(ActionKind::Notify, &make_event(Severity::High, 85.0, 80.0))
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn deliver_suppressed_inside_silence_window() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let manager = NotificationManager::new(
        vec![recording("email", false, &seen)],
        vec![ChannelRoute {
            min_severity: Severity::Low,
            channel_index: 0,
            actions: vec![ActionKind::Notify],
        }],
        // Covers the whole day
        vec![SilenceWindow {
            start: NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
            end: NaiveTime::from_hms_opt(23, 59, 59).unwrap(),
            recurrence: None,
        }],
    )
    .with_clock(Arc::new(ManualClock::new(at(12, 0))));

    let delivered = manager
        .deliver(ActionKind::Notify, &make_event(Severity::High, 85.0, 80.0))
        .await
        .unwrap();
    assert_eq!(delivered, 0);
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn silence_follows_the_injected_clock() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let clock = Arc::new(ManualClock::new(at(2, 30)));
    let manager = NotificationManager::new(
        vec![recording("pager", false, &seen)],
        vec![ChannelRoute {
            min_severity: Severity::Low,
            channel_index: 0,
            actions: vec![ActionKind::Page],
        }],
        vec![window((2, 0), (4, 0))],
    )
    .with_clock(clock.clone());
    let event = make_event(Severity::Critical, 99.0, 80.0);

    assert_eq!(manager.deliver(ActionKind::Page, &event).await.unwrap(), 0);
    assert!(seen.lock().unwrap().is_empty());

    clock.set(at(4, 1));
    assert_eq!(manager.deliver(ActionKind::Page, &event).await.unwrap(), 1);
    assert_eq!(*seen.lock().unwrap(), vec!["pager:triggered".to_string()]);
}

// ── Dispatcher tests ──

struct CountingHandler {
    hits: Arc<Mutex<Vec<ActionKind>>>,
    kind: ActionKind,
    fail: bool,
}

#[async_trait]
impl ActionHandler for CountingHandler {
    async fn execute(&self, _event: &AlertEvent) -> anyhow::Result<()> {
        self.hits.lock().unwrap().push(self.kind);
        if self.fail {
            anyhow::bail!("handler for {} failed", self.kind);
        }
        Ok(())
    }
}

struct PanickingHandler;

#[async_trait]
impl ActionHandler for PanickingHandler {
    async fn execute(&self, _event: &AlertEvent) -> anyhow::Result<()> {
        panic!("handler blew up");
    }
}

#[tokio::test]
async fn dispatch_isolates_failing_actions() {
    let hits = Arc::new(Mutex::new(Vec::new()));
    let mut dispatcher = ActionDispatcher::new();
    dispatcher.register(
        ActionKind::Notify,
        Arc::new(CountingHandler {
            hits: hits.clone(),
            kind: ActionKind::Notify,
            fail: true,
        }),
    );
    dispatcher.register(ActionKind::Escalate, Arc::new(PanickingHandler));
    dispatcher.register(
        ActionKind::Page,
        Arc::new(CountingHandler {
            hits: hits.clone(),
            kind: ActionKind::Page,
            fail: false,
        }),
    );

    let handles = dispatcher.dispatch(
        &[ActionKind::Notify, ActionKind::Escalate, ActionKind::Page],
        &make_event(Severity::High, 85.0, 80.0),
    );
    assert_eq!(handles.len(), 3);
    for handle in handles {
        let _ = handle.await;
    }

    let mut hits = hits.lock().unwrap().clone();
    hits.sort_by_key(|k| k.to_string());
    assert_eq!(hits, vec![ActionKind::Notify, ActionKind::Page]);
}

#[tokio::test]
async fn dispatch_skips_unregistered_actions() {
    let dispatcher = ActionDispatcher::new();
    let handles = dispatcher.dispatch(&[ActionKind::AutoScale], &make_event(Severity::High, 85.0, 80.0));
    assert!(handles.is_empty());
    assert!(dispatcher.publish(&make_event(Severity::High, 85.0, 80.0)).is_none());
}

#[test]
fn dispatch_without_runtime_drops_work() {
    let mut dispatcher = ActionDispatcher::new();
    dispatcher.register(ActionKind::Page, Arc::new(PanickingHandler));
    let handles = dispatcher.dispatch(&[ActionKind::Page], &make_event(Severity::High, 85.0, 80.0));
    assert!(handles.is_empty());
}

struct RecordingScaler {
    requests: Arc<Mutex<Vec<ScalingRequest>>>,
}

#[async_trait]
impl AutoscaleClient for RecordingScaler {
    async fn submit_scaling_policy(&self, request: &ScalingRequest) -> anyhow::Result<()> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(())
    }
}

#[tokio::test]
async fn auto_scale_action_submits_request_for_alert_resource() {
    let requests = Arc::new(Mutex::new(Vec::new()));
    let dispatcher = ActionDispatcher::new().with_autoscaler(Arc::new(RecordingScaler {
        requests: requests.clone(),
    }));

    for handle in dispatcher.dispatch(&[ActionKind::AutoScale], &make_event(Severity::High, 85.0, 80.0)) {
        handle.await.unwrap();
    }

    let requests = requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].resource_id, "web-01");
    assert_eq!(requests[0].metric, "cpu");
    assert_eq!(requests[0].direction, ScaleDirection::ScaleOut);
}

#[test]
fn scaling_request_scales_in_below_threshold() {
    let event = make_event(Severity::Low, 5.0, 10.0);
    let request = ScalingRequest::for_alert(&event.alert, event.timestamp);
    assert_eq!(request.direction, ScaleDirection::ScaleIn);
    assert_eq!(request.alert_id, "1001");
}

#[tokio::test]
async fn with_notifier_wires_channel_actions() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let manager = Arc::new(NotificationManager::new(
        vec![recording("ops", false, &seen)],
        vec![ChannelRoute {
            min_severity: Severity::Low,
            channel_index: 0,
            actions: vec![ActionKind::Escalate],
        }],
        vec![],
    ));
    let dispatcher = ActionDispatcher::new().with_notifier(manager);
    assert!(dispatcher.has_handler(ActionKind::Notify));
    assert!(!dispatcher.has_handler(ActionKind::AutoScale));

    for handle in dispatcher.dispatch(&[ActionKind::Escalate], &make_event(Severity::High, 85.0, 80.0)) {
        handle.await.unwrap();
    }
    dispatcher
        .publish(&make_event(Severity::High, 85.0, 80.0))
        .unwrap()
        .await
        .unwrap();

    assert_eq!(seen.lock().unwrap().len(), 2);
}
