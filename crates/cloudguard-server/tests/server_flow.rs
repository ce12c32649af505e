mod common;

use cloudguard_alert::SweepKind;
use cloudguard_common::types::AlertStatus;
use cloudguard_server::bootstrap;
use cloudguard_server::config::ServerConfig;
use cloudguard_server::ingest;
use common::{TestContext, RULES_JSON};

fn full_config(rules_path: &str) -> String {
    format!(
        r#"
rules_file = "{rules_path}"

[engine]
buffer_capacity = 50
resolution_interval_secs = 5

[[channels]]
name = "dashboard"
channel_type = "log"
min_severity = "low"
actions = ["notify", "page"]
config = {{ label = "dash" }}

[[channels]]
name = "broken-hook"
channel_type = "webhook"
config = {{}}

[[silence_windows]]
start_time = "02:00"
end_time = "02:30"
recurrence = "daily"
"#
    )
}

#[test]
fn empty_config_uses_defaults() -> anyhow::Result<()> {
    let ctx = TestContext::new()?;
    let path = ctx.write("server.toml", "")?;
    let config = ServerConfig::load(&path)?;
    assert_eq!(config.engine.buffer_capacity, 1000);
    assert_eq!(config.engine.resolution_interval_secs, 30);
    assert!(config.channels.is_empty());
    assert!(config.autoscale.is_none());
    Ok(())
}

#[test]
fn parses_full_config() -> anyhow::Result<()> {
    let ctx = TestContext::new()?;
    let path = ctx.write("server.toml", &full_config("rules.json"))?;
    let config = ServerConfig::load(&path)?;

    assert_eq!(config.engine.buffer_capacity, 50);
    assert_eq!(config.engine.resolution_interval_secs, 5);
    assert_eq!(config.engine.anomaly_interval_secs, 300);
    assert_eq!(config.channels.len(), 2);
    assert_eq!(config.channels[0].config["label"], "dash");
    assert_eq!(config.channels[0].actions, vec!["notify", "page"]);
    assert_eq!(config.silence_windows[0].start_time, "02:00");
    Ok(())
}

#[test]
fn rejects_zero_sweep_interval_and_bad_toml() -> anyhow::Result<()> {
    let ctx = TestContext::new()?;
    let zero = ctx.write("zero.toml", "[engine]\nretention_interval_secs = 0\n")?;
    assert!(ServerConfig::load(&zero).is_err());

    let garbage = ctx.write("garbage.toml", "engine = [")?;
    let err = ServerConfig::load(&garbage).unwrap_err();
    assert!(err.to_string().contains("garbage.toml"));

    assert!(ServerConfig::load("/nonexistent/server.toml").is_err());
    Ok(())
}

#[test]
fn build_engine_loads_seed_and_skips_bad_entries() -> anyhow::Result<()> {
    let ctx = TestContext::new()?;
    let rules = ctx.write("rules.json", RULES_JSON)?;
    let path = ctx.write("server.toml", &full_config(&rules))?;
    let config = ServerConfig::load(&path)?;

    let engine = bootstrap::build_engine(&config)?;
    let ids: Vec<String> = engine.list_rules().into_iter().map(|r| r.id).collect();
    assert_eq!(ids, vec!["cpu-high".to_string(), "disk-low".to_string()]);
    assert_eq!(engine.config().buffer_capacity, 50);
    Ok(())
}

#[test]
fn invalid_channel_is_skipped() -> anyhow::Result<()> {
    let ctx = TestContext::new()?;
    let path = ctx.write("server.toml", &full_config("unused.json"))?;
    let config = ServerConfig::load(&path)?;

    let notifier = bootstrap::build_notifier(&config, &Default::default())?;
    assert_eq!(notifier.channels().len(), 1);
    assert_eq!(notifier.channels()[0].instance_id(), "dashboard");
    Ok(())
}

#[test]
fn invalid_silence_window_fails_startup() -> anyhow::Result<()> {
    let ctx = TestContext::new()?;
    let path = ctx.write(
        "server.toml",
        "[[silence_windows]]\nstart_time = \"25:99\"\nend_time = \"03:00\"\n",
    )?;
    let config = ServerConfig::load(&path)?;
    assert!(bootstrap::build_engine(&config).is_err());
    Ok(())
}

#[test]
fn invalid_autoscale_endpoint_fails_startup() -> anyhow::Result<()> {
    let ctx = TestContext::new()?;
    let path = ctx.write(
        "server.toml",
        "[autoscale]\nendpoint = \"ftp://scaler.internal\"\n",
    )?;
    let config = ServerConfig::load(&path)?;
    assert!(bootstrap::build_engine(&config).is_err());
    Ok(())
}

#[tokio::test]
async fn ingests_json_lines_until_eof() -> anyhow::Result<()> {
    let ctx = TestContext::new()?;
    let rules = ctx.write("rules.json", RULES_JSON)?;
    let path = ctx.write("server.toml", &full_config(&rules))?;
    let engine = bootstrap::build_engine(&ServerConfig::load(&path)?)?;

    let input = concat!(
        "{\"resource_id\":\"web-01\",\"metric\":\"cpu\",\"value\":85.0}\n",
        "\n",
        "{\"resource_id\":\"web-01\",\"metric\":\"cpu\",\"value\":91.0}\n",
        "this is not json\n",
        "{\"resource_id\":\"\",\"metric\":\"cpu\",\"value\":1.0}\n",
        "{\"resource_id\":\"web-01\",\"metric\":\"disk_free\",\"value\":2.0}\n",
        "{\"resource_id\":\"db-01\",\"metric\":\"disk_free\",\"value\":2.0,\"timestamp\":\"2024-01-01T00:00:00Z\"}\n",
    );
    let summary = ingest::run_ingest(&engine, input.as_bytes()).await?;

    assert_eq!(summary.accepted, 4);
    assert_eq!(summary.rejected, 2);
    assert_eq!(summary.alerts_triggered, 2);

    let active = engine.list_active_alerts();
    assert_eq!(active.len(), 2);
    assert!(active.iter().all(|a| a.status == AlertStatus::Active));
    assert!(active
        .iter()
        .any(|a| a.rule_id == "disk-low" && a.resource_id == "db-01"));
    Ok(())
}

#[tokio::test]
async fn start_and_stop_sweeps() -> anyhow::Result<()> {
    let engine = bootstrap::build_engine(&ServerConfig::default())?;
    engine.start();
    assert!(SweepKind::ALL.iter().all(|k| engine.is_running(*k)));
    engine.stop();
    assert!(SweepKind::ALL.iter().all(|k| !engine.is_running(*k)));
    Ok(())
}
