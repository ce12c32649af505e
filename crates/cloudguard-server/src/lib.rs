//! CloudGuard server: configuration, rule seeding and sample ingestion
//! around a [`cloudguard_alert::MonitoringEngine`].

pub mod bootstrap;
pub mod config;
pub mod ingest;
pub mod rule_seed;
