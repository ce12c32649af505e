//! Rule-based monitoring and alerting engine.
//!
//! [`engine::MonitoringEngine`] ingests per-resource samples into a bounded
//! [`buffer::MetricBuffer`], evaluates threshold [`rules::MonitoringRule`]s
//! against them and drives the alert lifecycle (trigger, acknowledge,
//! resolve) through [`lifecycle::AlertManager`]. Three periodic sweeps run on
//! the [`scheduler::Scheduler`]: resolution with hysteresis, anomaly
//! detection through an [`anomaly::AnomalyDetector`], and buffer retention.

pub mod anomaly;
pub mod buffer;
pub mod config;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod rules;
pub mod scheduler;


pub use config::EngineConfig;
pub use engine::{EngineStats, MonitoringEngine};
pub use error::AlertError;
pub use scheduler::SweepKind;
