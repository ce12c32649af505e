use anyhow::Result;
use tokio::io::BufReader;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use cloudguard_server::bootstrap;
use cloudguard_server::config::ServerConfig;
use cloudguard_server::ingest;

#[allow(clippy::print_stderr)]
fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cloudguard-server [config.toml]    Start the engine, reading JSON samples from stdin");
    eprintln!("  cloudguard-server --help           Show this message");
    eprintln!();
    eprintln!("Default config path: config/server.toml");
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("cloudguard=info".parse()?))
        .init();

    let args: Vec<String> = std::env::args().collect();
    match args.get(1).map(|s| s.as_str()) {
        Some("--help" | "-h") => {
            print_usage();
            Ok(())
        }
        path => run_server(path.unwrap_or("config/server.toml")).await,
    }
}

async fn run_server(config_path: &str) -> Result<()> {
    let config = ServerConfig::load(config_path)?;

    tracing::info!(
        config = %config_path,
        channels = config.channels.len(),
        rules_file = config.rules_file.as_deref().unwrap_or("-"),
        "cloudguard-server starting"
    );

    let engine = bootstrap::build_engine(&config)?;
    engine.start();

    let reader = BufReader::new(tokio::io::stdin());
    tokio::select! {
        result = ingest::run_ingest(&engine, reader) => {
            match result {
                Ok(summary) => tracing::info!(accepted = summary.accepted, "Input exhausted, shutting down"),
                Err(e) => tracing::error!(error = %e, "Reading samples failed"),
            }
        }
        _ = signal::ctrl_c() => {
            tracing::info!("Shutting down gracefully");
        }
    }

    engine.stop();
    let stats = engine.stats();
    tracing::info!(
        resources = stats.resources,
        samples = stats.samples,
        active_alerts = stats.active_alerts,
        history = stats.history_len,
        "Server stopped"
    );
    Ok(())
}
