//! Threadwarden: keeps chat thread titles, nicknames and membership in line
//! with operator policy.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::BufReader;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use threadwarden_core::WardenConfig;
use threadwarden_executor::Platform;
use threadwarden_runtime::{EngineHandle, KeepAlive};

mod dry_run;
mod envelope;
mod serve;

use dry_run::DryRunPlatform;

fn resolve_config_path() -> PathBuf {
    std::env::var("WARDEN_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("threadwarden.json"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing; stdout carries replies, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let config_path = resolve_config_path();

    if args.len() > 1 {
        match args[1].as_str() {
            "--config" | "config" => {
                let config = WardenConfig::load(&config_path);
                println!("{}", serde_json::to_string_pretty(&config)?);
                return Ok(());
            }
            "--init" | "init" => {
                if config_path.exists() {
                    return Err(threadwarden_core::Error::Config(format!(
                        "{} already exists",
                        config_path.display()
                    ))
                    .into());
                }
                WardenConfig::default().save(&config_path)?;
                println!("Wrote default configuration to {}", config_path.display());
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("Threadwarden — chat thread policy daemon");
                println!();
                println!("Usage: threadwarden [command]");
                println!();
                println!("Commands:");
                println!("  (none)     Read JSON envelopes from stdin, one per line");
                println!("  config     Print the effective configuration");
                println!("  init       Write a default configuration file");
                println!("  help       Show this help message");
                println!();
                println!("Environment:");
                println!("  WARDEN_CONFIG            Config file (default threadwarden.json)");
                println!("  WARDEN_RETRY_ATTEMPTS    Attempts per action");
                println!("  WARDEN_RETRY_DELAY_MS    Delay between attempts");
                println!("  WARDEN_MAX_CONCURRENCY   Remote calls in flight");
                println!("  WARDEN_KEEPALIVE_SECS    Keep-alive interval");
                println!("  WARDEN_KEEPALIVE_TYPING_MS  Typing pulse length");
                return Ok(());
            }
            _ => {
                eprintln!("Unknown command: {}. Use 'threadwarden help' for usage.", args[1]);
                std::process::exit(1);
            }
        }
    }

    let config = WardenConfig::load(&config_path);
    info!("Configuration: {}", config_path.display());

    let platform: Arc<dyn Platform> = Arc::new(DryRunPlatform);
    let engine = EngineHandle::start(platform.clone(), &config);

    let keepalive = tokio::spawn(KeepAlive::from_config(&config).run(engine.clone(), platform));

    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    tokio::select! {
        result = serve::serve(&engine, stdin, stdout) => {
            if let Err(e) = result {
                warn!("Input loop ended with error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted");
        }
    }

    keepalive.abort();
    engine.shutdown().await?;

    info!("Threadwarden stopped");
    Ok(())
}
