pub mod command;  // CLI subcommands
pub mod config;   // Configuration management
pub mod error;    // Error handling and types
pub mod goodwe;   // GoodWe UDP protocol implementation
pub mod options;  // Command line options parsing
pub mod prelude;  // Common imports and types
pub mod utils;    // Utility functions

// Get the package version from Cargo.toml
const CARGO_PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

use crate::prelude::*;
use crate::command::Command;
use crate::goodwe::Link;

use {futures::future::join_all, log::LevelFilter, std::io::Write};

const LOG_ENV: &str = "RUST_LOG";

/// Initialise logging. Everything is let through the filter so the level can
/// be narrowed later from the config file, unless `RUST_LOG` is set.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("trace"))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {} {}] {}",
                chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
                record.level(),
                record.module_path().unwrap_or(""),
                record.args()
            )
        })
        .write_style(env_logger::WriteStyle::Never)
        .try_init();

    if std::env::var_os(LOG_ENV).is_none() {
        log::set_max_level(LevelFilter::Info);
    }
}

fn apply_loglevel(level: &str) {
    if std::env::var_os(LOG_ENV).is_some() {
        return;
    }
    match level.parse::<LevelFilter>() {
        Ok(filter) => log::set_max_level(filter),
        Err(_) => warn!("ignoring unknown loglevel {}", level),
    }
}

/// Connect to one configured inverter and run `command` against it.
async fn run_inverter(inverter: config::Inverter, command: Command) -> Result<serde_json::Value> {
    let link = Link::udp(inverter.host(), inverter.port());
    let mut driver = goodwe::connect(
        link,
        inverter.family(),
        inverter.comm_addr(),
        inverter.timeout(),
        inverter.retries(),
    )
    .await?;

    command.run(&mut driver, inverter.include_unknown()).await
}

async fn run(options: Options) -> Result<()> {
    if !options.command.needs_inverter() {
        let output = Command::scan(goodwe::DEFAULT_TIMEOUT, goodwe::DEFAULT_RETRIES).await?;
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let config = match &options.host {
        Some(host) => Config::single(config::Inverter::from_host(host, options.port, options.family.clone()))?,
        None => Config::new(options.config_file.clone())?,
    };
    apply_loglevel(config.loglevel());

    let inverters: Vec<config::Inverter> = config.enabled_inverters().cloned().collect();
    if inverters.is_empty() {
        bail!("no enabled inverters configured");
    }

    let results = join_all(
        inverters
            .iter()
            .map(|inverter| run_inverter(inverter.clone(), options.command.clone())),
    )
    .await;

    let mut failed = 0;
    for (inverter, result) in inverters.iter().zip(results) {
        match result {
            Ok(output) => {
                let output = serde_json::json!({ "host": inverter.host(), "result": output });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            Err(err) => {
                error!("{}:{}: {}", inverter.host(), inverter.port(), err);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} inverters failed", failed, inverters.len());
    }
    Ok(())
}

/// Main application entry point. Returns early, dropping every in-flight
/// exchange and its socket, when a shutdown signal arrives.
pub async fn app(mut shutdown_rx: tokio::sync::broadcast::Receiver<()>, options: Options) -> Result<()> {
    init_logging();
    debug!("goodwe-bridge {} starting", CARGO_PKG_VERSION);

    tokio::select! {
        res = run(options) => res,
        _ = shutdown_rx.recv() => {
            info!("Shutdown signal received, cancelling");
            Ok(())
        }
    }
}
