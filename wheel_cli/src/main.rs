#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! `wheel` binary: embedded controller console and GUI bridge.

mod cli;
mod rt;
mod run;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::{Result, WrapErr};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};
use wheel_config::{Config, Logging};

use crate::cli::{Cli, Commands, FILE_GUARD};

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Cli::parse();

    let (config, loaded_from_file) = load_config(&args.config)?;
    init_tracing(&args, &config.logging)?;
    if loaded_from_file {
        tracing::info!(path = %args.config.display(), "config loaded");
    } else {
        tracing::info!(path = %args.config.display(), "config file absent, using defaults");
    }

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let flag = Arc::clone(&shutdown);
        ctrlc::set_handler(move || {
            flag.store(true, Ordering::Relaxed);
        })
        .wrap_err("installing Ctrl-C handler")?;
    }

    match args.cmd {
        Commands::Controller => run::controller(config, &shutdown),
        Commands::Bridge {
            serial_port,
            tcp_port,
            sim,
            rt,
            rt_prio,
        } => run::bridge(
            config,
            run::BridgeOpts {
                serial_port,
                tcp_port,
                sim,
                rt,
                rt_prio,
            },
            &shutdown,
        ),
    }
}

/// Missing config file falls back to defaults; a present but invalid file
/// is an error.
fn load_config(path: &Path) -> Result<(Config, bool)> {
    if !path.exists() {
        return Ok((Config::default(), false));
    }
    let raw = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("reading config {}", path.display()))?;
    let config = wheel_config::load_toml(&raw)
        .wrap_err_with(|| format!("parsing config {}", path.display()))?;
    config
        .validate()
        .wrap_err_with(|| format!("invalid config {}", path.display()))?;
    Ok((config, true))
}

/// Console layer (pretty or JSON per `--json`) plus an optional JSON-lines
/// file layer from `[logging]`. `RUST_LOG` overrides the configured level.
fn init_tracing(args: &Cli, logging: &Logging) -> Result<()> {
    let level = args
        .log_level
        .clone()
        .or_else(|| logging.level.clone())
        .unwrap_or_else(|| "info".to_owned());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let console = if args.json {
        fmt::layer().json().with_writer(std::io::stderr).boxed()
    } else {
        fmt::layer().with_writer(std::io::stderr).boxed()
    };

    let registry = tracing_subscriber::registry().with(filter).with(console);
    match file_writer(logging)? {
        Some(writer) => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(writer))
                .init();
        }
        None => registry.init(),
    }
    Ok(())
}

fn file_writer(logging: &Logging) -> Result<Option<tracing_appender::non_blocking::NonBlocking>> {
    let Some(file) = &logging.file else {
        return Ok(None);
    };
    let path = Path::new(file);
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let name = path
        .file_name()
        .ok_or_else(|| eyre::eyre!("logging.file has no file name: {file}"))?;

    let appender = match logging.rotation.as_deref() {
        Some("daily") => tracing_appender::rolling::daily(dir, name),
        Some("hourly") => tracing_appender::rolling::hourly(dir, name),
        Some("never") | None => tracing_appender::rolling::never(dir, name),
        Some(other) => {
            return Err(eyre::eyre!(
                "unknown logging.rotation {other:?}, expected never|daily|hourly"
            ));
        }
    };
    let (writer, guard) = tracing_appender::non_blocking(appender);
    // Keep the worker alive for the life of the process.
    let _ = FILE_GUARD.set(guard);
    Ok(Some(writer))
}
