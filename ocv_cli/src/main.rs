mod check;
mod cli;
mod error_fmt;
mod inspect;
mod replay;
mod report;
mod session;
mod simulate;
mod trace;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::WrapErr;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE, json_mode};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};
use crate::replay::{ReplayArgs, run_replay};
use crate::simulate::{SimulateArgs, run_simulate};

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(err) = run(cli) {
        if json_mode() {
            eprintln!("{}", format_error_json(&err));
        } else {
            eprintln!("{}", humanize(&err));
        }
        std::process::exit(exit_code_for_error(&err));
    }
}

fn run(cli: Cli) -> eyre::Result<()> {
    color_eyre::install()?;

    let cfg = ocv_config::load_file(&cli.config)?;
    init_tracing(&cli.log_level, cli.json, &cfg.logging)?;
    cfg.validate().wrap_err("invalid configuration")?;
    tracing::debug!(config = %cli.config.display(), "config loaded");

    match cli.cmd {
        Commands::Replay {
            trace,
            model,
            store,
            every,
        } => run_replay(
            &cfg,
            &ReplayArgs {
                trace: &trace,
                model: model.as_deref(),
                store: store.as_deref(),
                every,
                json: cli.json,
            },
        ),
        Commands::Simulate {
            seconds,
            realtime,
            profile,
            period_ms,
            model,
            store,
            every,
        } => {
            let shutdown = Arc::new(AtomicBool::new(false));
            if realtime {
                let flag = shutdown.clone();
                ctrlc::set_handler(move || {
                    flag.store(true, Ordering::Relaxed);
                })
                .wrap_err("install Ctrl-C handler")?;
            }
            run_simulate(
                &cfg,
                &SimulateArgs {
                    seconds,
                    realtime,
                    profile: profile.as_deref(),
                    period_ms,
                    model: model.as_deref(),
                    store: store.as_deref(),
                    every,
                    json: cli.json,
                },
                &shutdown,
            )
        }
        Commands::Inspect { model, store } => {
            inspect::run_inspect(&cfg, model.as_deref(), store.as_deref(), cli.json)
        }
        Commands::SelfCheck => check::run_self_check(&cfg, cli.json),
    }
}

/// Console logs go to stderr (stdout carries estimates); the optional file
/// sink always writes JSON lines.
fn init_tracing(level: &str, json: bool, logging: &ocv_config::Logging) -> eyre::Result<()> {
    let console_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
    if json {
        layers.push(
            fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_filter(console_filter)
                .boxed(),
        );
    } else {
        layers.push(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(console_filter)
                .boxed(),
        );
    }

    if let Some(file) = logging.file.as_deref() {
        let path = Path::new(file);
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = path
            .file_name()
            .ok_or_else(|| eyre::eyre!("logging.file {file:?} has no file name"))?;
        let appender = match logging.rotation.as_deref().unwrap_or("never") {
            "daily" => tracing_appender::rolling::daily(dir, name),
            "hourly" => tracing_appender::rolling::hourly(dir, name),
            "never" => tracing_appender::rolling::never(dir, name),
            other => eyre::bail!("logging.rotation must be never|daily|hourly, got {other:?}"),
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        let file_filter = EnvFilter::try_new(logging.level.as_deref().unwrap_or("info"))?;
        layers.push(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(file_filter)
                .boxed(),
        );
    }

    // An already-installed global subscriber wins.
    let _ = tracing_subscriber::registry().with(layers).try_init();
    Ok(())
}
