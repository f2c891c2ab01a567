mod cli;
mod error_fmt;
mod run;

use clap::Parser;
use eyre::WrapErr;
use std::path::Path;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() {
    // Pretty panics and error reports; harmless if already installed.
    let _ = color_eyre::install();
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(e) = real_main(cli) {
        if JSON_MODE.get().copied().unwrap_or(false) {
            println!("{}", format_error_json(&e));
        } else {
            println!("{}", humanize(&e));
        }
        tracing::error!(error = %e, "command failed");
        std::process::exit(exit_code_for_error(&e));
    }
}

fn real_main(cli: Cli) -> eyre::Result<()> {
    let (cfg, cfg_found) = load_config(&cli.config)?;
    init_tracing(&cli, &cfg.logging);
    if !cfg_found {
        tracing::warn!(path = %cli.config.display(), "config file not found, using defaults");
    }

    match cli.cmd {
        Commands::Run {
            duration_s,
            export,
            no_start,
            every,
        } => run::run_live(
            &cfg,
            run::LiveOpts {
                duration_s,
                export,
                start: !no_start,
                every,
                json: cli.json,
            },
        ),
        Commands::Replay {
            input,
            export,
            every,
        } => run::replay(&cfg, &input, export.as_deref(), every, cli.json),
        Commands::Calibrate { out, mode } => run::calibrate(&cfg, out.as_deref(), &mode, cli.json),
        Commands::SelfCheck => run::self_check(&cfg, cli.json),
    }
}

/// Read and validate the TOML config. A missing file yields defaults.
fn load_config(path: &Path) -> eyre::Result<(roast_config::Config, bool)> {
    let text = match std::fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok((roast_config::Config::default(), false));
        }
        Err(e) => return Err(e).wrap_err_with(|| format!("open config {}", path.display())),
    };
    let cfg = roast_config::load_toml(&text)
        .map_err(|e| eyre::eyre!("parse config {}: {}", path.display(), e))?;
    cfg.validate()?;
    Ok((cfg, true))
}

fn init_tracing(cli: &Cli, logging: &roast_config::Logging) {
    let level = cli
        .log_level
        .clone()
        .or_else(|| logging.level.clone())
        .unwrap_or_else(|| "info".to_string());
    let make_filter = || match EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new("info")),
    };

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

    // Console logs go to stderr; stdout carries reports.
    if cli.json {
        layers.push(
            fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_filter(make_filter())
                .boxed(),
        );
    } else {
        layers.push(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(make_filter())
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
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "roast.log".to_string());
        let appender = match logging.rotation.as_deref() {
            Some("daily") => tracing_appender::rolling::daily(dir, name),
            Some("hourly") => tracing_appender::rolling::hourly(dir, name),
            _ => tracing_appender::rolling::never(dir, name),
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        layers.push(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(make_filter())
                .boxed(),
        );
    }

    // A subscriber may already be set (tests); keep going with that one.
    let _ = tracing_subscriber::registry().with(layers).try_init();
}
