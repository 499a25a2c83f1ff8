// SPDX-License-Identifier: Apache-2.0

use clap::{Parser, ValueEnum};
use std::error::Error;
use std::io::{self, IsTerminal};
use std::process::ExitCode;
use tokio::select;
use tokio::signal::unix::{SignalKind, signal};
use tokio_util::sync::CancellationToken;
use tracing::metadata::LevelFilter;
use tracing::{error, info};
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_log::LogTracer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Registry};

use tailchase::diagnostics::TracingDiagnostics;
use tailchase::init::args::TailArgs;
use tailchase::input::GlobFileFinder;
use tailchase::persistence::JsonFileCheckpointStore;
use tailchase::sink::WriterSink;
use tailchase::{Config, RunSummary, Tailer};

type BoxError = Box<dyn Error + Send + Sync>;

#[derive(Debug, Parser)]
#[command(name = "tailchase")]
#[command(bin_name = "tailchase")]
#[command(version, about, long_about = None)]
struct Arguments {
    #[arg(value_enum, long, env = "TAILCHASE_LOG_FORMAT", default_value = "text")]
    /// Log format
    log_format: LogFormatArg,

    #[command(flatten)]
    tail: TailArgs,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, ValueEnum)]
pub enum LogFormatArg {
    Text,
    Json,
}

fn main() -> ExitCode {
    let opt = Arguments::parse();
    let config: Config = opt.tail.into();

    let _guard = match setup_logging(&opt.log_format, config.verbose) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("ERROR: failed to setup logging: {}", e);
            return ExitCode::from(1);
        }
    };

    match run_tail(config) {
        Ok(summary) => {
            info!(
                polls = summary.polls,
                records = summary.records,
                errors = summary.errors,
                "Exiting"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = e, "Failed to run tail loop.");
            ExitCode::from(1)
        }
    }
}

#[tokio::main]
async fn run_tail(config: Config) -> Result<RunSummary, BoxError> {
    let finder = GlobFileFinder::new(config.source_pattern.clone());
    let store = JsonFileCheckpointStore::open(&config.checkpoint_dir)?;
    let sink = WriterSink::new(io::stdout(), config.verbose);
    let mut tailer = Tailer::new(config, finder, store, sink, TracingDiagnostics)?;

    let cancel_token = CancellationToken::new();
    let mut tail_task = {
        let token = cancel_token.clone();
        tokio::task::spawn_blocking(move || tailer.run(&token))
    };

    select! {
        _ = signal_wait() => {
            info!("Shutdown signal received.");
            cancel_token.cancel();
            Ok((&mut tail_task).await?)
        },
        // Only returns on its own when not following
        summary = &mut tail_task => Ok(summary?),
    }
}

type LoggerGuard = tracing_appender::non_blocking::WorkerGuard;

/// Logs go to stderr, stdout carries the records
fn setup_logging(log_format: &LogFormatArg, verbose: bool) -> Result<LoggerGuard, BoxError> {
    LogTracer::init()?;

    let (non_blocking_writer, guard) = tracing_appender::non_blocking(io::stderr());

    let default_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env()?;

    if *log_format == LogFormatArg::Json {
        let app_name = format!("{}-{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        let bunyan_formatting_layer = BunyanFormattingLayer::new(app_name, non_blocking_writer);

        let subscriber = Registry::default()
            .with(filter)
            .with(JsonStorageLayer)
            .with(bunyan_formatting_layer);
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        // Skip color codes when not in a terminal
        let use_ansi = io::stderr().is_terminal();

        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking_writer)
            .with_target(false)
            .with_level(true)
            .with_ansi(use_ansi)
            .compact();

        let subscriber = Registry::default().with(filter).with(layer);
        tracing::subscriber::set_global_default(subscriber)?;
    }
    Ok(guard)
}

async fn signal_wait() {
    let (mut sig_term, mut sig_int) = match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(term), Ok(int)) => (term, int),
        (Err(e), _) | (_, Err(e)) => {
            error!("Unable to install signal handlers: {}", e);
            return std::future::pending().await;
        }
    };

    select! {
        _ = sig_term.recv() => {},
        _ = sig_int.recv() => {},
    }
}
