use anyhow::Context;
use clap::Parser;
use igpsport_client::{Config, HttpFileSink, ReqwestIgpsportClient, SyncRunner};
use std::process::ExitCode;

mod cli;

use cli::{Cli, Exit, Failure};

fn init_tracing() {
    // Configure logging from env var `IGPSPORT_LOG_LEVEL` (or fallback to `RUST_LOG`, default `info`).
    let log_env = std::env::var("IGPSPORT_LOG_LEVEL")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string());

    // Keep connection-pool chatter quiet unless asked for explicitly
    let combined_filter = format!("{},hyper_util=warn", log_env);
    let env_filter = tracing_subscriber::EnvFilter::try_new(combined_filter)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,hyper_util=warn"));
    tracing_subscriber::fmt()
        .compact()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .with_env_filter(env_filter)
        .init();
    tracing::debug!("igpsport-sync: log filter: {}", log_env);
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    let config = cli.config();
    if !config.has_credentials() {
        eprintln!("{}", cli::usage());
        return Exit::MissingCredentials.into();
    }

    match run(&cli, config).await {
        Ok(exit) => exit.into(),
        Err(e) => {
            eprintln!("error: {e:#}");
            Exit::SetupFailed.into()
        }
    }
}

async fn run(cli: &Cli, config: Config) -> anyhow::Result<Exit> {
    let selection = cli.selection();

    let mut api = ReqwestIgpsportClient::new(&config).context("building api client")?;
    let sink = HttpFileSink::new(config.output.clone()).context("building download client")?;

    let mut failures = Vec::new();
    for format in selection.sync_formats() {
        tracing::info!(format, "starting sync");
        match SyncRunner::new(&mut api, &sink).run(format).await {
            Ok(report) => tracing::info!(
                format,
                pages = report.pages,
                files = report.files.len(),
                "format synced"
            ),
            Err(error) => failures.push(Failure { format, error }),
        }
    }

    let exit = cli::summarize(
        selection,
        &failures,
        &mut std::io::stdout(),
        &mut std::io::stderr(),
    )
    .context("writing summary")?;
    Ok(exit)
}
