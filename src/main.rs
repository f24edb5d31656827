use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;

use axe_k8s::KubeCluster;
use axe_logs::Manager;

mod cli;
mod config;
mod logging;
mod pager;
mod plain;
mod shutdown;
mod spool;

use cli::Args;
use config::{Config, FileConfig, OutputMode};
use spool::Spool;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match run_app(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_app(args: Args) -> Result<()> {
    let file = match &args.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let config = Config::resolve(args, file)?;

    logging::init(
        config.log_file.as_deref(),
        config.output != OutputMode::Pager,
    )?;

    let cluster = KubeCluster::connect(config.context.as_deref()).await?;
    let namespaces = config.namespaces_or(cluster.default_namespace());
    tracing::info!(
        context = cluster.context().unwrap_or("<current>"),
        namespaces = ?namespaces,
        "starting"
    );

    let manager = Manager::new(cluster, config.settings.clone());
    for namespace in &namespaces {
        manager.watch(namespace);
    }
    let logs = manager.logs().context("Log feed already taken")?;

    let spool = config.spool.as_deref().map(Spool::open).transpose()?;

    let cancel = CancellationToken::new();
    tokio::spawn(shutdown::watch_signals(cancel.clone()));

    match config.output {
        OutputMode::Pager => pager::run(manager, logs, config.scrollback, spool, cancel).await,
        OutputMode::Plain | OutputMode::Json => {
            let json = config.output == OutputMode::Json;
            let writer = tokio::spawn(plain::run(logs, json, spool, cancel.clone()));

            let synced = manager.run(&cancel).await;
            if synced.is_err() {
                cancel.cancel();
            }

            let written = writer.await.context("Output task failed")?;
            synced?;
            written
        }
    }
}
