use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::config::parse_duration;

/// axe - tail every container in every pod of one or more namespaces
#[derive(Parser, Debug, Default)]
#[command(name = "axe")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Kubernetes context name (defaults to the current context)
    #[arg(long)]
    pub context: Option<String>,

    /// Namespaces to watch, comma-separated or repeated
    /// (defaults to the context's namespace)
    #[arg(short = 'n', long = "namespace", value_delimiter = ',')]
    pub namespaces: Vec<String>,

    /// How far back the first read of each container reaches (e.g. 30s, 5m, 1h)
    #[arg(long, value_parser = parse_duration)]
    pub lookback: Option<Duration>,

    /// How often the pod snapshot is re-delivered; 0 disables
    #[arg(long, value_parser = parse_duration)]
    pub resync: Option<Duration>,

    /// Pause between reconnect attempts of a container stream
    #[arg(long, value_parser = parse_duration)]
    pub retry_interval: Option<Duration>,

    /// Capacity of the merged log feed
    #[arg(long)]
    pub buffer: Option<usize>,

    /// Lines kept in the pager
    #[arg(long)]
    pub scrollback: Option<usize>,

    /// Write lines to stdout instead of opening the pager
    #[arg(long)]
    pub plain: bool,

    /// Emit NDJSON records (implies --plain)
    #[arg(long)]
    pub json: bool,

    /// Also append every displayed line to this file
    #[arg(long, value_name = "PATH")]
    pub spool: Option<PathBuf>,

    /// Write diagnostics to this file (filtered by RUST_LOG)
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// TOML file with defaults for the options above
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}
