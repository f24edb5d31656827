use std::fs::File;
use std::io;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

/// Install the global subscriber. Diagnostics go to `log_file` when given,
/// else to stderr if the terminal is free, else nowhere.
pub fn init(log_file: Option<&Path>, terminal_free: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None if terminal_free => builder.with_writer(io::stderr).init(),
        // The pager owns the terminal
        None => builder.with_writer(io::sink).init(),
    }
    Ok(())
}
