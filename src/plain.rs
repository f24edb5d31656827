use std::io::{self, Write};

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use axe_types::LogRecord;

use crate::spool::Spool;

/// Write the feed to stdout until cancelled or the reader goes away
pub async fn run(
    mut rx: mpsc::Receiver<LogRecord>,
    json: bool,
    mut spool: Option<Spool>,
    cancel: CancellationToken,
) -> Result<()> {
    let stdout = io::stdout();

    loop {
        let record = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            record = rx.recv() => match record {
                Some(record) => record,
                None => break,
            },
        };

        let line = record.display_line();
        if let Some(spool) = spool.as_mut() {
            spool.write_line(&line)?;
        }

        let mut out = stdout.lock();
        let written = if json {
            serde_json::to_writer(&mut out, &record)
                .map_err(io::Error::other)
                .and_then(|()| out.write_all(b"\n"))
        } else {
            out.write_all(line.as_bytes())
                .and_then(|()| out.write_all(b"\n"))
        };

        match written {
            Ok(()) => {}
            // Downstream closed, e.g. `axe --plain | head`
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                cancel.cancel();
                break;
            }
            Err(e) => return Err(e).context("Failed to write to stdout"),
        }
    }

    if let Some(spool) = spool.as_mut() {
        spool.flush()?;
    }
    Ok(())
}
