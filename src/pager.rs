use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use axe_k8s::Cluster;
use axe_logs::{LogRecord, Manager, SyncError};
use axe_tui::{
    AppState, Event, EventHandler, KeyBindings, PagerScreen, Throughput, Tui, humanize_bytes,
};
use axe_types::TailStatus;

use crate::spool::Spool;

/// How often the status message summarises throughput
const SUMMARY_INTERVAL: Duration = Duration::from_secs(5);

/// Run the interactive pager until the user quits or `cancel` fires
pub async fn run<C: Cluster>(
    manager: Manager<C>,
    mut logs: mpsc::Receiver<LogRecord>,
    scrollback: usize,
    mut spool: Option<Spool>,
    cancel: CancellationToken,
) -> Result<()> {
    let mut tui = Tui::new().context("Failed to initialise terminal")?;
    let mut events = EventHandler::new(Duration::from_millis(250), &cancel);
    let keybindings = KeyBindings::new();

    let mut state = AppState::new(scrollback);
    let mut meter = Throughput::default();
    let mut summary =
        tokio::time::interval_at(Instant::now() + SUMMARY_INTERVAL, SUMMARY_INTERVAL);

    let mut synced = start_manager(manager.clone(), cancel.clone());
    let mut syncing = true;

    state.set_status(TailStatus::Syncing);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,

            Some(event) = events.next() => match event {
                Event::Key(key) => {
                    if let Some(action) = keybindings.get_action(&key) {
                        state.handle_action(action);
                    }
                }
                Event::Resize(_, _) => state.render_dirty = true,
                Event::Tick => {}
                Event::Error(e) => state.set_message(e),
            },

            Some(record) = logs.recv() => {
                meter.add(record.payload_len());
                let line = state.push_record(&record);
                if let Some(spool) = spool.as_mut() {
                    spool.write_line(&line)?;
                }
            }

            result = &mut synced, if syncing => {
                syncing = false;
                match result {
                    Ok(Ok(())) => state.set_status(TailStatus::Tailing),
                    Ok(Err(e)) => {
                        state.set_status(TailStatus::Error);
                        state.set_message(format!("Log manager reported: {e}"));
                    }
                    // The run task was dropped; shutting down anyway
                    Err(_) => {}
                }
            }

            _ = summary.tick() => {
                let (live, total) = manager.container_count();
                let rate = meter.rate(std::time::Instant::now(), Duration::from_secs(1));
                state.set_message(format!(
                    "{live}/{total} containers | {} ({}/s)",
                    humanize_bytes(state.pager.byte_len() as f64),
                    humanize_bytes(rate),
                ));
            }
        }

        if state.should_quit {
            break;
        }

        if state.render_dirty {
            tui.draw(|frame| PagerScreen::render(frame, &mut state))
                .context("Failed to draw")?;
            state.render_dirty = false;
        }
    }

    cancel.cancel();
    events.shutdown();
    tui.restore().context("Failed to restore terminal")?;

    if let Some(spool) = spool.as_mut() {
        spool.flush()?;
        println!("Log file: {}", spool.path().display());
    }
    Ok(())
}

/// Run the manager in the background, reporting how the initial sync went
fn start_manager<C: Cluster>(
    manager: Manager<C>,
    cancel: CancellationToken,
) -> oneshot::Receiver<Result<(), SyncError>> {
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        let _ = tx.send(manager.run(&cancel).await);
    });
    rx
}
